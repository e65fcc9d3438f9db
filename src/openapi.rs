use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BlueMoon API",
        version = "1.0.0",
        description = "Backend API for BlueMoon - apartment building management: households, resident rosters, monthly fee invoices and payments",
        contact(
            name = "BlueMoon Team",
            email = "support@bluemoon.vn"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "auth", description = "Authentication: login, refresh rotation, logout, registration"),
        (name = "households", description = "Apartments, hosts and member rosters"),
        (name = "residents", description = "Resident records across all apartments"),
        (name = "fees", description = "Fee catalog"),
        (name = "invoices", description = "Monthly invoices, fee lines and payments")
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::refresh_token,
        crate::api::auth::logout,
        crate::api::auth::register,
        // Households
        crate::api::households::list_households,
        crate::api::households::create_household,
        crate::api::households::get_household,
        crate::api::households::update_household,
        crate::api::households::delete_household,
        crate::api::households::get_members,
        crate::api::households::add_member,
        // Residents
        crate::api::residents::list_residents,
        crate::api::residents::update_member,
        crate::api::residents::delete_resident,
        // Fees
        crate::api::fees::list_fees,
        crate::api::fees::get_fee,
        crate::api::fees::create_fee,
        crate::api::fees::update_fee,
        crate::api::fees::delete_fee,
        // Invoices
        crate::api::invoices::list_invoices,
        crate::api::invoices::create_invoice,
        crate::api::invoices::get_invoice,
        crate::api::invoices::update_invoice,
        crate::api::invoices::delete_invoice,
        crate::api::invoices::apply_payment,
        crate::api::invoices::update_invoice_detail,
        crate::api::invoices::delete_invoice_detail,
    ),
    components(
        schemas(
            // Auth
            crate::models::LoginRequest,
            crate::models::LoginResponse,
            crate::models::UserDetail,
            crate::models::UserRole,
            crate::models::TokenResponse,
            crate::models::RegisterRequest,
            crate::api::auth::MessageResponse,
            // Households
            crate::models::ApartmentStatus,
            crate::models::ApartmentType,
            crate::models::HouseholdRequest,
            crate::models::HouseholdResponse,
            crate::models::HouseholdsQuery,
            // Residents
            crate::models::ResidentStatus,
            crate::models::AddMemberRequest,
            crate::models::UpdateMemberRequest,
            crate::models::ResidentResponse,
            crate::models::ResidentsQuery,
            // Fees
            crate::models::Fee,
            crate::models::FeeRequest,
            // Invoices
            crate::models::InvoiceStatus,
            crate::models::PaymentMethod,
            crate::models::TransactionStatus,
            crate::models::FeeItemRequest,
            crate::models::CreateInvoiceRequest,
            crate::models::UpdateInvoiceRequest,
            crate::models::UpdateDetailRequest,
            crate::models::ApplyPaymentRequest,
            crate::models::InvoiceDetailResponse,
            crate::models::InvoiceResponse,
            crate::models::PaymentResponse,
            crate::models::InvoicesQuery,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
