pub mod apartment;
pub mod fee;
pub mod invoice;
pub mod resident;
pub mod user;

pub use apartment::{
    Apartment, ApartmentStatus, ApartmentType, HouseholdRequest, HouseholdResponse,
    HouseholdsQuery,
};
pub use fee::{Fee, FeeRequest};
pub use invoice::{
    ApplyPaymentRequest, CreateInvoiceRequest, FeeItemRequest, Invoice, InvoiceDetail,
    InvoiceDetailResponse, InvoiceResponse, InvoiceStatus, InvoicesQuery, Payment, PaymentMethod,
    PaymentResponse, TransactionStatus, UpdateDetailRequest, UpdateInvoiceRequest,
};
pub use resident::{
    AddMemberRequest, Resident, ResidentResponse, ResidentStatus, ResidentsQuery,
    UpdateMemberRequest,
};
pub use user::{
    LoginRequest, LoginResponse, RefreshToken, RegisterRequest, TokenResponse, UserAccount,
    UserDetail, UserRole,
};
