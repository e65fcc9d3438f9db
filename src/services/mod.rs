pub mod auth_service;
pub mod fee_service;
pub mod household_service;
pub mod invoice_service;
pub mod refresh_token_service;

pub use auth_service::AuthService;
pub use fee_service::FeeService;
pub use household_service::HouseholdService;
pub use invoice_service::InvoiceService;
pub use refresh_token_service::{RefreshTokenService, RotationResult};
