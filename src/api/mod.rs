pub mod auth;
pub mod fees;
pub mod households;
pub mod invoices;
pub mod residents;

use crate::middleware::AppState;
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/households", households::routes())
        .nest("/residents", residents::routes())
        .nest("/fees", fees::routes())
        .nest("/invoices", invoices::routes())
}
