use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, AppointmentState};
use payment_cell::router::{payment_routes, PaymentState};
use shared_config::AppConfig;
use shared_database::pg::DbPool;

pub fn create_router(config: Arc<AppConfig>, pool: DbPool) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest(
            "/appointments",
            appointment_routes(AppointmentState::new(config.clone(), pool.clone())),
        )
        .nest("/payments", payment_routes(PaymentState::new(config, pool)))
}
