// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::pg::DbPool;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{
    AppointmentBooking, AppointmentCancellation, TransactionalBookingService,
    TransactionalCancellationService,
};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<dyn AppointmentBooking>,
    pub cancellation: Arc<dyn AppointmentCancellation>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, pool: DbPool) -> Self {
        let booking = TransactionalBookingService::new(pool.clone(), &config);
        let cancellation = TransactionalCancellationService::new(pool, &config);

        Self {
            config,
            booking: Arc::new(booking),
            cancellation: Arc::new(cancellation),
        }
    }
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    // All appointment operations require a patient token
    let protected_routes = Router::new()
        .route("/", post(handlers::book_online_appointment))
        .route("/offline", post(handlers::book_offline_appointment))
        .route("/me", get(handlers::list_my_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
