// libs/payment-cell/src/router.rs
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
use crate::middleware::webhook_auth_middleware;
use crate::services::{PaymentReconciler, TransactionalPaymentReconciler};

#[derive(Clone)]
pub struct PaymentState {
    pub config: Arc<AppConfig>,
    pub reconciler: Arc<dyn PaymentReconciler>,
}

impl PaymentState {
    pub fn new(config: Arc<AppConfig>, pool: DbPool) -> Self {
        let reconciler = TransactionalPaymentReconciler::new(pool, &config);

        Self {
            config,
            reconciler: Arc::new(reconciler),
        }
    }
}

pub fn payment_routes(state: PaymentState) -> Router {
    let order_routes = Router::new()
        .route("/orders", post(handlers::create_payment_order))
        .route("/orders/{order_code}", get(handlers::get_payment_order))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    // Provider callbacks carry an API key instead of a user token
    let webhook_routes = Router::new()
        .route("/webhooks/sepay", post(handlers::sepay_webhook))
        .layer(middleware::from_fn_with_state(state.config.clone(), webhook_auth_middleware));

    Router::new()
        .merge(order_routes)
        .merge(webhook_routes)
        .with_state(state)
}
