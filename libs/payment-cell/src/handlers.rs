// libs/payment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_models::auth::AuthContext;
use shared_models::error::AppError;

use crate::models::{CreateOrderRequest, OrderDetail, SepayWebhookEvent};
use crate::router::PaymentState;

// ==============================================================================
// ORDER HANDLERS
// ==============================================================================

/// Patients may only pay for their own appointments; staff can open an
/// order for any appointment.
#[axum::debug_handler]
pub async fn create_payment_order(
    State(state): State<PaymentState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<OrderDetail>, AppError> {
    let owner = match &auth {
        AuthContext::Patient { patient_id } => Some(*patient_id),
        AuthContext::Staff { .. } => None,
    };

    let order = state.reconciler.create_order(request, owner).await?;

    Ok(Json(order))
}

#[axum::debug_handler]
pub async fn get_payment_order(
    State(state): State<PaymentState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let order = state.reconciler.get_order(order_code.clone()).await?;

    if let AuthContext::Patient { patient_id } = auth {
        if order.patient_id != patient_id {
            debug!("Patient {} asked for order {} of another patient", patient_id, order_code);
            return Err(AppError::NotFound("Order not found".to_string()));
        }
    }

    Ok(Json(json!({
        "id": order.payment_order_id,
        "order_code": order.order_code,
        "amount_vnd": order.amount_vnd,
        "status": order.status,
        "va_number": order.va_number,
        "qr_code_url": order.qr_code_url
    })))
}

// ==============================================================================
// WEBHOOK HANDLER
// ==============================================================================

/// Acknowledges every well-formed delivery, matched or not, so the provider
/// stops retrying.
#[axum::debug_handler]
pub async fn sepay_webhook(
    State(state): State<PaymentState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let event = SepayWebhookEvent::from_value(payload).map_err(|e| {
        warn!("Rejected webhook payload: {}", e);
        AppError::from(e)
    })?;

    state.reconciler.handle_webhook(event).await?;

    Ok(Json(json!({ "success": true })))
}
