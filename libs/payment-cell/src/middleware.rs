// libs/payment-cell/src/middleware.rs
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::error::AppError;

const APIKEY_SCHEME: &str = "apikey ";

/// Checks `Authorization: Apikey <secret>` on provider callbacks. An unset
/// secret rejects every call.
pub async fn webhook_auth_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing webhook credentials".to_string()))?;

    let provided = header
        .get(..APIKEY_SCHEME.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(APIKEY_SCHEME))
        .map(|_| header[APIKEY_SCHEME.len()..].trim())
        .ok_or_else(|| AppError::Auth("Invalid webhook authorization scheme".to_string()))?;

    if config.sepay_webhook_secret.is_empty() || provided != config.sepay_webhook_secret {
        warn!("Rejected webhook call with invalid API key");
        return Err(AppError::Auth("Invalid webhook API key".to_string()));
    }

    Ok(next.run(request).await)
}
