// libs/appointment-cell/src/services/qr.rs
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::AppointmentError;

/// Data bound into an appointment's check-in code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrPayload {
    pub appointment_id: i32,
    pub queue_number: i32,
    pub shift_number: Option<i32>,
    pub estimated_time: Option<NaiveDateTime>,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

/// Turns a payload into whatever the front desk scanner reads.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, payload: &QrPayload) -> Result<String, AppointmentError>;
}

/// Base64 of the JSON payload. Rendering to an image is left to clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonEncoder;

impl QrEncoder for Base64JsonEncoder {
    fn encode(&self, payload: &QrPayload) -> Result<String, AppointmentError> {
        let json = serde_json::to_vec(payload).map_err(|e| {
            AppointmentError::ValidationError(format!("QR payload is not serializable: {}", e))
        })?;
        Ok(general_purpose::STANDARD.encode(json))
    }
}
