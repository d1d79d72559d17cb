// libs/payment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_database::schema::{payment_events, payment_orders};
use shared_models::error::AppError;

pub const PAYMENT_METHOD_VA: &str = "VA";
pub const PAYMENT_PROVIDER_SEPAY: &str = "SEPAY";

// ==============================================================================
// ORDER STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentOrderStatus {
    Pending,
    Awaiting,
    Paid,
    Partially,
    Cancelled,
}

impl PaymentOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentOrderStatus::Pending => "PENDING",
            PaymentOrderStatus::Awaiting => "AWAITING",
            PaymentOrderStatus::Paid => "PAID",
            PaymentOrderStatus::Partially => "PARTIALLY",
            PaymentOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(PaymentOrderStatus::Pending),
            "AWAITING" => Some(PaymentOrderStatus::Awaiting),
            "PAID" => Some(PaymentOrderStatus::Paid),
            "PARTIALLY" => Some(PaymentOrderStatus::Partially),
            "CANCELLED" => Some(PaymentOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Only unpaid orders accept webhook updates.
    pub fn is_unpaid(self) -> bool {
        matches!(self, PaymentOrderStatus::Pending | PaymentOrderStatus::Awaiting)
    }

    pub fn unpaid_codes() -> Vec<&'static str> {
        vec![
            PaymentOrderStatus::Pending.as_str(),
            PaymentOrderStatus::Awaiting.as_str(),
        ]
    }
}

impl fmt::Display for PaymentOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// STORAGE ENTITIES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = payment_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentOrderEntity {
    pub id: i32,
    pub appointment_id: i32,
    pub patient_id: i32,
    pub clinic_id: i32,
    pub service_id: i32,
    pub order_code: String,
    pub amount_vnd: i64,
    pub status: String,
    pub method: String,
    pub provider: String,
    pub va_number: Option<String>,
    pub qr_code_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentOrderEntity {
    pub fn status(&self) -> Result<PaymentOrderStatus, PaymentError> {
        PaymentOrderStatus::parse(&self.status).ok_or_else(|| {
            PaymentError::DatabaseError(format!(
                "Payment order {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_orders)]
pub struct NewPaymentOrderEntity {
    pub appointment_id: i32,
    pub patient_id: i32,
    pub clinic_id: i32,
    pub service_id: i32,
    pub order_code: String,
    pub amount_vnd: i64,
    pub status: String,
    pub method: String,
    pub provider: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_events)]
pub struct NewPaymentEventEntity {
    pub sepay_tx_id: String,
    pub code: Option<String>,
    pub reference_code: Option<String>,
    pub transfer_amount: i64,
    pub transfer_type: Option<String>,
    pub content: Option<String>,
    pub raw_payload: Value,
}

// ==============================================================================
// REQUESTS AND RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub appointment_id: i32,
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    pub payment_order_id: i32,
    pub order_code: String,
    pub amount_vnd: i64,
    pub status: PaymentOrderStatus,
    pub va_number: Option<String>,
    pub qr_code_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub patient_id: i32,
}

impl TryFrom<PaymentOrderEntity> for OrderDetail {
    type Error = PaymentError;

    fn try_from(order: PaymentOrderEntity) -> Result<Self, Self::Error> {
        let status = order.status()?;
        Ok(Self {
            payment_order_id: order.id,
            order_code: order.order_code,
            amount_vnd: order.amount_vnd,
            status,
            va_number: order.va_number,
            qr_code_url: order.qr_code_url,
            expires_at: order.expires_at,
            patient_id: order.patient_id,
        })
    }
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Transaction id already recorded; nothing applied.
    Duplicate,
    /// Logged only: outbound, unmatched, zero amount or order already settled.
    Recorded,
    Applied {
        order_code: String,
        status: PaymentOrderStatus,
    },
}

// ==============================================================================
// WEBHOOK PAYLOAD
// ==============================================================================

/// Bank-transfer notification. Parsed from the raw JSON so the untouched
/// payload can be stored alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct SepayWebhookEvent {
    pub transaction_id: String,
    pub code: Option<String>,
    pub transfer_amount: i64,
    pub transfer_type: Option<String>,
    pub content: Option<String>,
    pub reference_code: Option<String>,
    pub raw: Value,
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_field(payload: &Value, key: &str) -> i64 {
    match payload.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f.trunc() as i64).unwrap_or(0),
        _ => 0,
    }
}

impl SepayWebhookEvent {
    pub fn from_value(raw: Value) -> Result<Self, PaymentError> {
        if !raw.is_object() {
            return Err(PaymentError::ValidationError(
                "Webhook payload must be a JSON object".to_string(),
            ));
        }

        let transaction_id = string_field(&raw, "id").ok_or(PaymentError::MissingTransactionId)?;

        Ok(Self {
            transaction_id,
            code: string_field(&raw, "code"),
            transfer_amount: amount_field(&raw, "transferAmount"),
            transfer_type: string_field(&raw, "transferType").map(|t| t.to_ascii_lowercase()),
            content: string_field(&raw, "content"),
            reference_code: string_field(&raw, "referenceCode"),
            raw,
        })
    }

    pub fn is_incoming(&self) -> bool {
        self.transfer_type.as_deref() == Some("in")
    }

    pub fn to_audit_row(&self) -> NewPaymentEventEntity {
        NewPaymentEventEntity {
            sepay_tx_id: self.transaction_id.clone(),
            code: self.code.clone(),
            reference_code: self.reference_code.clone(),
            transfer_amount: self.transfer_amount,
            transfer_type: self.transfer_type.clone(),
            content: self.content.clone(),
            raw_payload: self.raw.clone(),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("An unpaid payment order already exists")]
    UnpaidOrderExists,

    #[error("Appointment is canceled")]
    AppointmentCanceled,

    #[error("Missing transaction id")]
    MissingTransactionId,

    #[error("Payment is busy, please retry: {0}")]
    LockContention(String),

    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

const ONE_UNPAID_ORDER_INDEX: &str = "payment_orders_one_unpaid";

impl From<DieselError> for PaymentError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if info.constraint_name() == Some(ONE_UNPAID_ORDER_INDEX) =>
            {
                PaymentError::UnpaidOrderExists
            }
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, ref info) => {
                PaymentError::LockContention(info.message().to_string())
            }
            DieselError::DatabaseError(_, ref info)
                if info.message().contains("deadlock detected")
                    || info.message().contains("lock timeout") =>
            {
                PaymentError::LockContention(info.message().to_string())
            }
            other => PaymentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound(_) => AppError::NotFound(err.to_string()),
            PaymentError::UnpaidOrderExists
            | PaymentError::AppointmentCanceled
            | PaymentError::LockContention(_) => AppError::Conflict(err.to_string()),
            PaymentError::MissingTransactionId => AppError::ValidationError(err.to_string()),
            PaymentError::ValidationError(msg) => AppError::ValidationError(msg),
            PaymentError::NotConfigured => AppError::Internal(err.to_string()),
            PaymentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
