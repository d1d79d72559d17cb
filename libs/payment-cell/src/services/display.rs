// libs/payment-cell/src/services/display.rs
use chrono::{DateTime, Duration, Utc};

use shared_config::AppConfig;

/// Bank details shown to the patient for a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDisplayConfig {
    pub bank_code: String,
    pub bank_account: String,
    pub qr_base_url: String,
    pub default_ttl_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDisplay {
    pub va_number: String,
    pub qr_code_url: String,
    pub expires_at: DateTime<Utc>,
}

impl PaymentDisplayConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bank_code: config.payment_bank_code.clone(),
            bank_account: config.payment_bank_account.clone(),
            qr_base_url: config.payment_qr_base_url.clone(),
            default_ttl_seconds: config.payment_order_ttl_seconds,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bank_code.is_empty() && !self.bank_account.is_empty() && !self.qr_base_url.is_empty()
    }

    /// Non-positive or missing TTLs fall back to the configured default.
    pub fn ttl_seconds(&self, requested: Option<i64>) -> i64 {
        requested.filter(|ttl| *ttl > 0).unwrap_or(self.default_ttl_seconds)
    }

    pub fn render(
        &self,
        order_code: &str,
        amount_vnd: i64,
        now: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> PaymentDisplay {
        PaymentDisplay {
            va_number: self.bank_account.clone(),
            qr_code_url: format!(
                "{}?acc={}&bank={}&amount={}&des={}",
                self.qr_base_url, self.bank_account, self.bank_code, amount_vnd, order_code
            ),
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }
}
