use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub sepay_webhook_secret: String,
    pub payment_bank_code: String,
    pub payment_bank_account: String,
    pub payment_qr_base_url: String,
    pub payment_order_ttl_seconds: i64,
    pub clinic_utc_offset_hours: i32,
    pub booking_lock_timeout_ms: u64,
    pub booking_emit_qr: bool,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            sepay_webhook_secret: env::var("SEPAY_WEBHOOK_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SEPAY_WEBHOOK_SECRET not set, webhook calls will be rejected");
                    String::new()
                }),
            payment_bank_code: env::var("PAYMENT_BANK_CODE")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_BANK_CODE not set, using empty value");
                    String::new()
                }),
            payment_bank_account: env::var("PAYMENT_BANK_ACCOUNT")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_BANK_ACCOUNT not set, using empty value");
                    String::new()
                }),
            payment_qr_base_url: env::var("PAYMENT_QR_BASE_URL")
                .unwrap_or_else(|_| "https://qr.sepay.vn/img".to_string()),
            payment_order_ttl_seconds: parse_or("PAYMENT_ORDER_TTL_SECONDS", 900),
            clinic_utc_offset_hours: parse_or("CLINIC_UTC_OFFSET_HOURS", 7),
            booking_lock_timeout_ms: parse_or("BOOKING_LOCK_TIMEOUT_MS", 5000),
            booking_emit_qr: parse_or("BOOKING_EMIT_QR", true),
            server_port: parse_or("SERVER_PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty() && !self.jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.sepay_webhook_secret.is_empty()
            && !self.payment_bank_code.is_empty()
            && !self.payment_bank_account.is_empty()
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
