// libs/appointment-cell/src/services/mod.rs
pub mod booking;
pub mod cancellation;
pub mod capacity;
pub mod counter;
pub mod lifecycle;
pub mod pricing;
pub mod qr;
pub mod queries;
pub mod schedule;

pub use booking::{AppointmentBooking, TransactionalBookingService};
pub use cancellation::{AppointmentCancellation, TransactionalCancellationService};
pub use capacity::ShiftCapacityGuard;
pub use counter::CounterService;
pub use lifecycle::AppointmentLifecycleService;
pub use pricing::PricingService;
pub use qr::{Base64JsonEncoder, QrEncoder};

use std::fmt::Display;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{error, warn};

use shared_config::AppConfig;

use crate::models::AppointmentError;

/// Fixed clinic offset from config; UTC if the configured hours are out of
/// range.
pub fn clinic_offset(config: &AppConfig) -> FixedOffset {
    config
        .clinic_utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            warn!(
                "CLINIC_UTC_OFFSET_HOURS={} is out of range, falling back to UTC",
                config.clinic_utc_offset_hours
            );
            Utc.fix()
        })
}

pub(crate) fn pool_error<E: Display>(err: E) -> AppointmentError {
    error!("Failed to obtain a DB connection: {}", err);
    AppointmentError::DatabaseError(format!("Failed to obtain a DB connection: {}", err))
}
