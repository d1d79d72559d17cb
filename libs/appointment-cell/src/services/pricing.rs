// libs/appointment-cell/src/services/pricing.rs
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use shared_database::schema::services;

use crate::models::AppointmentError;

/// Insured patients pay half. There are no other tiers.
pub const INSURANCE_DISCOUNT_PERCENT: i64 = 50;

/// Price charged for a booking. Odd amounts round down in the patient's
/// favour.
pub fn snapshot_price(base_price: i64, has_insurance: bool) -> i64 {
    if has_insurance {
        base_price * (100 - INSURANCE_DISCOUNT_PERCENT) / 100
    } else {
        base_price
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PricingService;

impl PricingService {
    pub fn new() -> Self {
        Self
    }

    pub async fn base_price(
        &self,
        conn: &mut AsyncPgConnection,
        service_id: i32,
    ) -> Result<i64, AppointmentError> {
        services::table
            .find(service_id)
            .select(services::price)
            .first::<i64>(conn)
            .await
            .optional()?
            .ok_or_else(|| AppointmentError::NotFound("Service".to_string()))
    }

    pub async fn quote(
        &self,
        conn: &mut AsyncPgConnection,
        service_id: i32,
        has_insurance: bool,
    ) -> Result<i64, AppointmentError> {
        let base = self.base_price(conn, service_id).await?;
        let price = snapshot_price(base, has_insurance);
        debug!(
            "Priced service {} at {} (base {}, insured: {})",
            service_id, price, base, has_insurance
        );
        Ok(price)
    }
}
