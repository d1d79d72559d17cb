// libs/appointment-cell/src/services/counter.rs
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use shared_database::schema::{daily_counters, shift_counters};

use crate::models::AppointmentError;

/// Issues queue numbers. Both counters are monotonic but not gap-free: a
/// rolled-back booking burns the value it drew.
///
/// Every call must run inside the booking transaction so the counter row
/// lock is held until the appointment row commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterService;

impl CounterService {
    pub fn new() -> Self {
        Self
    }

    /// Next 1-based ticket number for a clinic on a calendar day.
    pub async fn next_daily_number(
        &self,
        conn: &mut AsyncPgConnection,
        clinic_id: i32,
        day: NaiveDate,
    ) -> Result<i32, AppointmentError> {
        diesel::insert_into(daily_counters::table)
            .values((
                daily_counters::clinic_id.eq(clinic_id),
                daily_counters::counter_date.eq(day),
                daily_counters::last_number.eq(1),
            ))
            .on_conflict((daily_counters::clinic_id, daily_counters::counter_date))
            .do_update()
            .set((
                daily_counters::last_number.eq(daily_counters::last_number + 1),
                daily_counters::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        let number = daily_counters::table
            .find((clinic_id, day))
            .select(daily_counters::last_number)
            .for_update()
            .first::<i32>(conn)
            .await?;

        debug!("Issued daily number {} for clinic {} on {}", number, clinic_id, day);
        Ok(number)
    }

    /// Next 1-based position inside a shift.
    pub async fn next_shift_number(
        &self,
        conn: &mut AsyncPgConnection,
        shift_id: i32,
    ) -> Result<i32, AppointmentError> {
        diesel::insert_into(shift_counters::table)
            .values((
                shift_counters::shift_id.eq(shift_id),
                shift_counters::last_number.eq(1),
            ))
            .on_conflict(shift_counters::shift_id)
            .do_update()
            .set((
                shift_counters::last_number.eq(shift_counters::last_number + 1),
                shift_counters::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        let number = shift_counters::table
            .find(shift_id)
            .select(shift_counters::last_number)
            .for_update()
            .first::<i32>(conn)
            .await?;

        debug!("Issued shift number {} for shift {}", number, shift_id);
        Ok(number)
    }
}
