// libs/appointment-cell/src/services/capacity.rs
use chrono::{FixedOffset, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info, warn};

use shared_database::schema::{appointments, doctor_schedules};

use crate::models::{AppointmentError, AppointmentStatus, ShiftEntity};
use crate::services::schedule;

diesel::define_sql_function! {
    fn greatest(a: Integer, b: Integer) -> Integer;
}

/// Owns every write to `doctor_schedules.booked_patients`.
#[derive(Debug, Clone, Copy)]
pub struct ShiftCapacityGuard {
    utc_offset: FixedOffset,
}

impl ShiftCapacityGuard {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self { utc_offset }
    }

    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.utc_offset).naive_local()
    }

    /// Locks the shift row for the rest of the transaction and validates it
    /// for `patient_id`. A shift owned by another doctor or clinic is
    /// reported as missing.
    pub async fn lock_shift(
        &self,
        conn: &mut AsyncPgConnection,
        shift_id: i32,
        doctor_id: i32,
        clinic_id: i32,
        patient_id: i32,
    ) -> Result<ShiftEntity, AppointmentError> {
        debug!("Locking shift {} for patient {}", shift_id, patient_id);

        let shift = doctor_schedules::table
            .find(shift_id)
            .select(ShiftEntity::as_select())
            .for_update()
            .first::<ShiftEntity>(conn)
            .await
            .optional()?
            .filter(|shift| shift.doctor_id == doctor_id && shift.clinic_id == clinic_id)
            .ok_or_else(|| AppointmentError::NotFound("Shift".to_string()))?;

        let already_booked = diesel::select(diesel::dsl::exists(
            appointments::table
                .filter(appointments::patient_id.eq(patient_id))
                .filter(appointments::shift_id.eq(shift_id))
                .filter(appointments::status.ne(AppointmentStatus::Canceled.code())),
        ))
        .get_result::<bool>(conn)
        .await?;

        if let Err(err) = schedule::check_bookable(&shift, self.local_now(), already_booked) {
            warn!("Shift {} rejected for patient {}: {}", shift_id, patient_id, err);
            return Err(err);
        }

        Ok(shift)
    }

    /// Takes one seat. Returns false when the shift filled up since it was
    /// checked; the caller must abort.
    pub async fn commit_reservation(
        &self,
        conn: &mut AsyncPgConnection,
        shift_id: i32,
    ) -> Result<bool, AppointmentError> {
        let updated = diesel::update(
            doctor_schedules::table
                .find(shift_id)
                .filter(doctor_schedules::booked_patients.lt(doctor_schedules::max_patients)),
        )
        .set(doctor_schedules::booked_patients.eq(doctor_schedules::booked_patients + 1))
        .execute(conn)
        .await?;

        if updated != 1 {
            warn!("Capacity commit lost for shift {}", shift_id);
            return Ok(false);
        }

        debug!("Reserved one seat on shift {}", shift_id);
        Ok(true)
    }

    /// Gives one seat back, never going below zero.
    pub async fn release_reservation(
        &self,
        conn: &mut AsyncPgConnection,
        shift_id: i32,
    ) -> Result<(), AppointmentError> {
        diesel::update(doctor_schedules::table.find(shift_id))
            .set(
                doctor_schedules::booked_patients
                    .eq(greatest(doctor_schedules::booked_patients - 1, 0)),
            )
            .execute(conn)
            .await?;

        info!("Released one seat on shift {}", shift_id);
        Ok(())
    }
}
