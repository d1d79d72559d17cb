// libs/appointment-cell/src/services/cancellation.rs
use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use mockall::automock;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::pg::{set_local_lock_timeout, DbPool};
use shared_database::schema::appointments;

use crate::models::{AppointmentEntity, AppointmentError, AppointmentStatus};
use crate::services::capacity::ShiftCapacityGuard;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::{clinic_offset, pool_error};

#[automock]
#[async_trait]
pub trait AppointmentCancellation: Send + Sync {
    /// Cancels a confirmed appointment owned by `patient_id` and frees its
    /// seat. Someone else's appointment is reported as not found.
    async fn cancel(&self, appointment_id: i32, patient_id: i32) -> Result<(), AppointmentError>;
}

#[derive(Clone)]
pub struct TransactionalCancellationService {
    pool: DbPool,
    guard: ShiftCapacityGuard,
    lifecycle: AppointmentLifecycleService,
    lock_timeout_ms: u64,
}

impl TransactionalCancellationService {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        Self {
            pool,
            guard: ShiftCapacityGuard::new(clinic_offset(config)),
            lifecycle: AppointmentLifecycleService::new(),
            lock_timeout_ms: config.booking_lock_timeout_ms,
        }
    }
}

#[async_trait]
impl AppointmentCancellation for TransactionalCancellationService {
    async fn cancel(&self, appointment_id: i32, patient_id: i32) -> Result<(), AppointmentError> {
        debug!("Cancelling appointment {} for patient {}", appointment_id, patient_id);

        let guard = self.guard;
        let lifecycle = self.lifecycle;
        let lock_timeout_ms = self.lock_timeout_ms;

        let conn = &mut self.pool.get().await.map_err(pool_error)?;

        let released_shift = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    set_local_lock_timeout(conn, lock_timeout_ms).await?;

                    let appointment = appointments::table
                        .filter(appointments::id.eq(appointment_id))
                        .filter(appointments::patient_id.eq(patient_id))
                        .select(AppointmentEntity::as_select())
                        .for_update()
                        .first::<AppointmentEntity>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| AppointmentError::NotFound("Appointment".to_string()))?;

                    lifecycle.validate_cancellation(appointment.status()?)?;

                    diesel::update(appointments::table.find(appointment.id))
                        .set(appointments::status.eq(AppointmentStatus::Canceled.code()))
                        .execute(conn)
                        .await?;

                    if let Some(shift_id) = appointment.shift_id {
                        guard.release_reservation(conn, shift_id).await?;
                    }

                    Ok::<Option<i32>, AppointmentError>(appointment.shift_id)
                })
            })
            .await?;

        info!(
            "Appointment {} cancelled (released shift: {:?})",
            appointment_id, released_shift
        );
        Ok(())
    }
}
