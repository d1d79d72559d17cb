// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use mockall::automock;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::pg::{set_local_lock_timeout, DbPool};
use shared_database::schema::{appointments, doctor_schedules};

use crate::models::{
    AppointmentDetail, AppointmentEntity, AppointmentError, AppointmentStatus,
    BookAppointmentRequest, BookingChannel, BookingOptions, NewAppointmentEntity, ShiftEntity,
};
use crate::services::capacity::ShiftCapacityGuard;
use crate::services::counter::CounterService;
use crate::services::pricing::PricingService;
use crate::services::qr::{Base64JsonEncoder, QrEncoder, QrPayload};
use crate::services::{clinic_offset, pool_error, queries, schedule};

/// Booking capability used by the HTTP layer.
#[automock]
#[async_trait]
pub trait AppointmentBooking: Send + Sync {
    /// Books one seat for `patient_id`. Offline requests without a shift get
    /// one picked for them.
    async fn book(
        &self,
        patient_id: i32,
        request: BookAppointmentRequest,
        options: BookingOptions,
    ) -> Result<AppointmentDetail, AppointmentError>;

    async fn list_for_patient(&self, patient_id: i32) -> Result<Vec<AppointmentDetail>, AppointmentError>;

    async fn get_for_patient(
        &self,
        appointment_id: i32,
        patient_id: i32,
    ) -> Result<AppointmentDetail, AppointmentError>;
}

/// Inline transactional allocator: every booking is one database
/// transaction that locks the shift row before anything else.
#[derive(Clone)]
pub struct TransactionalBookingService {
    pool: DbPool,
    guard: ShiftCapacityGuard,
    counters: CounterService,
    pricing: PricingService,
    qr_encoder: Arc<dyn QrEncoder>,
    utc_offset: FixedOffset,
    lock_timeout_ms: u64,
}

impl TransactionalBookingService {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        let utc_offset = clinic_offset(config);
        Self {
            pool,
            guard: ShiftCapacityGuard::new(utc_offset),
            counters: CounterService::new(),
            pricing: PricingService::new(),
            qr_encoder: Arc::new(Base64JsonEncoder),
            utc_offset,
            lock_timeout_ms: config.booking_lock_timeout_ms,
        }
    }

    pub fn with_qr_encoder(mut self, qr_encoder: Arc<dyn QrEncoder>) -> Self {
        self.qr_encoder = qr_encoder;
        self
    }

    fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.utc_offset).naive_local()
    }

    /// Advisory pick for offline bookings. The shift is re-locked and
    /// re-validated by `book`, so it may still be rejected there.
    pub async fn pick_shift(&self, clinic_id: i32, doctor_id: i32) -> Result<ShiftEntity, AppointmentError> {
        let now_local = self.local_now();
        let conn = &mut self.pool.get().await.map_err(pool_error)?;

        let candidates: Vec<ShiftEntity> = doctor_schedules::table
            .filter(doctor_schedules::clinic_id.eq(clinic_id))
            .filter(doctor_schedules::doctor_id.eq(doctor_id))
            .filter(doctor_schedules::work_date.eq(now_local.date()))
            .filter(doctor_schedules::is_active.eq(true))
            .filter(doctor_schedules::booked_patients.lt(doctor_schedules::max_patients))
            .order(doctor_schedules::start_time.asc())
            .select(ShiftEntity::as_select())
            .load(conn)
            .await?;

        debug!(
            "Found {} candidate shifts for doctor {} at clinic {}",
            candidates.len(),
            doctor_id,
            clinic_id
        );

        schedule::select_shift(&candidates, now_local)
            .cloned()
            .ok_or(AppointmentError::NoShiftsAvailable)
    }
}

#[async_trait]
impl AppointmentBooking for TransactionalBookingService {
    async fn book(
        &self,
        patient_id: i32,
        request: BookAppointmentRequest,
        options: BookingOptions,
    ) -> Result<AppointmentDetail, AppointmentError> {
        let (clinic_id, doctor_id) = request.selectors()?;

        let shift_id = match (request.shift_id, options.channel) {
            (Some(shift_id), _) => shift_id,
            (None, BookingChannel::Offline) => self.pick_shift(clinic_id, doctor_id).await?.id,
            (None, BookingChannel::Online) => {
                return Err(AppointmentError::ValidationError(
                    "shift_id is required for online booking".to_string(),
                ));
            }
        };

        info!(
            "Booking shift {} for patient {} ({}, insured: {})",
            shift_id, patient_id, options.channel, options.has_insurance
        );

        let guard = self.guard;
        let counters = self.counters;
        let pricing = self.pricing;
        let qr_encoder = Arc::clone(&self.qr_encoder);
        let lock_timeout_ms = self.lock_timeout_ms;
        let today = self.local_now().date();
        let service_id = request.service_id;

        let conn = &mut self.pool.get().await.map_err(pool_error)?;

        let detail = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    set_local_lock_timeout(conn, lock_timeout_ms).await?;

                    let shift = guard
                        .lock_shift(conn, shift_id, doctor_id, clinic_id, patient_id)
                        .await?;

                    let cur_price = pricing.quote(conn, service_id, options.has_insurance).await?;
                    let queue_number = counters.next_daily_number(conn, clinic_id, today).await?;
                    let shift_number = counters.next_shift_number(conn, shift.id).await?;

                    let estimated_time = schedule::estimated_visit_time(
                        shift.work_date,
                        shift.start_time,
                        shift.avg_minutes_per_patient,
                        shift_number,
                    );
                    if estimated_time >= shift.ends_at() {
                        warn!(
                            "Estimated time {} for shift {} position {} falls after shift end {}",
                            estimated_time,
                            shift.id,
                            shift_number,
                            shift.ends_at()
                        );
                    }

                    let appointment: AppointmentEntity = diesel::insert_into(appointments::table)
                        .values(NewAppointmentEntity {
                            patient_id,
                            clinic_id,
                            service_id,
                            doctor_id,
                            shift_id: Some(shift.id),
                            queue_number,
                            shift_number: Some(shift_number),
                            estimated_time: Some(estimated_time),
                            status: AppointmentStatus::Confirmed.code(),
                            booking_channel: options.channel.as_str().to_string(),
                            cur_price,
                        })
                        .returning(AppointmentEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    if !guard.commit_reservation(conn, shift.id).await? {
                        return Err(AppointmentError::CapacityChanged);
                    }

                    if options.emit_qr {
                        let qr_code = qr_encoder.encode(&QrPayload {
                            appointment_id: appointment.id,
                            queue_number,
                            shift_number: Some(shift_number),
                            estimated_time: Some(estimated_time),
                            price: cur_price,
                            created_at: appointment.appointment_time,
                        })?;

                        diesel::update(appointments::table.find(appointment.id))
                            .set(appointments::qr_code.eq(Some(qr_code)))
                            .execute(conn)
                            .await?;
                    }

                    let detail = queries::load_detail(conn, appointment.id, None).await?;
                    Ok::<AppointmentDetail, AppointmentError>(detail)
                })
            })
            .await?;

        info!(
            "Appointment {} booked: shift {} position {:?}, ticket {}",
            detail.id, shift_id, detail.shift_number, detail.queue_number
        );

        Ok(detail)
    }

    async fn list_for_patient(&self, patient_id: i32) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        debug!("Listing appointments for patient {}", patient_id);
        let conn = &mut self.pool.get().await.map_err(pool_error)?;
        queries::load_patient_details(conn, patient_id).await
    }

    async fn get_for_patient(
        &self,
        appointment_id: i32,
        patient_id: i32,
    ) -> Result<AppointmentDetail, AppointmentError> {
        debug!("Fetching appointment {} for patient {}", appointment_id, patient_id);
        let conn = &mut self.pool.get().await.map_err(pool_error)?;
        queries::load_detail(conn, appointment_id, Some(patient_id)).await
    }
}
