// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::schema::{appointments, doctor_schedules};
use shared_models::error::AppError;

// ==============================================================================
// STATUS AND CHANNEL
// ==============================================================================

/// Stored as SMALLINT: pending(0), confirmed(1), in progress(2),
/// completed(3), canceled(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub fn code(self) -> i16 {
        match self {
            AppointmentStatus::Pending => 0,
            AppointmentStatus::Confirmed => 1,
            AppointmentStatus::InProgress => 2,
            AppointmentStatus::Completed => 3,
            AppointmentStatus::Canceled => 4,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(AppointmentStatus::Pending),
            1 => Some(AppointmentStatus::Confirmed),
            2 => Some(AppointmentStatus::InProgress),
            3 => Some(AppointmentStatus::Completed),
            4 => Some(AppointmentStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingChannel {
    Online,
    Offline,
}

impl BookingChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingChannel::Online => "online",
            BookingChannel::Offline => "offline",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "online" => Some(BookingChannel::Online),
            "offline" => Some(BookingChannel::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for BookingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that used to distinguish the separate booking paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingOptions {
    pub has_insurance: bool,
    pub channel: BookingChannel,
    pub emit_qr: bool,
}

impl BookingOptions {
    pub fn online(has_insurance: bool, emit_qr: bool) -> Self {
        Self {
            has_insurance,
            channel: BookingChannel::Online,
            emit_qr,
        }
    }

    pub fn offline(has_insurance: bool, emit_qr: bool) -> Self {
        Self {
            has_insurance,
            channel: BookingChannel::Offline,
            emit_qr,
        }
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub clinic_id: Option<i32>,
    pub service_id: i32,
    pub doctor_id: Option<i32>,
    pub shift_id: Option<i32>,
}

impl BookAppointmentRequest {
    /// Clinic and doctor are both needed to lock a shift or pick one.
    pub fn selectors(&self) -> Result<(i32, i32), AppointmentError> {
        match (self.clinic_id, self.doctor_id) {
            (Some(clinic_id), Some(doctor_id)) => Ok((clinic_id, doctor_id)),
            _ => Err(AppointmentError::ValidationError(
                "clinic_id and doctor_id are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
    #[serde(default)]
    pub insurances: bool,
}

// ==============================================================================
// STORAGE ENTITIES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = doctor_schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShiftEntity {
    pub id: i32,
    pub doctor_id: i32,
    pub clinic_id: i32,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub avg_minutes_per_patient: i32,
    pub max_patients: i32,
    pub booked_patients: i32,
    pub is_active: bool,
}

impl ShiftEntity {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.work_date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.work_date.and_time(self.end_time)
    }

    pub fn has_capacity(&self) -> bool {
        self.booked_patients < self.max_patients
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AppointmentEntity {
    pub id: i32,
    pub patient_id: i32,
    pub clinic_id: i32,
    pub service_id: i32,
    pub doctor_id: i32,
    pub shift_id: Option<i32>,
    pub queue_number: i32,
    pub shift_number: Option<i32>,
    pub estimated_time: Option<NaiveDateTime>,
    pub appointment_time: DateTime<Utc>,
    pub status: i16,
    pub booking_channel: String,
    pub cur_price: i64,
    pub qr_code: Option<String>,
    pub printed: bool,
}

impl AppointmentEntity {
    pub fn status(&self) -> Result<AppointmentStatus, AppointmentError> {
        AppointmentStatus::from_code(self.status).ok_or_else(|| {
            AppointmentError::DatabaseError(format!(
                "Appointment {} has unknown status code {}",
                self.id, self.status
            ))
        })
    }

    pub fn channel(&self) -> Result<BookingChannel, AppointmentError> {
        BookingChannel::parse(&self.booking_channel).ok_or_else(|| {
            AppointmentError::DatabaseError(format!(
                "Appointment {} has unknown booking channel '{}'",
                self.id, self.booking_channel
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointmentEntity {
    pub patient_id: i32,
    pub clinic_id: i32,
    pub service_id: i32,
    pub doctor_id: i32,
    pub shift_id: Option<i32>,
    pub queue_number: i32,
    pub shift_number: Option<i32>,
    pub estimated_time: Option<NaiveDateTime>,
    pub status: i16,
    pub booking_channel: String,
    pub cur_price: i64,
}

// ==============================================================================
// RESPONSES
// ==============================================================================

/// Appointment joined with the service, doctor and clinic it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetail {
    pub id: i32,
    pub patient_id: i32,
    pub clinic_id: i32,
    pub service_id: i32,
    pub doctor_id: i32,
    pub shift_id: Option<i32>,
    pub queue_number: i32,
    pub shift_number: Option<i32>,
    pub estimated_time: Option<NaiveDateTime>,
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub booking_channel: BookingChannel,
    pub cur_price: i64,
    pub qr_code: Option<String>,
    pub printed: bool,
    pub service_name: String,
    pub service_price: i64,
    pub doctor_name: String,
    pub clinic_name: String,
}

impl AppointmentDetail {
    pub fn from_parts(
        appointment: AppointmentEntity,
        service_name: String,
        service_price: i64,
        doctor_name: String,
        clinic_name: String,
    ) -> Result<Self, AppointmentError> {
        let status = appointment.status()?;
        let booking_channel = appointment.channel()?;

        Ok(Self {
            id: appointment.id,
            patient_id: appointment.patient_id,
            clinic_id: appointment.clinic_id,
            service_id: appointment.service_id,
            doctor_id: appointment.doctor_id,
            shift_id: appointment.shift_id,
            queue_number: appointment.queue_number,
            shift_number: appointment.shift_number,
            estimated_time: appointment.estimated_time,
            appointment_time: appointment.appointment_time,
            status,
            booking_channel,
            cur_price: appointment.cur_price,
            qr_code: appointment.qr_code,
            printed: appointment.printed,
            service_name,
            service_price,
            doctor_name,
            clinic_name,
        })
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Shift is full")]
    ShiftFull,

    #[error("Patient already has a booking for this shift")]
    AlreadyBooked,

    #[error("Shift has already ended")]
    ShiftPast,

    #[error("Shift is not active")]
    ShiftInactive,

    #[error("No shifts available today")]
    NoShiftsAvailable,

    #[error("Shift capacity changed, please retry")]
    CapacityChanged,

    #[error("Appointment cannot be canceled in status {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Booking is busy, please retry: {0}")]
    LockContention(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

const DUPLICATE_BOOKING_INDEX: &str = "appointments_patient_shift_live";
const CAPACITY_CHECK: &str = "doctor_schedules_capacity";

fn is_lock_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("deadlock detected")
        || message.contains("lock timeout")
        || message.contains("could not obtain lock")
}

impl From<DieselError> for AppointmentError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                if info.constraint_name() == Some(DUPLICATE_BOOKING_INDEX) =>
            {
                AppointmentError::AlreadyBooked
            }
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, ref info)
                if info.constraint_name() == Some(CAPACITY_CHECK) =>
            {
                AppointmentError::ShiftFull
            }
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, ref info) => {
                AppointmentError::LockContention(info.message().to_string())
            }
            DieselError::DatabaseError(_, ref info) if is_lock_failure(info.message()) => {
                AppointmentError::LockContention(info.message().to_string())
            }
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::ShiftFull
            | AppointmentError::AlreadyBooked
            | AppointmentError::ShiftPast
            | AppointmentError::ShiftInactive
            | AppointmentError::NoShiftsAvailable
            | AppointmentError::CapacityChanged
            | AppointmentError::InvalidStatusTransition(_)
            | AppointmentError::LockContention(_) => AppError::Conflict(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
            AppointmentStatus::Canceled,
        ] {
            assert_eq!(AppointmentStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(AppointmentStatus::Canceled.code(), 4);
        assert_eq!(AppointmentStatus::from_code(9), None);
    }

    #[test]
    fn test_missing_selectors_is_validation_error() {
        let request = BookAppointmentRequest {
            clinic_id: Some(1),
            service_id: 2,
            doctor_id: None,
            shift_id: None,
        };

        assert!(matches!(
            request.selectors(),
            Err(AppointmentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_error_categories() {
        assert!(matches!(
            AppError::from(AppointmentError::ShiftFull),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(AppointmentError::NotFound("Shift".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(AppointmentError::DatabaseError("boom".into())),
            AppError::Database(_)
        ));
        assert!(matches!(
            AppError::from(AppointmentError::LockContention("deadlock detected".into())),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn test_unclassified_storage_error_is_database_error() {
        let err = AppointmentError::from(DieselError::NotFound);
        assert!(matches!(err, AppointmentError::DatabaseError(_)));
    }
}
