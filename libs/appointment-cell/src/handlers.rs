// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::AuthContext;
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, BookingOptions, BookingQuery};
use crate::router::AppointmentState;

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Patient self-service booking against a chosen shift.
#[axum::debug_handler]
pub async fn book_online_appointment(
    State(state): State<AppointmentState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<BookingQuery>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = auth.require_patient()?;
    let options = BookingOptions::online(query.insurances, state.config.booking_emit_qr);

    let appointment = state.booking.book(patient_id, request, options).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

/// Kiosk booking. Without a `shift_id` the current or next shift of the
/// doctor today is used.
#[axum::debug_handler]
pub async fn book_offline_appointment(
    State(state): State<AppointmentState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<BookingQuery>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = auth.require_patient()?;
    let options = BookingOptions::offline(query.insurances, state.config.booking_emit_qr);

    let appointment = state.booking.book(patient_id, request, options).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

// ==============================================================================
// QUERY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<AppointmentState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let patient_id = auth.require_patient()?;

    let appointments = state.booking.list_for_patient(patient_id).await?;
    debug!("Returning {} appointments for patient {}", appointments.len(), patient_id);

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let patient_id = auth.require_patient()?;

    let appointment = state.booking.get_for_patient(appointment_id, patient_id).await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// CANCELLATION HANDLER
// ==============================================================================

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Extension(auth): Extension<AuthContext>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let patient_id = auth.require_patient()?;

    state.cancellation.cancel(appointment_id, patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment_id,
        "message": "Appointment cancelled successfully"
    })))
}
