use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    extract::{Extension, Path, Query, State},
    http::{Request, StatusCode},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tower::ServiceExt;

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use appointment_cell::router::{appointment_routes, AppointmentState};
use appointment_cell::services::booking::MockAppointmentBooking;
use appointment_cell::services::cancellation::MockAppointmentCancellation;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn sample_detail(id: i32, patient_id: i32, channel: BookingChannel) -> AppointmentDetail {
    AppointmentDetail {
        id,
        patient_id,
        clinic_id: 3,
        service_id: 2,
        doctor_id: 7,
        shift_id: Some(11),
        queue_number: 4,
        shift_number: Some(3),
        estimated_time: NaiveDate::from_ymd_opt(2025, 3, 10).and_then(|d| d.and_hms_opt(9, 20, 0)),
        appointment_time: Utc::now(),
        status: AppointmentStatus::Confirmed,
        booking_channel: channel,
        cur_price: 100_000,
        qr_code: Some("eyJhcHBvaW50bWVudF9pZCI6MX0=".to_string()),
        printed: false,
        service_name: "General consultation".to_string(),
        service_price: 200_000,
        doctor_name: "Dr. Tran".to_string(),
        clinic_name: "District 1 Clinic".to_string(),
    }
}

fn booking_request(shift_id: Option<i32>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        clinic_id: Some(3),
        service_id: 2,
        doctor_id: Some(7),
        shift_id,
    }
}

fn state_with(
    booking: MockAppointmentBooking,
    cancellation: MockAppointmentCancellation,
) -> AppointmentState {
    AppointmentState {
        config: TestConfig::default().to_arc(),
        booking: Arc::new(booking),
        cancellation: Arc::new(cancellation),
    }
}

// =============================================================================
// BOOKING
// =============================================================================

#[tokio::test]
async fn test_online_booking_passes_insurance_and_qr_options() {
    let mut booking = MockAppointmentBooking::new();
    booking
        .expect_book()
        .withf(|patient_id, request, options| {
            *patient_id == 42
                && request.shift_id == Some(11)
                && options.has_insurance
                && options.emit_qr
                && options.channel == BookingChannel::Online
        })
        .times(1)
        .returning(|patient_id, _, _| Ok(sample_detail(501, patient_id, BookingChannel::Online)));

    let state = state_with(booking, MockAppointmentCancellation::new());

    let Json(body) = book_online_appointment(
        State(state),
        Extension(TestUser::patient(42).to_context()),
        Query(BookingQuery { insurances: true }),
        Json(booking_request(Some(11))),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["id"], 501);
    assert_eq!(body["appointment"]["booking_channel"], "online");
    assert_eq!(body["appointment"]["status"], "confirmed");
    assert_eq!(body["appointment"]["estimated_time"], "2025-03-10T09:20:00");
}

#[tokio::test]
async fn test_offline_booking_without_shift_is_tagged_offline() {
    let mut booking = MockAppointmentBooking::new();
    booking
        .expect_book()
        .withf(|_, request, options| {
            request.shift_id.is_none()
                && !options.has_insurance
                && options.channel == BookingChannel::Offline
        })
        .times(1)
        .returning(|patient_id, _, _| Ok(sample_detail(502, patient_id, BookingChannel::Offline)));

    let state = state_with(booking, MockAppointmentCancellation::new());

    let Json(body) = book_offline_appointment(
        State(state),
        Extension(TestUser::patient(8).to_context()),
        Query(BookingQuery::default()),
        Json(booking_request(None)),
    )
    .await
    .unwrap();

    assert_eq!(body["appointment"]["booking_channel"], "offline");
    assert_eq!(body["appointment"]["patient_id"], 8);
}

#[tokio::test]
async fn test_staff_cannot_book_for_themselves() {
    let mut booking = MockAppointmentBooking::new();
    booking.expect_book().never();

    let state = state_with(booking, MockAppointmentCancellation::new());

    let result = book_online_appointment(
        State(state),
        Extension(TestUser::doctor(7, 3).to_context()),
        Query(BookingQuery::default()),
        Json(booking_request(Some(11))),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_booking_conflicts_map_to_conflict() {
    for failure in [
        AppointmentError::ShiftFull,
        AppointmentError::AlreadyBooked,
        AppointmentError::ShiftPast,
        AppointmentError::NoShiftsAvailable,
        AppointmentError::CapacityChanged,
    ] {
        let message = failure.to_string();
        let mut booking = MockAppointmentBooking::new();
        booking.expect_book().return_once(move |_, _, _| Err(failure));

        let state = state_with(booking, MockAppointmentCancellation::new());
        let result = book_online_appointment(
            State(state),
            Extension(TestUser::patient(1).to_context()),
            Query(BookingQuery::default()),
            Json(booking_request(Some(11))),
        )
        .await;

        assert_matches!(result, Err(AppError::Conflict(msg)) if msg == message);
    }
}

#[tokio::test]
async fn test_missing_selector_is_bad_request() {
    let mut booking = MockAppointmentBooking::new();
    booking.expect_book().return_once(|_, request, _| {
        request.selectors().map(|_| sample_detail(1, 1, BookingChannel::Offline))
    });

    let state = state_with(booking, MockAppointmentCancellation::new());
    let result = book_offline_appointment(
        State(state),
        Extension(TestUser::patient(1).to_context()),
        Query(BookingQuery::default()),
        Json(BookAppointmentRequest {
            clinic_id: None,
            service_id: 2,
            doctor_id: Some(7),
            shift_id: None,
        }),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let mut booking = MockAppointmentBooking::new();
    booking
        .expect_book()
        .return_once(|_, _, _| Err(AppointmentError::DatabaseError("connection reset".to_string())));

    let state = state_with(booking, MockAppointmentCancellation::new());
    let result = book_online_appointment(
        State(state),
        Extension(TestUser::patient(1).to_context()),
        Query(BookingQuery::default()),
        Json(booking_request(Some(11))),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// QUERIES AND CANCELLATION
// =============================================================================

#[tokio::test]
async fn test_list_my_appointments() {
    let mut booking = MockAppointmentBooking::new();
    booking
        .expect_list_for_patient()
        .withf(|patient_id| *patient_id == 42)
        .returning(|patient_id| {
            Ok(vec![
                sample_detail(2, patient_id, BookingChannel::Online),
                sample_detail(1, patient_id, BookingChannel::Offline),
            ])
        });

    let state = state_with(booking, MockAppointmentCancellation::new());
    let Json(body) = list_my_appointments(State(state), Extension(TestUser::patient(42).to_context()))
        .await
        .unwrap();

    assert_eq!(body["total"], 2);
    assert_eq!(body["appointments"][0]["id"], 2);
}

#[tokio::test]
async fn test_foreign_appointment_is_not_found() {
    let mut booking = MockAppointmentBooking::new();
    booking
        .expect_get_for_patient()
        .withf(|appointment_id, patient_id| *appointment_id == 77 && *patient_id == 5)
        .return_once(|_, _| Err(AppointmentError::NotFound("Appointment".to_string())));

    let state = state_with(booking, MockAppointmentCancellation::new());
    let result = get_appointment(
        State(state),
        Extension(TestUser::patient(5).to_context()),
        Path(77),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(msg)) if msg == "Appointment not found");
}

#[tokio::test]
async fn test_cancel_confirmed_appointment() {
    let mut cancellation = MockAppointmentCancellation::new();
    cancellation
        .expect_cancel()
        .withf(|appointment_id, patient_id| *appointment_id == 9 && *patient_id == 42)
        .times(1)
        .returning(|_, _| Ok(()));

    let state = state_with(MockAppointmentBooking::new(), cancellation);
    let Json(body) = cancel_appointment(
        State(state),
        Extension(TestUser::patient(42).to_context()),
        Path(9),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["appointment_id"], 9);
}

#[tokio::test]
async fn test_cancel_twice_is_conflict() {
    let mut cancellation = MockAppointmentCancellation::new();
    cancellation
        .expect_cancel()
        .return_once(|_, _| Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Canceled)));

    let state = state_with(MockAppointmentBooking::new(), cancellation);
    let result = cancel_appointment(
        State(state),
        Extension(TestUser::patient(42).to_context()),
        Path(9),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(msg)) if msg.contains("canceled"));
}

// =============================================================================
// ROUTER
// =============================================================================

#[tokio::test]
async fn test_routes_require_bearer_token() {
    let app = appointment_routes(state_with(
        MockAppointmentBooking::new(),
        MockAppointmentCancellation::new(),
    ));

    let response = app
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_routes_book_with_query_flag() {
    let config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(&TestUser::patient(42), &config.jwt_secret, None);

    let mut booking = MockAppointmentBooking::new();
    booking
        .expect_book()
        .withf(|_, _, options| options.has_insurance)
        .returning(|patient_id, _, _| Ok(sample_detail(900, patient_id, BookingChannel::Online)));

    let app = appointment_routes(state_with(booking, MockAppointmentCancellation::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/?insurances=true")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"clinic_id":3,"service_id":2,"doctor_id":7,"shift_id":11}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["appointment"]["id"], 900);
}

#[tokio::test]
async fn test_routes_render_conflict_body() {
    let config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(&TestUser::patient(42), &config.jwt_secret, None);

    let mut cancellation = MockAppointmentCancellation::new();
    cancellation
        .expect_cancel()
        .return_once(|_, _| Err(AppointmentError::InvalidStatusTransition(AppointmentStatus::Completed)));

    let app = appointment_routes(state_with(MockAppointmentBooking::new(), cancellation));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/15/cancel")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Appointment cannot be canceled in status completed");
}
