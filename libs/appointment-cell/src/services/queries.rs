// libs/appointment-cell/src/services/queries.rs
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use shared_database::schema::{appointments, clinics, doctors, services};

use crate::models::{AppointmentDetail, AppointmentEntity, AppointmentError};

type DetailRow = (AppointmentEntity, String, i64, String, String);

fn into_details(rows: Vec<DetailRow>) -> Result<Vec<AppointmentDetail>, AppointmentError> {
    rows.into_iter()
        .map(|(appointment, service_name, service_price, doctor_name, clinic_name)| {
            AppointmentDetail::from_parts(appointment, service_name, service_price, doctor_name, clinic_name)
        })
        .collect()
}

/// Loads one appointment with its display names. `patient_id` scopes the
/// lookup to its owner when given.
pub async fn load_detail(
    conn: &mut AsyncPgConnection,
    appointment_id: i32,
    patient_id: Option<i32>,
) -> Result<AppointmentDetail, AppointmentError> {
    let mut query = appointments::table
        .inner_join(services::table)
        .inner_join(doctors::table)
        .inner_join(clinics::table)
        .filter(appointments::id.eq(appointment_id))
        .select((
            AppointmentEntity::as_select(),
            services::name,
            services::price,
            doctors::full_name,
            clinics::name,
        ))
        .into_boxed();

    if let Some(patient_id) = patient_id {
        query = query.filter(appointments::patient_id.eq(patient_id));
    }

    let rows: Vec<DetailRow> = query.limit(1).load(conn).await?;

    into_details(rows)?
        .pop()
        .ok_or_else(|| AppointmentError::NotFound("Appointment".to_string()))
}

/// Patient's appointments, most recently booked first.
pub async fn load_patient_details(
    conn: &mut AsyncPgConnection,
    patient_id: i32,
) -> Result<Vec<AppointmentDetail>, AppointmentError> {
    let rows: Vec<DetailRow> = appointments::table
        .inner_join(services::table)
        .inner_join(doctors::table)
        .inner_join(clinics::table)
        .filter(appointments::patient_id.eq(patient_id))
        .order((appointments::appointment_time.desc(), appointments::id.desc()))
        .select((
            AppointmentEntity::as_select(),
            services::name,
            services::price,
            doctors::full_name,
            clinics::name,
        ))
        .load(conn)
        .await?;

    into_details(rows)
}
