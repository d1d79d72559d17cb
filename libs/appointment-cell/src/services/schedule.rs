// libs/appointment-cell/src/services/schedule.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::models::{AppointmentError, ShiftEntity};

/// Shift start plus `(shift_number - 1) * avg_minutes`, on the shift's work
/// date. Not clamped to the shift end.
pub fn estimated_visit_time(
    work_date: NaiveDate,
    start_time: NaiveTime,
    avg_minutes_per_patient: i32,
    shift_number: i32,
) -> NaiveDateTime {
    let offset_minutes = i64::from(shift_number - 1) * i64::from(avg_minutes_per_patient);
    work_date.and_time(start_time) + Duration::minutes(offset_minutes)
}

/// A shift is past once local now reaches its end.
pub fn is_shift_past(shift: &ShiftEntity, now_local: NaiveDateTime) -> bool {
    now_local >= shift.ends_at()
}

/// Checks a locked shift in the order the caller reports them: inactive,
/// past, duplicate, full.
pub fn check_bookable(
    shift: &ShiftEntity,
    now_local: NaiveDateTime,
    already_booked: bool,
) -> Result<(), AppointmentError> {
    if !shift.is_active {
        return Err(AppointmentError::ShiftInactive);
    }
    if is_shift_past(shift, now_local) {
        return Err(AppointmentError::ShiftPast);
    }
    if already_booked {
        return Err(AppointmentError::AlreadyBooked);
    }
    if !shift.has_capacity() {
        return Err(AppointmentError::ShiftFull);
    }
    Ok(())
}

/// Offline auto-selection. Prefers a shift running right now, then the
/// next one to start today; earliest start wins within each group.
pub fn select_shift(candidates: &[ShiftEntity], now_local: NaiveDateTime) -> Option<&ShiftEntity> {
    let open = || {
        candidates
            .iter()
            .filter(|shift| shift.is_active && shift.has_capacity())
    };

    let in_progress = open()
        .filter(|shift| shift.starts_at() <= now_local && now_local < shift.ends_at())
        .min_by_key(|shift| shift.starts_at());

    if let Some(shift) = in_progress {
        debug!("Auto-picked in-progress shift {}", shift.id);
        return Some(shift);
    }

    let upcoming = open()
        .filter(|shift| shift.starts_at() > now_local)
        .min_by_key(|shift| shift.starts_at());

    if let Some(shift) = upcoming {
        debug!("Auto-picked upcoming shift {}", shift.id);
    }
    upcoming
}
