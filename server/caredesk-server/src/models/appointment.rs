use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use error_common::codes;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;
pub const MIN_DURATION_MINUTES: i32 = 5;
pub const MAX_DURATION_MINUTES: i32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Scheduled and confirmed appointments hold their slot
    pub fn is_blocking(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_blocking()
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match self {
            Scheduled => matches!(next, Confirmed | Completed | Cancelled | NoShow),
            Confirmed => matches!(next, Completed | Cancelled | NoShow),
            Completed | Cancelled | NoShow => false,
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown appointment status '{s}'")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Half-open interval overlap: touching intervals do not overlap
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.scheduled_at < end && start < self.ends_at()
    }
}

/// Which side of a booking is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingConflict {
    Doctor(Uuid),
    Patient(Uuid),
}

impl From<BookingConflict> for ApiError {
    fn from(conflict: BookingConflict) -> Self {
        match conflict {
            BookingConflict::Doctor(existing) => ApiError::conflict_with_code(
                codes::scheduling::DOCTOR_DOUBLE_BOOKED,
                format!("doctor already has appointment {existing} in this time range"),
            ),
            BookingConflict::Patient(existing) => ApiError::conflict_with_code(
                codes::scheduling::PATIENT_DOUBLE_BOOKED,
                format!("patient already has appointment {existing} in this time range"),
            ),
        }
    }
}

/// First blocking appointment in `existing` that collides with `candidate`.
///
/// The candidate itself is skipped so rescheduling does not collide with
/// its own old slot. Doctor conflicts are reported before patient ones.
pub fn find_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Appointment>,
    candidate: &Appointment,
) -> Option<BookingConflict> {
    let start = candidate.scheduled_at;
    let end = candidate.ends_at();
    let mut patient_conflict = None;

    for other in existing {
        if other.id == candidate.id || !other.status.is_blocking() || !other.overlaps(start, end) {
            continue;
        }
        if other.doctor_id == candidate.doctor_id {
            return Some(BookingConflict::Doctor(other.id));
        }
        if other.patient_id == candidate.patient_id && patient_conflict.is_none() {
            patient_conflict = Some(BookingConflict::Patient(other.id));
        }
    }
    patient_conflict
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
    /// Cancellation reason
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RescheduleRequest {
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive lower bound on `scheduled_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `scheduled_at`
    pub to: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_id.map_or(true, |id| id == appointment.doctor_id)
            && self.patient_id.map_or(true, |id| id == appointment.patient_id)
            && self.status.map_or(true, |s| s == appointment.status)
            && self.from.map_or(true, |from| appointment.scheduled_at >= from)
            && self.to.map_or(true, |to| appointment.scheduled_at < to)
    }

    /// Appointments of one doctor on one UTC day
    pub fn doctor_day(doctor_id: Uuid, date: NaiveDate) -> Self {
        let (from, to) = day_bounds(date);
        Self {
            doctor_id: Some(doctor_id),
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    /// Appointments of one doctor that can reach into a UTC day, including
    /// ones that start the evening before and run past midnight
    pub fn doctor_day_overlapping(doctor_id: Uuid, date: NaiveDate) -> Self {
        let (from, to) = day_bounds(date);
        Self {
            doctor_id: Some(doctor_id),
            from: Some(from - Duration::minutes(i64::from(MAX_DURATION_MINUTES))),
            to: Some(to),
            ..Default::default()
        }
    }
}

/// `[00:00, next 00:00)` of a UTC day
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    #[param(example = 30)]
    pub slot_minutes: Option<i32>,
    #[param(example = 9)]
    pub start_hour: Option<u32>,
    #[param(example = 17)]
    pub end_hour: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Availability {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_minutes: i32,
    pub slots: Vec<TimeSlot>,
}

/// Free slots of `[start_hour, end_hour)` on `date` that neither overlap a
/// blocking appointment nor start before `now`.
pub fn free_slots(
    date: NaiveDate,
    start_hour: u32,
    end_hour: u32,
    slot_minutes: i32,
    booked: &[Appointment],
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    let (day_start, _) = day_bounds(date);
    let window_end = day_start + Duration::hours(i64::from(end_hour));
    let step = Duration::minutes(i64::from(slot_minutes));

    let mut slots = Vec::new();
    let mut start = day_start + Duration::hours(i64::from(start_hour));
    while start + step <= window_end {
        let end = start + step;
        let taken = booked
            .iter()
            .any(|a| a.status.is_blocking() && a.overlaps(start, end));
        if !taken && start >= now {
            slots.push(TimeSlot { start, end });
        }
        start = end;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, hour, minute, 0).unwrap()
    }

    fn appointment(doctor_id: Uuid, patient_id: Uuid, start: DateTime<Utc>, minutes: i32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            scheduled_at: start,
            duration_minutes: minutes,
            reason: "Follow-up".to_string(),
            notes: None,
            status: AppointmentStatus::Scheduled,
            cancellation_reason: None,
            created_by: Uuid::new_v4(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_status_transitions() {
        use AppointmentStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!Confirmed.can_transition_to(Scheduled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Scheduled));
    }

    #[test]
    fn test_touching_intervals_do_not_conflict() {
        let doctor = Uuid::new_v4();
        let existing = appointment(doctor, Uuid::new_v4(), at(10, 0), 30);
        let next = appointment(doctor, Uuid::new_v4(), at(10, 30), 30);
        assert_eq!(find_conflict([&existing], &next), None);

        let before = appointment(doctor, Uuid::new_v4(), at(9, 30), 30);
        assert_eq!(find_conflict([&existing], &before), None);
    }

    #[test]
    fn test_overlap_reports_doctor_first() {
        let doctor = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let patient_visit = appointment(Uuid::new_v4(), patient, at(10, 0), 60);
        let doctor_visit = appointment(doctor, Uuid::new_v4(), at(10, 15), 30);
        let candidate = appointment(doctor, patient, at(10, 20), 15);

        assert_eq!(
            find_conflict([&patient_visit, &doctor_visit], &candidate),
            Some(BookingConflict::Doctor(doctor_visit.id))
        );
        assert_eq!(
            find_conflict([&patient_visit], &candidate),
            Some(BookingConflict::Patient(patient_visit.id))
        );
    }

    #[test]
    fn test_cancelled_and_self_are_ignored() {
        let doctor = Uuid::new_v4();
        let mut cancelled = appointment(doctor, Uuid::new_v4(), at(10, 0), 30);
        cancelled.status = AppointmentStatus::Cancelled;
        let candidate = appointment(doctor, Uuid::new_v4(), at(10, 0), 30);
        assert_eq!(find_conflict([&cancelled, &candidate], &candidate), None);
    }

    #[test]
    fn test_free_slots_skip_booked_and_past() {
        let doctor = Uuid::new_v4();
        let booked = vec![appointment(doctor, Uuid::new_v4(), at(10, 15), 30)];
        let slots = free_slots(at(0, 0).date_naive(), 9, 12, 30, &booked, at(9, 10));

        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        // 09:00 is past, 10:00 and 10:30 overlap the 10:15 booking
        assert_eq!(starts, vec![at(9, 30), at(11, 0), at(11, 30)]);
    }

    #[test]
    fn test_overnight_appointment_blocks_early_slots() {
        let doctor = Uuid::new_v4();
        let late = appointment(doctor, Uuid::new_v4(), at(23, 0) - Duration::days(1), 120);
        let date = at(0, 0).date_naive();

        let filter = AppointmentFilter::doctor_day_overlapping(doctor, date);
        assert!(filter.matches(&late));
        assert!(!AppointmentFilter::doctor_day(doctor, date).matches(&late));

        let slots = free_slots(date, 0, 2, 30, &[late], at(0, 0) - Duration::days(2));
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![at(1, 0), at(1, 30)]);
    }
}
