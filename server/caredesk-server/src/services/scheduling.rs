use std::sync::Arc;

use chrono::{DateTime, Utc};
use error_common::codes;
use tracing::info;
use uuid::Uuid;

use super::{PatientService, StaffService};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    free_slots, Appointment, AppointmentFilter, AppointmentStatus, Availability, AvailabilityQuery,
    CreateAppointmentRequest, RescheduleRequest, StaffKind, UpdateAppointmentStatusRequest,
    DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
use crate::repository::AppointmentRepository;
use crate::validation::{non_blank, FieldErrors};

const DEFAULT_SLOT_MINUTES: i32 = 30;
const DEFAULT_START_HOUR: u32 = 9;
const DEFAULT_END_HOUR: u32 = 17;

/// Appointment booking, status changes and availability
///
/// Conflict checks happen inside the repository so that they are atomic
/// with the write; this layer validates participants and times.
pub struct SchedulingService {
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<PatientService>,
    staff: Arc<StaffService>,
}

fn check_duration(errors: &mut FieldErrors, minutes: i32) {
    errors.check(
        "duration_minutes",
        (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes),
        format!("must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"),
    );
}

fn ensure_future(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> ApiResult<()> {
    if scheduled_at <= now {
        return Err(ApiError::unprocessable(
            codes::scheduling::IN_THE_PAST,
            "appointments must be scheduled in the future",
        ));
    }
    Ok(())
}

impl SchedulingService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<PatientService>,
        staff: Arc<StaffService>,
    ) -> Self {
        Self {
            appointments,
            patients,
            staff,
        }
    }

    pub async fn book(&self, request: CreateAppointmentRequest, created_by: Uuid) -> ApiResult<Appointment> {
        let duration = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        let mut errors = FieldErrors::new();
        check_duration(&mut errors, duration);
        errors.check("reason", !request.reason.trim().is_empty(), "is required");
        errors.into_result()?;

        let now = Utc::now();
        ensure_future(request.scheduled_at, now)?;
        self.patients.active(request.patient_id).await?;
        self.staff.active(StaffKind::Doctor, request.doctor_id).await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            scheduled_at: request.scheduled_at,
            duration_minutes: duration,
            reason: request.reason.trim().to_string(),
            notes: non_blank(request.notes),
            status: AppointmentStatus::Scheduled,
            cancellation_reason: None,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let booked = self.appointments.book(&appointment).await?;
        info!(
            appointment_id = %booked.id,
            doctor_id = %booked.doctor_id,
            scheduled_at = %booked.scheduled_at,
            "Appointment booked"
        );
        Ok(booked)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Appointment> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("appointment"))
    }

    pub async fn list(
        &self,
        filter: &AppointmentFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<Appointment>, u64)> {
        self.appointments.list(filter, limit, offset).await
    }

    pub async fn all(&self, filter: &AppointmentFilter) -> ApiResult<Vec<Appointment>> {
        self.appointments.list_all(filter).await
    }

    pub async fn update_status(&self, id: Uuid, request: UpdateAppointmentStatusRequest) -> ApiResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let current = appointment.status;
        let next = request.status;
        if !appointment.status.can_transition_to(next) {
            return Err(ApiError::unprocessable(
                codes::scheduling::INVALID_TRANSITION,
                format!(
                    "cannot move appointment from {} to {}",
                    appointment.status.as_str(),
                    next.as_str()
                ),
            ));
        }

        if next == AppointmentStatus::Cancelled {
            appointment.cancellation_reason = non_blank(request.reason);
        }
        appointment.status = next;
        appointment.updated_at = Utc::now();

        let updated = self.appointments.update(&appointment, current).await?;
        info!(appointment_id = %id, status = next.as_str(), "Appointment status changed");
        Ok(updated)
    }

    /// Move a scheduled or confirmed appointment; it becomes scheduled again
    pub async fn reschedule(&self, id: Uuid, request: RescheduleRequest) -> ApiResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let current = appointment.status;
        if !current.is_blocking() {
            return Err(ApiError::invalid_state(format!(
                "a {} appointment cannot be rescheduled",
                appointment.status.as_str()
            )));
        }

        let duration = request.duration_minutes.unwrap_or(appointment.duration_minutes);
        let mut errors = FieldErrors::new();
        check_duration(&mut errors, duration);
        errors.into_result()?;
        let now = Utc::now();
        ensure_future(request.scheduled_at, now)?;

        appointment.scheduled_at = request.scheduled_at;
        appointment.duration_minutes = duration;
        appointment.status = AppointmentStatus::Scheduled;
        appointment.updated_at = now;

        let moved = self.appointments.reschedule(&appointment, current).await?;
        info!(appointment_id = %id, scheduled_at = %moved.scheduled_at, "Appointment rescheduled");
        Ok(moved)
    }

    /// Only cancelled appointments may be removed
    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let appointment = self.get(id).await?;
        if appointment.status != AppointmentStatus::Cancelled {
            return Err(ApiError::invalid_state("only cancelled appointments can be deleted"));
        }
        if !self.appointments.delete(id).await? {
            return Err(ApiError::not_found("appointment"));
        }
        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }

    pub async fn availability(&self, query: AvailabilityQuery) -> ApiResult<Availability> {
        let slot_minutes = query.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
        let start_hour = query.start_hour.unwrap_or(DEFAULT_START_HOUR);
        let end_hour = query.end_hour.unwrap_or(DEFAULT_END_HOUR);

        let mut errors = FieldErrors::new();
        errors.check(
            "slot_minutes",
            (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&slot_minutes),
            format!("must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"),
        );
        errors.check("end_hour", end_hour <= 24, "must be at most 24");
        errors.check("start_hour", start_hour < end_hour, "must be before end_hour");
        errors.into_result()?;

        self.staff.get(StaffKind::Doctor, query.doctor_id).await?;
        let booked = self
            .appointments
            .list_all(&AppointmentFilter::doctor_day_overlapping(query.doctor_id, query.date))
            .await?;

        Ok(Availability {
            doctor_id: query.doctor_id,
            date: query.date,
            slot_minutes,
            slots: free_slots(query.date, start_hour, end_hour, slot_minutes, &booked, Utc::now()),
        })
    }
}
