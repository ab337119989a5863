use async_trait::async_trait;
use dashmap::DashMap;
use error_common::codes;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{find_conflict, Appointment, AppointmentFilter, AppointmentStatus};
use crate::types::pagination::page_of;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert after checking doctor and patient conflicts, atomically
    async fn book(&self, appointment: &Appointment) -> ApiResult<Appointment>;
    /// Store a new time for an existing appointment, with the same check.
    ///
    /// Writes only while the stored status is still `expected`.
    async fn reschedule(&self, appointment: &Appointment, expected: AppointmentStatus) -> ApiResult<Appointment>;
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Appointment>>;
    /// Store status, notes and cancellation reason while the stored status is
    /// still `expected`
    async fn update(&self, appointment: &Appointment, expected: AppointmentStatus) -> ApiResult<Appointment>;
    async fn delete(&self, id: Uuid) -> ApiResult<bool>;
    /// Ordered by `scheduled_at` ascending
    async fn list(&self, filter: &AppointmentFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Appointment>, u64)>;
    async fn list_all(&self, filter: &AppointmentFilter) -> ApiResult<Vec<Appointment>>;
}

/// 422 for a write based on a status another request already changed
pub fn status_changed(stored: AppointmentStatus) -> ApiError {
    ApiError::unprocessable(
        codes::scheduling::STATUS_CHANGED,
        format!("appointment is now {}; reload and retry", stored.as_str()),
    )
}

/// In-memory implementation for development/testing
///
/// `booking_lock` serializes the status and conflict checks with the write
/// for every mutation.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: DashMap<Uuid, Appointment>,
    booking_lock: Mutex<()>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_conflicts(&self, candidate: &Appointment) -> ApiResult<()> {
        let existing: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.doctor_id == candidate.doctor_id || a.patient_id == candidate.patient_id)
            .map(|a| a.value().clone())
            .collect();
        match find_conflict(existing.iter(), candidate) {
            Some(conflict) => Err(conflict.into()),
            None => Ok(()),
        }
    }

    fn sorted(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| filter.matches(a.value()))
            .map(|a| a.value().clone())
            .collect();
        appointments.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then_with(|| a.id.cmp(&b.id)));
        appointments
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn book(&self, appointment: &Appointment) -> ApiResult<Appointment> {
        let _guard = self.booking_lock.lock();
        self.check_conflicts(appointment)?;
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn reschedule(&self, appointment: &Appointment, expected: AppointmentStatus) -> ApiResult<Appointment> {
        let _guard = self.booking_lock.lock();
        let stored = self
            .appointments
            .get(&appointment.id)
            .map(|a| a.status)
            .ok_or_else(|| ApiError::not_found("appointment"))?;
        if stored != expected {
            return Err(status_changed(stored));
        }
        self.check_conflicts(appointment)?;
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Appointment>> {
        Ok(self.appointments.get(&id).map(|a| a.value().clone()))
    }

    async fn update(&self, appointment: &Appointment, expected: AppointmentStatus) -> ApiResult<Appointment> {
        let _guard = self.booking_lock.lock();
        match self.appointments.get_mut(&appointment.id) {
            Some(existing) if existing.status != expected => Err(status_changed(existing.status)),
            Some(mut existing) => {
                existing.status = appointment.status;
                existing.notes = appointment.notes.clone();
                existing.cancellation_reason = appointment.cancellation_reason.clone();
                existing.updated_at = appointment.updated_at;
                Ok(existing.value().clone())
            }
            None => Err(ApiError::not_found("appointment")),
        }
    }

    async fn delete(&self, id: Uuid) -> ApiResult<bool> {
        let _guard = self.booking_lock.lock();
        Ok(self.appointments.remove(&id).is_some())
    }

    async fn list(&self, filter: &AppointmentFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Appointment>, u64)> {
        Ok(page_of(self.sorted(filter), limit, offset))
    }

    async fn list_all(&self, filter: &AppointmentFilter) -> ApiResult<Vec<Appointment>> {
        Ok(self.sorted(filter))
    }
}
