use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Patient, PatientFilter};
use crate::types::pagination::page_of;

#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Fails with a conflict when the MRN is taken
    async fn insert(&self, patient: &Patient) -> ApiResult<Patient>;
    /// Non-deleted patient by id
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Patient>>;
    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<Patient>>;
    async fn update(&self, patient: &Patient) -> ApiResult<Patient>;
    /// Returns false when there was nothing to delete
    async fn soft_delete(&self, id: Uuid) -> ApiResult<bool>;
    /// Newest first
    async fn list(&self, filter: &PatientFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Patient>, u64)>;
    async fn list_all(&self, filter: &PatientFilter) -> ApiResult<Vec<Patient>>;
}

/// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryPatientRepository {
    patients: DashMap<Uuid, Patient>,
    mrns: DashMap<String, Uuid>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: &PatientFilter) -> Vec<Patient> {
        let mut patients: Vec<Patient> = self
            .patients
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.mrn.cmp(&a.mrn)));
        patients
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn insert(&self, patient: &Patient) -> ApiResult<Patient> {
        match self.mrns.entry(patient.mrn.clone()) {
            Entry::Occupied(_) => Err(ApiError::conflict(format!("MRN {} already exists", patient.mrn))),
            Entry::Vacant(slot) => {
                slot.insert(patient.id);
                self.patients.insert(patient.id, patient.clone());
                Ok(patient.clone())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Patient>> {
        Ok(self
            .patients
            .get(&id)
            .filter(|p| !p.is_deleted)
            .map(|p| p.value().clone()))
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<Patient>> {
        Ok(self
            .patients
            .iter()
            .find(|p| !p.is_deleted && p.user_id == Some(user_id))
            .map(|p| p.value().clone()))
    }

    async fn update(&self, patient: &Patient) -> ApiResult<Patient> {
        match self.patients.get_mut(&patient.id) {
            Some(mut existing) if !existing.is_deleted => {
                *existing = patient.clone();
                Ok(patient.clone())
            }
            _ => Err(ApiError::not_found("patient")),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> ApiResult<bool> {
        match self.patients.get_mut(&id) {
            Some(mut existing) if !existing.is_deleted => {
                existing.is_deleted = true;
                existing.is_active = false;
                existing.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, filter: &PatientFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Patient>, u64)> {
        Ok(page_of(self.sorted(filter), limit, offset))
    }

    async fn list_all(&self, filter: &PatientFilter) -> ApiResult<Vec<Patient>> {
        Ok(self.sorted(filter))
    }
}
