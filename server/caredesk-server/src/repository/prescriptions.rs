use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Prescription, PrescriptionFilter, PrescriptionStatus};
use crate::types::pagination::page_of;

#[async_trait]
pub trait PrescriptionRepository: Send + Sync {
    async fn insert(&self, prescription: &Prescription) -> ApiResult<Prescription>;
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Prescription>>;
    /// Store `prescription` only if the stored status is still `expected`.
    ///
    /// Returns None when the record is missing or its status moved on.
    async fn compare_and_update(
        &self,
        prescription: &Prescription,
        expected: PrescriptionStatus,
    ) -> ApiResult<Option<Prescription>>;
    /// Newest first
    async fn list(&self, filter: &PrescriptionFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Prescription>, u64)>;
    async fn list_all(&self, filter: &PrescriptionFilter) -> ApiResult<Vec<Prescription>>;
}

/// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryPrescriptionRepository {
    prescriptions: DashMap<Uuid, Prescription>,
}

impl InMemoryPrescriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: &PrescriptionFilter) -> Vec<Prescription> {
        let mut prescriptions: Vec<Prescription> = self
            .prescriptions
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        prescriptions.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then_with(|| a.id.cmp(&b.id)));
        prescriptions
    }
}

#[async_trait]
impl PrescriptionRepository for InMemoryPrescriptionRepository {
    async fn insert(&self, prescription: &Prescription) -> ApiResult<Prescription> {
        self.prescriptions.insert(prescription.id, prescription.clone());
        Ok(prescription.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Prescription>> {
        Ok(self.prescriptions.get(&id).map(|p| p.value().clone()))
    }

    async fn compare_and_update(
        &self,
        prescription: &Prescription,
        expected: PrescriptionStatus,
    ) -> ApiResult<Option<Prescription>> {
        // get_mut holds the shard write lock across the check and the write
        match self.prescriptions.get_mut(&prescription.id) {
            Some(mut existing) if existing.status == expected => {
                *existing = prescription.clone();
                Ok(Some(prescription.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list(&self, filter: &PrescriptionFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Prescription>, u64)> {
        Ok(page_of(self.sorted(filter), limit, offset))
    }

    async fn list_all(&self, filter: &PrescriptionFilter) -> ApiResult<Vec<Prescription>> {
        Ok(self.sorted(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn prescription() -> Prescription {
        let now = Utc::now();
        Prescription {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_id: None,
            diagnosis: "Seasonal flu".to_string(),
            notes: None,
            items: Vec::new(),
            status: PrescriptionStatus::Active,
            issued_at: now,
            dispensed_at: None,
            dispensed_by: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_compare_and_update_only_once() {
        let repo = InMemoryPrescriptionRepository::new();
        let stored = repo.insert(&prescription()).await.unwrap();

        let mut dispensed = stored.clone();
        dispensed.status = PrescriptionStatus::Dispensed;
        let first = repo
            .compare_and_update(&dispensed, PrescriptionStatus::Active)
            .await
            .unwrap();
        let second = repo
            .compare_and_update(&dispensed, PrescriptionStatus::Active)
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }
}
