use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{sort_work_queue, LabTest, LabTestFilter};
use crate::types::pagination::page_of;

#[async_trait]
pub trait LabTestRepository: Send + Sync {
    async fn insert(&self, test: &LabTest) -> ApiResult<LabTest>;
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LabTest>>;
    async fn update(&self, test: &LabTest) -> ApiResult<LabTest>;
    /// Work queue order: priority, then oldest first
    async fn list(&self, filter: &LabTestFilter, limit: i64, offset: i64) -> ApiResult<(Vec<LabTest>, u64)>;
    async fn list_all(&self, filter: &LabTestFilter) -> ApiResult<Vec<LabTest>>;
}

/// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryLabTestRepository {
    tests: DashMap<Uuid, LabTest>,
}

impl InMemoryLabTestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: &LabTestFilter) -> Vec<LabTest> {
        let mut tests: Vec<LabTest> = self
            .tests
            .iter()
            .filter(|t| filter.matches(t.value()))
            .map(|t| t.value().clone())
            .collect();
        sort_work_queue(&mut tests);
        tests
    }
}

#[async_trait]
impl LabTestRepository for InMemoryLabTestRepository {
    async fn insert(&self, test: &LabTest) -> ApiResult<LabTest> {
        self.tests.insert(test.id, test.clone());
        Ok(test.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LabTest>> {
        Ok(self.tests.get(&id).map(|t| t.value().clone()))
    }

    async fn update(&self, test: &LabTest) -> ApiResult<LabTest> {
        match self.tests.get_mut(&test.id) {
            Some(mut existing) => {
                *existing = test.clone();
                Ok(test.clone())
            }
            None => Err(ApiError::not_found("lab test")),
        }
    }

    async fn list(&self, filter: &LabTestFilter, limit: i64, offset: i64) -> ApiResult<(Vec<LabTest>, u64)> {
        Ok(page_of(self.sorted(filter), limit, offset))
    }

    async fn list_all(&self, filter: &LabTestFilter) -> ApiResult<Vec<LabTest>> {
        Ok(self.sorted(filter))
    }
}
