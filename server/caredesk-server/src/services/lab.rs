use std::sync::Arc;

use chrono::Utc;
use error_common::codes;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::{PatientService, StaffService};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    LabPriority, LabResultRequest, LabStatus, LabTest, LabTestFilter, OrderLabTestRequest, StaffKind,
};
use crate::repository::LabTestRepository;
use crate::validation::{non_blank, FieldErrors};

pub struct LabService {
    lab_tests: Arc<dyn LabTestRepository>,
    patients: Arc<PatientService>,
    staff: Arc<StaffService>,
}

impl LabService {
    pub fn new(lab_tests: Arc<dyn LabTestRepository>, patients: Arc<PatientService>, staff: Arc<StaffService>) -> Self {
        Self {
            lab_tests,
            patients,
            staff,
        }
    }

    /// Order a test. Without `ordered_by` the caller's doctor profile orders it.
    pub async fn order(&self, request: OrderLabTestRequest, acting_user: Uuid) -> ApiResult<LabTest> {
        let mut errors = FieldErrors::new();
        errors.check("test_name", !request.test_name.trim().is_empty(), "is required");
        errors.check("category", !request.category.trim().is_empty(), "is required");
        if let Some(price) = request.price {
            errors.check("price", price >= Decimal::ZERO, "must not be negative");
        }
        errors.into_result()?;

        let ordered_by = match request.ordered_by {
            Some(id) => id,
            None => self
                .staff
                .find_by_user(acting_user)
                .await?
                .filter(|m| m.kind == StaffKind::Doctor)
                .map(|m| m.id)
                .ok_or_else(|| ApiError::validation("ordered_by is required when the caller has no doctor profile"))?,
        };
        self.patients.active(request.patient_id).await?;
        self.staff.active(StaffKind::Doctor, ordered_by).await?;

        let now = Utc::now();
        let test = LabTest {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            ordered_by,
            technician_id: None,
            test_name: request.test_name.trim().to_string(),
            category: request.category.trim().to_string(),
            priority: request.priority.unwrap_or(LabPriority::Routine),
            status: LabStatus::Ordered,
            result: None,
            result_notes: None,
            price: request.price,
            ordered_at: now,
            completed_at: None,
            updated_at: now,
        };
        let created = self.lab_tests.insert(&test).await?;
        info!(
            lab_test_id = %created.id,
            priority = created.priority.as_str(),
            "Lab test ordered"
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<LabTest> {
        self.lab_tests
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("lab test"))
    }

    /// Work queue order: stat, urgent, routine; oldest first within each
    pub async fn list(&self, filter: &LabTestFilter, limit: i64, offset: i64) -> ApiResult<(Vec<LabTest>, u64)> {
        self.lab_tests.list(filter, limit, offset).await
    }

    pub async fn all(&self, filter: &LabTestFilter) -> ApiResult<Vec<LabTest>> {
        self.lab_tests.list_all(filter).await
    }

    pub async fn assign(&self, id: Uuid, technician_id: Uuid) -> ApiResult<LabTest> {
        let mut test = self.get(id).await?;
        if test.status.is_terminal() {
            return Err(ApiError::invalid_state(format!(
                "a {} lab test cannot be reassigned",
                test.status.as_str()
            )));
        }
        self.staff.active(StaffKind::LabTechnician, technician_id).await?;

        test.technician_id = Some(technician_id);
        test.updated_at = Utc::now();
        let updated = self.lab_tests.update(&test).await?;
        info!(lab_test_id = %id, technician_id = %technician_id, "Lab test assigned");
        Ok(updated)
    }

    /// Advance along the pipeline; completing requires a recorded result
    pub async fn update_status(&self, id: Uuid, next: LabStatus) -> ApiResult<LabTest> {
        let mut test = self.get(id).await?;
        if !test.status.can_transition_to(next) {
            return Err(ApiError::unprocessable(
                codes::resource::INVALID_STATE,
                format!("cannot move lab test from {} to {}", test.status.as_str(), next.as_str()),
            ));
        }
        if next == LabStatus::Completed && test.result.is_none() {
            return Err(ApiError::invalid_state("record a result before completing the test"));
        }

        let now = Utc::now();
        test.status = next;
        if next == LabStatus::Completed {
            test.completed_at = Some(now);
        }
        test.updated_at = now;
        let updated = self.lab_tests.update(&test).await?;
        info!(lab_test_id = %id, status = next.as_str(), "Lab test status changed");
        Ok(updated)
    }

    /// Record or correct the result of an open test
    pub async fn record_result(&self, id: Uuid, request: LabResultRequest) -> ApiResult<LabTest> {
        let mut errors = FieldErrors::new();
        errors.check("result", !request.result.trim().is_empty(), "is required");
        errors.into_result()?;

        let mut test = self.get(id).await?;
        if test.status.is_terminal() {
            return Err(ApiError::invalid_state(format!(
                "a {} lab test cannot take results",
                test.status.as_str()
            )));
        }
        test.result = Some(request.result.trim().to_string());
        test.result_notes = non_blank(request.result_notes);
        test.updated_at = Utc::now();
        let updated = self.lab_tests.update(&test).await?;
        info!(lab_test_id = %id, "Lab result recorded");
        Ok(updated)
    }
}
