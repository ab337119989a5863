use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LabPriority {
    Routine,
    Urgent,
    Stat,
}

impl LabPriority {
    pub const ALL: [LabPriority; 3] = [LabPriority::Routine, LabPriority::Urgent, LabPriority::Stat];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabPriority::Routine => "routine",
            LabPriority::Urgent => "urgent",
            LabPriority::Stat => "stat",
        }
    }

    /// Work queue position, lowest first
    pub fn rank(&self) -> u8 {
        match self {
            LabPriority::Stat => 0,
            LabPriority::Urgent => 1,
            LabPriority::Routine => 2,
        }
    }
}

impl FromStr for LabPriority {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LabPriority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown lab priority '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
    Ordered,
    SampleCollected,
    InProgress,
    Completed,
    Cancelled,
}

impl LabStatus {
    pub const ALL: [LabStatus; 5] = [
        LabStatus::Ordered,
        LabStatus::SampleCollected,
        LabStatus::InProgress,
        LabStatus::Completed,
        LabStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabStatus::Ordered => "ordered",
            LabStatus::SampleCollected => "sample_collected",
            LabStatus::InProgress => "in_progress",
            LabStatus::Completed => "completed",
            LabStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LabStatus::Completed | LabStatus::Cancelled)
    }

    /// Strictly forward through the pipeline, or cancel while open
    pub fn can_transition_to(&self, next: LabStatus) -> bool {
        use LabStatus::*;
        match (self, next) {
            (Ordered, SampleCollected) | (SampleCollected, InProgress) | (InProgress, Completed) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl FromStr for LabStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LabStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown lab status '{s}'")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LabTest {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Ordering doctor's staff id
    pub ordered_by: Uuid,
    pub technician_id: Option<Uuid>,
    pub test_name: String,
    pub category: String,
    pub priority: LabPriority,
    pub status: LabStatus,
    pub result: Option<String>,
    pub result_notes: Option<String>,
    pub price: Option<Decimal>,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LabTest {
    pub fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLabTestRequest {
    pub patient_id: Uuid,
    /// Ordering doctor; defaults to the caller's doctor profile
    pub ordered_by: Option<Uuid>,
    pub test_name: String,
    pub category: String,
    pub priority: Option<LabPriority>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignTechnicianRequest {
    pub technician_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateLabStatusRequest {
    pub status: LabStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LabResultRequest {
    pub result: String,
    pub result_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LabTestFilter {
    pub patient_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub status: Option<LabStatus>,
    pub priority: Option<LabPriority>,
}

impl LabTestFilter {
    pub fn matches(&self, test: &LabTest) -> bool {
        self.patient_id.map_or(true, |id| id == test.patient_id)
            && self.technician_id.map_or(true, |id| Some(id) == test.technician_id)
            && self.status.map_or(true, |s| s == test.status)
            && self.priority.map_or(true, |p| p == test.priority)
    }
}

/// Stat first, then urgent, then routine; oldest first within a priority
pub fn sort_work_queue(tests: &mut [LabTest]) {
    tests.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(a.ordered_at.cmp(&b.ordered_at))
            .then(a.id.cmp(&b.id))
    });
}
