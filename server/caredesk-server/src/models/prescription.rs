use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Dispensed,
    Cancelled,
}

impl PrescriptionStatus {
    pub const ALL: [PrescriptionStatus; 3] = [
        PrescriptionStatus::Active,
        PrescriptionStatus::Dispensed,
        PrescriptionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Dispensed => "dispensed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PrescriptionStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrescriptionStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown prescription status '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionItem {
    pub medicine_id: Uuid,
    /// Catalogue name at the time of prescribing
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub quantity: i32,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub notes: Option<String>,
    pub items: Vec<PrescriptionItem>,
    pub status: PrescriptionStatus,
    pub issued_at: DateTime<Utc>,
    pub dispensed_at: Option<DateTime<Utc>>,
    pub dispensed_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPrescriptionItem {
    pub medicine_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub quantity: i32,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    /// Defaults to the caller's doctor profile
    pub doctor_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    pub notes: Option<String>,
    pub items: Vec<NewPrescriptionItem>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PrescriptionFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<PrescriptionStatus>,
}

impl PrescriptionFilter {
    pub fn matches(&self, prescription: &Prescription) -> bool {
        self.patient_id.map_or(true, |id| id == prescription.patient_id)
            && self.doctor_id.map_or(true, |id| id == prescription.doctor_id)
            && self.status.map_or(true, |s| s == prescription.status)
    }
}
