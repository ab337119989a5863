use auth_identity::Role;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::patient::{AccountRequest, Gender};
use crate::error::ApiError;
use crate::validation::FieldErrors;
use crate::{validate_email, validate_field, validate_length, validate_phone, validate_required};

/// Clinical staff with a profile: doctors, nurses, lab technicians
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StaffKind {
    Doctor,
    Nurse,
    LabTechnician,
}

impl StaffKind {
    pub const ALL: [StaffKind; 3] = [StaffKind::Doctor, StaffKind::Nurse, StaffKind::LabTechnician];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffKind::Doctor => "doctor",
            StaffKind::Nurse => "nurse",
            StaffKind::LabTechnician => "lab_technician",
        }
    }

    /// Human label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            StaffKind::Doctor => "doctor",
            StaffKind::Nurse => "nurse",
            StaffKind::LabTechnician => "lab technician",
        }
    }

    /// Plural path segment and export name
    pub fn plural(&self) -> &'static str {
        match self {
            StaffKind::Doctor => "doctors",
            StaffKind::Nurse => "nurses",
            StaffKind::LabTechnician => "lab-technicians",
        }
    }

    /// Role given to a login account created for this kind of staff
    pub fn role(&self) -> Role {
        match self {
            StaffKind::Doctor => Role::Doctor,
            StaffKind::Nurse => Role::Nurse,
            StaffKind::LabTechnician => Role::LabTechnician,
        }
    }

    pub fn for_role(role: Role) -> Option<StaffKind> {
        StaffKind::ALL.into_iter().find(|k| k.role() == role)
    }
}

impl FromStr for StaffKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StaffKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown staff kind '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Evening,
    Night,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Morning, Shift::Evening, Shift::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Evening => "evening",
            Shift::Night => "night",
        }
    }
}

impl FromStr for Shift {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shift::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown shift '{s}'")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StaffMember {
    pub id: Uuid,
    pub kind: StaffKind,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: Option<Gender>,
    pub department: String,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<Decimal>,
    pub shift: Option<Shift>,
    pub user_id: Option<Uuid>,
    pub is_active: bool,
    pub joined_on: Option<NaiveDate>,
    #[serde(skip)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StaffMember {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Field rules shared by every kind, then the kind's own requirements
    pub fn validate_profile(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        validate_length!(errors, "first_name", self.first_name, 1, 100);
        validate_length!(errors, "last_name", self.last_name, 1, 100);
        validate_email!(errors, "email", self.email);
        validate_phone!(errors, "phone", self.phone);
        validate_required!(errors, "department", self.department);
        if let Some(years) = self.experience_years {
            validate_field!(errors, "experience_years", years >= 0, "must not be negative");
        }

        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        match self.kind {
            StaffKind::Doctor => {
                validate_field!(errors, "specialization", present(&self.specialization), "is required for doctors");
                validate_field!(errors, "license_number", present(&self.license_number), "is required for doctors");
                if let Some(fee) = self.consultation_fee {
                    validate_field!(errors, "consultation_fee", fee >= Decimal::ZERO, "must not be negative");
                }
            }
            StaffKind::Nurse => {
                validate_field!(errors, "shift", self.shift.is_some(), "is required for nurses");
            }
            StaffKind::LabTechnician => {
                validate_field!(
                    errors,
                    "qualification",
                    present(&self.qualification),
                    "is required for lab technicians"
                );
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStaffRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: Option<Gender>,
    pub department: String,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<Decimal>,
    pub shift: Option<Shift>,
    pub joined_on: Option<NaiveDate>,
    pub create_account: Option<AccountRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateStaffRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<Decimal>,
    pub shift: Option<Shift>,
    pub joined_on: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StaffFilter {
    /// Matches first name, last name or email
    pub search: Option<String>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub is_active: Option<bool>,
}

impl StaffFilter {
    pub fn matches(&self, member: &StaffMember) -> bool {
        if member.is_deleted {
            return false;
        }
        if let Some(department) = &self.department {
            if !member.department.eq_ignore_ascii_case(department) {
                return false;
            }
        }
        if let Some(specialization) = &self.specialization {
            let same = member
                .specialization
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(specialization));
            if !same {
                return false;
            }
        }
        if self.is_active.is_some_and(|a| a != member.is_active) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [&member.first_name, &member.last_name, &member.email]
                    .into_iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    /// Day to list, `YYYY-MM-DD` (UTC)
    pub date: NaiveDate,
}
