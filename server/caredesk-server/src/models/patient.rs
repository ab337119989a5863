use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::{check_date_of_birth, FieldErrors, RequestValidation};
use crate::{validate_email, validate_field, validate_length, validate_phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown gender '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BloodGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ApiError::internal(format!("unknown blood group '{s}'")))
    }
}

/// Patient record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    /// `MRN-YYYYMMDD-XXXXXX`
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub blood_group: Option<BloodGroup>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub allergies: Vec<String>,
    pub medical_history: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_active: bool,
    #[serde(skip)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `today`
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.date_of_birth).unwrap_or(0)
    }
}

/// Patient as returned by the API, with the derived age
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: Patient,
    pub age: u32,
}

impl From<Patient> for PatientView {
    fn from(patient: Patient) -> Self {
        let age = patient.age_on(Utc::now().date_naive());
        Self { patient, age }
    }
}

/// Login account created together with a profile
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AccountRequest {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub blood_group: Option<BloodGroup>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub medical_history: Option<String>,
    pub create_account: Option<AccountRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub medical_history: Option<String>,
    pub is_active: Option<bool>,
}

impl RequestValidation for CreatePatientRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        validate_length!(errors, "first_name", self.first_name, 1, 100);
        validate_length!(errors, "last_name", self.last_name, 1, 100);
        validate_phone!(errors, "phone", self.phone);
        check_date_of_birth(&mut errors, self.date_of_birth, Utc::now().date_naive());

        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => validate_email!(errors, "email", email),
            _ => validate_field!(
                errors,
                "email",
                self.create_account.is_none(),
                "is required when creating an account"
            ),
        }
        errors.into_result()
    }
}

impl RequestValidation for UpdatePatientRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(first_name) = &self.first_name {
            validate_length!(errors, "first_name", first_name, 1, 100);
        }
        if let Some(last_name) = &self.last_name {
            validate_length!(errors, "last_name", last_name, 1, 100);
        }
        if let Some(phone) = &self.phone {
            validate_phone!(errors, "phone", phone);
        }
        if let Some(date_of_birth) = self.date_of_birth {
            check_date_of_birth(&mut errors, date_of_birth, Utc::now().date_naive());
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            validate_email!(errors, "email", email);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientFilter {
    /// Matches first name, last name, MRN, phone or email
    pub search: Option<String>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub is_active: Option<bool>,
}

impl PatientFilter {
    pub fn matches(&self, patient: &Patient) -> bool {
        if patient.is_deleted {
            return false;
        }
        if self.gender.is_some_and(|g| g != patient.gender) {
            return false;
        }
        if self.blood_group.is_some() && self.blood_group != patient.blood_group {
            return false;
        }
        if self.is_active.is_some_and(|a| a != patient.is_active) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                [
                    Some(patient.first_name.as_str()),
                    Some(patient.last_name.as_str()),
                    Some(patient.mrn.as_str()),
                    Some(patient.phone.as_str()),
                    patient.email.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term))
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Patient {
        let now = Utc::now();
        Patient {
            id: Uuid::new_v4(),
            mrn: "MRN-20240101-ABC123".to_string(),
            first_name: "Amara".to_string(),
            last_name: "Okafor".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            gender: Gender::Female,
            blood_group: Some(BloodGroup::ONegative),
            phone: "+1 555 0100".to_string(),
            email: Some("amara@example.org".to_string()),
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            allergies: vec![],
            medical_history: None,
            user_id: None,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let p = patient();
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), 33);
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 34);
    }

    #[test]
    fn test_blood_group_wire_format() {
        let json = serde_json::to_string(&BloodGroup::AbPositive).unwrap();
        assert_eq!(json, "\"AB+\"");
        assert_eq!("O-".parse::<BloodGroup>().unwrap(), BloodGroup::ONegative);
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let p = patient();
        let filter = PatientFilter {
            search: Some("okaf".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&p));

        let filter = PatientFilter {
            search: Some("abc123".to_string()),
            gender: Some(Gender::Male),
            ..Default::default()
        };
        assert!(!filter.matches(&p));
    }

    #[test]
    fn test_deleted_never_matches() {
        let mut p = patient();
        p.is_deleted = true;
        assert!(!PatientFilter::default().matches(&p));
    }
}
