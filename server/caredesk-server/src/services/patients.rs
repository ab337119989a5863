use std::sync::Arc;

use auth_identity::{normalize_email, CreateUserRequest, IdentityService, Role};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{CreatePatientRequest, Patient, PatientFilter, UpdatePatientRequest};
use crate::repository::PatientRepository;
use crate::validation::{non_blank, RequestValidation};

const MRN_ATTEMPTS: usize = 5;

/// `MRN-YYYYMMDD-XXXXXX`, six uppercase hex characters from a v4 UUID
pub fn generate_mrn(at: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("MRN-{}-{}", at.format("%Y%m%d"), suffix)
}

pub struct PatientService {
    patients: Arc<dyn PatientRepository>,
    identity: Arc<IdentityService>,
}

impl PatientService {
    pub fn new(patients: Arc<dyn PatientRepository>, identity: Arc<IdentityService>) -> Self {
        Self { patients, identity }
    }

    /// Register a patient, with a `patient` login account when requested
    pub async fn create(&self, request: CreatePatientRequest) -> ApiResult<Patient> {
        request.validate()?;

        let email = non_blank(request.email).map(|e| normalize_email(&e));
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();

        let user_id = match (&request.create_account, &email) {
            (Some(account), Some(email)) => {
                let user = self
                    .identity
                    .register(CreateUserRequest {
                        email: email.clone(),
                        password: account.password.clone(),
                        full_name: format!("{first_name} {last_name}"),
                        role: Role::Patient,
                    })
                    .await?;
                Some(user.id)
            }
            _ => None,
        };

        let now = Utc::now();
        let mut patient = Patient {
            id: Uuid::new_v4(),
            mrn: generate_mrn(now),
            first_name,
            last_name,
            date_of_birth: request.date_of_birth,
            gender: request.gender,
            blood_group: request.blood_group,
            phone: request.phone.trim().to_string(),
            email,
            address: non_blank(request.address),
            emergency_contact_name: non_blank(request.emergency_contact_name),
            emergency_contact_phone: non_blank(request.emergency_contact_phone),
            allergies: clean_list(request.allergies),
            medical_history: non_blank(request.medical_history),
            user_id,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let created = self.insert_with_fresh_mrn(&mut patient).await;
        match (&created, user_id) {
            (Ok(patient), _) => info!(patient_id = %patient.id, mrn = %patient.mrn, "Patient registered"),
            (Err(_), Some(user_id)) => self.release_account(user_id).await,
            (Err(_), None) => {}
        }
        created
    }

    async fn insert_with_fresh_mrn(&self, patient: &mut Patient) -> ApiResult<Patient> {
        let mut attempt = 1;
        loop {
            match self.patients.insert(patient).await {
                Err(err) if err.is_conflict() && attempt < MRN_ATTEMPTS => {
                    patient.mrn = generate_mrn(patient.created_at);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Disable an account whose profile could not be stored
    async fn release_account(&self, user_id: Uuid) {
        if let Err(err) = self.identity.set_active(user_id, false).await {
            warn!(user_id = %user_id, error = %err, "Could not disable orphaned patient account");
        }
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Patient> {
        self.patients
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("patient"))
    }

    /// Active patient, for bookings and orders
    pub async fn active(&self, id: Uuid) -> ApiResult<Patient> {
        let patient = self.get(id).await?;
        if !patient.is_active {
            return Err(ApiError::invalid_state(format!("patient {} is not active", patient.mrn)));
        }
        Ok(patient)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> ApiResult<Option<Patient>> {
        self.patients.find_by_user_id(user_id).await
    }

    pub async fn update(&self, id: Uuid, request: UpdatePatientRequest) -> ApiResult<Patient> {
        request.validate()?;
        let mut patient = self.get(id).await?;

        if let Some(first_name) = request.first_name {
            patient.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            patient.last_name = last_name.trim().to_string();
        }
        if let Some(date_of_birth) = request.date_of_birth {
            patient.date_of_birth = date_of_birth;
        }
        if let Some(gender) = request.gender {
            patient.gender = gender;
        }
        if request.blood_group.is_some() {
            patient.blood_group = request.blood_group;
        }
        if let Some(phone) = request.phone {
            patient.phone = phone.trim().to_string();
        }
        if let Some(email) = request.email {
            patient.email = non_blank(Some(email)).map(|e| normalize_email(&e));
        }
        if request.address.is_some() {
            patient.address = non_blank(request.address);
        }
        if request.emergency_contact_name.is_some() {
            patient.emergency_contact_name = non_blank(request.emergency_contact_name);
        }
        if request.emergency_contact_phone.is_some() {
            patient.emergency_contact_phone = non_blank(request.emergency_contact_phone);
        }
        if let Some(allergies) = request.allergies {
            patient.allergies = clean_list(allergies);
        }
        if request.medical_history.is_some() {
            patient.medical_history = non_blank(request.medical_history);
        }
        if let Some(is_active) = request.is_active {
            patient.is_active = is_active;
        }
        patient.updated_at = Utc::now();

        let updated = self.patients.update(&patient).await?;
        info!(patient_id = %id, "Patient updated");
        Ok(updated)
    }

    /// Soft delete; a linked login account is disabled too
    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let patient = self.get(id).await?;
        if !self.patients.soft_delete(id).await? {
            return Err(ApiError::not_found("patient"));
        }
        if let Some(user_id) = patient.user_id {
            self.identity.set_active(user_id, false).await?;
        }
        info!(patient_id = %id, "Patient deleted");
        Ok(())
    }

    pub async fn list(&self, filter: &PatientFilter, limit: i64, offset: i64) -> ApiResult<(Vec<Patient>, u64)> {
        self.patients.list(filter, limit, offset).await
    }

    pub async fn all(&self, filter: &PatientFilter) -> ApiResult<Vec<Patient>> {
        self.patients.list_all(filter).await
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountRequest, Gender};
    use crate::repository::InMemoryPatientRepository;
    use auth_identity::{IdentityConfig, InMemoryUserRepository};
    use chrono::NaiveDate;

    fn service() -> (PatientService, Arc<IdentityService>) {
        let identity = Arc::new(
            IdentityService::new(Arc::new(InMemoryUserRepository::new()), IdentityConfig::for_tests()).unwrap(),
        );
        let service = PatientService::new(Arc::new(InMemoryPatientRepository::new()), identity.clone());
        (service, identity)
    }

    fn request() -> CreatePatientRequest {
        CreatePatientRequest {
            first_name: " Amara ".to_string(),
            last_name: "Okafor".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1988, 2, 14).unwrap(),
            gender: Gender::Female,
            blood_group: None,
            phone: "+1 555 0100".to_string(),
            email: Some("Amara@Example.org".to_string()),
            address: Some("  ".to_string()),
            emergency_contact_name: None,
            emergency_contact_phone: None,
            allergies: vec!["penicillin".to_string(), " ".to_string()],
            medical_history: None,
            create_account: None,
        }
    }

    #[test]
    fn test_mrn_format() {
        let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 3, 9, 8, 0, 0).unwrap();
        let mrn = generate_mrn(at);
        assert!(mrn.starts_with("MRN-20240309-"));
        let suffix = &mrn["MRN-20240309-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn test_create_normalizes_fields() {
        let (service, _) = service();
        let patient = service.create(request()).await.unwrap();
        assert_eq!(patient.first_name, "Amara");
        assert_eq!(patient.email.as_deref(), Some("amara@example.org"));
        assert_eq!(patient.address, None);
        assert_eq!(patient.allergies, vec!["penicillin".to_string()]);
        assert!(patient.user_id.is_none());
    }

    #[tokio::test]
    async fn test_create_with_account_links_patient_user() {
        let (service, identity) = service();
        let mut req = request();
        req.create_account = Some(AccountRequest {
            password: "correct-horse-42".to_string(),
        });
        let patient = service.create(req).await.unwrap();
        let user = identity.get_user(patient.user_id.unwrap()).await.unwrap();
        assert_eq!(user.role, Role::Patient);
        assert_eq!(user.email, "amara@example.org");

        let found = service.find_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(found.id, patient.id);
    }

    #[tokio::test]
    async fn test_deleted_patient_is_gone() {
        let (service, _) = service();
        let patient = service.create(request()).await.unwrap();
        service.delete(patient.id).await.unwrap();
        assert!(matches!(service.get(patient.id).await, Err(ApiError::NotFound { .. })));
        assert!(matches!(service.delete(patient.id).await, Err(ApiError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_merges_only_given_fields() {
        let (service, _) = service();
        let patient = service.create(request()).await.unwrap();
        let updated = service
            .update(
                patient.id,
                UpdatePatientRequest {
                    phone: Some("0712 345 678".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone, "0712 345 678");
        assert_eq!(updated.first_name, "Amara");

        let invalid = service
            .update(
                patient.id,
                UpdatePatientRequest {
                    phone: Some("12".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(invalid, Err(ApiError::Validation { .. })));
    }
}
