use std::sync::Arc;

use auth_identity::{normalize_email, CreateUserRequest, IdentityService};
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    Appointment, AppointmentFilter, CreateStaffRequest, StaffFilter, StaffKind, StaffMember, UpdateStaffRequest,
};
use crate::repository::{AppointmentRepository, StaffRepository};
use crate::validation::non_blank;

/// Doctors, nurses and lab technicians behind one implementation
pub struct StaffService {
    staff: Arc<dyn StaffRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    identity: Arc<IdentityService>,
}

impl StaffService {
    pub fn new(
        staff: Arc<dyn StaffRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        identity: Arc<IdentityService>,
    ) -> Self {
        Self {
            staff,
            appointments,
            identity,
        }
    }

    pub async fn create(&self, kind: StaffKind, request: CreateStaffRequest) -> ApiResult<StaffMember> {
        let now = Utc::now();
        let mut member = StaffMember {
            id: Uuid::new_v4(),
            kind,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: normalize_email(&request.email),
            phone: request.phone.trim().to_string(),
            gender: request.gender,
            department: request.department.trim().to_string(),
            specialization: non_blank(request.specialization),
            qualification: non_blank(request.qualification),
            license_number: non_blank(request.license_number),
            experience_years: request.experience_years,
            consultation_fee: request.consultation_fee,
            shift: request.shift,
            user_id: None,
            is_active: true,
            joined_on: request.joined_on,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        member.validate_profile()?;

        if let Some(account) = request.create_account {
            let user = self
                .identity
                .register(CreateUserRequest {
                    email: member.email.clone(),
                    password: account.password,
                    full_name: member.full_name(),
                    role: kind.role(),
                })
                .await?;
            member.user_id = Some(user.id);
        }

        match self.staff.insert(&member).await {
            Ok(created) => {
                info!(staff_id = %created.id, kind = kind.as_str(), "Staff member added");
                Ok(created)
            }
            Err(err) => {
                if let Some(user_id) = member.user_id {
                    if let Err(release) = self.identity.set_active(user_id, false).await {
                        warn!(user_id = %user_id, error = %release, "Could not disable orphaned staff account");
                    }
                }
                Err(err)
            }
        }
    }

    /// Member of `kind`; any other kind is reported as not found
    pub async fn get(&self, kind: StaffKind, id: Uuid) -> ApiResult<StaffMember> {
        self.staff
            .find_by_id(id)
            .await?
            .filter(|m| m.kind == kind)
            .ok_or_else(|| ApiError::not_found(kind.label()))
    }

    /// Active member of `kind`, for bookings and assignments
    pub async fn active(&self, kind: StaffKind, id: Uuid) -> ApiResult<StaffMember> {
        let member = self.get(kind, id).await?;
        if !member.is_active {
            return Err(ApiError::invalid_state(format!(
                "{} {} is not active",
                kind.label(),
                member.full_name()
            )));
        }
        Ok(member)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> ApiResult<Option<StaffMember>> {
        self.staff.find_by_user_id(user_id).await
    }

    pub async fn update(&self, kind: StaffKind, id: Uuid, request: UpdateStaffRequest) -> ApiResult<StaffMember> {
        let mut member = self.get(kind, id).await?;

        if let Some(first_name) = request.first_name {
            member.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            member.last_name = last_name.trim().to_string();
        }
        if let Some(email) = request.email {
            member.email = normalize_email(&email);
        }
        if let Some(phone) = request.phone {
            member.phone = phone.trim().to_string();
        }
        if request.gender.is_some() {
            member.gender = request.gender;
        }
        if let Some(department) = request.department {
            member.department = department.trim().to_string();
        }
        if request.specialization.is_some() {
            member.specialization = non_blank(request.specialization);
        }
        if request.qualification.is_some() {
            member.qualification = non_blank(request.qualification);
        }
        if request.license_number.is_some() {
            member.license_number = non_blank(request.license_number);
        }
        if request.experience_years.is_some() {
            member.experience_years = request.experience_years;
        }
        if request.consultation_fee.is_some() {
            member.consultation_fee = request.consultation_fee;
        }
        if request.shift.is_some() {
            member.shift = request.shift;
        }
        if request.joined_on.is_some() {
            member.joined_on = request.joined_on;
        }
        if let Some(is_active) = request.is_active {
            member.is_active = is_active;
        }
        member.validate_profile()?;
        member.updated_at = Utc::now();

        let updated = self.staff.update(&member).await?;
        info!(staff_id = %id, kind = kind.as_str(), "Staff member updated");
        Ok(updated)
    }

    /// Soft delete; a linked login account is disabled too
    pub async fn delete(&self, kind: StaffKind, id: Uuid) -> ApiResult<()> {
        let member = self.get(kind, id).await?;
        if !self.staff.soft_delete(id).await? {
            return Err(ApiError::not_found(kind.label()));
        }
        if let Some(user_id) = member.user_id {
            self.identity.set_active(user_id, false).await?;
        }
        info!(staff_id = %id, kind = kind.as_str(), "Staff member removed");
        Ok(())
    }

    pub async fn list(
        &self,
        kind: StaffKind,
        filter: &StaffFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<StaffMember>, u64)> {
        self.staff.list(kind, filter, limit, offset).await
    }

    pub async fn all(&self, kind: Option<StaffKind>, filter: &StaffFilter) -> ApiResult<Vec<StaffMember>> {
        self.staff.list_all(kind, filter).await
    }

    /// A doctor's scheduled and confirmed appointments on one UTC day, by start
    pub async fn doctor_schedule(&self, doctor_id: Uuid, date: NaiveDate) -> ApiResult<Vec<Appointment>> {
        self.get(StaffKind::Doctor, doctor_id).await?;
        let day = self
            .appointments
            .list_all(&AppointmentFilter::doctor_day(doctor_id, date))
            .await?;
        Ok(day.into_iter().filter(|a| a.status.is_blocking()).collect())
    }
}
