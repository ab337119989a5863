use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{StaffFilter, StaffKind, StaffMember};
use crate::types::pagination::page_of;

#[async_trait]
pub trait StaffRepository: Send + Sync {
    /// Fails with a conflict when a non-deleted member already uses the email
    async fn insert(&self, member: &StaffMember) -> ApiResult<StaffMember>;
    /// Non-deleted member by id, of any kind
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<StaffMember>>;
    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<StaffMember>>;
    async fn update(&self, member: &StaffMember) -> ApiResult<StaffMember>;
    async fn soft_delete(&self, id: Uuid) -> ApiResult<bool>;
    /// Ordered by last name, first name
    async fn list(
        &self,
        kind: StaffKind,
        filter: &StaffFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<StaffMember>, u64)>;
    /// Every kind when `kind` is None
    async fn list_all(&self, kind: Option<StaffKind>, filter: &StaffFilter) -> ApiResult<Vec<StaffMember>>;
}

/// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryStaffRepository {
    members: DashMap<Uuid, StaffMember>,
    write_lock: Mutex<()>,
}

impl InMemoryStaffRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(&self, email: &str, except: Uuid) -> bool {
        self.members
            .iter()
            .any(|m| !m.is_deleted && m.id != except && m.email.eq_ignore_ascii_case(email))
    }

    fn sorted(&self, kind: Option<StaffKind>, filter: &StaffFilter) -> Vec<StaffMember> {
        let mut members: Vec<StaffMember> = self
            .members
            .iter()
            .filter(|m| kind.map_or(true, |k| k == m.kind) && filter.matches(m.value()))
            .map(|m| m.value().clone())
            .collect();
        members.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        members
    }
}

#[async_trait]
impl StaffRepository for InMemoryStaffRepository {
    async fn insert(&self, member: &StaffMember) -> ApiResult<StaffMember> {
        let _guard = self.write_lock.lock();
        if self.email_taken(&member.email, member.id) {
            return Err(ApiError::conflict(format!("staff email {} already in use", member.email)));
        }
        self.members.insert(member.id, member.clone());
        Ok(member.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<StaffMember>> {
        Ok(self
            .members
            .get(&id)
            .filter(|m| !m.is_deleted)
            .map(|m| m.value().clone()))
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<StaffMember>> {
        Ok(self
            .members
            .iter()
            .find(|m| !m.is_deleted && m.user_id == Some(user_id))
            .map(|m| m.value().clone()))
    }

    async fn update(&self, member: &StaffMember) -> ApiResult<StaffMember> {
        let _guard = self.write_lock.lock();
        if self.email_taken(&member.email, member.id) {
            return Err(ApiError::conflict(format!("staff email {} already in use", member.email)));
        }
        match self.members.get_mut(&member.id) {
            Some(mut existing) if !existing.is_deleted => {
                *existing = member.clone();
                Ok(member.clone())
            }
            _ => Err(ApiError::not_found(member.kind.label())),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> ApiResult<bool> {
        match self.members.get_mut(&id) {
            Some(mut existing) if !existing.is_deleted => {
                existing.is_deleted = true;
                existing.is_active = false;
                existing.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        kind: StaffKind,
        filter: &StaffFilter,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<StaffMember>, u64)> {
        Ok(page_of(self.sorted(Some(kind), filter), limit, offset))
    }

    async fn list_all(&self, kind: Option<StaffKind>, filter: &StaffFilter) -> ApiResult<Vec<StaffMember>> {
        Ok(self.sorted(kind, filter))
    }
}
