use crate::{error::*, models::*};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Lookup by lowercase email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_user(&self, user: &User) -> Result<User>;
    async fn update_last_login(&self, id: Uuid) -> Result<()>;
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>>;
    async fn count(&self) -> Result<u64>;
}

/// In-memory implementation for development/testing
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(IdentityError::EmailAlreadyInUse),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user.clone())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let id = match self.emails.get(email) {
            Some(id) => *id.value(),
            None => return Ok(None),
        };
        self.find_by_id(id).await
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        match self.users.get_mut(&user.id) {
            Some(mut existing) => {
                *existing = user.clone();
                Ok(user.clone())
            }
            None => Err(IdentityError::UserNotFound),
        }
    }

    async fn update_last_login(&self, id: Uuid) -> Result<()> {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.last_login_at = Some(Utc::now());
                Ok(())
            }
            None => Err(IdentityError::UserNotFound),
        }
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.len() as u64)
    }
}
