use crate::{config::*, error::*, models::*, repository::*, tokens::TokenIssuer};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct IdentityService {
    user_repo: Arc<dyn UserRepository>,
    config: IdentityConfig,
    argon2: Argon2<'static>,
    tokens: TokenIssuer,
}

impl IdentityService {
    pub fn new(user_repo: Arc<dyn UserRepository>, config: IdentityConfig) -> Result<Self> {
        let params = Params::new(config.argon2_m_cost, config.argon2_t_cost, 1, Some(32))
            .map_err(|e| IdentityError::InternalError(anyhow::anyhow!("invalid argon2 params: {e}")))?;
        let tokens = TokenIssuer::new(&config.jwt_secret, &config.issuer, config.token_ttl_minutes);

        Ok(Self {
            user_repo,
            config,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            tokens,
        })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    pub async fn register(&self, request: CreateUserRequest) -> Result<User> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        self.validate_password(&request.password)?;
        let password_hash = self.hash_password(&request.password).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            full_name: request.full_name.trim().to_string(),
            role: request.role,
            is_active: true,
            password_hash,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let user = self.user_repo.create_user(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let mut user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        self.verify_password(password, &user.password_hash).await?;

        if !user.is_active {
            return Err(IdentityError::AccountDisabled);
        }

        self.user_repo.update_last_login(user.id).await?;
        user.last_login_at = Some(Utc::now());

        let (token, expires_at) = self.tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, "User authenticated");

        Ok(LoginResponse {
            user,
            token,
            expires_at,
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token)
    }

    /// Verify `token` and reload its subject.
    ///
    /// Role and active flag come from the stored account, not the claims, so a
    /// token stops granting access as soon as the account is disabled or demoted.
    pub async fn authorize_token(&self, token: &str) -> Result<User> {
        let claims = self.tokens.verify(token)?;
        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if !user.is_active {
            return Err(IdentityError::AccountDisabled);
        }
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut user = self.get_user(user_id).await?;

        self.verify_password(current_password, &user.password_hash).await?;
        self.validate_password(new_password)?;

        user.password_hash = self.hash_password(new_password).await?;
        user.updated_at = Utc::now();
        self.user_repo.update_user(&user).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub async fn set_active(&self, user_id: Uuid, is_active: bool) -> Result<User> {
        let mut user = self.get_user(user_id).await?;
        user.is_active = is_active;
        user.updated_at = Utc::now();
        self.user_repo.update_user(&user).await
    }

    pub async fn set_role(&self, user_id: Uuid, role: Role) -> Result<User> {
        let mut user = self.get_user(user_id).await?;
        user.role = role;
        user.updated_at = Utc::now();
        self.user_repo.update_user(&user).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)
    }

    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        self.user_repo.list_users(role).await
    }

    /// Seed an administrator unless one already uses `email`.
    ///
    /// Returns `true` when a new account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool> {
        if self.user_repo.find_by_email(&normalize_email(email)).await?.is_some() {
            return Ok(false);
        }

        self.register(CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Administrator".to_string(),
            role: Role::Admin,
        })
        .await?;
        Ok(true)
    }

    pub fn validate_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.config.password_min_length {
            return Err(IdentityError::WeakPassword(format!(
                "must be at least {} characters",
                self.config.password_min_length
            )));
        }

        if !password.chars().any(|c| c.is_alphabetic()) {
            return Err(IdentityError::WeakPassword("must contain a letter".to_string()));
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(IdentityError::WeakPassword("must contain a digit".to_string()));
        }

        Ok(())
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| IdentityError::HashingError)
        })
        .await
        .map_err(|_| IdentityError::HashingError)?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<()> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash).map_err(|_| IdentityError::HashingError)?;
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .map_err(|_| IdentityError::InvalidCredentials)
        })
        .await
        .map_err(|_| IdentityError::HashingError)?
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld` with a non-empty local part and a dot after the `@`
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}
