//! Authentication context extraction
//!
//! Handlers take an [`AuthContext`] argument; axum resolves it from the
//! `Authorization: Bearer <jwt>` header before the handler runs, so an
//! unauthenticated request never reaches handler code. The account is
//! reloaded on every request; role and active flag are never read from claims.

use auth_identity::{Permission, Role};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use error_common::codes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::server::CareDeskServer;

/// Authenticated caller, resolved from a verified token and the stored account
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.can(permission)
    }

    /// 403 unless the caller's role grants `permission`
    pub fn require(&self, permission: Permission) -> ApiResult<()> {
        if self.can(permission) {
            return Ok(());
        }
        tracing::warn!(
            user_id = %self.user_id,
            role = self.role.as_str(),
            permission = ?permission,
            "Permission denied"
        );
        Err(ApiError::authorization(format!(
            "role '{}' lacks the {:?} permission",
            self.role.as_str(),
            permission
        )))
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    /// Patient id a patient caller is confined to; `None` for staff.
    ///
    /// A patient account without a linked patient record sees nothing.
    pub async fn patient_scope(&self, server: &CareDeskServer) -> ApiResult<Option<Uuid>> {
        if !self.is_patient() {
            return Ok(None);
        }
        match server.patients.find_by_user(self.user_id).await? {
            Some(patient) => Ok(Some(patient.id)),
            None => Err(ApiError::authorization("no patient record is linked to this account")),
        }
    }

    /// 403 when a patient caller asks for another patient's data
    pub async fn ensure_patient_access(&self, server: &CareDeskServer, patient_id: Uuid) -> ApiResult<()> {
        match self.patient_scope(server).await? {
            Some(own) if own != patient_id => Err(ApiError::authorization(
                "patients can only access their own records",
            )),
            _ => Ok(()),
        }
    }
}

/// Bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Authentication {
            message: "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
            code: codes::authentication::TOKEN_INVALID,
        })
}

#[async_trait]
impl FromRequestParts<CareDeskServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, server: &CareDeskServer) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(ctx.clone());
        }

        let token = bearer_token(&parts.headers)?;
        let user = server.identity.authorize_token(token).await?;
        let ctx = AuthContext {
            user_id: user.id,
            email: user.email,
            role: user.role,
        };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(ApiError::Authentication { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_require_permission() {
        let nurse = AuthContext::new(Uuid::new_v4(), "nurse@caredesk.test", Role::Nurse);
        assert!(nurse.require(Permission::ViewPatients).is_ok());
        match nurse.require(Permission::Dispense) {
            Err(err) => assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN),
            Ok(()) => panic!("nurses cannot dispense"),
        }
    }
}
