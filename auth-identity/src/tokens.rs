use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{error::*, models::*};

/// HS256 signer/verifier for access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| IdentityError::JwtError(e.to_string()))?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::InvalidToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "doc@caredesk.dev".to_string(),
            full_name: "Dr Who".to_string(),
            role: Role::Doctor,
            is_active: true,
            password_hash: String::new(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new("a-very-long-secret-for-testing-purposes", "caredesk", 60);
        let user = user();
        let (token, expires_at) = issuer.issue(&user).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Doctor);
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let a = TokenIssuer::new("a-very-long-secret-for-testing-purposes", "caredesk", 60);
        let b = TokenIssuer::new("a-very-long-secret-for-testing-purposes", "someone-else", 60);
        let (token, _) = a.issue(&user()).unwrap();
        assert!(matches!(b.verify(&token), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = TokenIssuer::new("a-very-long-secret-for-testing-purposes", "caredesk", 60);
        let b = TokenIssuer::new("another-long-secret-for-testing-purpose", "caredesk", 60);
        let (token, _) = a.issue(&user()).unwrap();
        assert!(matches!(b.verify(&token), Err(IdentityError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new("a-very-long-secret-for-testing-purposes", "caredesk", -5);
        let (token, _) = issuer.issue(&user()).unwrap();
        assert!(matches!(issuer.verify(&token), Err(IdentityError::TokenExpired)));
    }

    #[test]
    fn test_garbage_token() {
        let issuer = TokenIssuer::new("a-very-long-secret-for-testing-purposes", "caredesk", 60);
        assert!(matches!(issuer.verify("not.a.jwt"), Err(IdentityError::InvalidToken)));
    }
}
