use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub token_ttl_minutes: i64,
    pub password_min_length: usize,
    /// Argon2 memory cost in KiB
    pub argon2_m_cost: u32,
    /// Argon2 iterations
    pub argon2_t_cost: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "caredesk-development-secret-change-me".to_string(),
            issuer: "caredesk".to_string(),
            token_ttl_minutes: 480,
            password_min_length: 10,
            argon2_m_cost: 19_456,
            argon2_t_cost: 2,
        }
    }
}

impl IdentityConfig {
    /// Cheap hashing parameters for tests
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "caredesk-test-secret-at-least-32-bytes!".to_string(),
            argon2_m_cost: 256,
            argon2_t_cost: 1,
            ..Default::default()
        }
    }
}
