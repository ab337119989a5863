//! Identity management and user authentication for CareDesk
//!
//! This crate provides:
//! - User accounts with one [`Role`] each
//! - The role to [`Permission`] matrix
//! - Argon2id password hashing
//! - HS256 JWT access tokens
//! - In-memory and PostgreSQL user repositories
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use auth_identity::{CreateUserRequest, IdentityConfig, IdentityService, InMemoryUserRepository, Role};
//!
//! # tokio_test::block_on(async {
//! let service = IdentityService::new(
//!     Arc::new(InMemoryUserRepository::new()),
//!     IdentityConfig::for_tests(),
//! )?;
//!
//! service.register(CreateUserRequest {
//!     email: "frontdesk@caredesk.dev".to_string(),
//!     password: "reception2024".to_string(),
//!     full_name: "Front Desk".to_string(),
//!     role: Role::Receptionist,
//! }).await?;
//!
//! let login = service.authenticate("frontdesk@caredesk.dev", "reception2024").await?;
//! let claims = service.verify_token(&login.token)?;
//! assert_eq!(claims.role, Role::Receptionist);
//! # Ok::<(), auth_identity::IdentityError>(())
//! # });
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod tokens;

pub use config::*;
pub use error::*;
pub use models::*;
pub use permissions::*;
pub use postgres::PgUserRepository;
pub use repository::*;
pub use service::*;
