//! Account lifecycle tests against the in-memory user store
//!
//! 1. Reception registers, logs in and verifies its token
//! 2. Disabled accounts cannot log in
//! 3. Password rotation invalidates the old password
//! 4. Admin bootstrap is idempotent

use auth_identity::*;
use std::sync::Arc;

fn create_test_service() -> IdentityService {
    IdentityService::new(
        Arc::new(InMemoryUserRepository::new()),
        IdentityConfig::for_tests(),
    )
    .unwrap()
}

fn request(email: &str, role: Role) -> CreateUserRequest {
    CreateUserRequest {
        email: email.to_string(),
        password: "frontdesk2024".to_string(),
        full_name: "Front Desk".to_string(),
        role,
    }
}

// ============================================================================
// TEST 1: Register, login, verify
// ============================================================================

#[tokio::test]
async fn test_register_login_and_verify() {
    let service = create_test_service();

    let user = service
        .register(request("Reception@CareDesk.dev", Role::Receptionist))
        .await
        .unwrap();
    assert_eq!(user.email, "reception@caredesk.dev");
    assert!(user.password_hash.starts_with("$argon2id$"));

    let login = service
        .authenticate("reception@caredesk.dev", "frontdesk2024")
        .await
        .unwrap();
    assert!(login.user.last_login_at.is_some());

    let claims = service.verify_token(&login.token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, Role::Receptionist);
    assert_eq!(claims.iss, "caredesk");
}

#[tokio::test]
async fn test_wrong_password_matches_unknown_user_error() {
    let service = create_test_service();
    service
        .register(request("reception@caredesk.dev", Role::Receptionist))
        .await
        .unwrap();

    let wrong = service
        .authenticate("reception@caredesk.dev", "not-the-password1")
        .await
        .unwrap_err();
    let unknown = service
        .authenticate("nobody@caredesk.dev", "frontdesk2024")
        .await
        .unwrap_err();

    assert!(matches!(wrong, IdentityError::InvalidCredentials));
    assert!(matches!(unknown, IdentityError::InvalidCredentials));
}

// ============================================================================
// TEST 2: Disabled accounts
// ============================================================================

#[tokio::test]
async fn test_disabled_account_cannot_login() {
    let service = create_test_service();
    let user = service
        .register(request("nurse@caredesk.dev", Role::Nurse))
        .await
        .unwrap();

    service.set_active(user.id, false).await.unwrap();
    let err = service
        .authenticate("nurse@caredesk.dev", "frontdesk2024")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::AccountDisabled));

    service.set_active(user.id, true).await.unwrap();
    assert!(service
        .authenticate("nurse@caredesk.dev", "frontdesk2024")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_issued_token_follows_stored_account() {
    let service = create_test_service();
    let user = service
        .register(request("ward@caredesk.dev", Role::Nurse))
        .await
        .unwrap();
    let login = service
        .authenticate("ward@caredesk.dev", "frontdesk2024")
        .await
        .unwrap();

    service.set_role(user.id, Role::Receptionist).await.unwrap();
    let current = service.authorize_token(&login.token).await.unwrap();
    assert_eq!(current.role, Role::Receptionist);

    service.set_active(user.id, false).await.unwrap();
    let err = service.authorize_token(&login.token).await.unwrap_err();
    assert!(matches!(err, IdentityError::AccountDisabled));
}

// ============================================================================
// TEST 3: Password rotation
// ============================================================================

#[tokio::test]
async fn test_change_password() {
    let service = create_test_service();
    let user = service
        .register(request("doc@caredesk.dev", Role::Doctor))
        .await
        .unwrap();

    let err = service
        .change_password(user.id, "wrong-current1", "brandnewpass99")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));

    let err = service
        .change_password(user.id, "frontdesk2024", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::WeakPassword(_)));

    service
        .change_password(user.id, "frontdesk2024", "brandnewpass99")
        .await
        .unwrap();

    assert!(service
        .authenticate("doc@caredesk.dev", "frontdesk2024")
        .await
        .is_err());
    assert!(service
        .authenticate("doc@caredesk.dev", "brandnewpass99")
        .await
        .is_ok());
}

// ============================================================================
// TEST 4: Bootstrap and roles
// ============================================================================

#[tokio::test]
async fn test_ensure_admin_is_idempotent() {
    let service = create_test_service();

    assert!(service
        .ensure_admin("admin@caredesk.dev", "bootstrap2024")
        .await
        .unwrap());
    assert!(!service
        .ensure_admin("ADMIN@caredesk.dev", "bootstrap2024")
        .await
        .unwrap());

    let admins = service.list_users(Some(Role::Admin)).await.unwrap();
    assert_eq!(admins.len(), 1);
}

#[tokio::test]
async fn test_role_change_is_reflected_in_new_tokens() {
    let service = create_test_service();
    let user = service
        .register(request("staff@caredesk.dev", Role::Nurse))
        .await
        .unwrap();

    service.set_role(user.id, Role::Pharmacist).await.unwrap();
    let login = service
        .authenticate("staff@caredesk.dev", "frontdesk2024")
        .await
        .unwrap();
    let claims = service.verify_token(&login.token).unwrap();
    assert_eq!(claims.role, Role::Pharmacist);
    assert!(claims.role.can(Permission::Dispense));
}

#[tokio::test]
async fn test_invalid_email_rejected() {
    let service = create_test_service();
    let err = service
        .register(request("not-an-email", Role::Nurse))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidEmail));
}
