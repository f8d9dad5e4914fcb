//! Integration tests for gatehouse-core
//!
//! These tests run the full context against a real DuckDB file and a
//! file-backed session, the way the CLI uses them.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::path::Path;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use gatehouse_core::adapters::{FileSessionStore, MemorySessionStore};
use gatehouse_core::domain::session::{KEY_AUTHENTICATED_AT, KEY_SESSION_TOKEN, KEY_USER_ID};
use gatehouse_core::services::CheckStatus;
use gatehouse_core::{GatehouseContext, NewUser, Session, SessionStore, UserRepository, UserType};

// ============================================================================
// Test Helpers
// ============================================================================

/// Write settings with cheap hashing parameters so the tests stay fast
fn write_settings(dir: &Path, extra_auth: &str) {
    let settings = format!(
        r#"{{"auth": {{"argon2": {{"memoryCost": 64, "timeCost": 1, "parallelism": 1}}{}}}}}"#,
        extra_auth
    );
    std::fs::write(dir.join("settings.json"), settings).unwrap();
}

fn create_context(temp_dir: &TempDir) -> GatehouseContext {
    write_settings(temp_dir.path(), "");
    GatehouseContext::new(temp_dir.path()).expect("Failed to create context")
}

fn test_user() -> NewUser {
    NewUser::new("testuser", "test@example.com", "password123", "Test", "User")
}

// ============================================================================
// Core Scenarios
// ============================================================================

#[test]
fn test_authenticate_nonexistent_user_fails() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session = MemorySessionStore::new();

    let result = ctx
        .user_service
        .authenticate(&session, "nonexistent@test.com", "password")
        .unwrap();

    assert!(!result.success);
    assert!(!result.message.is_empty());
}

#[test]
fn test_validate_session_without_login() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session = MemorySessionStore::new();

    assert!(!ctx.user_service.validate_session(&session).unwrap());
}

#[test]
fn test_destroy_session_reports_success() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session = MemorySessionStore::new();

    assert!(ctx.user_service.destroy_session(&session).unwrap());
    assert!(!ctx.user_service.validate_session(&session).unwrap());
}

#[test]
fn test_register_login_validate_logout() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session = FileSessionStore::new(temp_dir.path().join("session.json"));

    let created = ctx.user_service.create_user(&test_user()).unwrap();
    assert!(created.success, "{}", created.message);

    let login = ctx
        .user_service
        .authenticate(&session, "test@example.com", "password123")
        .unwrap();
    assert!(login.success, "{}", login.message);
    assert!(ctx.user_service.validate_session(&session).unwrap());

    assert!(ctx.user_service.destroy_session(&session).unwrap());
    assert!(!ctx.user_service.validate_session(&session).unwrap());
    assert!(!session.path().exists());
}

#[test]
fn test_duplicate_email_rejected_without_touching_first_account() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    assert!(ctx.user_service.create_user(&test_user()).unwrap().success);

    let duplicate = NewUser::new("other", "TEST@example.com", "another-pass", "Other", "Person");
    let result = ctx.user_service.create_user(&duplicate).unwrap();
    assert!(!result.success);

    let session = MemorySessionStore::new();
    assert!(ctx
        .user_service
        .authenticate(&session, "test@example.com", "password123")
        .unwrap()
        .success);
    assert_eq!(ctx.repository.count_users().unwrap(), 1);
}

// ============================================================================
// Session Persistence
// ============================================================================

#[test]
fn test_session_survives_context_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let session_path = temp_dir.path().join("session.json");

    {
        let ctx = create_context(&temp_dir);
        ctx.user_service.create_user(&test_user()).unwrap();
        let session = FileSessionStore::new(&session_path);
        assert!(ctx
            .user_service
            .authenticate(&session, "testuser", "password123")
            .unwrap()
            .success);
    }

    let ctx = GatehouseContext::new(temp_dir.path()).unwrap();
    let session = FileSessionStore::new(&session_path);
    assert!(ctx.user_service.validate_session(&session).unwrap());

    let me = ctx.user_service.current_user(&session).unwrap().unwrap();
    assert_eq!(me.username, "testuser");
    assert_eq!(me.user_type, UserType::Student);
}

#[test]
fn test_session_keys_never_hold_password() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session = FileSessionStore::new(temp_dir.path().join("session.json"));
    ctx.user_service.create_user(&test_user()).unwrap();
    ctx.user_service
        .authenticate(&session, "testuser", "password123")
        .unwrap();

    assert!(session.get(KEY_USER_ID).unwrap().is_some());
    assert_eq!(session.get(KEY_SESSION_TOKEN).unwrap().unwrap().len(), 64);
    assert!(session.get(KEY_AUTHENTICATED_AT).unwrap().is_some());

    let raw = std::fs::read_to_string(session.path()).unwrap();
    assert!(!raw.contains("password123"));
}

#[test]
fn test_session_expires_after_configured_lifetime() {
    let temp_dir = TempDir::new().unwrap();
    write_settings(temp_dir.path(), r#", "sessionLifetimeMinutes": 30"#);
    let ctx = GatehouseContext::new(temp_dir.path()).unwrap();
    let session = MemorySessionStore::new();
    ctx.user_service.create_user(&test_user()).unwrap();
    ctx.user_service
        .authenticate(&session, "testuser", "password123")
        .unwrap();

    let now = Utc::now();
    assert!(ctx
        .user_service
        .validate_session_at(&session, now + Duration::minutes(29))
        .unwrap());
    assert!(!ctx
        .user_service
        .validate_session_at(&session, now + Duration::minutes(31))
        .unwrap());
}

#[test]
fn test_hand_written_session_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session_path = temp_dir.path().join("session.json");
    ctx.user_service
        .create_user(&test_user().with_user_type("admin"))
        .unwrap();
    let admin_id = ctx.repository.find_by_username("testuser").unwrap().unwrap().id;

    std::fs::write(
        &session_path,
        format!(
            r#"{{"user_id": "{}", "session_token": "x", "authenticated_at": "{}"}}"#,
            admin_id,
            (Utc::now() + Duration::days(3650)).to_rfc3339()
        ),
    )
    .unwrap();

    let session = FileSessionStore::new(&session_path);
    assert!(Session::load(&session).unwrap().is_some());
    assert!(!ctx.user_service.validate_session(&session).unwrap());
    assert!(ctx.user_service.current_user(&session).unwrap().is_none());
}

#[test]
fn test_second_anonymous_admin_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let first = ctx
        .user_service
        .create_user(&test_user().with_user_type("admin"))
        .unwrap();
    assert!(first.success, "{}", first.message);

    let second = NewUser::new("mallory", "mallory@example.com", "password123", "Mal", "Lory")
        .with_user_type("admin");
    let result = ctx.user_service.create_user(&second).unwrap();
    assert!(!result.success);
    assert_eq!(ctx.repository.count_users().unwrap(), 1);
}

#[test]
fn test_tampered_session_is_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let session = MemorySessionStore::new();
    ctx.user_service.create_user(&test_user()).unwrap();
    ctx.user_service
        .authenticate(&session, "testuser", "password123")
        .unwrap();

    session
        .set(KEY_USER_ID, &uuid::Uuid::new_v4().to_string())
        .unwrap();
    assert!(!ctx.user_service.validate_session(&session).unwrap());

    session.set(KEY_USER_ID, "not-a-uuid").unwrap();
    assert!(!ctx.user_service.validate_session(&session).unwrap());
}

// ============================================================================
// Storage
// ============================================================================

#[test]
fn test_password_stored_as_argon2_hash() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    ctx.user_service.create_user(&test_user()).unwrap();

    let stored = ctx.repository.find_by_email("test@example.com").unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert_ne!(stored.password_hash, "password123");
}

#[test]
fn test_doctor_on_fresh_context() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);

    let result = ctx.doctor_service.run_checks().unwrap();
    assert_eq!(result.checks["database_connection"].status, CheckStatus::Pass);
    assert_eq!(result.checks["schema_migrations"].status, CheckStatus::Pass);
    assert_eq!(result.checks["users_table"].status, CheckStatus::Warning);
    assert!(result.is_healthy());
}
