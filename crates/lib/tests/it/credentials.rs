use std::net::{IpAddr, Ipv4Addr};

use watcher::{
    auth::IpFamily,
    credentials::{CredentialValidator, LoginError, NewUser},
};

use crate::helpers::{TEST_NIP, TEST_PASSWORD, TestApp, test_user};

fn client() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 20, 30, 40))
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let app = TestApp::new().await;
    let (token, context) = app
        .state
        .authenticator
        .login(TEST_NIP, TEST_PASSWORD, client())
        .await
        .unwrap();

    let user = test_user();
    assert_eq!(context.nip, user.nip);
    assert_eq!(context.user_id, user.user_id);
    assert_eq!(context.title, user.title);
    assert_eq!(context.ip, "10.20.30.40");
    assert_eq!(context.ip_family, IpFamily::Ipv4);

    let stored = app.state.sessions.resolve(token.as_str()).await.unwrap();
    assert_eq!(stored, context);
}

#[tokio::test]
async fn test_wrong_password_stores_nothing() {
    let app = TestApp::new().await;
    let err = app
        .state
        .authenticator
        .login(TEST_NIP, "not-the-password", client())
        .await
        .unwrap_err();
    assert_eq!(err, LoginError::InvalidCredentials);
    assert!(app.kv.is_empty().await);
}

#[tokio::test]
async fn test_unknown_nip_matches_wrong_password() {
    let app = TestApp::new().await;
    let unknown = app
        .state
        .authenticator
        .login("999999999999999", TEST_PASSWORD, client())
        .await
        .unwrap_err();
    let wrong = app
        .state
        .authenticator
        .login(TEST_NIP, "nope", client())
        .await
        .unwrap_err();
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(app.kv.is_empty().await);
}

#[tokio::test]
async fn test_session_store_outage_fails_login() {
    let app = TestApp::new().await;
    app.kv.set_available(false);
    let err = app
        .state
        .authenticator
        .login(TEST_NIP, TEST_PASSWORD, client())
        .await
        .unwrap_err();
    assert!(err.is_store_unavailable());
}

#[tokio::test]
async fn test_directory_outage_fails_login() {
    let app = TestApp::new().await;
    app.state.registry.close().await;
    let err = app
        .state
        .authenticator
        .login(TEST_NIP, TEST_PASSWORD, client())
        .await
        .unwrap_err();
    assert!(err.is_store_unavailable());
}

#[tokio::test]
async fn test_plaintext_password_column_never_matches() {
    let app = TestApp::new().await;
    let users = app.state.registry.get("users").unwrap();
    sqlx::query(
        "INSERT INTO users (user_id, nip, name, role, jabatan, department_id, password_hash) \
         VALUES ('u-legacy', '111111111111111', 'Legacy', 'staff', '', '', 'hunter2')",
    )
    .execute(users.pool())
    .await
    .unwrap();

    let err = CredentialValidator::new(users)
        .validate("111111111111111", "hunter2")
        .await
        .unwrap_err();
    assert!(err.is_invalid_credentials());
}

#[tokio::test]
async fn test_duplicate_nip_rejected() {
    let app = TestApp::new().await;
    let validator = CredentialValidator::new(app.state.registry.get("users").unwrap());
    let again = NewUser {
        user_id: "u-101".to_string(),
        ..test_user()
    };
    let err = validator.create_user(&again, "other").await.unwrap_err();
    assert!(err.is_duplicate_nip());
}
