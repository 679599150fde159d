//! Token acquisition against a loopback identity provider.
//!
//! These go through the real `OAuthClient`, `DeviceFlow` and
//! `PublicClientApp` so provider replies are parsed exactly as in a run.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::{Duration, Utc};
use common::{StubProvider, device_code, refusal, token};
use welcomer_core::{Error, acquire_token};
use welcomer_oauth::{
    CachedAccount, DeviceAuthorization, OAuthClient, Provider, PublicClientApp, Token, TokenCache,
};

fn client(stub: &StubProvider) -> OAuthClient {
    OAuthClient::new("app-1", Provider::from_authority(&stub.authority).unwrap())
}

fn scopes() -> Vec<String> {
    vec!["https://graph.microsoft.com/Mail.Send".to_string()]
}

fn pending_authorization() -> DeviceAuthorization {
    serde_json::from_str(&device_code().1).unwrap()
}

fn stale_account() -> CachedAccount {
    CachedAccount {
        username: "ops@contoso.com".into(),
        home_account_id: "o-1.t-1".into(),
        token: Token::new("stale", "Bearer")
            .with_refresh_token("rt-1")
            .with_expires_at(Utc::now() - Duration::minutes(5)),
    }
}

#[tokio::test]
async fn declined_sign_in_reports_provider_fields() {
    let stub = StubProvider::start(vec![
        device_code(),
        refusal(
            "authorization_declined",
            "AADSTS70000: user declined",
            "corr-9",
        ),
    ])
    .await;
    let mut cache = TokenCache::default();
    let mut prompted = None;

    let err = {
        let mut app = PublicClientApp::new(client(&stub), &mut cache);
        acquire_token(&mut app, &scopes(), None, |auth| {
            prompted = Some(auth.message());
        })
        .await
        .unwrap_err()
    };

    match err {
        Error::AuthFailed {
            error,
            description,
            correlation_id,
        } => {
            assert_eq!(error, "authorization_declined");
            assert_eq!(description, "AADSTS70000: user declined");
            assert_eq!(correlation_id.as_deref(), Some("corr-9"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(prompted.as_deref(), Some("To sign in, enter ABCD-1234"));
    assert!(!cache.has_state_changed());

    let requests = stub.requests().await;
    assert!(requests[0].contains("client_id=app-1"));
    assert!(requests[1].contains("device_code=dc-1"));
}

#[tokio::test]
async fn provider_expiry_keeps_correlation_id() {
    let stub = StubProvider::start(vec![refusal(
        "expired_token",
        "AADSTS70020: code expired",
        "corr-10",
    )])
    .await;
    let mut cache = TokenCache::default();

    let result = PublicClientApp::new(client(&stub), &mut cache)
        .acquire_token_by_device_flow(&pending_authorization())
        .await;

    let err = Error::from(result.unwrap_err());
    assert_eq!(
        err.to_string(),
        "Authentication failed: expired_token - AADSTS70020: code expired (correlation id: corr-10)"
    );
    assert!(cache.is_empty());
}

#[tokio::test]
async fn pending_then_granted_caches_the_account() {
    let stub = StubProvider::start(vec![
        refusal("authorization_pending", "AADSTS70016: pending", "corr-11"),
        token("at-1", Some("rt-1")),
    ])
    .await;
    let mut cache = TokenCache::default();

    let granted = PublicClientApp::new(client(&stub), &mut cache)
        .acquire_token_by_device_flow(&pending_authorization())
        .await
        .unwrap();

    assert_eq!(granted.access_token, "at-1");
    assert!(cache.has_state_changed());
    assert_eq!(cache.accounts()[0].username, "ops@contoso.com");
    assert_eq!(cache.accounts()[0].home_account_id, "o-1.t-1");

    let requests = stub.requests().await;
    assert_eq!(requests.len(), 2);
    for body in &requests {
        assert!(body.contains("device_code=dc-1"));
        assert!(!body.contains("client_secret"));
    }
}

#[tokio::test]
async fn rejected_refresh_is_a_silent_miss() {
    let stub = StubProvider::start(vec![refusal(
        "invalid_grant",
        "AADSTS70008: refresh token expired",
        "corr-12",
    )])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut cache = TokenCache::default();
    cache.upsert(stale_account());
    cache.save(&dir.path().join("token_cache.json")).unwrap();
    let account = cache.accounts()[0].clone();

    let silent = PublicClientApp::new(client(&stub), &mut cache)
        .acquire_token_silent(&scopes(), &account)
        .await
        .unwrap();

    assert!(silent.is_none());
    assert!(!cache.has_state_changed());
    assert_eq!(cache.accounts()[0].token.access_token, "stale");

    let requests = stub.requests().await;
    assert!(requests[0].contains("grant_type=refresh_token"));
    assert!(requests[0].contains("refresh_token=rt-1"));
    assert!(requests[0].contains("offline_access"));
}

#[tokio::test]
async fn refresh_updates_the_cache() {
    let stub = StubProvider::start(vec![token("at-2", None)]).await;
    let mut cache = TokenCache::default();
    cache.upsert(stale_account());
    let account = cache.accounts()[0].clone();

    let refreshed = PublicClientApp::new(client(&stub), &mut cache)
        .acquire_token_silent(&scopes(), &account)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(refreshed.access_token, "at-2");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(cache.accounts()[0].token, refreshed);
    assert!(cache.has_state_changed());
    stub.requests().await;
}
