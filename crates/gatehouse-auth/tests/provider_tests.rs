//! Tests for the HTTP provider client against mock provider endpoints.
//!
//! wiremock stands in for the provider's token and profile endpoints so the
//! code exchange and the profile mapping are exercised over real HTTP.

use gatehouse_auth::{
    AuthError, HttpProviderClient, OAuthProvider, OAuthProviderClient, OAuthState,
    ProviderDescriptor,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, provider: OAuthProvider, userinfo_path: &str) -> HttpProviderClient {
    let descriptor = ProviderDescriptor::new(provider, "client-id", "client-secret", "http://localhost:3000")
        .with_endpoints(
            format!("{}/authorize", server.uri()),
            format!("{}/token", server.uri()),
            format!("{}{}", server.uri(), userinfo_path),
        );
    HttpProviderClient::new(descriptor).unwrap()
}

#[tokio::test]
async fn test_authorization_url_carries_state_and_pkce() {
    let server = MockServer::start().await;
    let client = client_for(&server, OAuthProvider::Google, "/userinfo");
    let state = OAuthState::with_pkce("google");

    let url = client.authorization_url(&state).unwrap();

    assert!(url.starts_with(&format!("{}/authorize?", server.uri())));
    assert!(url.contains(&format!("state={}", state.state)));
    assert!(url.contains(&format!("code_challenge={}", state.code_challenge().unwrap())));
    assert!(url.contains("code_challenge_method=S256"));
    assert!(url.contains("client_id=client-id"));
    assert!(url.contains("scope=profile+email"));
}

#[tokio::test]
async fn test_exchange_code_returns_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "gho_access",
            "token_type": "bearer",
            "scope": "user:email"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, OAuthProvider::GitHub, "/user");
    let state = OAuthState::with_pkce("github");

    let token = client.exchange_code("auth-code", &state).await.unwrap();
    assert_eq!(token, "gho_access");
}

#[tokio::test]
async fn test_exchange_code_failure_is_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, OAuthProvider::GitHub, "/user");
    let err = client
        .exchange_code("stale-code", &OAuthState::new("github"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::OAuthError(_)));
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_google_profile_keeps_verified_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer ya29.token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "110169484474386276334",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "email_verified": true
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, OAuthProvider::Google, "/userinfo");
    let profile = client.fetch_profile("ya29.token").await.unwrap();

    assert_eq!(profile.provider, "google");
    assert_eq!(profile.subject_id, "110169484474386276334");
    assert_eq!(profile.display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(profile.emails, vec!["ada@example.com".to_string()]);
}

#[tokio::test]
async fn test_google_profile_drops_unverified_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "42",
            "email": "someone@example.com",
            "email_verified": false
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, OAuthProvider::Google, "/userinfo");
    let profile = client.fetch_profile("token").await.unwrap();

    assert!(profile.emails.is_empty());
    assert!(profile.display_name.is_none());
}

#[tokio::test]
async fn test_github_profile_orders_verified_emails_primary_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 583231,
            "login": "octocat",
            "name": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "email": "old@example.com", "primary": false, "verified": true },
            { "email": "unverified@example.com", "primary": false, "verified": false },
            { "email": "octocat@github.com", "primary": true, "verified": true }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server, OAuthProvider::GitHub, "/user");
    let profile = client.fetch_profile("gho_access").await.unwrap();

    assert_eq!(profile.provider, "github");
    assert_eq!(profile.subject_id, "583231");
    assert_eq!(profile.display_name.as_deref(), Some("octocat"));
    assert_eq!(
        profile.emails,
        vec!["octocat@github.com".to_string(), "old@example.com".to_string()]
    );
}

#[tokio::test]
async fn test_profile_endpoint_error_is_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Bad credentials"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, OAuthProvider::GitHub, "/user");
    let err = client.fetch_profile("revoked").await.unwrap_err();

    assert!(matches!(err, AuthError::OAuthError(_)));
}

#[test]
fn test_custom_provider_without_endpoints_fails_at_construction() {
    let descriptor =
        ProviderDescriptor::new(OAuthProvider::Custom, "id", "secret", "http://localhost:3000");
    let err = HttpProviderClient::new(descriptor).unwrap_err();

    assert!(matches!(err, AuthError::ConfigError(_)));
}
