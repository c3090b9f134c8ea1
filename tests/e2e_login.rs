//! E2E tests for the authorization redirect

mod common;

use cloudgate::auth::secrets::CodeVerifier;
use common::{cookie_value, set_cookie_for, set_cookies, TestServer};

#[tokio::test]
async fn test_login_redirects_to_authorization_endpoint() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");

    assert!(location.starts_with(&format!("{}/oauth2/auth?", server.provider.addr)));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("redirect_uri=https%3A%2F%2Flogin.test.example.com%2Foauth%2Fcf%2Fcallback"));
    assert!(location.contains("code_challenge_method=S256"));
    assert!(location.contains("state="));
    // Space-joined scope set, form-encoded
    assert!(location.contains("scope=account%3Aread+user%3Aread"));
}

#[tokio::test]
async fn test_login_sets_flow_cookies_with_attributes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login"))
        .send()
        .await
        .expect("request succeeds");

    let cookies = set_cookies(&response);
    for name in ["code_verifier", "state"] {
        let header = set_cookie_for(&cookies, name)
            .unwrap_or_else(|| panic!("missing {name} cookie, got: {cookies:?}"));
        assert!(header.contains("Path=/"), "{header}");
        assert!(header.contains("Secure"), "{header}");
        assert!(header.contains("HttpOnly"), "{header}");
        assert!(header.contains("SameSite=Lax"), "{header}");
        assert!(header.contains("Max-Age=600"), "{header}");
    }
}

#[tokio::test]
async fn test_login_challenge_matches_verifier_cookie() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/login"))
        .send()
        .await
        .expect("request succeeds");

    let cookies = set_cookies(&response);
    let verifier = cookie_value(&cookies, "code_verifier").expect("code_verifier cookie");

    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    let url = url::Url::parse(location).expect("authorization URL parses");
    let challenge = url
        .query_pairs()
        .find(|(k, _)| k == "code_challenge")
        .map(|(_, v)| v.into_owned())
        .expect("code_challenge parameter");

    assert_eq!(CodeVerifier::from_value(verifier).challenge(), challenge);
}

#[tokio::test]
async fn test_consecutive_logins_use_fresh_secrets() {
    let server = TestServer::new().await;

    let mut states = Vec::new();
    let mut verifiers = Vec::new();
    for _ in 0..2 {
        let response = server
            .client
            .get(server.url("/login"))
            .send()
            .await
            .expect("request succeeds");
        let cookies = set_cookies(&response);
        states.push(cookie_value(&cookies, "state").expect("state cookie"));
        verifiers.push(cookie_value(&cookies, "code_verifier").expect("code_verifier cookie"));
    }

    assert_ne!(states[0], states[1]);
    assert_ne!(verifiers[0], verifiers[1]);
    assert_eq!(states[0].len(), 32);
}
