//! Login handshake against a mocked Identity endpoint.

use steelqa::login::{login, login_with_page, LoginOutcome, AUTH_COOKIE, TOKEN_FIELD};
use steelqa::{Credentials, HttpClient, ProbeConfig, QaError};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ─────────────────────── helpers ───────────────────────

const LOGIN_FORM: &str = r#"
<html><head><title>Log in</title></head><body>
<form id="account" method="post">
    <input id="Input_Email" name="Input.Email" type="email" />
    <input id="Input_Password" name="Input.Password" type="password" />
    <input name="__RequestVerificationToken" type="hidden" value="abc123" />
</form>
</body></html>
"#;

fn config(server: &MockServer) -> ProbeConfig {
    ProbeConfig::new(&server.uri())
        .unwrap()
        .with_credentials(Credentials::new("admin@example.com", "Admin@123"))
}

async fn mount_login_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/Account/Login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", ".AspNetCore.Antiforgery=anti; path=/")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_redirect_after_post_authenticates() {
    let server = MockServer::start().await;
    mount_login_page(&server, LOGIN_FORM).await;

    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .and(body_string_contains("Input.Email=admin%40example.com"))
        .and(body_string_contains("__RequestVerificationToken=abc123"))
        .and(body_string_contains("Input.RememberMe=false"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .insert_header(
                    "set-cookie",
                    ".AspNetCore.Identity.Application=session; path=/",
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<main>dashboard</main>"))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = HttpClient::new(&config).unwrap();
    let attempt = login(&client, &config).await.unwrap();

    assert_eq!(
        attempt.outcome,
        LoginOutcome::Authenticated {
            location: format!("{}/", server.uri())
        }
    );
    assert_eq!(attempt.form.token.as_deref(), Some("abc123"));
    assert!(attempt.fields_sent.contains(&TOKEN_FIELD.to_string()));
    let landing = attempt.landing.unwrap();
    assert_eq!(landing.status, 200);
    assert!(landing.body.contains("dashboard"));

    let cookies = client.cookies();
    assert!(cookies
        .iter()
        .any(|(name, value)| name == ".AspNetCore.Identity.Application" && value == "session"));
}

#[tokio::test]
async fn test_rerendered_form_is_rejected_with_errors() {
    let server = MockServer::start().await;
    mount_login_page(&server, LOGIN_FORM).await;

    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="validation-summary-errors"><ul><li>Invalid login attempt.</li></ul></div>"#,
        ))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = HttpClient::new(&config).unwrap();
    let attempt = login(&client, &config).await.unwrap();

    assert_eq!(
        attempt.outcome,
        LoginOutcome::Rejected {
            status: 200,
            errors: vec!["Invalid login attempt.".to_string()],
        }
    );
    assert!(attempt.landing.is_none());
}

#[tokio::test]
async fn test_missing_token_posts_without_it() {
    let server = MockServer::start().await;
    mount_login_page(&server, r#"<form method="post"><input name="Input.Email"></form>"#).await;

    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = HttpClient::new(&config).unwrap();
    let attempt = login(&client, &config).await.unwrap();

    assert_eq!(
        attempt.outcome,
        LoginOutcome::Unexpected {
            status: 400,
            location: None
        }
    );
    assert!(!attempt.fields_sent.contains(&TOKEN_FIELD.to_string()));

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body = String::from_utf8_lossy(&post.body);
    assert!(!body.contains(TOKEN_FIELD));
}

#[tokio::test]
async fn test_redirect_back_to_login_is_not_success() {
    let server = MockServer::start().await;
    mount_login_page(&server, LOGIN_FORM).await;

    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/Account/Login?ReturnUrl=%2F"),
        )
        .mount(&server)
        .await;

    let config = config(&server);
    let client = HttpClient::new(&config).unwrap();
    let attempt = login(&client, &config).await.unwrap();

    assert!(!attempt.outcome.is_authenticated());
    assert!(attempt.landing.is_none());
}

#[tokio::test]
async fn test_missing_credentials_fails_before_any_request() {
    let server = MockServer::start().await;
    let config = ProbeConfig::new(&server.uri()).unwrap();
    let client = HttpClient::new(&config).unwrap();

    let err = login(&client, &config).await.unwrap_err();
    assert!(matches!(err, QaError::MissingCredentials(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_redirect_without_auth_cookie_is_not_success() {
    let server = MockServer::start().await;
    mount_login_page(&server, LOGIN_FORM).await;

    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "./Lockout"))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = HttpClient::new(&config).unwrap();
    let attempt = login(&client, &config).await.unwrap();

    assert_eq!(
        attempt.outcome,
        LoginOutcome::Unexpected {
            status: 302,
            location: Some(format!("{}/Account/Lockout", server.uri())),
        }
    );
    assert!(attempt.landing.is_none());
    assert!(!client.cookies().iter().any(|(name, _)| name == AUTH_COOKIE));
}

#[tokio::test]
async fn test_login_with_page_posts_the_token_already_seen() {
    let server = MockServer::start().await;
    mount_login_page(&server, LOGIN_FORM).await;

    Mock::given(method("POST"))
        .and(path("/Account/Login"))
        .and(body_string_contains("__RequestVerificationToken=abc123"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .insert_header("set-cookie", ".AspNetCore.Identity.Application=session; path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<main>home</main>"))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = HttpClient::new(&config).unwrap();
    let page = client.get("/Account/Login").await.unwrap();
    let attempt = login_with_page(&client, &config, page).await.unwrap();

    assert!(attempt.outcome.is_authenticated());
    let requests = server.received_requests().await.unwrap();
    let login_gets = requests
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == "/Account/Login")
        .count();
    assert_eq!(login_gets, 1);
}
