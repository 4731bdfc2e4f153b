//! Credential login against the target application's Identity form.
//!
//! The handshake reads the anti-forgery token from the login page, posts the
//! credentials as a url-encoded form and judges the result by the HTTP
//! response itself: the server accepted the sign-in when it redirects away
//! from the login page and issues the Identity application cookie in the same
//! response. Rendered page text is never used to decide.

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Credentials, ProbeConfig};
use crate::http::{HttpClient, PageResponse};
use crate::types::{QaError, QaResult};

/// Hidden field carrying the anti-forgery token.
pub const TOKEN_FIELD: &str = "__RequestVerificationToken";

pub const EMAIL_FIELD: &str = "Input.Email";
pub const PASSWORD_FIELD: &str = "Input.Password";
pub const REMEMBER_ME_FIELD: &str = "Input.RememberMe";

/// Cookie Identity issues on a completed sign-in. Large tickets are split
/// into `<name>C1`, `<name>C2`, ... so only the prefix is matched.
pub const AUTH_COOKIE: &str = ".AspNetCore.Identity.Application";

/// Pages Identity redirects to when a sign-in did not complete.
const SIGN_IN_FAILURE_PAGES: &[&str] = &[
    "lockout",
    "loginwith2fa",
    "loginwithrecoverycode",
    "accessdenied",
];

/// Classes the Identity UI uses for validation messages.
const ERROR_SELECTOR: &str = ".validation-summary-errors, .alert-danger, .text-danger";

/// An input located on the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormInput {
    pub name: Option<String>,
    pub id: Option<String>,
}

/// What the login page looks like.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    /// A `<form method="post">` is present.
    pub form_found: bool,
    pub email_field: Option<FormInput>,
    pub password_field: Option<FormInput>,
    /// Anti-forgery token value, when the hidden field exists.
    pub token: Option<String>,
    pub title: Option<String>,
}

/// How the server answered the credential post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// Redirected away from the login page with the auth cookie issued.
    Authenticated { location: String },
    /// The form was rendered again, usually with validation messages.
    Rejected { status: u16, errors: Vec<String> },
    /// Anything else: a redirect back to the login page, to lockout or
    /// two-factor pages, or one that issued no auth cookie.
    Unexpected {
        status: u16,
        location: Option<String>,
    },
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated { .. })
    }
}

/// Full record of one login handshake.
#[derive(Debug, Clone, Serialize)]
pub struct LoginAttempt {
    pub login_page: PageResponse,
    pub form: LoginForm,
    /// Names of the fields posted, in order.
    pub fields_sent: Vec<String>,
    pub response: PageResponse,
    pub outcome: LoginOutcome,
    /// Page reached by following the success redirect.
    pub landing: Option<PageResponse>,
}

/// Extract the anti-forgery token from a login form.
pub fn extract_verification_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    token_from(&document)
}

fn token_from(document: &Html) -> Option<String> {
    let sel = Selector::parse(&format!(r#"input[name="{TOKEN_FIELD}"]"#)).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(|s| s.to_string())
}

/// Describe the login page: form, credential inputs, token and title.
pub fn inspect_login_form(html: &str) -> LoginForm {
    let document = Html::parse_document(html);
    let form_sel = Selector::parse("form").unwrap();
    let title_sel = Selector::parse("title").unwrap();

    let form_found = document.select(&form_sel).any(|form| {
        form.value()
            .attr("method")
            .map(|m| m.eq_ignore_ascii_case("post"))
            .unwrap_or(false)
    });

    let title = document
        .select(&title_sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    LoginForm {
        form_found,
        email_field: find_input(&document, EMAIL_FIELD, "Input_Email"),
        password_field: find_input(&document, PASSWORD_FIELD, "Input_Password"),
        token: token_from(&document),
        title,
    }
}

fn find_input(document: &Html, name: &str, id: &str) -> Option<FormInput> {
    let by_name = Selector::parse(&format!(r#"input[name="{name}"]"#)).ok()?;
    let by_id = Selector::parse(&format!("input#{id}")).ok()?;

    document
        .select(&by_name)
        .next()
        .or_else(|| document.select(&by_id).next())
        .map(|el| FormInput {
            name: el.value().attr("name").map(|s| s.to_string()),
            id: el.value().attr("id").map(|s| s.to_string()),
        })
}

/// Collect non-empty validation messages from a rendered form.
pub fn validation_errors(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let sel = Selector::parse(ERROR_SELECTOR).unwrap();

    let mut errors: Vec<String> = Vec::new();
    for el in document.select(&sel) {
        let text = el
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() && !errors.contains(&text) {
            errors.push(text);
        }
    }
    errors
}

/// Perform the login handshake with the configured credentials.
///
/// The session jar inside `client` keeps the resulting auth cookie.
pub async fn login(client: &HttpClient, config: &ProbeConfig) -> QaResult<LoginAttempt> {
    require_credentials(config)?;
    let login_url = config.login_url()?;
    let login_page = client.get(login_url.as_str()).await?;
    login_with_page(client, config, login_page).await
}

/// Finish the handshake using a login page the caller already fetched
/// through `client`, so the token posted is the one the caller saw.
pub async fn login_with_page(
    client: &HttpClient,
    config: &ProbeConfig,
    login_page: PageResponse,
) -> QaResult<LoginAttempt> {
    let creds = require_credentials(config)?;
    let login_url = config.login_url()?;

    let form = inspect_login_form(&login_page.body);
    if form.token.is_none() {
        warn!("No {TOKEN_FIELD} on the login page; posting without it");
    }

    let mut fields = vec![
        (EMAIL_FIELD.to_string(), creds.email.clone()),
        (PASSWORD_FIELD.to_string(), creds.password.clone()),
        (REMEMBER_ME_FIELD.to_string(), config.remember_me.to_string()),
    ];
    if let Some(token) = &form.token {
        fields.push((TOKEN_FIELD.to_string(), token.clone()));
    }
    let fields_sent = fields.iter().map(|(k, _)| k.clone()).collect();
    let headers = vec![("Referer".to_string(), login_url.to_string())];

    let response = client
        .post_form(login_url.as_str(), &fields, &headers)
        .await?;
    let outcome = classify(&response, &login_url);
    debug!(?outcome, "login response classified");

    let landing = match &outcome {
        LoginOutcome::Authenticated { location } => {
            info!("Login accepted, following redirect to {location}");
            Some(client.get(location).await?)
        }
        _ => None,
    };

    Ok(LoginAttempt {
        login_page,
        form,
        fields_sent,
        response,
        outcome,
        landing,
    })
}

fn require_credentials(config: &ProbeConfig) -> QaResult<&Credentials> {
    config.credentials.as_ref().ok_or_else(|| {
        QaError::MissingCredentials("set --email/--password or STEELQA_EMAIL/STEELQA_PASSWORD".into())
    })
}

/// The response carries a `Set-Cookie` for the Identity application cookie.
fn issues_auth_cookie(response: &PageResponse) -> bool {
    response
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
        .filter_map(|(_, value)| value.split('=').next())
        .any(|name| name.trim().starts_with(AUTH_COOKIE))
}

fn is_sign_in_failure_page(target: &url::Url) -> bool {
    target
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|last| SIGN_IN_FAILURE_PAGES.contains(&last.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn classify(response: &PageResponse, login_url: &url::Url) -> LoginOutcome {
    if response.is_redirect() {
        let location = response.location().map(|s| s.to_string());
        let target = location.as_deref().and_then(|l| login_url.join(l).ok());
        return match (location, target) {
            (Some(_), Some(target))
                if !target.path().eq_ignore_ascii_case(login_url.path())
                    && !is_sign_in_failure_page(&target)
                    && issues_auth_cookie(response) =>
            {
                LoginOutcome::Authenticated {
                    location: target.to_string(),
                }
            }
            (location, target) => LoginOutcome::Unexpected {
                status: response.status,
                location: target.map(|t| t.to_string()).or(location),
            },
        };
    }

    if response.is_success() {
        return LoginOutcome::Rejected {
            status: response.status,
            errors: validation_errors(&response.body),
        };
    }

    LoginOutcome::Unexpected {
        status: response.status,
        location: None,
    }
}
