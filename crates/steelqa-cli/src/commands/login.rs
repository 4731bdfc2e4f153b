//! Step-by-step login probe.
//!
//! 1. main page reachability, 2. login form inspection, 3. credential post,
//! 4. session cookies. Each step reports its own failure and the probe moves on.

use anyhow::Result;
use serde::Serialize;

use steelqa::login::{inspect_login_form, login, login_with_page, LoginAttempt, LoginForm};
use steelqa::report::preview;
use steelqa::snapshot::{save_snapshot, AFTER_LOGIN_SNAPSHOT, LOGIN_PAGE_SNAPSHOT};
use steelqa::{HttpClient, LoginOutcome, PageResponse, ProbeConfig, QaResult};

use super::output;

const PREVIEW_CHARS: usize = 20;

#[derive(Serialize, Default)]
struct LoginProbe {
    main_status: Option<u16>,
    main_bytes: Option<usize>,
    form: Option<LoginForm>,
    outcome: Option<LoginOutcome>,
    cookies: Vec<String>,
    errors: Vec<String>,
}

pub async fn run(config: &ProbeConfig) -> Result<()> {
    let json = output::is_json();
    let mut probe = LoginProbe::default();
    let say = |line: String| {
        if !json {
            println!("{line}");
        }
    };

    say("Testing Steel Estimation Platform UI\n".to_string());
    let client = HttpClient::new(config)?;

    say("1. Testing connection to application...".to_string());
    match client.get("/").await {
        Ok(page) => {
            say(format!("   - Main page status: {}", page.status));
            say(format!("   - Response size: {} bytes", page.len()));
            probe.main_status = Some(page.status);
            probe.main_bytes = Some(page.len());
        }
        Err(e) => {
            say(format!("   - Error connecting to {}: {e}", config.base_url));
            probe.errors.push(e.to_string());
        }
    }

    say("\n2. Accessing login page...".to_string());
    let login_page = match client.get(&config.login_path).await {
        Ok(page) => {
            let (form, lines) = inspect_login_page(config, &page);
            lines.into_iter().for_each(&say);
            probe.form = Some(form);
            Some(page)
        }
        Err(e) => {
            say(format!("   - Error accessing login page: {e}"));
            probe.errors.push(e.to_string());
            None
        }
    };

    say("\n3. Attempting login...".to_string());
    match attempt_login(&client, config, login_page).await {
        Ok((attempt, lines)) => {
            lines.into_iter().for_each(&say);
            probe.outcome = Some(attempt.outcome);
        }
        Err(e) => {
            say(format!("   - Error during login: {e}"));
            probe.errors.push(e.to_string());
        }
    }

    say("\n4. Session cookies:".to_string());
    for (name, value) in client.cookies() {
        say(format!("   - {name}: {}", preview(&value, PREVIEW_CHARS)));
        probe.cookies.push(name);
    }

    if json {
        output::print_json(&probe);
    } else {
        println!("\n=== Test Summary ===");
        println!("Check the saved HTML files for more details:");
        println!("- {LOGIN_PAGE_SNAPSHOT}: The login page");
        println!("- {AFTER_LOGIN_SNAPSHOT}: The page after login attempt");
    }
    Ok(())
}

fn inspect_login_page(config: &ProbeConfig, page: &PageResponse) -> (LoginForm, Vec<String>) {
    let form = inspect_login_form(&page.body);
    let mut lines = vec![
        format!("   - Login page status: {}", page.status),
        format!("   - URL: {}", page.final_url),
    ];

    if !form.form_found {
        lines.push("   - No login form found".to_string());
        lines.push(format!(
            "   - Page title: {}",
            form.title.as_deref().unwrap_or("No title")
        ));
        return (form, lines);
    }

    lines.push("   - Login form found".to_string());
    for (label, field) in [("Email", &form.email_field), ("Password", &form.password_field)] {
        if let Some(input) = field {
            lines.push(format!(
                "   - {label} input found: name='{}', id='{}'",
                input.name.as_deref().unwrap_or("N/A"),
                input.id.as_deref().unwrap_or("N/A")
            ));
        }
    }
    match &form.token {
        Some(token) if !token.is_empty() => {
            lines.push(format!("   - CSRF token found: {}", preview(token, PREVIEW_CHARS)))
        }
        Some(_) => lines.push("   - No CSRF token value".to_string()),
        None => {}
    }

    lines.push(save_line(config, LOGIN_PAGE_SNAPSHOT, &page.body, "Login page"));
    (form, lines)
}

/// Reuses the page from step 2 when there is one, so the token shown there is
/// the token posted.
async fn attempt_login(
    client: &HttpClient,
    config: &ProbeConfig,
    login_page: Option<PageResponse>,
) -> QaResult<(LoginAttempt, Vec<String>)> {
    let attempt = match login_page {
        Some(page) => login_with_page(client, config, page).await?,
        None => login(client, config).await?,
    };
    let mut lines = vec![
        format!("   - Posting to: {}", attempt.response.url),
        format!("   - Data fields: {:?}", attempt.fields_sent),
        format!("   - Login response status: {}", attempt.response.status),
    ];
    if let Some(location) = attempt.response.location() {
        lines.push(format!("   - Redirect to: {location}"));
    }

    match &attempt.outcome {
        LoginOutcome::Authenticated { .. } => {
            if let Some(landing) = &attempt.landing {
                lines.push(format!("   - Final page status: {}", landing.status));
                lines.push(format!("   - Final URL: {}", landing.final_url));
            }
            lines.push("   - Login succeeded (redirected away from the login page)".to_string());
        }
        LoginOutcome::Rejected { status, errors } => {
            lines.push(format!("   - Login rejected (form re-rendered with {status})"));
            if !errors.is_empty() {
                lines.push("   - Error messages found:".to_string());
                lines.extend(errors.iter().map(|e| format!("     * {e}")));
            }
        }
        LoginOutcome::Unexpected { status, location } => {
            lines.push(format!(
                "   - Login outcome unclear: status {status}, location {}",
                location.as_deref().unwrap_or("none")
            ));
        }
    }

    let body = attempt
        .landing
        .as_ref()
        .map(|p| p.body.as_str())
        .unwrap_or(attempt.response.body.as_str());
    lines.push(save_line(config, AFTER_LOGIN_SNAPSHOT, body, "Response"));

    Ok((attempt, lines))
}

/// Write a snapshot and describe the result. A failed write never hides the
/// step's other findings.
fn save_line(config: &ProbeConfig, name: &str, body: &str, what: &str) -> String {
    match save_snapshot(&config.output_dir, name, body) {
        Ok(path) => format!("   - {what} saved to {}", path.display()),
        Err(e) => format!("   - Could not save {name}: {e}"),
    }
}
