//! Authenticated home-page capture.

use anyhow::Result;
use serde::Serialize;

use steelqa::layout::{check_layout, count_nav_links};
use steelqa::login::login;
use steelqa::snapshot::{save_snapshot, timestamped_now, CAPTURE_PREFIX};
use steelqa::{HttpClient, LoginOutcome, ProbeConfig, QaResult};

use super::layout::report_error;
use super::output;

#[derive(Serialize)]
struct Capture {
    login: Option<LoginOutcome>,
    status: u16,
    snapshot: Option<String>,
    snapshot_error: Option<String>,
    sidebar_found: bool,
    nav_links: usize,
    logo_src: Option<String>,
}

pub async fn run(config: &ProbeConfig) -> Result<()> {
    match capture(config).await {
        Ok(capture) if output::is_json() => output::print_json(&capture),
        Ok(capture) => print_capture(&capture),
        Err(e) => report_error(config, &e),
    }
    Ok(())
}

async fn capture(config: &ProbeConfig) -> QaResult<Capture> {
    let json = output::is_json();
    let client = HttpClient::new(config)?;

    let login_outcome = if config.credentials.is_some() {
        if !json {
            println!("Attempting to login...");
        }
        Some(login(&client, config).await?.outcome)
    } else {
        if !json {
            println!("No credentials configured; capturing the anonymous page");
        }
        None
    };

    let page = client.get("/").await?;
    let report = check_layout(&page.body, &config.expectations);

    let name = timestamped_now(CAPTURE_PREFIX);
    let (snapshot, snapshot_error) = match save_snapshot(&config.output_dir, &name, &page.body) {
        Ok(path) => {
            if !json {
                println!("Page HTML saved to {}", path.display());
            }
            (Some(path.display().to_string()), None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "snapshot not written");
            (None, Some(e.to_string()))
        }
    };

    Ok(Capture {
        login: login_outcome,
        status: page.status,
        snapshot,
        snapshot_error,
        sidebar_found: report.sidebar.is_some(),
        nav_links: count_nav_links(&page.body),
        logo_src: report.logo.map(|l| l.src),
    })
}

fn print_capture(capture: &Capture) {
    match &capture.login {
        Some(LoginOutcome::Authenticated { location }) => println!("Logged in (redirected to {location})"),
        Some(other) => println!("Login did not succeed: {other:?}"),
        None => {}
    }

    if capture.sidebar_found {
        println!("\nSidebar found in HTML!");
        println!("Found {} navigation links", capture.nav_links);
        if let Some(src) = &capture.logo_src {
            println!("Logo reference found: {src}");
        }
    } else {
        println!("\nNo sidebar found in HTML response");
    }

    match (&capture.snapshot, &capture.snapshot_error) {
        (Some(path), _) => println!(
            "\nHTML content saved. You can open {path} in a browser to view the page."
        ),
        (None, Some(e)) => println!("\n⚠️  Could not save HTML: {e}"),
        (None, None) => {}
    }
}
