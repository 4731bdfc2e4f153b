//! Sidebar layout verification against the running application.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use steelqa::layout::check_layout;
use steelqa::login::login;
use steelqa::report::write_layout;
use steelqa::snapshot::{save_snapshot, LAYOUT_SNAPSHOT};
use steelqa::{HttpClient, LayoutReport, LoginOutcome, ProbeConfig, QaError, QaResult};

use super::output;

#[derive(Serialize)]
struct LayoutRun {
    url: String,
    status: u16,
    login: Option<LoginOutcome>,
    report: LayoutReport,
    snapshot: Option<String>,
    /// Why the snapshot could not be written. The report is still valid.
    snapshot_error: Option<String>,
    #[serde(skip)]
    body: String,
}

/// Fetch `/`, run the checklist and print it.
///
/// Connection problems are printed, not returned; the run still exits 0.
pub async fn run(config: &ProbeConfig, with_login: bool, save: bool) -> Result<()> {
    let json = output::is_json();
    if !json {
        output::banner(&format!("SIDEBAR LAYOUT TEST - {}", config.base_url));
    }

    let mut run = match probe(config, with_login).await {
        Ok(run) => run,
        Err(e) => {
            report_error(config, &e);
            return Ok(());
        }
    };

    if json {
        if save {
            save_page(config, &mut run);
        }
        output::print_json(&run);
        return Ok(());
    }

    print_run(&run)?;
    if save {
        save_page(config, &mut run);
        match (&run.snapshot, &run.snapshot_error) {
            (Some(path), _) => println!("\nHTML saved to {path} for manual inspection"),
            (None, Some(e)) => println!("\n⚠️  Could not save HTML: {e}"),
            (None, None) => {}
        }
    }
    Ok(())
}

async fn probe(config: &ProbeConfig, with_login: bool) -> QaResult<LayoutRun> {
    let client = HttpClient::new(config)?;

    let login_outcome = if with_login {
        let attempt = login(&client, config).await?;
        if !attempt.outcome.is_authenticated() {
            tracing::warn!(outcome = ?attempt.outcome, "login did not succeed; checking anonymous page");
        }
        Some(attempt.outcome)
    } else {
        None
    };

    let page = client.get_ok("/").await?;
    let report = check_layout(&page.body, &config.expectations);

    Ok(LayoutRun {
        url: page.final_url,
        status: page.status,
        login: login_outcome,
        report,
        snapshot: None,
        snapshot_error: None,
        body: page.body,
    })
}

fn save_page(config: &ProbeConfig, run: &mut LayoutRun) {
    match save_snapshot(&config.output_dir, LAYOUT_SNAPSHOT, &run.body) {
        Ok(path) => run.snapshot = Some(path.display().to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "snapshot not written");
            run.snapshot_error = Some(e.to_string());
        }
    }
}

fn print_run(run: &LayoutRun) -> Result<()> {
    println!("\n✓ Successfully connected to application");
    println!("  Status Code: {}", run.status);
    if let Some(outcome) = &run.login {
        match outcome {
            LoginOutcome::Authenticated { location } => {
                println!("  Logged in (redirected to {location})")
            }
            other => println!("  Login did not succeed: {other:?}"),
        }
    }

    let mut stdout = io::stdout().lock();
    write_layout(&mut stdout, &run.report)?;
    Ok(())
}

/// Print a caught failure the way the probes report it.
pub fn report_error(config: &ProbeConfig, e: &QaError) {
    if output::is_json() {
        output::print_json(&serde_json::json!({
            "error": true,
            "network": e.is_network(),
            "message": e.to_string(),
        }));
    } else if let Err(io_err) = write_error(&mut io::stdout().lock(), config, e) {
        tracing::error!(error = %io_err, "cannot write to stdout");
    }
}

fn write_error<W: Write>(out: &mut W, config: &ProbeConfig, e: &QaError) -> io::Result<()> {
    if e.is_network() {
        writeln!(out, "\n❌ Error connecting to application: {e}")?;
        writeln!(out, "Make sure the application is running on {}", config.base_url)
    } else {
        writeln!(out, "\n❌ Unexpected error: {e}")
    }
}
