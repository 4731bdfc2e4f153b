//! steelqa: QA probes and release packager for the Steel Estimation web app.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use steelqa::config::{DEFAULT_BASE_URL, DEFAULT_LOGIN_PATH, DEFAULT_TIMEOUT_SECS};
use steelqa::{resolve_output_dir, Credentials, ProbeConfig};

mod commands;

use commands::pack::Preset;

#[derive(Parser)]
#[command(
    name = "steelqa",
    about = "QA probes and release packager for the Steel Estimation web app",
    version,
    after_help = "Run 'steelqa <command> --help' for details on each command."
)]
struct Cli {
    /// Base URL of the running application.
    #[arg(long, global = true, env = "STEELQA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Path of the login form.
    #[arg(long, global = true, env = "STEELQA_LOGIN_PATH", default_value = DEFAULT_LOGIN_PATH)]
    login_path: String,

    /// Login email.
    #[arg(long, global = true, env = "STEELQA_EMAIL")]
    email: Option<String>,

    /// Login password.
    #[arg(long, global = true, env = "STEELQA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Ask the server to persist the login cookie.
    #[arg(long, global = true)]
    remember_me: bool,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Directory HTML snapshots are written to.
    /// Also reads from STEELQA_OUTPUT_DIR.
    #[arg(long, global = true)]
    output_dir: Option<String>,

    /// Output results as JSON (machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a build output directory into a zip archive.
    Pack {
        /// Named source/destination pair.
        #[arg(long, value_enum)]
        preset: Option<Preset>,
        /// Directory to package (overrides the preset).
        #[arg(long)]
        source: Option<PathBuf>,
        /// Archive to write (overrides the preset).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fetch the home page and verify the sidebar layout.
    Layout {
        /// Log in before fetching the page.
        #[arg(long)]
        login: bool,
        /// Stylesheet that must be linked. Can be repeated. Defaults to site.css.
        #[arg(long = "stylesheet")]
        stylesheets: Vec<String>,
        /// Do not write sidebar-test-output.html.
        #[arg(long)]
        no_save: bool,
    },
    /// Walk the login flow step by step and save each page.
    Login,
    /// Log in, fetch the home page and save a timestamped snapshot.
    Capture,
    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

impl Cli {
    fn probe_config(&self) -> Result<ProbeConfig> {
        let mut config = ProbeConfig::new(&self.base_url)?
            .with_login_path(self.login_path.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_output_dir(resolve_output_dir(self.output_dir.as_deref()));
        config.remember_me = self.remember_me;
        if let (Some(email), Some(password)) = (&self.email, &self.password) {
            config = config.with_credentials(Credentials::new(email.clone(), password.clone()));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.json {
        std::env::set_var(commands::output::JSON_ENV, "1");
    } else {
        std::env::remove_var(commands::output::JSON_ENV);
    }

    let result = match &cli.command {
        Commands::Pack {
            preset,
            source,
            output,
        } => commands::pack::run(*preset, source.clone(), output.clone()),
        Commands::Layout {
            login,
            stylesheets,
            no_save,
        } => {
            let mut config = cli.probe_config()?;
            if !stylesheets.is_empty() {
                config.expectations.stylesheets = stylesheets.clone();
            }
            commands::layout::run(&config, *login, !*no_save).await
        }
        Commands::Login => commands::login::run(&cli.probe_config()?).await,
        Commands::Capture => commands::capture::run(&cli.probe_config()?).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "steelqa", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result {
        if commands::output::is_json() {
            commands::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
