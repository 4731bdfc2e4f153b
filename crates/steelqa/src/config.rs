//! Probe configuration and resolution.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::types::{QaError, QaResult};

/// Default address of a locally running instance.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default login form path.
pub const DEFAULT_LOGIN_PATH: &str = "/Account/Login";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Login identity submitted to the form.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the page-structure checker expects to find.
#[derive(Debug, Clone)]
pub struct LayoutExpectations {
    /// Fragments matched against `img[src]` to locate the logo.
    pub logo_fragments: Vec<String>,
    /// Each entry must appear in at least one stylesheet `href`.
    pub stylesheets: Vec<String>,
}

impl Default for LayoutExpectations {
    fn default() -> Self {
        Self {
            logo_fragments: vec![
                "f_symbol".to_string(),
                "fabos".to_string(),
                "logo".to_string(),
            ],
            stylesheets: vec!["site.css".to_string()],
        }
    }
}

/// Everything a probe run needs to reach the target application.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub base_url: Url,
    pub login_path: String,
    pub credentials: Option<Credentials>,
    pub remember_me: bool,
    pub timeout: Duration,
    pub output_dir: PathBuf,
    pub expectations: LayoutExpectations,
}

impl ProbeConfig {
    /// Build a config for `base_url` with defaults for everything else.
    pub fn new(base_url: &str) -> QaResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| QaError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            credentials: None,
            remember_me: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            output_dir: PathBuf::from("."),
            expectations: LayoutExpectations::default(),
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Resolve `path` against the base URL.
    pub fn url_for(&self, path: &str) -> QaResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| QaError::InvalidUrl(format!("{path}: {e}")))
    }

    pub fn login_url(&self) -> QaResult<Url> {
        self.url_for(&self.login_path)
    }
}

/// Resolve the directory snapshots are written to.
///
/// Order: explicit value, then `STEELQA_OUTPUT_DIR`, then the current directory.
pub fn resolve_output_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }

    if let Ok(env_dir) = std::env::var("STEELQA_OUTPUT_DIR") {
        if !env_dir.is_empty() {
            return PathBuf::from(env_dir);
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_absolute_paths() {
        let config = ProbeConfig::new("http://localhost:8080").unwrap();
        assert_eq!(
            config.url_for("/Identity/Account/Login").unwrap().as_str(),
            "http://localhost:8080/Identity/Account/Login"
        );
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "http://localhost:8080/Account/Login"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ProbeConfig::new("not a url"),
            Err(QaError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("admin@example.com", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("admin@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_explicit_output_dir_wins() {
        assert_eq!(resolve_output_dir(Some("out")), PathBuf::from("out"));
    }
}
