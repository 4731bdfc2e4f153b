//! HTML snapshots written for manual inspection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use crate::types::QaResult;

pub const LOGIN_PAGE_SNAPSHOT: &str = "login-page-parsed.html";
pub const AFTER_LOGIN_SNAPSHOT: &str = "after-login.html";
pub const LAYOUT_SNAPSHOT: &str = "sidebar-test-output.html";

/// Prefix of the timestamped capture written by `capture`.
pub const CAPTURE_PREFIX: &str = "sidebar-page";

/// `<prefix>-YYYYmmdd-HHMMSS.html` for the given instant.
pub fn timestamped_name<Tz: TimeZone>(prefix: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}-{}.html", at.format("%Y%m%d-%H%M%S"))
}

/// Timestamped name using the local clock.
pub fn timestamped_now(prefix: &str) -> String {
    timestamped_name(prefix, &Local::now())
}

/// Write `body` to `dir/name`, creating `dir` if needed.
pub fn save_snapshot(dir: &Path, name: &str, body: &str) -> QaResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, body)?;
    debug!(path = %path.display(), bytes = body.len(), "snapshot written");
    Ok(path)
}
