//! steelqa: release packaging and page-structure probes for the Steel Estimation web app.

pub mod archive;
pub mod config;
pub mod http;
pub mod layout;
pub mod login;
pub mod report;
pub mod snapshot;
pub mod types;

pub use archive::{build_manifest, pack_directory, ArchiveSummary, ManifestEntry};
pub use config::{resolve_output_dir, Credentials, LayoutExpectations, ProbeConfig};
pub use http::{HttpClient, PageResponse};
pub use layout::{check_layout, LayoutReport};
pub use login::{extract_verification_token, inspect_login_form, login, login_with_page, LoginForm, LoginOutcome};
pub use snapshot::{save_snapshot, timestamped_name, timestamped_now};
pub use types::*;
