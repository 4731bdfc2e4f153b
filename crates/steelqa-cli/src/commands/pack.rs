//! Release packaging subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;

use steelqa::archive::pack_directory;

use super::output;

/// Source/destination pairs used for past release builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// `publish-selfcontained` → `staging-selfcontained.zip`.
    Selfcontained,
    /// `publish-fixed` → `production-fix.zip`.
    ProductionFix,
}

impl Preset {
    pub fn source(self) -> PathBuf {
        match self {
            Preset::Selfcontained => PathBuf::from("publish-selfcontained"),
            Preset::ProductionFix => PathBuf::from("publish-fixed"),
        }
    }

    pub fn output(self) -> PathBuf {
        match self {
            Preset::Selfcontained => PathBuf::from("staging-selfcontained.zip"),
            Preset::ProductionFix => PathBuf::from("production-fix.zip"),
        }
    }
}

/// Explicit paths win over the preset; the preset defaults to `selfcontained`.
pub fn resolve_paths(
    preset: Option<Preset>,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
) -> (PathBuf, PathBuf) {
    let preset = preset.unwrap_or(Preset::Selfcontained);
    (
        source.unwrap_or_else(|| preset.source()),
        output.unwrap_or_else(|| preset.output()),
    )
}

pub fn run(preset: Option<Preset>, source: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let (source, dest) = resolve_paths(preset, source, output);
    let json = output::is_json();

    if !json {
        println!("Creating {}...", dest.display());
    }

    let summary = pack_directory(&source, &dest)
        .with_context(|| format!("packaging {} into {}", source.display(), dest.display()))?;

    if json {
        output::print_json(&serde_json::json!({
            "source": summary.source,
            "destination": summary.destination,
            "entries": summary.entries.len(),
            "bytes": summary.bytes,
            "megabytes": summary.megabytes(),
        }));
    } else {
        println!(
            "Created {} ({:.2} MB)",
            summary.destination.display(),
            summary.megabytes()
        );
        println!("Files: {}", summary.entries.len());
        println!("Size: {} bytes", summary.bytes);
    }
    Ok(())
}
