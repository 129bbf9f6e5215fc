//! Site build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_static::SiteBuilder;

use super::load_config;

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building site...");

    let mut config = load_config(config_path)?;
    if let Some(output) = output {
        config.set_output_dir(output);
    }

    let report = SiteBuilder::new(config)
        .build()
        .await
        .context("Build failed")?;

    for skipped in report.skipped() {
        tracing::warn!("Skipped missing passthrough {}", skipped.source);
    }

    tracing::info!(
        "Copied {} files and found {} templates in {}ms",
        report.files_copied,
        report.templates.len(),
        report.duration_ms
    );

    tracing::info!("Output: {}", report.output_dir.display());

    Ok(())
}
