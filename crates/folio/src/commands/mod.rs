pub mod build;
pub mod check;
pub mod dev;
pub mod init;
pub mod serve;

use std::path::Path;

use anyhow::{Context, Result};
use folio_static::SiteConfig;

/// Load and validate `folio.toml`, or defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<SiteConfig> {
    let config = SiteConfig::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}
