//! Site configuration and build for the folio site.
//!
//! Reads `folio.toml`, copies passthrough assets into the output directory
//! and records what the template stage will consume in a build manifest.

pub mod builder;
pub mod config;

pub use builder::{
    BuildError, BuildReport, PassthroughCopy, PassthroughKind, SiteBuilder, TemplateEntry,
    MANIFEST_FILE,
};
pub use config::{
    AssetsConfig, ConfigError, DirsConfig, SiteConfig, TemplateFormat, TemplatesConfig,
    DEFAULT_CONFIG,
};
