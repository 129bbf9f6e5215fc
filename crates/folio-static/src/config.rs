//! Site configuration (`folio.toml`).

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use folio_behavior::Settings;
use serde::{Deserialize, Serialize};

/// The configuration written by `folio init`.
pub const DEFAULT_CONFIG: &str = r#"# folio configuration

[dirs]
# Template sources
input = "src"

# Built site
output = "_site"

# Relative to the input directory
includes = "_includes"
layouts = "_layouts"
data = "_data"

[templates]
formats = ["njk", "html", "md"]
html_engine = "njk"
markdown_engine = "njk"

[assets]
# Copied into the output directory unmodified
passthrough = ["assets", "images", "files", "papers", "code", "fonts", "CNAME"]

# Extra paths that trigger a reload in `folio dev`
watch = ["./assets/css/"]

[behavior]
site_title = "Ivan Li"
scroll_offset = 80
desktop_breakpoint = 980
"#;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A template language the site accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Njk,
    Html,
    Md,
}

impl TemplateFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Njk => "njk",
            Self::Html => "html",
            Self::Md => "md",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "njk" => Some(Self::Njk),
            "html" => Some(Self::Html),
            "md" => Some(Self::Md),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirsConfig {
    #[serde(default = "default_input")]
    pub input: String,

    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_includes")]
    pub includes: String,

    #[serde(default = "default_layouts")]
    pub layouts: String,

    #[serde(default = "default_data")]
    pub data: String,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            includes: default_includes(),
            layouts: default_layouts(),
            data: default_data(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_formats")]
    pub formats: Vec<TemplateFormat>,

    /// Engine that pre-processes `.html` templates
    #[serde(default = "default_engine")]
    pub html_engine: TemplateFormat,

    /// Engine that pre-processes `.md` templates
    #[serde(default = "default_engine")]
    pub markdown_engine: TemplateFormat,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            html_engine: default_engine(),
            markdown_engine: default_engine(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Files and directories copied to the output unmodified
    #[serde(default = "default_passthrough")]
    pub passthrough: Vec<String>,

    /// Additional paths watched by the dev server
    #[serde(default = "default_watch")]
    pub watch: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            passthrough: default_passthrough(),
            watch: default_watch(),
        }
    }
}

fn default_input() -> String {
    "src".to_string()
}

fn default_output() -> String {
    "_site".to_string()
}

fn default_includes() -> String {
    "_includes".to_string()
}

fn default_layouts() -> String {
    "_layouts".to_string()
}

fn default_data() -> String {
    "_data".to_string()
}

fn default_formats() -> Vec<TemplateFormat> {
    vec![TemplateFormat::Njk, TemplateFormat::Html, TemplateFormat::Md]
}

fn default_engine() -> TemplateFormat {
    TemplateFormat::Njk
}

fn default_passthrough() -> Vec<String> {
    ["assets", "images", "files", "papers", "code", "fonts", "CNAME"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_watch() -> Vec<String> {
    vec!["./assets/css/".to_string()]
}

/// Everything `folio.toml` configures.
///
/// Relative paths resolve against the directory holding the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub dirs: DirsConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub behavior: Settings,

    #[serde(skip)]
    root: PathBuf,
}

impl SiteConfig {
    /// Load `path`, falling back to defaults when it does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let root = fs::canonicalize(&root).unwrap_or(root);

        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default().with_root(root));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config.with_root(root))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check the configuration for settings that cannot build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dirs = [
            ("input", &self.dirs.input),
            ("output", &self.dirs.output),
            ("includes", &self.dirs.includes),
            ("layouts", &self.dirs.layouts),
            ("data", &self.dirs.data),
        ];
        for (name, dir) in dirs {
            if normalize(dir).is_empty() {
                return Err(ConfigError::Invalid(format!("dirs.{name} must not be empty")));
            }
        }

        let output = normalize(&self.dirs.output);
        if output == normalize(&self.dirs.input) {
            return Err(ConfigError::Invalid(
                "dirs.output must differ from dirs.input".to_string(),
            ));
        }

        if self.templates.formats.is_empty() {
            return Err(ConfigError::Invalid(
                "templates.formats must list at least one format".to_string(),
            ));
        }
        let mut formats = HashSet::new();
        for format in &self.templates.formats {
            if !formats.insert(format) {
                return Err(ConfigError::Invalid(format!(
                    "template format {format} is listed twice"
                )));
            }
        }

        let mut sources = HashSet::new();
        for entry in &self.assets.passthrough {
            let source = normalize(entry);
            if source.is_empty() || Path::new(source).is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "passthrough {entry:?} must be a relative path"
                )));
            }
            if Path::new(source)
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(ConfigError::Invalid(format!(
                    "passthrough {entry:?} must stay inside the site root"
                )));
            }
            if !sources.insert(source) {
                return Err(ConfigError::Invalid(format!(
                    "passthrough {entry:?} is listed twice"
                )));
            }
            if Path::new(output).starts_with(source) {
                return Err(ConfigError::Invalid(format!(
                    "passthrough {entry:?} contains the output directory"
                )));
            }
        }

        Ok(())
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join(normalize(&self.dirs.input))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(normalize(&self.dirs.output))
    }

    /// Point the build at another output directory.
    pub fn set_output_dir(&mut self, output: impl AsRef<Path>) {
        self.dirs.output = output.as_ref().display().to_string();
    }

    pub fn includes_dir(&self) -> PathBuf {
        self.input_dir().join(normalize(&self.dirs.includes))
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.input_dir().join(normalize(&self.dirs.layouts))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.input_dir().join(normalize(&self.dirs.data))
    }

    /// Passthrough entries paired with their resolved source paths.
    pub fn passthrough_sources(&self) -> Vec<(String, PathBuf)> {
        self.assets
            .passthrough
            .iter()
            .map(|entry| {
                let entry = normalize(entry).to_string();
                let source = self.root.join(&entry);
                (entry, source)
            })
            .collect()
    }

    /// Resolved watch targets, without input or passthrough sources.
    pub fn watch_targets(&self) -> Vec<PathBuf> {
        self.assets
            .watch
            .iter()
            .map(|target| self.root.join(normalize(target)))
            .collect()
    }

    /// Every path the dev server watches: watch targets, the input
    /// directory and passthrough sources.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.watch_targets();
        paths.push(self.input_dir());
        paths.extend(self.passthrough_sources().into_iter().map(|(_, source)| source));

        let mut seen = HashSet::new();
        paths.retain(|path| seen.insert(path.clone()));
        paths
    }

    /// Whether files with `ext` are templates.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        TemplateFormat::from_extension(ext)
            .is_some_and(|format| self.templates.formats.contains(&format))
    }
}

/// Strip a leading `./` and trailing slashes from a configured path.
fn normalize(path: &str) -> &str {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_site_layout() {
        let config = SiteConfig::default();

        assert_eq!(config.dirs.input, "src");
        assert_eq!(config.dirs.output, "_site");
        assert_eq!(config.dirs.includes, "_includes");
        assert_eq!(config.dirs.layouts, "_layouts");
        assert_eq!(config.dirs.data, "_data");
        assert_eq!(
            config.assets.passthrough,
            vec!["assets", "images", "files", "papers", "code", "fonts", "CNAME"]
        );
        assert_eq!(config.assets.watch, vec!["./assets/css/"]);
        assert_eq!(
            config.templates.formats,
            vec![TemplateFormat::Njk, TemplateFormat::Html, TemplateFormat::Md]
        );
        assert_eq!(config.templates.html_engine, TemplateFormat::Njk);
        assert_eq!(config.templates.markdown_engine, TemplateFormat::Njk);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_config_file_matches_defaults() {
        let config = SiteConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = SiteConfig::from_toml(
            r#"
[dirs]
output = "public"

[behavior]
scroll_lock = "last-open"
"#,
        )
        .unwrap();

        assert_eq!(config.dirs.output, "public");
        assert_eq!(config.dirs.input, "src");
        assert_eq!(config.assets, AssetsConfig::default());
        assert_eq!(
            config.behavior.scroll_lock,
            folio_behavior::ScrollLockPolicy::LastOpen
        );
        assert_eq!(config.behavior.scroll_offset, 80.0);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = SiteConfig::load(&temp.path().join("folio.toml")).unwrap();

        assert_eq!(config.dirs, DirsConfig::default());
        let root = fs::canonicalize(temp.path()).unwrap();
        assert_eq!(config.root(), root.as_path());
        assert_eq!(config.input_dir(), root.join("src"));
        assert_eq!(config.includes_dir(), root.join("src").join("_includes"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(&path, "[dirs\ninput = ").unwrap();

        let err = SiteConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_template_format_is_rejected() {
        let err = SiteConfig::from_toml("[templates]\nformats = [\"liquid\"]\n").unwrap_err();
        assert!(err.to_string().contains("liquid"));
    }

    #[test]
    fn validate_rejects_unbuildable_settings() {
        let mut same_dirs = SiteConfig::default();
        same_dirs.dirs.output = "./src/".to_string();

        let mut empty_dir = SiteConfig::default();
        empty_dir.dirs.layouts = String::new();

        let mut no_formats = SiteConfig::default();
        no_formats.templates.formats.clear();

        let mut repeated = SiteConfig::default();
        repeated.assets.passthrough.push("./images/".to_string());

        let mut escaping = SiteConfig::default();
        escaping.assets.passthrough = vec!["../shared".to_string()];

        let mut swallowing = SiteConfig::default();
        swallowing.dirs.output = "assets/out".to_string();

        for config in [same_dirs, empty_dir, no_formats, repeated, escaping, swallowing] {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{config:?} should not validate"
            );
        }
    }

    #[test]
    fn watch_paths_cover_targets_input_and_passthroughs() {
        let config = SiteConfig::default().with_root("/site");

        let paths = config.watch_paths();
        assert_eq!(paths[0], PathBuf::from("/site/assets/css"));
        assert_eq!(paths[1], PathBuf::from("/site/src"));
        assert_eq!(paths.last(), Some(&PathBuf::from("/site/CNAME")));
        assert_eq!(paths.len(), 9);
    }

    #[test]
    fn output_override_resolves_against_root() {
        let mut config = SiteConfig::default().with_root("/site");
        config.set_output_dir("dist");
        assert_eq!(config.output_dir(), PathBuf::from("/site/dist"));

        config.set_output_dir("/tmp/preview");
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/preview"));
    }

    #[test]
    fn accepts_configured_extensions_only() {
        let mut config = SiteConfig::default();
        config.templates.formats = vec![TemplateFormat::Md];

        assert!(config.accepts_extension("md"));
        assert!(!config.accepts_extension("njk"));
        assert!(!config.accepts_extension("txt"));
    }
}
