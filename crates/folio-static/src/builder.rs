//! Passthrough copy and template inventory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::{SiteConfig, TemplateFormat};

/// Manifest written at the root of the output directory.
pub const MANIFEST_FILE: &str = "folio-manifest.json";

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read input: {0}")]
    ReadError(String),

    #[error("Failed to copy {path}: {message}")]
    CopyError { path: String, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// What a passthrough entry turned out to be on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughKind {
    File,
    Directory,
    Missing,
}

/// Outcome of copying one passthrough entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassthroughCopy {
    /// Entry as configured, relative to the site root
    pub source: String,
    pub kind: PassthroughKind,
    /// Files copied
    pub files: usize,
}

/// A template the template stage will render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateEntry {
    /// Path relative to the input directory, with `/` separators
    pub path: String,
    pub format: TemplateFormat,
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildReport {
    pub passthroughs: Vec<PassthroughCopy>,
    pub templates: Vec<TemplateEntry>,

    /// Total files copied across all passthroughs
    pub files_copied: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    pub output_dir: PathBuf,
}

impl BuildReport {
    /// Passthrough entries whose source did not exist.
    pub fn skipped(&self) -> impl Iterator<Item = &PassthroughCopy> {
        self.passthroughs
            .iter()
            .filter(|copy| copy.kind == PassthroughKind::Missing)
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    generator: &'static str,
    version: &'static str,
    input: &'a str,
    output: &'a str,
    passthroughs: &'a [PassthroughCopy],
    templates: &'a [TemplateEntry],
}

/// A single file copy.
struct CopyJob {
    source: PathBuf,
    target: PathBuf,
}

/// Site builder.
pub struct SiteBuilder {
    config: SiteConfig,
}

impl SiteBuilder {
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Build the site into the output directory.
    pub async fn build(&self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let output_dir = self.config.output_dir();

        fs::create_dir_all(&output_dir)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", output_dir.display(), e)))?;

        let passthroughs = self.copy_passthroughs()?;
        let templates = self.discover_templates()?;
        self.write_manifest(&passthroughs, &templates)?;

        let files_copied = passthroughs.iter().map(|copy| copy.files).sum();
        let duration = start.elapsed();

        Ok(BuildReport {
            passthroughs,
            templates,
            files_copied,
            duration_ms: duration.as_millis() as u64,
            output_dir,
        })
    }

    /// Copy the part of a passthrough at `path` again after it changed.
    ///
    /// A path that no longer exists is removed from the output. Returns the
    /// output path touched, or `None` when `path` is not inside a passthrough.
    pub fn copy_changed(&self, path: &Path) -> Result<Option<PathBuf>, BuildError> {
        let path = if path.is_relative() {
            self.config.root().join(path)
        } else {
            path.to_path_buf()
        };

        let Some(entry) = self
            .config
            .passthrough_sources()
            .into_iter()
            .find(|(_, source)| path.starts_with(source))
            .map(|(entry, _)| entry)
        else {
            return Ok(None);
        };

        let relative = path
            .strip_prefix(self.config.root())
            .unwrap_or(Path::new(&entry));
        let target = self.config.output_dir().join(relative);

        if path.is_dir() {
            let jobs = collect_jobs(&path, &target);
            jobs.par_iter().try_for_each(copy_file)?;
            tracing::debug!("Copied {} files from {}", jobs.len(), path.display());
        } else if path.is_file() {
            copy_file(&CopyJob {
                source: path.clone(),
                target: target.clone(),
            })?;
            tracing::debug!("Copied {}", path.display());
        } else {
            remove_target(&target)?;
            tracing::debug!("Removed {}", target.display());
        }

        Ok(Some(target))
    }

    /// Copy every passthrough into the output directory, in parallel.
    fn copy_passthroughs(&self) -> Result<Vec<PassthroughCopy>, BuildError> {
        let output_dir = self.config.output_dir();
        let mut copies = Vec::new();
        let mut jobs = Vec::new();

        for (entry, source) in self.config.passthrough_sources() {
            let target = output_dir.join(&entry);

            let (kind, entry_jobs) = if source.is_dir() {
                (PassthroughKind::Directory, collect_jobs(&source, &target))
            } else if source.is_file() {
                (PassthroughKind::File, vec![CopyJob { source, target }])
            } else {
                tracing::warn!("Passthrough source not found, skipping: {}", entry);
                (PassthroughKind::Missing, Vec::new())
            };

            copies.push(PassthroughCopy {
                source: entry,
                kind,
                files: entry_jobs.len(),
            });
            jobs.extend(entry_jobs);
        }

        jobs.par_iter().try_for_each(copy_file)?;

        tracing::info!(
            "Copied {} files from {} passthroughs",
            jobs.len(),
            copies
                .iter()
                .filter(|copy| copy.kind != PassthroughKind::Missing)
                .count()
        );

        Ok(copies)
    }

    /// Find template files under the input directory.
    ///
    /// Includes, layouts and data directories hold partials rather than
    /// pages, so they are left out, as is an output directory nested in the
    /// input.
    fn discover_templates(&self) -> Result<Vec<TemplateEntry>, BuildError> {
        let input_dir = self.config.input_dir();

        if !input_dir.exists() {
            return Err(BuildError::ReadError(format!(
                "Input directory not found: {}",
                input_dir.display()
            )));
        }

        let excluded = [
            self.config.includes_dir(),
            self.config.layouts_dir(),
            self.config.data_dir(),
            self.config.output_dir(),
        ];

        let mut templates: Vec<TemplateEntry> = WalkDir::new(&input_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !excluded.iter().any(|dir| entry.path() == dir.as_path()))
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !self.config.accepts_extension(ext) {
                    return None;
                }
                let format = TemplateFormat::from_extension(ext)?;
                let relative = path.strip_prefix(&input_dir).unwrap_or(path);
                Some(TemplateEntry {
                    path: to_url_path(relative),
                    format,
                })
            })
            .collect();

        templates.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!("Found {} templates in {}", templates.len(), input_dir.display());

        Ok(templates)
    }

    fn write_manifest(
        &self,
        passthroughs: &[PassthroughCopy],
        templates: &[TemplateEntry],
    ) -> Result<(), BuildError> {
        let manifest = Manifest {
            generator: "folio",
            version: env!("CARGO_PKG_VERSION"),
            input: &self.config.dirs.input,
            output: &self.config.dirs.output,
            passthroughs,
            templates,
        };

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::write(self.config.output_dir().join(MANIFEST_FILE), json)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Plan the copy of every file under `source` to the same place under `target`.
fn collect_jobs(source: &Path, target: &Path) -> Vec<CopyJob> {
    WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
            CopyJob {
                source: entry.path().to_path_buf(),
                target: target.join(relative),
            }
        })
        .collect()
}

fn copy_file(job: &CopyJob) -> Result<(), BuildError> {
    let copy_error = |e: std::io::Error| BuildError::CopyError {
        path: job.source.display().to_string(),
        message: e.to_string(),
    };

    if let Some(parent) = job.target.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }
    fs::copy(&job.source, &job.target).map_err(copy_error)?;

    Ok(())
}

fn remove_target(target: &Path) -> Result<(), BuildError> {
    let result = if target.is_dir() {
        fs::remove_dir_all(target)
    } else if target.exists() {
        fs::remove_file(target)
    } else {
        return Ok(());
    };

    result.map_err(|e| BuildError::WriteError(format!("{}: {}", target.display(), e)))
}

fn to_url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn site(root: &Path) -> SiteConfig {
        let files = [
            ("src/index.njk", "{% extends 'base.njk' %}"),
            ("src/about.md", "# About"),
            ("src/research/index.html", "<h1>Research</h1>"),
            ("src/notes.txt", "not a template"),
            ("src/_includes/header.njk", "<header></header>"),
            ("src/_layouts/base.njk", "<html></html>"),
            ("src/_data/site.json", "{}"),
            ("assets/css/main.css", "body {}"),
            ("assets/js/main.js", "console.log('hi')"),
            ("images/me.jpg", "jpeg"),
            ("papers/2024/thesis.pdf", "pdf"),
            ("CNAME", "ivanli.dev"),
        ];
        for (path, content) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        SiteConfig::default().with_root(root)
    }

    #[tokio::test]
    async fn copies_passthroughs_unmodified() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));

        let report = builder.build().await.unwrap();
        let out = temp.path().join("_site");

        assert_eq!(report.output_dir, out);
        assert_eq!(
            fs::read_to_string(out.join("assets/css/main.css")).unwrap(),
            "body {}"
        );
        assert!(out.join("assets/js/main.js").exists());
        assert!(out.join("images/me.jpg").exists());
        assert!(out.join("papers/2024/thesis.pdf").exists());
        assert_eq!(fs::read_to_string(out.join("CNAME")).unwrap(), "ivanli.dev");
        assert_eq!(report.files_copied, 5);
    }

    #[tokio::test]
    async fn skips_missing_passthroughs() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));

        let report = builder.build().await.unwrap();

        let skipped: Vec<&str> = report.skipped().map(|copy| copy.source.as_str()).collect();
        assert_eq!(skipped, vec!["files", "code", "fonts"]);

        let cname = report
            .passthroughs
            .iter()
            .find(|copy| copy.source == "CNAME")
            .unwrap();
        assert_eq!(cname.kind, PassthroughKind::File);
        assert_eq!(cname.files, 1);
    }

    #[tokio::test]
    async fn inventories_templates_outside_partials() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));

        let report = builder.build().await.unwrap();

        let expected = vec![
            TemplateEntry {
                path: "about.md".to_string(),
                format: TemplateFormat::Md,
            },
            TemplateEntry {
                path: "index.njk".to_string(),
                format: TemplateFormat::Njk,
            },
            TemplateEntry {
                path: "research/index.html".to_string(),
                format: TemplateFormat::Html,
            },
        ];
        assert_eq!(report.templates, expected);
    }

    #[tokio::test]
    async fn writes_manifest() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));
        builder.build().await.unwrap();

        let manifest = fs::read_to_string(temp.path().join("_site").join(MANIFEST_FILE)).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();

        assert_eq!(manifest["generator"], "folio");
        assert_eq!(manifest["input"], "src");
        assert_eq!(manifest["passthroughs"][0]["source"], "assets");
        assert_eq!(manifest["passthroughs"][0]["kind"], "directory");
        assert_eq!(manifest["passthroughs"][0]["files"], 2);
        assert_eq!(manifest["templates"][1]["path"], "index.njk");
        assert_eq!(manifest["templates"][1]["format"], "njk");
    }

    #[tokio::test]
    async fn missing_input_directory_is_an_error() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(SiteConfig::default().with_root(temp.path()));

        let err = builder.build().await.unwrap_err();
        assert!(matches!(err, BuildError::ReadError(_)));
    }

    #[tokio::test]
    async fn copy_changed_refreshes_one_file() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));
        builder.build().await.unwrap();

        let css = temp.path().join("assets/css/main.css");
        fs::write(&css, "body { color: red }").unwrap();

        let target = builder.copy_changed(&css).unwrap();
        let out = temp.path().join("_site/assets/css/main.css");
        assert_eq!(target, Some(out.clone()));
        assert_eq!(fs::read_to_string(out).unwrap(), "body { color: red }");
    }

    #[tokio::test]
    async fn copy_changed_mirrors_deletions_and_new_directories() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));
        builder.build().await.unwrap();

        fs::remove_file(temp.path().join("images/me.jpg")).unwrap();
        builder.copy_changed(Path::new("images/me.jpg")).unwrap();
        assert!(!temp.path().join("_site/images/me.jpg").exists());

        let slides = temp.path().join("papers/2025");
        fs::create_dir_all(&slides).unwrap();
        fs::write(slides.join("talk.pdf"), "pdf").unwrap();
        builder.copy_changed(&slides).unwrap();
        assert!(temp.path().join("_site/papers/2025/talk.pdf").exists());
    }

    #[tokio::test]
    async fn copy_changed_ignores_paths_outside_passthroughs() {
        let temp = tempdir().unwrap();
        let builder = SiteBuilder::new(site(temp.path()));
        builder.build().await.unwrap();

        let template = temp.path().join("src/index.njk");
        assert_eq!(builder.copy_changed(&template).unwrap(), None);
    }
}
