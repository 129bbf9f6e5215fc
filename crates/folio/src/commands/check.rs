//! Check built pages against the page behaviour.
//!
//! Every page is loaded into a headless [`Page`], bootstrapped as if the
//! document had just become interactive, and inspected for markup the
//! behaviour cannot act on.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_behavior::{bootstrap, Page, ReadyState, Settings};
use folio_dom::{parse_html, select_all, Document, NodeId};
use walkdir::WalkDir;

use super::load_config;

/// What the behaviour found on one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageReport {
    pub navigation: bool,
    pub mobile_links: usize,
    /// Hrefs of in-page anchors with no target
    pub broken_anchors: Vec<String>,
    /// Popup ids named by triggers with no container
    pub broken_triggers: Vec<String>,
    pub lazy_images: usize,
    pub animated: usize,
}

/// Run the check command.
pub async fn run(config_path: &Path, paths: Vec<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let paths = if paths.is_empty() {
        vec![config.output_dir()]
    } else {
        paths
    };

    let pages = collect_pages(&paths)?;
    if pages.is_empty() {
        tracing::warn!("No HTML pages found");
        return Ok(());
    }

    let mut broken_triggers = 0;
    for path in &pages {
        let html = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report = inspect(&html, &config.behavior)
            .with_context(|| format!("Failed to check {}", path.display()))?;

        tracing::info!(
            "{}: navigation {}, {} mobile links, {} lazy images, {} animated elements",
            path.display(),
            if report.navigation { "mounted" } else { "absent" },
            report.mobile_links,
            report.lazy_images,
            report.animated
        );
        for href in &report.broken_anchors {
            tracing::warn!("{}: anchor {} has no target", path.display(), href);
        }
        for id in &report.broken_triggers {
            tracing::warn!("{}: popup trigger names missing #{}", path.display(), id);
        }
        broken_triggers += report.broken_triggers.len();
    }

    if broken_triggers > 0 {
        anyhow::bail!(
            "{} popup triggers without containers across {} pages",
            broken_triggers,
            pages.len()
        );
    }

    tracing::info!("Checked {} pages", pages.len());
    Ok(())
}

/// Expand directories into the HTML files below them.
fn collect_pages(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();

    for path in paths {
        if path.is_file() {
            pages.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("Path not found: {}", path.display());
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("html"))
            .collect();
        found.sort();
        pages.extend(found);
    }

    Ok(pages)
}

/// Bootstrap the page behaviour on `html` and report what it found.
pub fn inspect(html: &str, settings: &Settings) -> Result<PageReport> {
    let document = parse_html(html).context("Failed to parse HTML")?;
    let mut page = Page::new(document).with_ready_state(ReadyState::Interactive);

    let handle = bootstrap(&mut page, settings.clone())?;
    let site = handle
        .site()
        .context("Site did not mount on an interactive page")?;

    let doc = page.document();
    let report = PageReport {
        navigation: !site.navigation.is_inert(),
        mobile_links: select_all(doc, "#navPanel a")?.len(),
        broken_anchors: attributes(doc, &site.smooth_scroll.broken_anchors(&page), "href"),
        broken_triggers: attributes(doc, &site.popup.broken_triggers(&page), "data-popup"),
        lazy_images: site.lazy_load.images().len(),
        animated: site.scroll_animations.elements().len(),
    };

    handle.teardown(&mut page);
    Ok(report)
}

/// Distinct values of `name` on `nodes`, in document order.
fn attributes(doc: &Document, nodes: &[NodeId], name: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in nodes.iter().filter_map(|&node| doc.attribute(node, name)) {
        if !values.iter().any(|seen| seen == value) {
            values.push(value.to_string());
        }
    }
    values
}
