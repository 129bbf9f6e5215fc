//! Initialize a folio site in the current project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use folio_static::{SiteConfig, DEFAULT_CONFIG};

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing folio...");

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    let config = SiteConfig::load(config_path)?;
    let input_dir = config.input_dir();
    for dir in [&input_dir, &config.includes_dir(), &config.layouts_dir()] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let pages = [
        (config.layouts_dir().join("base.njk"), DEFAULT_LAYOUT),
        (input_dir.join("index.njk"), DEFAULT_INDEX),
    ];
    for (path, content) in pages {
        if !path.exists() || yes {
            fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Created {}", path.display());
        }
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'folio dev' to start the development server.");

    Ok(())
}

const DEFAULT_LAYOUT: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }}</title>
  <link rel="stylesheet" href="/assets/css/main.css">
</head>
<body class="is-preload">
  <header id="header">
    <nav id="nav">
      <ul>
        <li><a href="#about">About</a></li>
        <li><a href="/research/">Research</a></li>
      </ul>
    </nav>
  </header>

  {{ content | safe }}

  <script src="/assets/js/main.js"></script>
</body>
</html>
"##;

const DEFAULT_INDEX: &str = r#"---
layout: base.njk
title: Home
---
<section id="about" data-animate>
  <h2>About</h2>
  <p>Write something about yourself here.</p>
</section>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_config_and_input_dir() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("folio.toml");

        run(&config_path, false).await.unwrap();

        let config = SiteConfig::load(&config_path).unwrap();
        assert_eq!(config.dirs, folio_static::DirsConfig::default());
        assert!(temp.path().join("src/index.njk").exists());
        assert!(temp.path().join("src/_layouts/base.njk").exists());
        assert!(temp.path().join("src/_includes").is_dir());
    }

    #[tokio::test]
    async fn keeps_existing_config_without_yes() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("folio.toml");
        fs::write(&config_path, "[dirs]\ninput = \"pages\"\n").unwrap();

        run(&config_path, false).await.unwrap();
        assert_eq!(
            fs::read_to_string(&config_path).unwrap(),
            "[dirs]\ninput = \"pages\"\n"
        );

        run(&config_path, true).await.unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);
    }
}
