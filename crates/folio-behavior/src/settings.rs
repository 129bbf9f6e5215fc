//! Behaviour settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When closing a popup releases the body scroll lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollLockPolicy {
    /// Every close restores page scrolling
    #[default]
    Unconditional,
    /// Scrolling is restored once no popup remains open
    LastOpen,
}

/// Tunables shared by the page components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Text of the title bar link
    #[serde(default = "default_site_title")]
    pub site_title: String,

    /// Target of the title bar link
    #[serde(default = "default_home")]
    pub home: String,

    /// Space left above smooth-scroll targets, in pixels
    #[serde(default = "default_scroll_offset")]
    pub scroll_offset: f64,

    /// Scroll position past which the header is marked scrolled
    #[serde(default = "default_scrolled_threshold")]
    pub scrolled_threshold: f64,

    /// Viewport width above which the mobile panel closes
    #[serde(default = "default_desktop_breakpoint")]
    pub desktop_breakpoint: f64,

    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,

    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    /// Delay between the load event and removing the preload class
    #[serde(default = "default_preload_delay_ms")]
    pub preload_delay_ms: u64,

    #[serde(default)]
    pub scroll_lock: ScrollLockPolicy,
}

fn default_site_title() -> String {
    "Ivan Li".to_string()
}

fn default_home() -> String {
    "/".to_string()
}

fn default_scroll_offset() -> f64 {
    80.0
}

fn default_scrolled_threshold() -> f64 {
    50.0
}

fn default_desktop_breakpoint() -> f64 {
    980.0
}

fn default_scroll_debounce_ms() -> u64 {
    10
}

fn default_resize_debounce_ms() -> u64 {
    100
}

fn default_preload_delay_ms() -> u64 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_title: default_site_title(),
            home: default_home(),
            scroll_offset: default_scroll_offset(),
            scrolled_threshold: default_scrolled_threshold(),
            desktop_breakpoint: default_desktop_breakpoint(),
            scroll_debounce_ms: default_scroll_debounce_ms(),
            resize_debounce_ms: default_resize_debounce_ms(),
            preload_delay_ms: default_preload_delay_ms(),
            scroll_lock: ScrollLockPolicy::default(),
        }
    }
}

impl Settings {
    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_table_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.scroll_offset, 80.0);
        assert_eq!(settings.preload_delay(), Duration::from_millis(100));
    }

    #[test]
    fn overrides_individual_fields() {
        let settings: Settings = toml::from_str(
            r#"
site_title = "Someone Else"
desktop_breakpoint = 1200
scroll_lock = "last-open"
"#,
        )
        .unwrap();

        assert_eq!(settings.site_title, "Someone Else");
        assert_eq!(settings.desktop_breakpoint, 1200.0);
        assert_eq!(settings.scroll_lock, ScrollLockPolicy::LastOpen);
        assert_eq!(settings.resize_debounce_ms, 100);
    }
}
