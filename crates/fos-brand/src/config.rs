//! Configuration
//!
//! Loaded from JSON:
//!
//! ```json
//! {
//!   "images": { "sun": "/local/brands/sun.svg" },
//!   "debug": false,
//!   "host_element": "home-assistant",
//!   "shadow_timeout_ms": 10000
//! }
//! ```
//!
//! Missing fields take their defaults; `images` defaults to the built-in
//! replacement table.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{BrandError, BrandResult};

/// Domain to image URL, in configuration order.
///
/// Order matters: domain lookups return the first configured domain that
/// matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementImages(IndexMap<String, String>);

impl ReplacementImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Images shipped with the frontend bundle
    pub fn builtin() -> Self {
        [
            ("lovelace_cards", "/lovelace_cards_files/lovelace-cards.svg"),
            ("yandex_player", "/lovelace_cards_files/yandex-music.svg"),
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, domain: impl Into<String>, url: impl Into<String>) -> Self {
        self.0.insert(domain.into(), url.into());
        self
    }

    pub fn get(&self, domain: &str) -> Option<&str> {
        self.0.get(domain).map(String::as_str)
    }

    /// Configured domains, in order
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReplacementImages {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandConfig {
    pub images: ReplacementImages,
    /// Per-event `tracing` output from the watcher
    pub debug: bool,
    /// Selector for the application element whose shadow root is watched
    pub host_element: String,
    /// Give up waiting for the host's shadow root after this long
    pub shadow_timeout_ms: Option<u64>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            images: ReplacementImages::builtin(),
            debug: false,
            host_element: "home-assistant".to_string(),
            shadow_timeout_ms: None,
        }
    }
}

impl BrandConfig {
    pub fn from_json(json: &str) -> BrandResult<Self> {
        serde_json::from_str(json).map_err(|e| BrandError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> BrandResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| BrandError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn with_images(mut self, images: ReplacementImages) -> Self {
        self.images = images;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn shadow_timeout(&self) -> Option<Duration> {
        self.shadow_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrandConfig::from_json("{}").unwrap();
        assert_eq!(config, BrandConfig::default());
        assert_eq!(config.host_element, "home-assistant");
        assert_eq!(
            config.images.get("yandex_player"),
            Some("/lovelace_cards_files/yandex-music.svg")
        );
        assert_eq!(config.shadow_timeout(), None);
    }

    #[test]
    fn test_image_order_preserved() {
        let config = BrandConfig::from_json(
            r#"{"images": {"zeta": "/z.svg", "alpha": "/a.svg", "mid": "/m.svg"}, "debug": true}"#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.images.domains().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_invalid_json() {
        let err = BrandConfig::from_json(r#"{"images": []}"#).unwrap_err();
        assert!(matches!(err, BrandError::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_file() {
        let err = BrandConfig::from_file("/nonexistent/brand.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/brand.json"));
    }
}
