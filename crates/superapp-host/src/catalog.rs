// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where each mini-app is loaded from.

use std::collections::BTreeMap;

use superapp_core::config::{BridgeConfig, TargetOrigin};
use url::{Origin, Url};

/// Mini-app name -> URL, with a bundled-asset fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniAppCatalog {
    entries: BTreeMap<String, String>,
    bundled_base_url: String,
}

impl MiniAppCatalog {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            entries: config.mini_apps.clone(),
            bundled_base_url: config.bundled_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The listed dev-server URL, or `<bundled_base_url>/<name>/index.html`.
    pub fn resolve(&self, name: &str) -> String {
        match self.entries.get(name) {
            Some(url) => url.clone(),
            None => format!("{}/{name}/index.html", self.bundled_base_url),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The exact target origin for a web host embedding `name`. Falls back
    /// to `*` when the URL has no usable origin.
    pub fn target_origin(&self, name: &str) -> TargetOrigin {
        match origin_of(&self.resolve(name)) {
            Some(origin) => TargetOrigin::Exact(origin),
            None => TargetOrigin::Any,
        }
    }
}

/// Serialized origin of an absolute http(s) URL, as a browser stamps it on
/// `MessageEvent::origin`.
pub fn origin_of(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    match url.origin() {
        origin @ Origin::Tuple(..) => Some(origin.ascii_serialization()),
        Origin::Opaque(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_apps_resolve_to_dev_servers() {
        let catalog = MiniAppCatalog::from_config(&BridgeConfig::default());
        assert_eq!(catalog.resolve("demo-app1"), "http://localhost:5173");
        assert_eq!(catalog.resolve("demo-app2"), "http://localhost:5174");
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["demo-app1", "demo-app2"]);
    }

    #[test]
    fn unlisted_apps_fall_back_to_bundled_assets() {
        let config = BridgeConfig {
            bundled_base_url: "http://localhost:8080/mini-apps/".into(),
            ..Default::default()
        };
        let catalog = MiniAppCatalog::from_config(&config);
        assert_eq!(
            catalog.resolve("payments"),
            "http://localhost:8080/mini-apps/payments/index.html"
        );
        assert_eq!(
            catalog.target_origin("payments"),
            TargetOrigin::Exact("http://localhost:8080".into())
        );
    }

    #[test]
    fn origins_drop_path_credentials_and_default_port() {
        assert_eq!(origin_of("http://localhost:5173").as_deref(), Some("http://localhost:5173"));
        assert_eq!(
            origin_of("HTTPS://User@Shop.Example:443/cart?x=1").as_deref(),
            Some("https://shop.example")
        );
        assert_eq!(origin_of("http://[::1]:8080/a").as_deref(), Some("http://[::1]:8080"));
        assert_eq!(origin_of("http://[::1]/a").as_deref(), Some("http://[::1]"));
        assert_eq!(origin_of("file:///tmp/index.html"), None);
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn origins_follow_browser_url_parsing() {
        assert_eq!(origin_of("http://example.com:080/").as_deref(), Some("http://example.com"));
        assert_eq!(origin_of("http://example.com:65536/"), None);
        assert_eq!(
            origin_of("http://evil.example\\@shop.example/").as_deref(),
            Some("http://evil.example")
        );
        assert_eq!(origin_of("http://exa mple.com/"), None);
        assert_eq!(origin_of("ws://localhost:5173"), None);
    }
}
