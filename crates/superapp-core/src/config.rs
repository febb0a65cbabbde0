// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration, shared by host and mini-app builds.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Where a web transport may post to, and which sender origin it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetOrigin {
    /// `"*"` — post to any origin; inbound is still checked by source window.
    Any,
    /// Post only to, and accept only from, this exact origin.
    Exact(String),
}

impl TargetOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Exact(origin) => origin,
        }
    }

    /// Whether an inbound event origin is acceptable.
    pub fn admits(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == origin,
        }
    }
}

impl From<String> for TargetOrigin {
    fn from(value: String) -> Self {
        if value == "*" {
            Self::Any
        } else {
            Self::Exact(value)
        }
    }
}

impl From<TargetOrigin> for String {
    fn from(value: TargetOrigin) -> Self {
        value.as_str().to_owned()
    }
}

impl std::fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a second bridge client claims the receive hook of a
/// script context that already has a live owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPolicy {
    /// The new client takes over atomically; the previous owner's later
    /// teardown leaves the new hook in place.
    Replace,
    /// Construction fails with `BridgeError::HookOccupied`.
    Reject,
}

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name the Android JS interface is exposed under (`window.<name>`).
    pub android_interface_name: String,
    /// Name of the WKWebView script-message handler.
    pub ios_handler_name: String,
    /// Global function the native side calls to push messages down.
    pub receiver_function: String,
    /// Target origin for `postMessage` and inbound origin checks.
    pub target_origin: TargetOrigin,
    /// Largest wire payload an adapter accepts; `None` disables the check.
    pub max_payload_bytes: Option<usize>,
    /// Policy for a second client in one script context.
    pub hook_policy: HookPolicy,
    /// Refuse the standalone fallback (production builds).
    pub require_native_transport: bool,
    /// Dev-server URLs by mini-app name.
    pub mini_apps: BTreeMap<String, String>,
    /// Base URL for bundled mini-apps not listed in `mini_apps`.
    pub bundled_base_url: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let mut mini_apps = BTreeMap::new();
        mini_apps.insert("demo-app1".to_owned(), "http://localhost:5173".to_owned());
        mini_apps.insert("demo-app2".to_owned(), "http://localhost:5174".to_owned());

        Self {
            android_interface_name: "AndroidBridge".into(),
            ios_handler_name: "nativeApp".into(),
            receiver_function: "receiveFromNative".into(),
            target_origin: TargetOrigin::Any,
            max_payload_bytes: Some(1024 * 1024),
            hook_policy: HookPolicy::Replace,
            require_native_transport: false,
            mini_apps,
            bundled_base_url: "http://localhost:8080/mini-apps".into(),
            log_filter: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.as_ref().display(), "bridge config loaded");
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "using default bridge config");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
