// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic transport contract.
//
// The protocol is fire-and-forget and at-most-once. A transport owns the
// platform-level listener it installed and must remove it on `dispose`.

use std::sync::Arc;

use superapp_core::diagnostics::{DiagnosticEvent, Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::{BridgeError, Result};

/// Callback invoked for every inbound envelope.
pub type ReceiveCallback = Arc<dyn Fn(Envelope) + Send + Sync>;

/// Which raw channel a transport wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    Ios,
    Web,
    /// No native channel; outbound messages are only logged.
    Standalone,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Android => f.write_str("android"),
            Self::Ios => f.write_str("ios"),
            Self::Web => f.write_str("web"),
            Self::Standalone => f.write_str("standalone"),
        }
    }
}

/// Uniform send/receive capability over one platform channel.
///
/// Identical across platforms and across the host and mini-app halves.
pub trait Transport: Send + Sync {
    fn platform(&self) -> Platform;

    /// Which end of the bridge this transport serves.
    fn side(&self) -> Side;

    /// Hand a serialized envelope to the platform channel.
    ///
    /// Returns `BridgeError::Disposed` after teardown and
    /// `BridgeError::PayloadTooLarge` when the configured limit is exceeded.
    fn send(&self, envelope: &Envelope) -> Result<()>;

    /// Register the single inbound callback. A second registration replaces
    /// the first; only the newest callback is ever invoked.
    fn on_receive(&self, callback: ReceiveCallback);

    /// Remove every platform-level listener this transport installed.
    /// Idempotent and safe to call from a concurrent teardown path.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Reject an outbound wire string larger than the adapter's limit.
pub(crate) fn enforce_limit(
    wire: &str,
    limit: Option<usize>,
    side: Side,
    diagnostics: &Diagnostics,
) -> Result<()> {
    match limit {
        Some(limit) if wire.len() > limit => {
            diagnostics.record(&DiagnosticEvent::PayloadTooLarge {
                side,
                size: wire.len(),
                limit,
            });
            Err(BridgeError::PayloadTooLarge {
                size: wire.len(),
                limit,
            })
        }
        _ => Ok(()),
    }
}
