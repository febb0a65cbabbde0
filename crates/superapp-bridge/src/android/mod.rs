// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android WebView transport.
//
// Up:   the page calls `window.AndroidBridge.postMessage(jsonString)`, a
//       method of an object the host exposed with `addJavascriptInterface`.
// Down: the host evaluates `window.receiveFromNative && ...(<json>)`.
//
// Inbound payloads arrive as raw strings and are decoded here. A decode
// failure is reported and dropped; nothing is ever thrown back across the
// interface call, since a fault there hangs or crashes the calling script.
//
// The real `WebViewHost` lives in `webview` (JNI, Android targets only).

#[cfg(target_os = "android")]
pub mod webview;

use std::sync::Arc;

use superapp_core::config::{BridgeConfig, HookPolicy};
use superapp_core::diagnostics::{Diagnostics, Side};
use superapp_core::envelope::{Envelope, decode};
use superapp_core::error::{BridgeError, Result};
use tracing::{debug, info, warn};

use crate::hook::{HookBinding, HookToken, ReceiveHook};
use crate::listener::ListenerSlot;
use crate::script::receiver_call;
use crate::traits::{Platform, ReceiveCallback, Transport, enforce_limit};

/// Entry point installed as the JS interface's `postMessage` method.
pub type InterfaceEntry = Arc<dyn Fn(&str) + Send + Sync>;

/// Host-side view of an Android `WebView`.
pub trait WebViewHost: Send + Sync {
    /// Expose `entry` to the page as `window.<name>.postMessage`.
    fn add_javascript_interface(&self, name: &str, entry: InterfaceEntry) -> Result<()>;

    fn remove_javascript_interface(&self, name: &str) -> Result<()>;

    /// `WebView.evaluateJavascript`; implementations marshal onto the UI
    /// thread themselves.
    fn evaluate_javascript(&self, script: &str) -> Result<()>;
}

/// Page-side view of the exposed interface object.
pub trait JavascriptInterface: Send + Sync {
    fn post_message(&self, json: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Host half
// ---------------------------------------------------------------------------

/// Host end of the Android channel.
pub struct AndroidHostTransport {
    webview: Arc<dyn WebViewHost>,
    interface_name: String,
    receiver_function: String,
    max_payload_bytes: Option<usize>,
    slot: Arc<ListenerSlot>,
}

impl AndroidHostTransport {
    /// Install the JS interface on `webview`. Call once the surface has
    /// finished its initial load.
    pub fn attach(
        webview: Arc<dyn WebViewHost>,
        config: &BridgeConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let slot = Arc::new(ListenerSlot::new(Side::Host, diagnostics));

        let inbound = slot.clone();
        let limit = config.max_payload_bytes;
        let entry: InterfaceEntry = Arc::new(move |raw: &str| {
            if enforce_limit(raw, limit, Side::Host, inbound.diagnostics()).is_err() {
                return;
            }
            match decode(raw) {
                Ok(envelope) => {
                    inbound.deliver(envelope);
                }
                Err(error) => inbound.report_decode_failure(error),
            }
        });
        webview.add_javascript_interface(&config.android_interface_name, entry)?;

        info!(interface = %config.android_interface_name, "android bridge attached");
        Ok(Self {
            webview,
            interface_name: config.android_interface_name.clone(),
            receiver_function: config.receiver_function.clone(),
            max_payload_bytes: config.max_payload_bytes,
            slot,
        })
    }
}

impl Transport for AndroidHostTransport {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn side(&self) -> Side {
        Side::Host
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        if self.slot.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        let script = receiver_call(&self.receiver_function, envelope);
        enforce_limit(&script, self.max_payload_bytes, Side::Host, self.slot.diagnostics())?;
        debug!(message_type = envelope.message_type(), "android: evaluating receiver call");
        self.webview.evaluate_javascript(&script)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        self.slot.set(callback);
    }

    fn dispose(&self) {
        if !self.slot.dispose() {
            return;
        }
        if let Err(e) = self.webview.remove_javascript_interface(&self.interface_name) {
            warn!(error = %e, "failed to remove android JS interface");
        }
        info!(interface = %self.interface_name, "android bridge detached");
    }

    fn is_disposed(&self) -> bool {
        self.slot.is_disposed()
    }
}

impl Drop for AndroidHostTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ---------------------------------------------------------------------------
// Mini-app half
// ---------------------------------------------------------------------------

/// Mini-app end of the Android channel.
pub struct AndroidMiniAppTransport {
    interface: Arc<dyn JavascriptInterface>,
    binding: HookBinding,
    max_payload_bytes: Option<usize>,
    slot: Arc<ListenerSlot>,
}

impl AndroidMiniAppTransport {
    /// Claim the page's receive hook and post through `interface`.
    pub fn connect(
        interface: Arc<dyn JavascriptInterface>,
        hook: Arc<ReceiveHook>,
        policy: HookPolicy,
        max_payload_bytes: Option<usize>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let slot = Arc::new(ListenerSlot::new(Side::MiniApp, diagnostics));
        let binding = HookBinding::bind(hook, policy, slot.clone())?;
        Ok(Self {
            interface,
            binding,
            max_payload_bytes,
            slot,
        })
    }

    pub fn hook_token(&self) -> HookToken {
        self.binding.token()
    }
}

impl Transport for AndroidMiniAppTransport {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn side(&self) -> Side {
        Side::MiniApp
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        if self.slot.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        let wire = envelope.to_wire();
        enforce_limit(&wire, self.max_payload_bytes, Side::MiniApp, self.slot.diagnostics())?;
        self.interface.post_message(&wire)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        self.slot.set(callback);
    }

    fn dispose(&self) {
        if self.slot.dispose() && !self.binding.release() {
            debug!("receive hook already taken over by a newer client");
        }
    }

    fn is_disposed(&self) -> bool {
        self.slot.is_disposed()
    }
}

impl Drop for AndroidMiniAppTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}
