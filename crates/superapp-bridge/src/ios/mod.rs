// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS WKWebView transport.
//
// Up:   the page calls `webkit.messageHandlers.nativeApp.postMessage(obj)`.
//       WebKit structured-clones the object, so the host receives an
//       already-parsed body rather than text.
// Down: the host evaluates the same receiver-call script Android uses.
//
// The parsed body is still re-validated here; WebKit guarantees a value,
// not an envelope.

#[cfg(target_os = "ios")]
pub mod webkit;

use std::sync::Arc;

use serde_json::Value;
use superapp_core::config::{BridgeConfig, HookPolicy};
use superapp_core::diagnostics::{Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::{BridgeError, Result};
use tracing::{debug, info, warn};

use crate::hook::{HookBinding, HookToken, ReceiveHook};
use crate::listener::ListenerSlot;
use crate::script::{envelope_from_script_value, receiver_call};
use crate::traits::{Platform, ReceiveCallback, Transport, enforce_limit};

/// Handler installed under `webkit.messageHandlers.<name>`.
pub type ScriptMessageEntry = Arc<dyn Fn(Value) + Send + Sync>;

/// Host-side view of a `WKWebView` and its user content controller.
pub trait ScriptMessageHost: Send + Sync {
    fn add_script_message_handler(&self, name: &str, entry: ScriptMessageEntry) -> Result<()>;

    fn remove_script_message_handler(&self, name: &str) -> Result<()>;

    fn evaluate_javascript(&self, script: &str) -> Result<()>;
}

/// Page-side view of a registered message handler.
pub trait ScriptMessageHandler: Send + Sync {
    fn post_message(&self, body: Value) -> Result<()>;
}

/// Host end of the iOS channel.
pub struct IosHostTransport {
    webview: Arc<dyn ScriptMessageHost>,
    handler_name: String,
    receiver_function: String,
    max_payload_bytes: Option<usize>,
    slot: Arc<ListenerSlot>,
}

impl IosHostTransport {
    pub fn attach(
        webview: Arc<dyn ScriptMessageHost>,
        config: &BridgeConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let slot = Arc::new(ListenerSlot::new(Side::Host, diagnostics));

        let inbound = slot.clone();
        let entry: ScriptMessageEntry = Arc::new(move |body| match envelope_from_script_value(body) {
            Ok(envelope) => {
                inbound.deliver(envelope);
            }
            Err(error) => inbound.report_decode_failure(error),
        });
        webview.add_script_message_handler(&config.ios_handler_name, entry)?;

        info!(handler = %config.ios_handler_name, "ios bridge attached");
        Ok(Self {
            webview,
            handler_name: config.ios_handler_name.clone(),
            receiver_function: config.receiver_function.clone(),
            max_payload_bytes: config.max_payload_bytes,
            slot,
        })
    }
}

impl Transport for IosHostTransport {
    fn platform(&self) -> Platform {
        Platform::Ios
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
        debug!(message_type = envelope.message_type(), "ios: evaluating receiver call");
        self.webview.evaluate_javascript(&script)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        self.slot.set(callback);
    }

    fn dispose(&self) {
        if !self.slot.dispose() {
            return;
        }
        if let Err(e) = self.webview.remove_script_message_handler(&self.handler_name) {
            warn!(error = %e, "failed to remove ios script message handler");
        }
        info!(handler = %self.handler_name, "ios bridge detached");
    }

    fn is_disposed(&self) -> bool {
        self.slot.is_disposed()
    }
}

impl Drop for IosHostTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Mini-app end of the iOS channel.
pub struct IosMiniAppTransport {
    handler: Arc<dyn ScriptMessageHandler>,
    binding: HookBinding,
    max_payload_bytes: Option<usize>,
    slot: Arc<ListenerSlot>,
}

impl IosMiniAppTransport {
    pub fn connect(
        handler: Arc<dyn ScriptMessageHandler>,
        hook: Arc<ReceiveHook>,
        policy: HookPolicy,
        max_payload_bytes: Option<usize>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let slot = Arc::new(ListenerSlot::new(Side::MiniApp, diagnostics));
        let binding = HookBinding::bind(hook, policy, slot.clone())?;
        Ok(Self {
            handler,
            binding,
            max_payload_bytes,
            slot,
        })
    }

    pub fn hook_token(&self) -> HookToken {
        self.binding.token()
    }
}

impl Transport for IosMiniAppTransport {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn side(&self) -> Side {
        Side::MiniApp
    }

    /// Posts the envelope as an object, not as text.
    fn send(&self, envelope: &Envelope) -> Result<()> {
        if self.slot.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        enforce_limit(
            &envelope.to_wire(),
            self.max_payload_bytes,
            Side::MiniApp,
            self.slot.diagnostics(),
        )?;
        self.handler.post_message(envelope.to_value())
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

impl Drop for IosMiniAppTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use serde_json::json;
    use superapp_core::diagnostics::{DiagnosticKind, MemorySink};

    use crate::context::ScriptContext;
    use crate::sim::{EventLoop, SimIosWebView};

    fn collect(transport: &dyn Transport) -> Arc<Mutex<Vec<Envelope>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        transport.on_receive(Arc::new(move |envelope| {
            sink.lock().expect("lock").push(envelope);
        }));
        seen
    }

    #[test]
    fn object_bodies_are_revalidated() {
        let webview = SimIosWebView::new(EventLoop::new());
        let sink = MemorySink::new();
        let host = IosHostTransport::attach(
            Arc::new(webview.clone()),
            &BridgeConfig::default(),
            sink.clone(),
        )
        .expect("attach");
        let seen = collect(&host);

        webview.deliver_body("nativeApp", json!({"type": "navigate", "data": {"screen": "home"}}));
        webview.deliver_body("nativeApp", json!({"data": {"screen": "home"}}));
        webview.deliver_body("nativeApp", json!([1, 2, 3]));
        webview.deliver_body("nativeApp", json!({"type": ""}));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].data(), Some(&json!({"screen": "home"})));
        assert_eq!(sink.count(DiagnosticKind::DecodeFailed), 3);
    }

    #[test]
    fn dispose_unregisters_handler() {
        let webview = SimIosWebView::new(EventLoop::new());
        let host = IosHostTransport::attach(
            Arc::new(webview.clone()),
            &BridgeConfig::default(),
            MemorySink::new(),
        )
        .expect("attach");
        assert!(webview.has_handler("nativeApp"));

        drop(host);
        assert!(!webview.has_handler("nativeApp"));
    }

    #[test]
    fn mini_app_posts_objects_and_receives_pushes() {
        let events = EventLoop::new();
        let webview = SimIosWebView::new(events.clone());
        let host = IosHostTransport::attach(
            Arc::new(webview.clone()),
            &BridgeConfig::default(),
            MemorySink::new(),
        )
        .expect("attach");
        let host_seen = collect(&host);

        let page = webview.page();
        let handler = page.script_message_handler("nativeApp").expect("handler");
        let mini_app = IosMiniAppTransport::connect(
            handler,
            page.receive_hook(),
            HookPolicy::Replace,
            None,
            MemorySink::new(),
        )
        .expect("connect");
        let mini_app_seen = collect(&mini_app);

        mini_app
            .send(&Envelope::new("showToast", Some(json!({"message": "Hi"}))).expect("envelope"))
            .expect("send");
        events.run_until_idle();
        assert_eq!(host_seen.lock().expect("lock")[0].message_type(), "showToast");

        let push = Envelope::new("notification", Some(json!({"title": "T", "body": "B"})))
            .expect("envelope");
        host.send(&push).expect("send");
        events.run_until_idle();
        assert_eq!(mini_app_seen.lock().expect("lock").as_slice(), &[push]);
    }

    #[test]
    fn reject_policy_refuses_second_client() {
        let webview = SimIosWebView::new(EventLoop::new());
        let _host = IosHostTransport::attach(
            Arc::new(webview.clone()),
            &BridgeConfig::default(),
            MemorySink::new(),
        )
        .expect("attach");
        let page = webview.page();
        let handler = page.script_message_handler("nativeApp").expect("handler");

        let _first = IosMiniAppTransport::connect(
            handler.clone(),
            page.receive_hook(),
            HookPolicy::Reject,
            None,
            MemorySink::new(),
        )
        .expect("first");
        let second = IosMiniAppTransport::connect(
            handler,
            page.receive_hook(),
            HookPolicy::Reject,
            None,
            MemorySink::new(),
        );
        assert!(matches!(second, Err(BridgeError::HookOccupied)));
    }
}
