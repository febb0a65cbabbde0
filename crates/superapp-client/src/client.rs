// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The bridge as seen from inside a mini-app.
//
// Construction picks exactly one transport, probing in a fixed order:
// Android JS interface, iOS message handler, parent frame, standalone. The
// client then owns that transport (and, on native platforms, the page's
// receive hook) until `teardown` or drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde_json::Value;
use superapp_bridge::android::AndroidMiniAppTransport;
use superapp_bridge::ios::IosMiniAppTransport;
use superapp_bridge::stub::StandaloneTransport;
use superapp_bridge::web::WebTransport;
use superapp_bridge::{Platform, ScriptContext, Transport};
use superapp_core::config::BridgeConfig;
use superapp_core::diagnostics::{DiagnosticEvent, Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::{BridgeError, Result};
use superapp_core::message::{DeepLink, HostMessage, MiniAppMessage, Notification, UserInfo};
use tracing::{debug, info, warn};

/// Mini-app state fed by host messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeState {
    pub user_info: Option<UserInfo>,
    pub notification: Option<Notification>,
    pub deep_link: Option<DeepLink>,
    /// Set once the inbound path is installed.
    pub is_ready: bool,
}

type Subscriber = Arc<dyn Fn(&HostMessage) + Send + Sync>;

struct Shared {
    state: Mutex<BridgeState>,
    subscribers: Mutex<Vec<(u64, Subscriber)>>,
    next_subscriber: AtomicU64,
    diagnostics: Diagnostics,
}

impl Shared {
    fn receive(&self, envelope: Envelope) {
        let message = match HostMessage::from_envelope(&envelope) {
            Ok(message) => message,
            Err(BridgeError::UnknownType(message_type)) => {
                debug!(%message_type, "ignoring unknown host message");
                self.diagnostics.record(&DiagnosticEvent::UnknownType {
                    side: Side::MiniApp,
                    message_type,
                });
                return;
            }
            Err(e) => {
                self.diagnostics.record(&DiagnosticEvent::InvalidPayload {
                    side: Side::MiniApp,
                    message_type: envelope.message_type().to_owned(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &message {
                HostMessage::UserInfo(user) => state.user_info = Some(user.clone()),
                HostMessage::Notification(n) => state.notification = Some(n.clone()),
                HostMessage::DeepLink(link) => state.deep_link = Some(link.clone()),
            }
        }

        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&message);
        }
    }
}

/// Keeps a [`BridgeClient::subscribe`] callback registered while alive.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    shared: Weak<Shared>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct BridgeClient {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
}

impl BridgeClient {
    /// Probe `context` and connect over the first channel found.
    ///
    /// With no channel available this falls back to a log-only transport,
    /// unless `config.require_native_transport` is set, in which case it
    /// fails with `BridgeError::TransportUnavailable`.
    pub fn connect(
        context: &dyn ScriptContext,
        config: &BridgeConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let transport = select_transport(context, config, diagnostics.clone())?;
        let client = Self::with_transport(transport, diagnostics);
        info!(platform = %client.platform(), "bridge client connected");
        client.log("Mini app initialized");
        Ok(client)
    }

    /// Wrap an already-selected transport.
    pub fn with_transport(transport: Arc<dyn Transport>, diagnostics: Diagnostics) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(BridgeState::default()),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(1),
            diagnostics,
        });

        let weak = Arc::downgrade(&shared);
        transport.on_receive(Arc::new(move |envelope| {
            if let Some(shared) = weak.upgrade() {
                shared.receive(envelope);
            }
        }));
        shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_ready = true;

        Self { transport, shared }
    }

    pub fn platform(&self) -> Platform {
        self.transport.platform()
    }

    /// Running without any host; sends go to the log only.
    pub fn is_standalone(&self) -> bool {
        self.platform() == Platform::Standalone
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Fire and forget. Failures are reported to diagnostics, never returned.
    pub fn send(&self, message: &MiniAppMessage) {
        match message.to_envelope() {
            Ok(envelope) => self.send_envelope(&envelope),
            Err(e) => self.shared.diagnostics.record(&DiagnosticEvent::SerializationFailed {
                side: Side::MiniApp,
                message_type: message.message_type().to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    /// Send an app-specific type outside the built-in contract.
    pub fn send_raw(&self, message_type: &str, data: Option<Value>) {
        match Envelope::new(message_type, data) {
            Ok(envelope) => self.send_envelope(&envelope),
            Err(error) => self.shared.diagnostics.record(&DiagnosticEvent::DecodeFailed {
                side: Side::MiniApp,
                error,
            }),
        }
    }

    fn send_envelope(&self, envelope: &Envelope) {
        match self.transport.send(envelope) {
            Ok(()) => {}
            // Already recorded by the transport.
            Err(BridgeError::PayloadTooLarge { .. }) => {}
            Err(BridgeError::Disposed) => {
                self.shared.diagnostics.record(&DiagnosticEvent::DroppedAfterDispose {
                    side: Side::MiniApp,
                    message_type: envelope.message_type().to_owned(),
                });
            }
            Err(e) => self.shared.diagnostics.record(&DiagnosticEvent::SendFailed {
                side: Side::MiniApp,
                message_type: envelope.message_type().to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn get_user_info(&self) {
        self.send(&MiniAppMessage::GetUserInfo);
    }

    pub fn show_toast(&self, message: impl Into<String>) {
        self.send(&MiniAppMessage::show_toast(message));
    }

    pub fn navigate(&self, screen: impl Into<String>) {
        self.send(&MiniAppMessage::navigate(screen));
    }

    /// Forward to the host console and log locally.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "miniapp", "{message}");
        self.send(&MiniAppMessage::log(message));
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Call `callback` for every recognised host message until the returned
    /// guard is dropped. State is updated before subscribers run.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&HostMessage) + Send + Sync + 'static,
    {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        Subscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.state().user_info
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Dispose the transport and release the receive hook. Later host
    /// messages are dropped silently. Idempotent.
    pub fn teardown(&self) {
        self.transport.dispose();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_ready = false;
    }

    pub fn is_torn_down(&self) -> bool {
        self.transport.is_disposed()
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn select_transport(
    context: &dyn ScriptContext,
    config: &BridgeConfig,
    diagnostics: Diagnostics,
) -> Result<Arc<dyn Transport>> {
    if let Some(interface) = context.javascript_interface(&config.android_interface_name) {
        return Ok(Arc::new(AndroidMiniAppTransport::connect(
            interface,
            context.receive_hook(),
            config.hook_policy,
            config.max_payload_bytes,
            diagnostics,
        )?));
    }

    if let Some(handler) = context.script_message_handler(&config.ios_handler_name) {
        return Ok(Arc::new(IosMiniAppTransport::connect(
            handler,
            context.receive_hook(),
            config.hook_policy,
            config.max_payload_bytes,
            diagnostics,
        )?));
    }

    if let Some(channel) = context.frame() {
        return Ok(Arc::new(WebTransport::mini_app(&channel, config, diagnostics)));
    }

    diagnostics.record(&DiagnosticEvent::TransportUnavailable { side: Side::MiniApp });
    if config.require_native_transport {
        return Err(BridgeError::TransportUnavailable);
    }
    warn!("no host bridge detected; running standalone");
    Ok(Arc::new(StandaloneTransport::with_hook(
        context.receive_hook(),
        config.hook_policy,
        diagnostics,
    )?))
}
