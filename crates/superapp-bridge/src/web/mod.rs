// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Browser transport: `postMessage` between a host page and its iframe.
//
// Unlike the native channels, any window can post into any other, so every
// inbound `message` event is checked before it reaches the listener:
//
// 1. `event.source` must be the peer window this transport was built for;
// 2. `event.origin` must be admitted by the configured target origin.
//
// Rejected events are reported as `RejectedMessage` and dropped.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use superapp_core::config::{BridgeConfig, TargetOrigin};
use superapp_core::diagnostics::{DiagnosticEvent, Diagnostics, RejectReason, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::{BridgeError, Result};
use tracing::{debug, info};

use crate::context::FrameChannel;
use crate::listener::ListenerSlot;
use crate::script::envelope_from_script_value;
use crate::traits::{Platform, ReceiveCallback, Transport, enforce_limit};

/// Identity of a browsing context, as compared through `event.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A `message` event as seen by a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Origin of the sending window.
    pub origin: String,
    /// The sending window, when it is still reachable.
    pub source: Option<WindowId>,
    pub data: Value,
}

pub type MessageListener = Arc<dyn Fn(MessageEvent) + Send + Sync>;

/// A window reference held by some script context.
///
/// Messages posted through a handle carry the holder's window as `source`
/// and the holder's origin as `origin`, the way a browser stamps them.
pub trait Window: Send + Sync {
    fn id(&self) -> WindowId;

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId;

    fn remove_message_listener(&self, id: ListenerId) -> bool;

    /// `window.postMessage(message, targetOrigin)`. Delivery is dropped by
    /// the browser when the window's origin does not match `target_origin`.
    fn post_message(&self, message: Value, target_origin: &str) -> Result<()>;
}

/// One end of a page/frame `postMessage` pair.
pub struct WebTransport {
    side: Side,
    own: Arc<dyn Window>,
    peer: Arc<dyn Window>,
    target_origin: TargetOrigin,
    max_payload_bytes: Option<usize>,
    listener: Mutex<Option<ListenerId>>,
    slot: Arc<ListenerSlot>,
}

impl WebTransport {
    /// Listen on `own` for messages from `peer`, and post to `peer`.
    pub fn new(
        side: Side,
        own: Arc<dyn Window>,
        peer: Arc<dyn Window>,
        target_origin: TargetOrigin,
        max_payload_bytes: Option<usize>,
        diagnostics: Diagnostics,
    ) -> Self {
        let slot = Arc::new(ListenerSlot::new(side, diagnostics));

        let inbound = slot.clone();
        let expected_source = peer.id();
        let expected_origin = target_origin.clone();
        let listener = own.add_message_listener(Arc::new(move |event: MessageEvent| {
            if event.source != Some(expected_source) {
                inbound.diagnostics().record(&DiagnosticEvent::RejectedMessage {
                    side,
                    origin: event.origin,
                    reason: RejectReason::UnexpectedSource,
                });
                return;
            }
            if !expected_origin.admits(&event.origin) {
                inbound.diagnostics().record(&DiagnosticEvent::RejectedMessage {
                    side,
                    origin: event.origin,
                    reason: RejectReason::UnexpectedOrigin {
                        expected: expected_origin.to_string(),
                    },
                });
                return;
            }
            match envelope_from_script_value(event.data) {
                Ok(envelope) => {
                    inbound.deliver(envelope);
                }
                Err(error) => inbound.report_decode_failure(error),
            }
        }));

        info!(%side, own = own.id().0, peer = peer.id().0, %target_origin, "web bridge attached");
        Self {
            side,
            own,
            peer,
            target_origin,
            max_payload_bytes,
            listener: Mutex::new(Some(listener)),
            slot,
        }
    }

    /// Host end: listen on the host window, post into the frame.
    pub fn host(
        own: Arc<dyn Window>,
        frame: Arc<dyn Window>,
        target_origin: TargetOrigin,
        config: &BridgeConfig,
        diagnostics: Diagnostics,
    ) -> Self {
        Self::new(
            Side::Host,
            own,
            frame,
            target_origin,
            config.max_payload_bytes,
            diagnostics,
        )
    }

    /// Mini-app end: listen on the frame's own window, post to the parent.
    pub fn mini_app(channel: &FrameChannel, config: &BridgeConfig, diagnostics: Diagnostics) -> Self {
        Self::new(
            Side::MiniApp,
            channel.own.clone(),
            channel.parent.clone(),
            config.target_origin.clone(),
            config.max_payload_bytes,
            diagnostics,
        )
    }

    pub fn target_origin(&self) -> &TargetOrigin {
        &self.target_origin
    }
}

impl Transport for WebTransport {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn side(&self) -> Side {
        self.side
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        if self.slot.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        enforce_limit(
            &envelope.to_wire(),
            self.max_payload_bytes,
            self.side,
            self.slot.diagnostics(),
        )?;
        self.peer
            .post_message(envelope.to_value(), self.target_origin.as_str())
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        self.slot.set(callback);
    }

    fn dispose(&self) {
        if !self.slot.dispose() {
            return;
        }
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = listener {
            if !self.own.remove_message_listener(id) {
                debug!(side = %self.side, "message listener was already gone");
            }
        }
        info!(side = %self.side, "web bridge detached");
    }

    fn is_disposed(&self) -> bool {
        self.slot.is_disposed()
    }
}

impl Drop for WebTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}
