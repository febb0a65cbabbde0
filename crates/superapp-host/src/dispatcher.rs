// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The single place inbound mini-app messages are interpreted.
//
// Dispatch is lookup-and-invoke. Unknown types, malformed payloads, handler
// errors and handler panics are all reported and contained per message; none
// of them disable the bridge or reach the mini-app.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use superapp_bridge::{Platform, Transport};
use superapp_core::diagnostics::{DiagnosticEvent, Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::{BridgeError, Result};
use superapp_core::message::HostMessage;
use tracing::{debug, info, instrument, warn};

use crate::registry::{Handler, HandlerContext, HandlerRegistry};
use crate::ui::UiContext;

/// What happened to one inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// No handler for the type; logged and ignored.
    UnknownType,
    /// The handler rejected the payload shape.
    InvalidPayload,
    /// The handler returned an error or panicked.
    Failed,
    /// The dispatcher was detached.
    Detached,
}

struct Inner {
    transport: Arc<dyn Transport>,
    registry: RwLock<HandlerRegistry>,
    ui: Arc<dyn UiContext>,
    diagnostics: Diagnostics,
}

/// Host end of one bridge instance.
pub struct HostDispatcher {
    inner: Arc<Inner>,
}

impl HostDispatcher {
    /// Start routing everything `transport` receives through `registry`.
    pub fn attach(
        transport: Arc<dyn Transport>,
        registry: HandlerRegistry,
        ui: Arc<dyn UiContext>,
        diagnostics: Diagnostics,
    ) -> Self {
        let inner = Arc::new(Inner {
            transport,
            registry: RwLock::new(registry),
            ui,
            diagnostics,
        });

        // Weak: the transport owns this callback.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.transport.on_receive(Arc::new(move |envelope| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(&envelope);
            }
        }));

        info!(platform = %inner.transport.platform(), "host dispatcher attached");
        Self { inner }
    }

    pub fn platform(&self) -> Platform {
        self.inner.transport.platform()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Route one envelope as if it had arrived on the transport.
    pub fn dispatch(&self, envelope: &Envelope) -> DispatchOutcome {
        self.inner.dispatch(envelope)
    }

    /// Push a message down to the mini-app.
    pub fn send(&self, message: &HostMessage) -> Result<()> {
        let envelope = message.to_envelope().inspect_err(|e| {
            self.inner.diagnostics.record(&DiagnosticEvent::SerializationFailed {
                side: Side::Host,
                message_type: message.message_type().to_owned(),
                reason: e.to_string(),
            });
        })?;
        self.send_envelope(&envelope)
    }

    pub fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        self.inner.transport.send(envelope).inspect_err(|e| {
            if !matches!(e, BridgeError::PayloadTooLarge { .. }) {
                self.inner.diagnostics.record(&DiagnosticEvent::SendFailed {
                    side: Side::Host,
                    message_type: envelope.message_type().to_owned(),
                    reason: e.to_string(),
                });
            }
        })
    }

    pub fn register<H>(&self, message_type: impl Into<String>, handler: H)
    where
        H: Handler + 'static,
    {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(message_type, handler);
    }

    pub fn unregister(&self, message_type: &str) -> bool {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unregister(message_type)
    }

    pub fn handles(&self, message_type: &str) -> bool {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(message_type)
    }

    /// Tear down: the transport removes its platform listener and later
    /// deliveries are dropped. Idempotent.
    pub fn detach(&self) {
        self.inner.transport.dispose();
    }

    pub fn is_detached(&self) -> bool {
        self.inner.transport.is_disposed()
    }
}

impl Drop for HostDispatcher {
    fn drop(&mut self) {
        self.detach();
    }
}

impl Inner {
    #[instrument(skip_all, fields(message_type = envelope.message_type()))]
    fn dispatch(&self, envelope: &Envelope) -> DispatchOutcome {
        if self.transport.is_disposed() {
            self.diagnostics.record(&DiagnosticEvent::DroppedAfterDispose {
                side: Side::Host,
                message_type: envelope.message_type().to_owned(),
            });
            return DispatchOutcome::Detached;
        }

        let message_type = envelope.message_type();
        let handler = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_type);
        let Some(handler) = handler else {
            warn!("no handler registered; ignoring");
            self.diagnostics.record(&DiagnosticEvent::UnknownType {
                side: Side::Host,
                message_type: message_type.to_owned(),
            });
            return DispatchOutcome::UnknownType;
        };

        let ctx = HandlerContext::new(
            message_type,
            self.transport.as_ref(),
            self.ui.as_ref(),
            &self.diagnostics,
        );
        let result = catch_unwind(AssertUnwindSafe(|| handler.handle(envelope.data(), &ctx)));

        match result {
            Ok(Ok(())) => {
                debug!("handled");
                DispatchOutcome::Handled
            }
            Ok(Err(BridgeError::InvalidPayload { reason, .. })) => {
                self.diagnostics.record(&DiagnosticEvent::InvalidPayload {
                    side: Side::Host,
                    message_type: message_type.to_owned(),
                    reason,
                });
                DispatchOutcome::InvalidPayload
            }
            Ok(Err(e)) => {
                self.diagnostics.record(&DiagnosticEvent::HandlerFailed {
                    side: Side::Host,
                    message_type: message_type.to_owned(),
                    reason: e.to_string(),
                });
                DispatchOutcome::Failed
            }
            Err(_) => {
                self.diagnostics.record(&DiagnosticEvent::HandlerFailed {
                    side: Side::Host,
                    message_type: message_type.to_owned(),
                    reason: "handler panicked".into(),
                });
                DispatchOutcome::Failed
            }
        }
    }
}
