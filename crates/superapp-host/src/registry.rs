// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Message type -> handler mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use superapp_bridge::Transport;
use superapp_core::diagnostics::{DiagnosticEvent, Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::Result;
use superapp_core::message::HostMessage;

use crate::handlers::{self, HostServices};
use crate::ui::{UiContext, UiTask};

/// What a handler can reach while handling one message.
pub struct HandlerContext<'a> {
    message_type: &'a str,
    transport: &'a dyn Transport,
    ui: &'a dyn UiContext,
    diagnostics: &'a Diagnostics,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(
        message_type: &'a str,
        transport: &'a dyn Transport,
        ui: &'a dyn UiContext,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            message_type,
            transport,
            ui,
            diagnostics,
        }
    }

    /// The `type` being handled.
    pub fn message_type(&self) -> &str {
        self.message_type
    }

    /// Push a message back down the transport the request arrived on.
    pub fn reply(&self, message: &HostMessage) -> Result<()> {
        let envelope = message.to_envelope().inspect_err(|e| {
            self.diagnostics.record(&DiagnosticEvent::SerializationFailed {
                side: Side::Host,
                message_type: message.message_type().to_owned(),
                reason: e.to_string(),
            });
        })?;
        self.reply_envelope(&envelope)
    }

    /// Like [`reply`](Self::reply), for app-specific types outside the
    /// built-in contract.
    pub fn reply_envelope(&self, envelope: &Envelope) -> Result<()> {
        self.transport.send(envelope)
    }

    pub fn ui(&self) -> &dyn UiContext {
        self.ui
    }

    /// Schedule `task` on the UI context.
    pub fn run_on_ui(&self, task: UiTask) {
        self.ui.run(task);
    }
}

/// Host-side behavior for one message type.
///
/// Returning `BridgeError::InvalidPayload` marks the message as malformed;
/// any other error is logged as a handler failure. Either way the bridge
/// keeps dispatching.
pub trait Handler: Send + Sync {
    fn handle(&self, data: Option<&Value>, ctx: &HandlerContext<'_>) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(Option<&Value>, &HandlerContext<'_>) -> Result<()> + Send + Sync,
{
    fn handle(&self, data: Option<&Value>, ctx: &HandlerContext<'_>) -> Result<()> {
        self(data, ctx)
    }
}

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry serving `getUserInfo`, `showToast`, `navigate` and `log`.
    pub fn with_builtin_handlers(services: HostServices) -> Self {
        let mut registry = Self::new();
        handlers::register_builtins(&mut registry, services);
        registry
    }

    /// Register `handler` for `message_type`, returning the one it replaced.
    pub fn register<H>(&mut self, message_type: impl Into<String>, handler: H) -> Option<Arc<dyn Handler>>
    where
        H: Handler + 'static,
    {
        self.handlers.insert(message_type.into(), Arc::new(handler))
    }

    /// Register a closure.
    pub fn register_fn<F>(&mut self, message_type: impl Into<String>, handler: F) -> Option<Arc<dyn Handler>>
    where
        F: Fn(Option<&Value>, &HandlerContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.register(message_type, handler)
    }

    pub fn unregister(&mut self, message_type: &str) -> bool {
        self.handlers.remove(message_type).is_some()
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    pub fn get(&self, message_type: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(message_type).cloned()
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
