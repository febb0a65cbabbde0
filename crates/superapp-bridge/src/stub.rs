// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standalone transport for a mini-app opened outside any host (a desktop
// browser during development, or CI).
//
// Outbound messages are logged and otherwise discarded. The receive hook is
// still claimed, so a developer tool that calls the page's receive function
// by hand reaches the listener exactly as a native host would.

use std::sync::Arc;

use superapp_core::config::HookPolicy;
use superapp_core::diagnostics::{Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::{BridgeError, Result};

use crate::hook::{HookBinding, ReceiveHook};
use crate::listener::ListenerSlot;
use crate::traits::{Platform, ReceiveCallback, Transport};

pub struct StandaloneTransport {
    binding: Option<HookBinding>,
    slot: Arc<ListenerSlot>,
}

impl StandaloneTransport {
    /// A transport with no inbound path at all.
    pub fn new(side: Side, diagnostics: Diagnostics) -> Self {
        Self {
            binding: None,
            slot: Arc::new(ListenerSlot::new(side, diagnostics)),
        }
    }

    /// A mini-app transport that still owns the page's receive hook.
    pub fn with_hook(
        hook: Arc<ReceiveHook>,
        policy: HookPolicy,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let slot = Arc::new(ListenerSlot::new(Side::MiniApp, diagnostics));
        let binding = HookBinding::bind(hook, policy, slot.clone())?;
        Ok(Self {
            binding: Some(binding),
            slot,
        })
    }
}

impl Transport for StandaloneTransport {
    fn platform(&self) -> Platform {
        Platform::Standalone
    }

    fn side(&self) -> Side {
        self.slot.side()
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        if self.slot.is_disposed() {
            return Err(BridgeError::Disposed);
        }
        tracing::info!(
            message_type = envelope.message_type(),
            data = ?envelope.data(),
            "standalone: no native channel, message not delivered"
        );
        Ok(())
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        self.slot.set(callback);
    }

    fn dispose(&self) {
        if self.slot.dispose() {
            if let Some(binding) = &self.binding {
                binding.release();
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.slot.is_disposed()
    }
}

impl Drop for StandaloneTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}
