// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The global receive function of one script context.
//
// Native hosts push messages down by evaluating
// `window.receiveFromNative && window.receiveFromNative(<json>)`. That global
// is process-wide mutable state inside the page, so ownership is explicit:
// installing returns a token, and only the holder of the current token can
// remove the hook. A client that lost the hook to a newer one cannot tear
// the newer one down.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use superapp_core::config::HookPolicy;
use superapp_core::error::{BridgeError, Result};
use tracing::debug;
use uuid::Uuid;

use crate::listener::ListenerSlot;
use crate::script::envelope_from_script_value;

/// The function installed as the page's receive hook. It receives the
/// argument the native side passed, already as a script value.
pub type HookFn = Arc<dyn Fn(Value) + Send + Sync>;

/// Proof of ownership of an installed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookToken(Uuid);

impl std::fmt::Display for HookToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One script context's `window.<receiver>` slot.
#[derive(Default)]
pub struct ReceiveHook {
    slot: Mutex<Option<(HookToken, HookFn)>>,
}

impl ReceiveHook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install `hook` according to `policy`.
    ///
    /// Under `Replace` the swap is atomic: there is no instant at which a
    /// message finds both or neither hook. Under `Reject` a live owner makes
    /// this fail with `BridgeError::HookOccupied`.
    pub fn install(&self, policy: HookPolicy, hook: HookFn) -> Result<HookToken> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((owner, _)) = slot.as_ref() {
            match policy {
                HookPolicy::Reject => return Err(BridgeError::HookOccupied),
                HookPolicy::Replace => debug!(previous = %owner, "replacing receive hook"),
            }
        }
        let token = HookToken(Uuid::new_v4());
        *slot = Some((token, hook));
        Ok(token)
    }

    /// Remove the hook if `token` still owns it. Returns whether it did.
    pub fn remove(&self, token: HookToken) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((owner, _)) if *owner == token => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn owner(&self) -> Option<HookToken> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(token, _)| *token)
    }

    pub fn is_installed(&self) -> bool {
        self.owner().is_some()
    }

    /// What `window.receiveFromNative && window.receiveFromNative(message)`
    /// does: call the hook if one is installed. Returns whether one ran.
    pub fn invoke(&self, message: Value) -> bool {
        let hook = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, hook)| hook.clone());
        match hook {
            Some(hook) => {
                hook(message);
                true
            }
            None => false,
        }
    }
}

/// A transport's claim on a receive hook, feeding its listener slot.
pub(crate) struct HookBinding {
    hook: Arc<ReceiveHook>,
    token: HookToken,
}

impl HookBinding {
    pub(crate) fn bind(
        hook: Arc<ReceiveHook>,
        policy: HookPolicy,
        slot: Arc<ListenerSlot>,
    ) -> Result<Self> {
        let token = hook.install(
            policy,
            Arc::new(move |value| match envelope_from_script_value(value) {
                Ok(envelope) => {
                    slot.deliver(envelope);
                }
                Err(error) => slot.report_decode_failure(error),
            }),
        )?;
        Ok(Self { hook, token })
    }

    pub(crate) fn token(&self) -> HookToken {
        self.token
    }

    /// Give the hook back, unless a newer owner has taken it.
    pub(crate) fn release(&self) -> bool {
        self.hook.remove(self.token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use serde_json::json;

    fn counting(counter: &Arc<AtomicUsize>) -> HookFn {
        let counter = counter.clone();
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn replace_policy_swaps_owner() {
        let hook = ReceiveHook::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));

        let first = hook.install(HookPolicy::Replace, counting(&old)).expect("install");
        let second = hook.install(HookPolicy::Replace, counting(&new)).expect("install");
        assert_ne!(first, second);

        assert!(hook.invoke(json!({"type": "userInfo"})));
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);

        // The displaced owner cannot remove its successor.
        assert!(!hook.remove(first));
        assert_eq!(hook.owner(), Some(second));
        assert!(hook.remove(second));
        assert!(!hook.is_installed());
    }

    #[test]
    fn reject_policy_refuses_second_owner() {
        let hook = ReceiveHook::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let token = hook.install(HookPolicy::Reject, counting(&counter)).expect("install");

        assert!(matches!(
            hook.install(HookPolicy::Reject, counting(&counter)),
            Err(BridgeError::HookOccupied)
        ));
        assert_eq!(hook.owner(), Some(token));

        assert!(hook.remove(token));
        assert!(hook.install(HookPolicy::Reject, counting(&counter)).is_ok());
    }

    #[test]
    fn invoke_without_hook_is_a_no_op() {
        let hook = ReceiveHook::new();
        assert!(!hook.invoke(json!({"type": "userInfo"})));
    }
}
