// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-listener cell shared by every adapter.
//
// Platform entry points hold an `Arc<ListenerSlot>` rather than the user
// callback, so a stale platform reference that fires after `dispose` lands
// here and is dropped instead of reaching torn-down state.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use superapp_core::diagnostics::{DiagnosticEvent, Diagnostics, Side};
use superapp_core::envelope::Envelope;
use superapp_core::error::DecodeError;
use tracing::debug;

use crate::traits::ReceiveCallback;

pub(crate) struct ListenerSlot {
    side: Side,
    callback: Mutex<Option<ReceiveCallback>>,
    disposed: AtomicBool,
    diagnostics: Diagnostics,
}

impl ListenerSlot {
    pub(crate) fn new(side: Side, diagnostics: Diagnostics) -> Self {
        Self {
            side,
            callback: Mutex::new(None),
            disposed: AtomicBool::new(false),
            diagnostics,
        }
    }

    pub(crate) fn side(&self) -> Side {
        self.side
    }

    pub(crate) fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Replace the registered callback.
    pub(crate) fn set(&self, callback: ReceiveCallback) {
        if self.is_disposed() {
            debug!(side = %self.side, "ignoring listener registration on disposed transport");
            return;
        }
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Hand an inbound envelope to the current callback.
    ///
    /// The callback runs outside the lock so it may send, re-register or
    /// dispose. A panicking callback is contained and reported.
    pub(crate) fn deliver(&self, envelope: Envelope) -> bool {
        if self.is_disposed() {
            self.diagnostics.record(&DiagnosticEvent::DroppedAfterDispose {
                side: self.side,
                message_type: envelope.message_type().to_owned(),
            });
            return false;
        }

        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(callback) = callback else {
            debug!(side = %self.side, message_type = envelope.message_type(), "no listener registered");
            return false;
        };

        let message_type = envelope.message_type().to_owned();
        if catch_unwind(AssertUnwindSafe(|| callback(envelope))).is_err() {
            self.diagnostics.record(&DiagnosticEvent::HandlerFailed {
                side: self.side,
                message_type,
                reason: "listener panicked".into(),
            });
        }
        true
    }

    pub(crate) fn report_decode_failure(&self, error: DecodeError) {
        self.diagnostics.record(&DiagnosticEvent::DecodeFailed {
            side: self.side,
            error,
        });
    }

    /// Mark disposed and drop the callback. Returns `true` only for the
    /// call that performed the transition.
    pub(crate) fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use superapp_core::diagnostics::{DiagnosticKind, MemorySink};

    fn envelope(tag: &str) -> Envelope {
        Envelope::new(tag, None).expect("envelope")
    }

    #[test]
    fn replacement_invokes_only_newest() {
        let slot = ListenerSlot::new(Side::Host, MemorySink::new());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        slot.set(Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }));
        let s = second.clone();
        slot.set(Arc::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(slot.deliver(envelope("log")));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delivery_after_dispose_is_dropped_and_reported() {
        let sink = MemorySink::new();
        let slot = ListenerSlot::new(Side::MiniApp, sink.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        slot.set(Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(slot.dispose());
        assert!(!slot.dispose());
        assert!(!slot.deliver(envelope("userInfo")));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(sink.count(DiagnosticKind::DroppedAfterDispose), 1);
    }

    #[test]
    fn panicking_listener_is_contained() {
        let sink = MemorySink::new();
        let slot = ListenerSlot::new(Side::Host, sink.clone());
        slot.set(Arc::new(|_| panic!("boom")));

        assert!(slot.deliver(envelope("log")));
        assert!(slot.deliver(envelope("log")));
        assert_eq!(sink.count(DiagnosticKind::HandlerFailed), 2);
    }
}
