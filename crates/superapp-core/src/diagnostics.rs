// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Observability hook for everything the bridge drops.
//
// The bridge degrades instead of failing: malformed, unknown, forged or late
// messages are dropped at the boundary where they arrive. Each drop is
// reported to a `DiagnosticSink` so a host can watch decode-failure and
// unknown-type rates in production. Sinks never fail.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DecodeError;

/// Which end of the bridge observed the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Host,
    MiniApp,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::MiniApp => f.write_str("mini-app"),
        }
    }
}

/// Why a web message event was not treated as a bridge message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// `event.source` is not the paired window.
    UnexpectedSource,
    /// `event.origin` differs from the configured target origin.
    UnexpectedOrigin { expected: String },
}

/// Something the bridge dropped or degraded on.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    DecodeFailed {
        side: Side,
        error: DecodeError,
    },
    UnknownType {
        side: Side,
        message_type: String,
    },
    InvalidPayload {
        side: Side,
        message_type: String,
        reason: String,
    },
    SerializationFailed {
        side: Side,
        message_type: String,
        reason: String,
    },
    HandlerFailed {
        side: Side,
        message_type: String,
        reason: String,
    },
    RejectedMessage {
        side: Side,
        origin: String,
        reason: RejectReason,
    },
    DroppedAfterDispose {
        side: Side,
        message_type: String,
    },
    PayloadTooLarge {
        side: Side,
        size: usize,
        limit: usize,
    },
    SendFailed {
        side: Side,
        message_type: String,
        reason: String,
    },
    TransportUnavailable {
        side: Side,
    },
}

/// Discriminant of a `DiagnosticEvent`, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    DecodeFailed,
    UnknownType,
    InvalidPayload,
    SerializationFailed,
    HandlerFailed,
    RejectedMessage,
    DroppedAfterDispose,
    PayloadTooLarge,
    SendFailed,
    TransportUnavailable,
}

impl DiagnosticEvent {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::DecodeFailed { .. } => DiagnosticKind::DecodeFailed,
            Self::UnknownType { .. } => DiagnosticKind::UnknownType,
            Self::InvalidPayload { .. } => DiagnosticKind::InvalidPayload,
            Self::SerializationFailed { .. } => DiagnosticKind::SerializationFailed,
            Self::HandlerFailed { .. } => DiagnosticKind::HandlerFailed,
            Self::RejectedMessage { .. } => DiagnosticKind::RejectedMessage,
            Self::DroppedAfterDispose { .. } => DiagnosticKind::DroppedAfterDispose,
            Self::PayloadTooLarge { .. } => DiagnosticKind::PayloadTooLarge,
            Self::SendFailed { .. } => DiagnosticKind::SendFailed,
            Self::TransportUnavailable { .. } => DiagnosticKind::TransportUnavailable,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Self::DecodeFailed { side, .. }
            | Self::UnknownType { side, .. }
            | Self::InvalidPayload { side, .. }
            | Self::SerializationFailed { side, .. }
            | Self::HandlerFailed { side, .. }
            | Self::RejectedMessage { side, .. }
            | Self::DroppedAfterDispose { side, .. }
            | Self::PayloadTooLarge { side, .. }
            | Self::SendFailed { side, .. }
            | Self::TransportUnavailable { side } => *side,
        }
    }
}

/// Receiver of bridge diagnostics. Implementations must not panic.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);
}

/// Shared handle passed to every adapter, dispatcher and client.
pub type Diagnostics = Arc<dyn DiagnosticSink>;

/// Default sink: one structured log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> Diagnostics {
        Arc::new(Self)
    }
}

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &DiagnosticEvent) {
        let side = event.side();
        match event {
            DiagnosticEvent::DecodeFailed { error, .. } => {
                warn!(%side, %error, "dropping malformed envelope");
            }
            DiagnosticEvent::UnknownType { message_type, .. } => {
                warn!(%side, %message_type, "unknown message type");
            }
            DiagnosticEvent::InvalidPayload {
                message_type,
                reason,
                ..
            } => {
                warn!(%side, %message_type, %reason, "dropping message with invalid payload");
            }
            DiagnosticEvent::SerializationFailed {
                message_type,
                reason,
                ..
            } => {
                warn!(%side, %message_type, %reason, "outbound payload is not representable as JSON");
            }
            DiagnosticEvent::HandlerFailed {
                message_type,
                reason,
                ..
            } => {
                warn!(%side, %message_type, %reason, "handler failed");
            }
            DiagnosticEvent::RejectedMessage { origin, reason, .. } => {
                warn!(%side, %origin, ?reason, "rejected message from untrusted window");
            }
            DiagnosticEvent::DroppedAfterDispose { message_type, .. } => {
                debug!(%side, %message_type, "message arrived after teardown");
            }
            DiagnosticEvent::PayloadTooLarge { size, limit, .. } => {
                warn!(%side, size, limit, "payload exceeds transport limit");
            }
            DiagnosticEvent::SendFailed {
                message_type,
                reason,
                ..
            } => {
                warn!(%side, %message_type, %reason, "send failed");
            }
            DiagnosticEvent::TransportUnavailable { .. } => {
                warn!(%side, "no native bridge channel; using standalone fallback");
            }
        }
    }
}

/// A recorded event with the time it was observed.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub at: DateTime<Utc>,
    pub event: DiagnosticEvent,
}

/// Keeps every event in memory. Used by tests and by hosts that export
/// drop rates.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.lock().iter().filter(|e| e.event.kind() == kind).count()
    }

    pub fn counts(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.lock().iter() {
            *counts.entry(entry.event.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        self.lock().push(RecordedEvent {
            at: Utc::now(),
            event: event.clone(),
        });
    }
}

/// Forwards each event to several sinks.
pub struct FanoutSink {
    sinks: Vec<Diagnostics>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Diagnostics>) -> Self {
        Self { sinks }
    }
}

impl DiagnosticSink for FanoutSink {
    fn record(&self, event: &DiagnosticEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
