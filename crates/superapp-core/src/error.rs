// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the bridge.
//
// None of these ever cross the native/script boundary as a panic. Adapters
// and the dispatcher convert them into diagnostics and drop the message.

use thiserror::Error;

/// Why a wire string or platform value could not be read as an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not valid JSON: {0}")]
    InvalidJson(String),

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("envelope has no non-empty `type` field")]
    MissingType,

    #[error("envelope `type` is not a string")]
    TypeNotString,
}

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Wire format --
    #[error("malformed envelope: {0}")]
    Decode(#[from] DecodeError),

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid `{message_type}` payload: {reason}")]
    InvalidPayload { message_type: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Transport --
    #[error("no native bridge channel available in this environment")]
    TransportUnavailable,

    #[error("transport has been disposed")]
    Disposed,

    #[error("payload of {size} bytes exceeds the transport limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("platform channel error: {0}")]
    Platform(String),

    #[error("another bridge client already owns the receive hook")]
    HookOccupied,

    // -- Host --
    #[error("handler for `{message_type}` failed: {reason}")]
    Handler { message_type: String, reason: String },

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BridgeError>;
