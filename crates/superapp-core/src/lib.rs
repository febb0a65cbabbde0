// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SuperApp — wire format, payload contract and error definitions shared by
// the host dispatcher, the transport adapters and the mini-app client.

pub mod config;
pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod message;

pub use config::{BridgeConfig, HookPolicy, TargetOrigin};
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, Diagnostics, Side};
pub use envelope::{Envelope, decode, encode};
pub use error::{BridgeError, DecodeError, Result};
pub use message::*;
