// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The script native hosts evaluate to push an envelope into the page.
//
//   window.receiveFromNative && window.receiveFromNative({"type":"userInfo",...})
//
// The envelope is inlined as an object literal. U+2028 and U+2029 are legal
// in JSON but terminate string literals in older JavaScript engines, so they
// are escaped before inlining.

use serde_json::Value;
use superapp_core::envelope::{Envelope, decode};
use superapp_core::error::DecodeError;

/// Build the receiver-call script for `envelope`.
pub fn receiver_call(function: &str, envelope: &Envelope) -> String {
    let json = envelope
        .to_wire()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    format!("window.{function} && window.{function}({json})")
}

/// Split a script produced by [`receiver_call`] into the function name and
/// the inlined JSON argument. Anything else yields `None`.
pub fn parse_receiver_call(script: &str) -> Option<(&str, &str)> {
    let rest = script.trim().strip_prefix("window.")?;
    let (function, call) = rest.split_once(" && ")?;
    let argument = call
        .strip_prefix("window.")?
        .strip_prefix(function)?
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some((function, argument))
}

/// Read a script-side value as an envelope. Pages normally pass an object;
/// a JSON string is accepted too since some hosts post pre-serialized text.
pub fn envelope_from_script_value(value: Value) -> Result<Envelope, DecodeError> {
    match value {
        Value::String(wire) => decode(&wire),
        other => Envelope::from_value(other),
    }
}
