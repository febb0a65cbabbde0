// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SuperApp — mini-app bridge client.

pub mod client;

pub use client::{BridgeClient, BridgeState, Subscription};
