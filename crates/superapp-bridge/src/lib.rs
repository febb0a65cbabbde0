// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! SuperApp — transport adapters.
//!
//! Each platform offers a different raw channel between a host and the
//! script context of an embedded mini-app:
//!
//! - Android: a JS interface object (`window.AndroidBridge.postMessage(json)`)
//!   up, `WebView.evaluateJavascript` down.
//! - iOS: a `WKScriptMessageHandler` (`webkit.messageHandlers.nativeApp`) up,
//!   `WKWebView.evaluateJavaScript` down.
//! - Web: `postMessage` in both directions between a page and its iframe.
//!
//! Every adapter wraps one of these into the same [`Transport`] contract.
//! The raw channels themselves are traits so the adapters can run against
//! real platform glue (`android::webview`, `ios::webkit`) or the in-memory
//! simulator in [`sim`].

pub mod android;
pub mod context;
pub mod hook;
pub mod ios;
pub mod script;
pub mod sim;
pub mod stub;
pub mod traits;
pub mod web;

mod listener;

pub use context::{FrameChannel, ScriptContext};
pub use hook::{HookFn, HookToken, ReceiveHook};
pub use traits::{Platform, ReceiveCallback, Transport};
