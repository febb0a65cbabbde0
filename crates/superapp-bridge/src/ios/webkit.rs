// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// C-ABI glue between `ScriptMessageHost` and a real `WKWebView`.
//
// The Swift host keeps ownership of the web view and its
// `WKUserContentController`. It hands Rust two callbacks when it creates the
// bridge, and forwards every `userContentController(_:didReceive:)` to
// `superapp_ios_did_receive` with the handle it was given on registration.
//
// ## Unsafe usage
//
// - The callbacks and their context pointer come from Swift and must stay
//   valid until `WebKitView` is dropped.
// - `message.body` is passed as a raw `id`. It is retained for the duration
//   of the call only.

use std::collections::HashMap;
use std::ffi::{CString, c_char, c_void};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_foundation::{NSJSONSerialization, NSJSONWritingOptions, NSString};
use serde_json::Value;
use superapp_core::error::{BridgeError, Result};
use tracing::{debug, warn};

use super::{ScriptMessageEntry, ScriptMessageHost};

/// `evaluateJavaScript(script)` on the main thread.
pub type EvaluateCallback = unsafe extern "C" fn(context: *mut c_void, script: *const c_char);

/// `add(handle != 0)` or `removeScriptMessageHandler(forName:)` (handle 0).
pub type HandlerCallback =
    unsafe extern "C" fn(context: *mut c_void, name: *const c_char, handle: u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn entries() -> &'static Mutex<HashMap<u64, ScriptMessageEntry>> {
    static ENTRIES: OnceLock<Mutex<HashMap<u64, ScriptMessageEntry>>> = OnceLock::new();
    ENTRIES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|e| BridgeError::Platform(format!("interior NUL: {e}")))
}

/// A `ScriptMessageHost` driven through Swift callbacks.
pub struct WebKitView {
    context: *mut c_void,
    evaluate: EvaluateCallback,
    set_handler: HandlerCallback,
    handles: Mutex<HashMap<String, u64>>,
}

// SAFETY: the Swift side dispatches both callbacks onto the main queue
// itself, so they may be invoked from any thread.
unsafe impl Send for WebKitView {}
unsafe impl Sync for WebKitView {}

impl WebKitView {
    /// # Safety
    ///
    /// `context` must remain valid, and both callbacks callable with it,
    /// until the returned value is dropped.
    pub unsafe fn new(
        context: *mut c_void,
        evaluate: EvaluateCallback,
        set_handler: HandlerCallback,
    ) -> Self {
        Self {
            context,
            evaluate,
            set_handler,
            handles: Mutex::new(HashMap::new()),
        }
    }
}

impl ScriptMessageHost for WebKitView {
    fn add_script_message_handler(&self, name: &str, entry: ScriptMessageEntry) -> Result<()> {
        let c_name = c_string(name)?;
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        entries()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, entry);
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), handle);

        // SAFETY: guaranteed by the contract of `WebKitView::new`.
        unsafe { (self.set_handler)(self.context, c_name.as_ptr(), handle) };
        debug!(name, handle, "ios: script message handler added");
        Ok(())
    }

    fn remove_script_message_handler(&self, name: &str) -> Result<()> {
        let c_name = c_string(name)?;
        let handle = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if let Some(handle) = handle {
            entries()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&handle);
        }
        // SAFETY: as above.
        unsafe { (self.set_handler)(self.context, c_name.as_ptr(), 0) };
        Ok(())
    }

    fn evaluate_javascript(&self, script: &str) -> Result<()> {
        let c_script = c_string(script)?;
        // SAFETY: as above.
        unsafe { (self.evaluate)(self.context, c_script.as_ptr()) };
        Ok(())
    }
}

/// Convert a structured-clone message body into a JSON value.
///
/// Strings pass through as `Value::String`; everything else goes through
/// `NSJSONSerialization`.
fn body_to_value(body: &AnyObject) -> Result<Value> {
    if let Some(text) = body.downcast_ref::<NSString>() {
        return Ok(Value::String(text.to_string()));
    }

    // SAFETY: `isValidJSONObject` guards `dataWithJSONObject`, which raises
    // an Objective-C exception on non-serializable input.
    let data = unsafe {
        if !NSJSONSerialization::isValidJSONObject(body) {
            return Err(BridgeError::Platform("message body is not JSON-serializable".into()));
        }
        NSJSONSerialization::dataWithJSONObject_options_error(body, NSJSONWritingOptions::empty())
    }
    .map_err(|e| BridgeError::Platform(format!("NSJSONSerialization: {e}")))?;

    Ok(serde_json::from_slice(&data.to_vec())?)
}

/// Forward one `WKScriptMessage` body to the handler registered as `handle`.
///
/// # Safety
///
/// `body` must be null or a valid Objective-C object pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn superapp_ios_did_receive(handle: u64, body: *mut AnyObject) {
    // SAFETY: caller guarantees `body` is null or a live object.
    let Some(body): Option<Retained<AnyObject>> = (unsafe { Retained::retain(body) }) else {
        debug!(handle, "ios: message with nil body");
        return;
    };

    let value = match body_to_value(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "ios: unreadable message body");
            return;
        }
    };

    let entry = entries()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&handle)
        .cloned();
    match entry {
        Some(entry) => entry(value),
        None => debug!(handle, "ios: message for a removed handler"),
    }
}
