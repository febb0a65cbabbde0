// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI glue between `WebViewHost` and a real `android.webkit.WebView`.
//
// The host app owns a small Kotlin helper, `com.example.superapp.NativeBridge`,
// wrapping its WebView:
//
//   class NativeBridge(private val webView: WebView) {
//       fun attachInterface(name: String, handle: Long)   // addJavascriptInterface
//       fun detachInterface(name: String)                 // removeJavascriptInterface
//       fun evaluateOnUiThread(script: String)            // post { evaluateJavascript }
//       external fun nativePostMessage(handle: Long, json: String)
//   }
//
// The object exposed to the page forwards its `@JavascriptInterface
// postMessage(json)` to `nativePostMessage` with the handle it was created
// with. Handles index a process-wide table of `InterfaceEntry` closures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::jlong;
use jni::{JNIEnv, JavaVM};
use superapp_core::error::{BridgeError, Result};
use tracing::{debug, warn};

use super::{InterfaceEntry, WebViewHost};

// ---------------------------------------------------------------------------
// Handle table
// ---------------------------------------------------------------------------

static NEXT_HANDLE: AtomicI64 = AtomicI64::new(1);

fn entries() -> &'static Mutex<HashMap<jlong, InterfaceEntry>> {
    static ENTRIES: OnceLock<Mutex<HashMap<jlong, InterfaceEntry>>> = OnceLock::new();
    ENTRIES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Platform(format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// WebView wrapper
// ---------------------------------------------------------------------------

/// A `WebViewHost` backed by the Kotlin `NativeBridge` helper.
pub struct JniWebView {
    vm: JavaVM,
    helper: GlobalRef,
    handles: Mutex<HashMap<String, jlong>>,
}

impl JniWebView {
    /// Wrap `helper`, an instance of `com.example.superapp.NativeBridge`.
    pub fn from_helper(env: &mut JNIEnv, helper: &JObject) -> Result<Self> {
        let vm = env.get_java_vm().map_err(|e| jni_err("get_java_vm", e))?;
        let helper = env
            .new_global_ref(helper)
            .map_err(|e| jni_err("new_global_ref(helper)", e))?;
        Ok(Self {
            vm,
            helper,
            handles: Mutex::new(HashMap::new()),
        })
    }

    fn call_with_string(&self, method: &str, argument: &str, handle: Option<jlong>) -> Result<()> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| jni_err("attach_current_thread", e))?;
        let j_argument: JString = env
            .new_string(argument)
            .map_err(|e| jni_err("new_string", e))?;

        match handle {
            Some(handle) => env.call_method(
                self.helper.as_obj(),
                method,
                "(Ljava/lang/String;J)V",
                &[JValue::Object(&j_argument), JValue::Long(handle)],
            ),
            None => env.call_method(
                self.helper.as_obj(),
                method,
                "(Ljava/lang/String;)V",
                &[JValue::Object(&j_argument)],
            ),
        }
        .map_err(|e| jni_err(method, e))?;
        Ok(())
    }
}

impl WebViewHost for JniWebView {
    fn add_javascript_interface(&self, name: &str, entry: InterfaceEntry) -> Result<()> {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        entries()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, entry);

        if let Err(e) = self.call_with_string("attachInterface", name, Some(handle)) {
            entries()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&handle);
            return Err(e);
        }

        let previous = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), handle);
        if let Some(previous) = previous {
            entries()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&previous);
        }
        debug!(name, handle, "android: JS interface attached");
        Ok(())
    }

    fn remove_javascript_interface(&self, name: &str) -> Result<()> {
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
        self.call_with_string("detachInterface", name, None)
    }

    fn evaluate_javascript(&self, script: &str) -> Result<()> {
        self.call_with_string("evaluateOnUiThread", script, None)
    }
}

// ---------------------------------------------------------------------------
// Inbound entry point
// ---------------------------------------------------------------------------

/// Called by the page-facing interface object on the WebView's JS bridge
/// thread. Never throws into Java: every failure is logged and dropped.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_superapp_NativeBridge_nativePostMessage(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    json: JString,
) {
    let json: String = match env.get_string(&json) {
        Ok(json) => json.into(),
        Err(e) => {
            warn!(error = %e, "android: unreadable postMessage argument");
            return;
        }
    };

    let entry = entries()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&handle)
        .cloned();
    match entry {
        Some(entry) => entry(&json),
        None => debug!(handle, "android: postMessage on a detached interface"),
    }
}
