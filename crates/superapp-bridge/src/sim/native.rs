// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated native web views.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use superapp_core::error::Result;
use tracing::debug;

use super::{EventLoop, SimPage};
use crate::android::{InterfaceEntry, JavascriptInterface, WebViewHost};
use crate::hook::ReceiveHook;
use crate::ios::{ScriptMessageEntry, ScriptMessageHandler, ScriptMessageHost};
use crate::script::parse_receiver_call;

/// Evaluated scripts kept per web view, oldest first.
pub const SCRIPT_HISTORY: usize = 64;

fn remember(scripts: &mut VecDeque<String>, script: &str) {
    if scripts.len() == SCRIPT_HISTORY {
        scripts.pop_front();
    }
    scripts.push_back(script.to_owned());
}

/// Evaluate a receiver-call script against a page's hook.
fn run_receiver_call(hook: &ReceiveHook, script: &str) {
    let Some((function, argument)) = parse_receiver_call(script) else {
        debug!("sim: ignoring non-receiver script");
        return;
    };
    match serde_json::from_str::<Value>(argument) {
        Ok(value) => {
            if !hook.invoke(value) {
                debug!(function, "sim: receive function not defined");
            }
        }
        Err(e) => debug!(error = %e, "sim: script argument is not a JSON literal"),
    }
}

// ---------------------------------------------------------------------------
// Android
// ---------------------------------------------------------------------------

#[derive(Default)]
struct AndroidState {
    interfaces: HashMap<String, InterfaceEntry>,
    scripts: VecDeque<String>,
}

/// An Android `WebView` and the page loaded in it.
#[derive(Clone)]
pub struct SimAndroidWebView {
    events: EventLoop,
    state: Arc<Mutex<AndroidState>>,
    hook: Arc<ReceiveHook>,
}

impl SimAndroidWebView {
    pub fn new(events: EventLoop) -> Self {
        Self {
            events,
            state: Arc::default(),
            hook: ReceiveHook::new(),
        }
    }

    /// The page's script context.
    pub fn page(&self) -> SimPage {
        SimPage::android(self.clone(), self.hook.clone())
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.lock().interfaces.contains_key(name)
    }

    pub fn interface_entry(&self, name: &str) -> Option<InterfaceEntry> {
        self.lock().interfaces.get(name).cloned()
    }

    /// Call `window.<name>.postMessage(raw)` synchronously, as page script
    /// would, with arbitrary text.
    pub fn deliver_raw(&self, name: &str, raw: &str) {
        if let Some(entry) = self.interface_entry(name) {
            entry(raw);
        }
    }

    /// The most recent [`SCRIPT_HISTORY`] evaluated scripts.
    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.lock().scripts.iter().cloned().collect()
    }

    pub(crate) fn exposed_interface(&self, name: &str) -> Option<Arc<dyn JavascriptInterface>> {
        if !self.has_interface(name) {
            return None;
        }
        Some(Arc::new(SimJavascriptInterface {
            webview: self.clone(),
            name: name.to_owned(),
        }))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AndroidState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WebViewHost for SimAndroidWebView {
    fn add_javascript_interface(&self, name: &str, entry: InterfaceEntry) -> Result<()> {
        self.lock().interfaces.insert(name.to_owned(), entry);
        Ok(())
    }

    fn remove_javascript_interface(&self, name: &str) -> Result<()> {
        self.lock().interfaces.remove(name);
        Ok(())
    }

    fn evaluate_javascript(&self, script: &str) -> Result<()> {
        remember(&mut self.lock().scripts, script);
        let hook = self.hook.clone();
        let script = script.to_owned();
        self.events.post(move || run_receiver_call(&hook, &script));
        Ok(())
    }
}

struct SimJavascriptInterface {
    webview: SimAndroidWebView,
    name: String,
}

impl JavascriptInterface for SimJavascriptInterface {
    fn post_message(&self, json: &str) -> Result<()> {
        let webview = self.webview.clone();
        let name = self.name.clone();
        let json = json.to_owned();
        self.webview
            .events
            .post(move || webview.deliver_raw(&name, &json));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// iOS
// ---------------------------------------------------------------------------

#[derive(Default)]
struct IosState {
    handlers: HashMap<String, ScriptMessageEntry>,
    scripts: VecDeque<String>,
}

/// A `WKWebView` and the page loaded in it.
#[derive(Clone)]
pub struct SimIosWebView {
    events: EventLoop,
    state: Arc<Mutex<IosState>>,
    hook: Arc<ReceiveHook>,
}

impl SimIosWebView {
    pub fn new(events: EventLoop) -> Self {
        Self {
            events,
            state: Arc::default(),
            hook: ReceiveHook::new(),
        }
    }

    pub fn page(&self) -> SimPage {
        SimPage::ios(self.clone(), self.hook.clone())
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.lock().handlers.contains_key(name)
    }

    /// Deliver a message body to the named handler synchronously.
    pub fn deliver_body(&self, name: &str, body: Value) {
        let entry = self.lock().handlers.get(name).cloned();
        if let Some(entry) = entry {
            entry(body);
        }
    }

    /// The most recent [`SCRIPT_HISTORY`] evaluated scripts.
    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.lock().scripts.iter().cloned().collect()
    }

    pub(crate) fn exposed_handler(&self, name: &str) -> Option<Arc<dyn ScriptMessageHandler>> {
        if !self.has_handler(name) {
            return None;
        }
        Some(Arc::new(SimScriptMessageHandler {
            webview: self.clone(),
            name: name.to_owned(),
        }))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IosState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScriptMessageHost for SimIosWebView {
    fn add_script_message_handler(&self, name: &str, entry: ScriptMessageEntry) -> Result<()> {
        self.lock().handlers.insert(name.to_owned(), entry);
        Ok(())
    }

    fn remove_script_message_handler(&self, name: &str) -> Result<()> {
        self.lock().handlers.remove(name);
        Ok(())
    }

    fn evaluate_javascript(&self, script: &str) -> Result<()> {
        remember(&mut self.lock().scripts, script);
        let hook = self.hook.clone();
        let script = script.to_owned();
        self.events.post(move || run_receiver_call(&hook, &script));
        Ok(())
    }
}

struct SimScriptMessageHandler {
    webview: SimIosWebView,
    name: String,
}

impl ScriptMessageHandler for SimScriptMessageHandler {
    fn post_message(&self, body: Value) -> Result<()> {
        let webview = self.webview.clone();
        let name = self.name.clone();
        self.webview
            .events
            .post(move || webview.deliver_body(&name, body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use serde_json::json;
    use superapp_core::config::HookPolicy;
    use superapp_core::envelope::Envelope;

    use crate::context::ScriptContext;
    use crate::script::receiver_call;

    #[test]
    fn evaluated_receiver_call_reaches_page_hook_later() {
        let events = EventLoop::new();
        let webview = SimAndroidWebView::new(events.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        webview
            .page()
            .receive_hook()
            .install(
                HookPolicy::Replace,
                Arc::new(move |value| {
                    assert_eq!(value["type"], "userInfo");
                    h.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .expect("install");

        let envelope = Envelope::new("userInfo", Some(json!({"userId": "1"}))).expect("envelope");
        webview
            .evaluate_javascript(&receiver_call("receiveFromNative", &envelope))
            .expect("evaluate");
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        events.run_until_idle();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn script_history_keeps_only_the_latest_scripts() {
        let events = EventLoop::new();
        let webview = SimAndroidWebView::new(events.clone());
        for i in 0..SCRIPT_HISTORY + 10 {
            webview.evaluate_javascript(&format!("void {i}")).expect("evaluate");
        }
        events.run_until_idle();

        let scripts = webview.evaluated_scripts();
        assert_eq!(scripts.len(), SCRIPT_HISTORY);
        assert_eq!(scripts.first().map(String::as_str), Some("void 10"));
        assert_eq!(scripts.last(), Some(&format!("void {}", SCRIPT_HISTORY + 9)));
    }

    #[test]
    fn interfaces_are_visible_only_while_installed() {
        let webview = SimIosWebView::new(EventLoop::new());
        let page = webview.page();
        assert!(page.script_message_handler("nativeApp").is_none());

        webview
            .add_script_message_handler("nativeApp", Arc::new(|_| {}))
            .expect("add");
        assert!(page.script_message_handler("nativeApp").is_some());

        webview.remove_script_message_handler("nativeApp").expect("remove");
        assert!(page.script_message_handler("nativeApp").is_none());
    }
}
