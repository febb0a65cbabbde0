// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory platform simulator.
//
// Stands in for an Android WebView, a WKWebView and a browser tab so both
// halves of the bridge can run in one process, in tests and in the demo
// binary. Cross-context deliveries are queued on an `EventLoop` and only run
// when it is pumped, which mirrors the asynchrony of the real channels and
// keeps ordering deterministic.

mod browser;
mod native;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::android::JavascriptInterface;
use crate::context::{FrameChannel, ScriptContext};
use crate::hook::ReceiveHook;
use crate::ios::ScriptMessageHandler;

pub use browser::{SimBrowser, SimFrame, SimWindowHandle};
pub use native::{SCRIPT_HISTORY, SimAndroidWebView, SimIosWebView};

/// Upper bound for one `run_until_idle` call; guards against ping-pong
/// handlers that enqueue forever.
const MAX_TASKS_PER_RUN: usize = 100_000;

type Task = Box<dyn FnOnce() + Send>;

/// FIFO task queue shared by every simulated context.
#[derive(Clone, Default)]
pub struct EventLoop {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Box::new(task));
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run queued tasks, including ones queued while running, until the
    /// queue is empty. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while ran < MAX_TASKS_PER_RUN {
            let task = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(task) = task else {
                return ran;
            };
            task();
            ran += 1;
        }
        warn!(ran, "event loop did not go idle");
        ran
    }
}

#[derive(Clone)]
enum Surface {
    Android(SimAndroidWebView),
    Ios(SimIosWebView),
    Frame(FrameChannel),
    Standalone,
}

/// A simulated mini-app page: what its script context can see.
#[derive(Clone)]
pub struct SimPage {
    hook: Arc<ReceiveHook>,
    surface: Surface,
}

impl SimPage {
    /// A page opened directly, with no host around it.
    pub fn standalone() -> Self {
        Self {
            hook: ReceiveHook::new(),
            surface: Surface::Standalone,
        }
    }

    /// A page loaded inside a frame.
    pub fn framed(channel: FrameChannel) -> Self {
        Self {
            hook: ReceiveHook::new(),
            surface: Surface::Frame(channel),
        }
    }

    pub(crate) fn android(webview: SimAndroidWebView, hook: Arc<ReceiveHook>) -> Self {
        Self {
            hook,
            surface: Surface::Android(webview),
        }
    }

    pub(crate) fn ios(webview: SimIosWebView, hook: Arc<ReceiveHook>) -> Self {
        Self {
            hook,
            surface: Surface::Ios(webview),
        }
    }
}

impl ScriptContext for SimPage {
    fn javascript_interface(&self, name: &str) -> Option<Arc<dyn JavascriptInterface>> {
        match &self.surface {
            Surface::Android(webview) => webview.exposed_interface(name),
            _ => None,
        }
    }

    fn script_message_handler(&self, name: &str) -> Option<Arc<dyn ScriptMessageHandler>> {
        match &self.surface {
            Surface::Ios(webview) => webview.exposed_handler(name),
            _ => None,
        }
    }

    fn frame(&self) -> Option<FrameChannel> {
        match &self.surface {
            Surface::Frame(channel) => Some(channel.clone()),
            _ => None,
        }
    }

    fn receive_hook(&self) -> Arc<ReceiveHook> {
        self.hook.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn tasks_run_in_post_order_including_nested() {
        let events = EventLoop::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        let nested = events.clone();
        events.post(move || {
            o.lock().expect("lock").push(1);
            let o = o.clone();
            nested.post(move || o.lock().expect("lock").push(3));
        });
        let o = order.clone();
        events.post(move || o.lock().expect("lock").push(2));

        assert_eq!(events.pending(), 2);
        assert_eq!(events.run_until_idle(), 3);
        assert_eq!(*order.lock().expect("lock"), vec![1, 2, 3]);
        assert_eq!(events.pending(), 0);
    }

    #[test]
    fn runaway_loops_are_bounded() {
        fn repost(events: EventLoop, hits: Arc<AtomicUsize>) {
            let next = events.clone();
            events.post(move || {
                hits.fetch_add(1, Ordering::Relaxed);
                repost(next, hits);
            });
        }
        let events = EventLoop::new();
        let hits = Arc::new(AtomicUsize::new(0));
        repost(events.clone(), hits.clone());

        assert_eq!(events.run_until_idle(), MAX_TASKS_PER_RUN);
        assert_eq!(hits.load(Ordering::Relaxed), MAX_TASKS_PER_RUN);
    }

    #[test]
    fn standalone_page_exposes_no_channels() {
        let page = SimPage::standalone();
        assert!(page.javascript_interface("AndroidBridge").is_none());
        assert!(page.script_message_handler("nativeApp").is_none());
        assert!(page.frame().is_none());
    }
}
