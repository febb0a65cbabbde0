// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated browser windows with `postMessage` semantics:
//
// - delivery is asynchronous (queued on the event loop);
// - the receiver sees the sender's origin and window;
// - a non-`*` target origin that does not match the receiving window's
//   origin silently drops the message.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use superapp_core::error::Result;
use tracing::debug;

use super::{EventLoop, SimPage};
use crate::context::FrameChannel;
use crate::web::{ListenerId, MessageEvent, MessageListener, Window, WindowId};

struct WindowState {
    origin: String,
    listeners: Vec<(ListenerId, MessageListener)>,
}

struct BrowserInner {
    events: EventLoop,
    windows: Mutex<BTreeMap<WindowId, WindowState>>,
    next_window: AtomicU64,
    next_listener: AtomicU64,
}

/// One browser tab's worth of windows.
#[derive(Clone)]
pub struct SimBrowser {
    inner: Arc<BrowserInner>,
}

/// A host page with one embedded mini-app frame.
pub struct SimFrame {
    pub host_id: WindowId,
    pub frame_id: WindowId,
    /// The host page's own window.
    pub host_window: Arc<dyn Window>,
    /// `iframe.contentWindow`, as held by the host.
    pub frame_window: Arc<dyn Window>,
    /// The frame's view of itself and of `window.parent`.
    pub channel: FrameChannel,
    /// The mini-app's script context.
    pub page: SimPage,
}

impl Default for SimBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBrowser {
    pub fn new() -> Self {
        Self::with_events(EventLoop::new())
    }

    pub fn with_events(events: EventLoop) -> Self {
        Self {
            inner: Arc::new(BrowserInner {
                events,
                windows: Mutex::new(BTreeMap::new()),
                next_window: AtomicU64::new(1),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    pub fn events(&self) -> &EventLoop {
        &self.inner.events
    }

    pub fn run_until_idle(&self) -> usize {
        self.inner.events.run_until_idle()
    }

    pub fn open_window(&self, origin: &str) -> WindowId {
        let id = WindowId(self.inner.next_window.fetch_add(1, Ordering::Relaxed));
        self.windows().insert(
            id,
            WindowState {
                origin: origin.to_owned(),
                listeners: Vec::new(),
            },
        );
        id
    }

    pub fn close_window(&self, id: WindowId) {
        self.windows().remove(&id);
    }

    /// A reference to `target` held by script running in `holder`.
    pub fn handle(&self, target: WindowId, holder: WindowId) -> Arc<dyn Window> {
        Arc::new(SimWindowHandle {
            browser: self.clone(),
            target,
            holder,
        })
    }

    /// Open a host page at `host_origin` embedding a frame at `frame_origin`.
    pub fn embed(&self, host_origin: &str, frame_origin: &str) -> SimFrame {
        let host_id = self.open_window(host_origin);
        let frame_id = self.open_window(frame_origin);
        let channel = FrameChannel {
            own: self.handle(frame_id, frame_id),
            parent: self.handle(host_id, frame_id),
        };
        SimFrame {
            host_id,
            frame_id,
            host_window: self.handle(host_id, host_id),
            frame_window: self.handle(frame_id, host_id),
            page: SimPage::framed(channel.clone()),
            channel,
        }
    }

    /// A third window at `origin` holding a reference to `target`, for
    /// posting messages that did not come from the expected peer.
    pub fn forge(&self, origin: &str, target: WindowId) -> Arc<dyn Window> {
        let attacker = self.open_window(origin);
        self.handle(target, attacker)
    }

    pub fn listener_count(&self, id: WindowId) -> usize {
        self.windows()
            .get(&id)
            .map_or(0, |window| window.listeners.len())
    }

    fn windows(&self) -> MutexGuard<'_, BTreeMap<WindowId, WindowState>> {
        self.inner
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, target: WindowId, holder: WindowId, message: Value, target_origin: &str) {
        let (event, listeners) = {
            let windows = self.windows();
            let Some(window) = windows.get(&target) else {
                debug!(target = target.0, "sim: postMessage to a closed window");
                return;
            };
            if target_origin != "*" && target_origin != window.origin {
                debug!(
                    target = target.0,
                    target_origin,
                    actual = %window.origin,
                    "sim: postMessage dropped on target origin mismatch"
                );
                return;
            }
            let (origin, source) = match windows.get(&holder) {
                Some(sender) => (sender.origin.clone(), Some(holder)),
                None => ("null".to_owned(), None),
            };
            let listeners: Vec<MessageListener> = window
                .listeners
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect();
            (
                MessageEvent {
                    origin,
                    source,
                    data: message,
                },
                listeners,
            )
        };

        for listener in listeners {
            listener(event.clone());
        }
    }
}

/// `Window` implementation over a `SimBrowser`.
pub struct SimWindowHandle {
    browser: SimBrowser,
    target: WindowId,
    holder: WindowId,
}

impl Window for SimWindowHandle {
    fn id(&self) -> WindowId {
        self.target
    }

    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let id = ListenerId(self.browser.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        if let Some(window) = self.browser.windows().get_mut(&self.target) {
            window.listeners.push((id, listener));
        }
        id
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        let mut windows = self.browser.windows();
        let Some(window) = windows.get_mut(&self.target) else {
            return false;
        };
        let before = window.listeners.len();
        window.listeners.retain(|(existing, _)| *existing != id);
        window.listeners.len() != before
    }

    fn post_message(&self, message: Value, target_origin: &str) -> Result<()> {
        let browser = self.browser.clone();
        let (target, holder) = (self.target, self.holder);
        let target_origin = target_origin.to_owned();
        self.browser
            .inner
            .events
            .post(move || browser.dispatch(target, holder, message, &target_origin));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use serde_json::json;

    fn counting(counter: &Arc<AtomicUsize>) -> MessageListener {
        let counter = counter.clone();
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn events_carry_sender_identity() {
        let browser = SimBrowser::new();
        let frame = browser.embed("https://host.example", "http://localhost:5173");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        frame.host_window.add_message_listener(Arc::new(move |event| {
            sink.lock().expect("lock").push(event);
        }));

        frame
            .channel
            .parent
            .post_message(json!({"type": "log"}), "*")
            .expect("post");
        assert!(seen.lock().expect("lock").is_empty());
        browser.run_until_idle();

        let seen = seen.lock().expect("lock");
        assert_eq!(seen[0].origin, "http://localhost:5173");
        assert_eq!(seen[0].source, Some(frame.frame_id));
    }

    #[test]
    fn target_origin_mismatch_drops_delivery() {
        let browser = SimBrowser::new();
        let frame = browser.embed("https://host.example", "http://localhost:5173");
        let hits = Arc::new(AtomicUsize::new(0));
        frame.channel.own.add_message_listener(counting(&hits));

        frame
            .frame_window
            .post_message(json!({}), "https://elsewhere.example")
            .expect("post");
        frame
            .frame_window
            .post_message(json!({}), "http://localhost:5173")
            .expect("post");
        browser.run_until_idle();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_windows_receive_nothing() {
        let browser = SimBrowser::new();
        let frame = browser.embed("https://host.example", "http://localhost:5173");
        let hits = Arc::new(AtomicUsize::new(0));
        frame.channel.own.add_message_listener(counting(&hits));

        browser.close_window(frame.frame_id);
        frame.frame_window.post_message(json!({}), "*").expect("post");
        browser.run_until_idle();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(browser.listener_count(frame.frame_id), 0);
    }
}
