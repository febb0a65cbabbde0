// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// What a mini-app can see of its environment.

use std::sync::Arc;

use crate::android::JavascriptInterface;
use crate::hook::ReceiveHook;
use crate::ios::ScriptMessageHandler;
use crate::web::Window;

/// The two windows a framed mini-app talks through.
#[derive(Clone)]
pub struct FrameChannel {
    /// The mini-app's own window; inbound `message` events arrive here.
    pub own: Arc<dyn Window>,
    /// `window.parent`, the host page.
    pub parent: Arc<dyn Window>,
}

/// The script context a mini-app runs in.
///
/// Each accessor answers one of the probes a mini-app performs while
/// choosing its transport; `None` means the channel is absent.
pub trait ScriptContext: Send + Sync {
    /// `window.<name>` as exposed by an Android host.
    fn javascript_interface(&self, name: &str) -> Option<Arc<dyn JavascriptInterface>>;

    /// `window.webkit.messageHandlers.<name>` as registered by an iOS host.
    fn script_message_handler(&self, name: &str) -> Option<Arc<dyn ScriptMessageHandler>>;

    /// Present when the page is embedded in a frame (`window.parent !== window`).
    fn frame(&self) -> Option<FrameChannel>;

    /// The page's global receive function slot.
    fn receive_hook(&self) -> Arc<ReceiveHook>;
}
