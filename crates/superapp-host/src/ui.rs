// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// UI-affine execution contexts.
//
// The dispatcher never hops threads on a handler's behalf. A handler whose
// side effect must run on the UI thread submits it here explicitly, and the
// side effect completes independently of the dispatch that scheduled it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::warn;

pub type UiTask = Box<dyn FnOnce() + Send>;

/// Somewhere UI work can be scheduled.
pub trait UiContext: Send + Sync {
    fn run(&self, task: UiTask);
}

/// Runs tasks inline on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateUi;

impl UiContext for ImmediateUi {
    fn run(&self, task: UiTask) {
        task();
    }
}

/// Holds tasks until [`QueuedUi::drain`] is called.
#[derive(Default)]
pub struct QueuedUi {
    queue: Mutex<VecDeque<UiTask>>,
}

impl QueuedUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run everything queued so far, including tasks queued by those tasks.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl UiContext for QueuedUi {
    fn run(&self, task: UiTask) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }
}

/// Sends tasks to a [`UiLoop`] running on the UI task.
#[derive(Clone)]
pub struct ChannelUi {
    tx: mpsc::UnboundedSender<UiTask>,
}

/// Receiving half of a [`ChannelUi`].
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<UiTask>,
}

impl ChannelUi {
    pub fn channel() -> (Self, UiLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiLoop { rx })
    }
}

impl UiContext for ChannelUi {
    fn run(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            warn!("UI loop has shut down; dropping UI task");
        }
    }
}

impl UiLoop {
    /// Run tasks until every [`ChannelUi`] has been dropped.
    pub async fn run(mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.rx.recv().await {
            task();
            ran += 1;
        }
        ran
    }

    /// Run whatever is already queued without waiting for more.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}
