// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SuperApp — host side: dispatcher, handler registry, built-in handlers and
// the mini-app catalog.

pub mod catalog;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod ui;

pub use catalog::MiniAppCatalog;
pub use dispatcher::{DispatchOutcome, HostDispatcher};
pub use handlers::{HostServices, Navigator, PlaceholderDirectory, ToastPresenter, UserDirectory};
pub use registry::{Handler, HandlerContext, HandlerRegistry};
pub use ui::{ChannelUi, ImmediateUi, QueuedUi, UiContext, UiLoop, UiTask};
