// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in handlers and the host collaborators they drive.
//
// The collaborators are the host application's business: a session lookup,
// a toast API and a router. Only their boundary lives here, plus logging
// stand-ins used by the demo binary.

use std::sync::Arc;

use superapp_core::error::Result;
use superapp_core::message::{
    GET_USER_INFO, HostMessage, LOG, LogRequest, NAVIGATE, NavigateRequest, SHOW_TOAST,
    ToastRequest, UserInfo, parse_payload,
};
use tracing::info;

use crate::registry::HandlerRegistry;

/// Resolves the signed-in user.
pub trait UserDirectory: Send + Sync {
    fn current_user(&self) -> Result<UserInfo>;
}

/// Presents a short message to the user. Called on the UI context.
pub trait ToastPresenter: Send + Sync {
    fn show_toast(&self, message: &str);
}

/// Opens a host screen. Called on the UI context.
pub trait Navigator: Send + Sync {
    fn navigate(&self, screen: &str);
}

/// Serves [`UserInfo::placeholder`] for every lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderDirectory;

impl UserDirectory for PlaceholderDirectory {
    fn current_user(&self) -> Result<UserInfo> {
        Ok(UserInfo::placeholder())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingToasts;

impl ToastPresenter for LoggingToasts {
    fn show_toast(&self, message: &str) {
        info!(target: "host", message, "toast");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, screen: &str) {
        info!(target: "host", screen, "navigate");
    }
}

/// The collaborators the built-in handlers need.
#[derive(Clone)]
pub struct HostServices {
    pub users: Arc<dyn UserDirectory>,
    pub toasts: Arc<dyn ToastPresenter>,
    pub navigator: Arc<dyn Navigator>,
}

impl HostServices {
    /// Placeholder user with toasts and navigation written to the log.
    pub fn logging() -> Self {
        Self {
            users: Arc::new(PlaceholderDirectory),
            toasts: Arc::new(LoggingToasts),
            navigator: Arc::new(LoggingNavigator),
        }
    }
}

pub(crate) fn register_builtins(registry: &mut HandlerRegistry, services: HostServices) {
    let users = services.users;
    registry.register_fn(GET_USER_INFO, move |_, ctx| {
        let user = users.current_user()?;
        ctx.reply(&HostMessage::UserInfo(user))
    });

    let toasts = services.toasts;
    registry.register_fn(SHOW_TOAST, move |data, ctx| {
        let request: ToastRequest = parse_payload(ctx.message_type(), data)?;
        let toasts = toasts.clone();
        ctx.run_on_ui(Box::new(move || toasts.show_toast(&request.message)));
        Ok(())
    });

    let navigator = services.navigator;
    registry.register_fn(NAVIGATE, move |data, ctx| {
        let request: NavigateRequest = parse_payload(ctx.message_type(), data)?;
        let navigator = navigator.clone();
        ctx.run_on_ui(Box::new(move || navigator.navigate(&request.screen)));
        Ok(())
    });

    registry.register_fn(LOG, |data, ctx| {
        let request: LogRequest = parse_payload(ctx.message_type(), data)?;
        info!(target: "miniapp", "{}", request.message);
        Ok(())
    });
}
