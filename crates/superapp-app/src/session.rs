// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One host <-> mini-app session over a simulated surface, and the demo
// shopping flow run through it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use superapp_bridge::android::AndroidHostTransport;
use superapp_bridge::ios::IosHostTransport;
use superapp_bridge::sim::{EventLoop, SimAndroidWebView, SimBrowser, SimFrame, SimIosWebView};
use superapp_bridge::web::WebTransport;
use superapp_bridge::{Platform, Transport};
use superapp_client::BridgeClient;
use superapp_core::config::BridgeConfig;
use superapp_core::diagnostics::{
    DiagnosticKind, Diagnostics, FanoutSink, MemorySink, TracingSink,
};
use superapp_core::error::{BridgeError, Result};
use superapp_core::message::{DeepLink, HostMessage, Notification, UserInfo};
use superapp_host::catalog::origin_of;
use superapp_host::{HandlerRegistry, HostDispatcher, HostServices, MiniAppCatalog, UiContext};
use tracing::info;

pub const HOST_ORIGIN: &str = "https://superapp.local";

const PRODUCTS: &[&str] = &["Laptop", "Phone", "Headphones"];

/// What a finished demo run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub platform: Platform,
    pub url: String,
    pub user: Option<UserInfo>,
    pub host_diagnostics: BTreeMap<DiagnosticKind, usize>,
    pub client_diagnostics: BTreeMap<DiagnosticKind, usize>,
}

pub struct Session {
    events: EventLoop,
    dispatcher: HostDispatcher,
    client: BridgeClient,
    url: String,
    host_sink: Arc<MemorySink>,
    client_sink: Arc<MemorySink>,
    web: Option<(SimBrowser, SimFrame)>,
}

fn observed(sink: &Arc<MemorySink>) -> Diagnostics {
    let memory: Diagnostics = sink.clone();
    Arc::new(FanoutSink::new(vec![TracingSink::shared(), memory]))
}

impl Session {
    /// Load mini-app `app` into a fresh `platform` surface and connect both
    /// halves.
    pub fn open(
        platform: Platform,
        app: &str,
        config: &BridgeConfig,
        ui: Arc<dyn UiContext>,
    ) -> Result<Self> {
        let catalog = MiniAppCatalog::from_config(config);
        let url = catalog.resolve(app);
        info!(%platform, app, %url, "loading mini-app");

        let events = EventLoop::new();
        let host_sink = MemorySink::new();
        let client_sink = MemorySink::new();
        let host_diagnostics = observed(&host_sink);
        let registry = HandlerRegistry::with_builtin_handlers(HostServices::logging());

        let (transport, client, web): (Arc<dyn Transport>, BridgeClient, Option<(SimBrowser, SimFrame)>) =
            match platform {
                Platform::Android => {
                    let webview = SimAndroidWebView::new(events.clone());
                    let transport: Arc<dyn Transport> = Arc::new(AndroidHostTransport::attach(
                        Arc::new(webview.clone()),
                        config,
                        host_diagnostics.clone(),
                    )?);
                    let client = BridgeClient::connect(&webview.page(), config, observed(&client_sink))?;
                    (transport, client, None)
                }
                Platform::Ios => {
                    let webview = SimIosWebView::new(events.clone());
                    let transport: Arc<dyn Transport> = Arc::new(IosHostTransport::attach(
                        Arc::new(webview.clone()),
                        config,
                        host_diagnostics.clone(),
                    )?);
                    let client = BridgeClient::connect(&webview.page(), config, observed(&client_sink))?;
                    (transport, client, None)
                }
                Platform::Web => {
                    let browser = SimBrowser::with_events(events.clone());
                    let frame_origin = origin_of(&url).unwrap_or_else(|| "null".to_owned());
                    let frame = browser.embed(HOST_ORIGIN, &frame_origin);
                    let transport: Arc<dyn Transport> = Arc::new(WebTransport::host(
                        frame.host_window.clone(),
                        frame.frame_window.clone(),
                        catalog.target_origin(app),
                        config,
                        host_diagnostics.clone(),
                    ));
                    let client = BridgeClient::connect(&frame.page, config, observed(&client_sink))?;
                    (transport, client, Some((browser, frame)))
                }
                Platform::Standalone => {
                    return Err(BridgeError::Config(
                        "a session needs a host surface; standalone has none".into(),
                    ));
                }
            };

        // The client's init message is still queued until the first settle.
        let dispatcher = HostDispatcher::attach(transport, registry, ui, host_diagnostics);
        Ok(Self {
            events,
            dispatcher,
            client,
            url,
            host_sink,
            client_sink,
            web,
        })
    }

    /// Deliver everything in flight. Yields afterwards so the UI loop can
    /// run the side effects just scheduled.
    pub async fn settle(&self) {
        self.events.run_until_idle();
        tokio::task::yield_now().await;
    }

    /// The shopping flow: who am I, add every product, check out, then
    /// receive a couple of host pushes.
    pub async fn run_demo(&self) -> Result<()> {
        self.settle().await;

        self.client.get_user_info();
        self.settle().await;
        if let Some(user) = self.client.user_info() {
            info!(target: "miniapp", name = %user.name, email = %user.email, "signed in");
        }

        for product in PRODUCTS {
            self.client.show_toast(format!("Added {product} to cart!"));
            self.client.log(format!("Product added: {product}"));
        }
        self.settle().await;

        self.client.navigate("checkout");
        self.settle().await;

        self.dispatcher.send(&HostMessage::Notification(Notification {
            title: "Order placed".into(),
            body: format!("{} items on their way", PRODUCTS.len()),
        }))?;
        self.dispatcher.send(&HostMessage::DeepLink(DeepLink {
            url: "superapp://orders/latest".into(),
        }))?;
        self.settle().await;

        if let Some((browser, frame)) = &self.web {
            info!("posting a forged showToast from a foreign window");
            browser
                .forge("https://attacker.example", frame.host_id)
                .post_message(json!({"type": "showToast", "data": {"message": "You won!"}}), "*")?;
            self.settle().await;
        }
        Ok(())
    }

    /// Tear both halves down and summarise.
    pub fn close(self) -> DemoReport {
        let user = self.client.user_info();
        self.client.teardown();
        self.dispatcher.detach();
        DemoReport {
            platform: self.dispatcher.platform(),
            url: self.url.clone(),
            user,
            host_diagnostics: self.host_sink.counts(),
            client_diagnostics: self.client_sink.counts(),
        }
    }
}
