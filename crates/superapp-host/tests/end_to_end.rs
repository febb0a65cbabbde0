// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host dispatcher and mini-app client talking over each simulated platform.

use std::sync::{Arc, Mutex};

use serde_json::json;
use superapp_bridge::android::AndroidHostTransport;
use superapp_bridge::ios::IosHostTransport;
use superapp_bridge::script::parse_receiver_call;
use superapp_bridge::sim::{EventLoop, SimAndroidWebView, SimBrowser, SimFrame, SimIosWebView};
use superapp_bridge::web::WebTransport;
use superapp_bridge::{Platform, Transport};
use superapp_client::BridgeClient;
use superapp_core::config::BridgeConfig;
use superapp_core::diagnostics::{DiagnosticKind, MemorySink};
use superapp_core::envelope::{Envelope, decode};
use superapp_core::message::{DeepLink, HostMessage, LOG, LogRequest, UserInfo, parse_payload};
use superapp_host::{
    HandlerRegistry, HostDispatcher, HostServices, ImmediateUi, MiniAppCatalog, Navigator,
    PlaceholderDirectory, ToastPresenter,
};

const HOST_ORIGIN: &str = "https://superapp.example";
const INIT_LOG: &str = "Mini app initialized";

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn push(&self, entry: String) {
        self.0.lock().expect("lock").push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().expect("lock").clone()
    }
}

impl ToastPresenter for Recorder {
    fn show_toast(&self, message: &str) {
        self.push(format!("toast:{message}"));
    }
}

impl Navigator for Recorder {
    fn navigate(&self, screen: &str) {
        self.push(format!("navigate:{screen}"));
    }
}

struct Harness {
    events: EventLoop,
    dispatcher: HostDispatcher,
    client: BridgeClient,
    host_diagnostics: Arc<MemorySink>,
    client_diagnostics: Arc<MemorySink>,
    /// Toasts and navigations, in order.
    effects: Arc<Recorder>,
    /// Lines received through `log`, in order, without the init line.
    logs: Arc<Recorder>,
    android: Option<SimAndroidWebView>,
    web: Option<(SimBrowser, SimFrame)>,
}

impl Harness {
    fn registry(effects: &Arc<Recorder>, logs: &Arc<Recorder>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::with_builtin_handlers(HostServices {
            users: Arc::new(PlaceholderDirectory),
            toasts: effects.clone(),
            navigator: effects.clone(),
        });
        let logs = logs.clone();
        registry.register_fn(LOG, move |data, ctx| {
            let request: LogRequest = parse_payload(ctx.message_type(), data)?;
            if request.message != INIT_LOG {
                logs.push(request.message);
            }
            Ok(())
        });
        registry
    }

    fn assemble(
        events: EventLoop,
        transport: Arc<dyn Transport>,
        page: &dyn superapp_bridge::ScriptContext,
        host_diagnostics: Arc<MemorySink>,
    ) -> (HostDispatcher, BridgeClient, Arc<MemorySink>, Arc<Recorder>, Arc<Recorder>) {
        let effects = Arc::new(Recorder::default());
        let logs = Arc::new(Recorder::default());
        let dispatcher = HostDispatcher::attach(
            transport,
            Self::registry(&effects, &logs),
            Arc::new(ImmediateUi),
            host_diagnostics,
        );
        let client_diagnostics = MemorySink::new();
        let client = BridgeClient::connect(page, &BridgeConfig::default(), client_diagnostics.clone())
            .expect("connect");
        events.run_until_idle();
        (dispatcher, client, client_diagnostics, effects, logs)
    }

    fn android() -> Self {
        let events = EventLoop::new();
        let webview = SimAndroidWebView::new(events.clone());
        let host_diagnostics = MemorySink::new();
        let transport = AndroidHostTransport::attach(
            Arc::new(webview.clone()),
            &BridgeConfig::default(),
            host_diagnostics.clone(),
        )
        .expect("attach");
        let (dispatcher, client, client_diagnostics, effects, logs) = Self::assemble(
            events.clone(),
            Arc::new(transport),
            &webview.page(),
            host_diagnostics.clone(),
        );
        Self {
            events,
            dispatcher,
            client,
            host_diagnostics,
            client_diagnostics,
            effects,
            logs,
            android: Some(webview),
            web: None,
        }
    }

    fn ios() -> Self {
        let events = EventLoop::new();
        let webview = SimIosWebView::new(events.clone());
        let host_diagnostics = MemorySink::new();
        let transport = IosHostTransport::attach(
            Arc::new(webview.clone()),
            &BridgeConfig::default(),
            host_diagnostics.clone(),
        )
        .expect("attach");
        let (dispatcher, client, client_diagnostics, effects, logs) = Self::assemble(
            events.clone(),
            Arc::new(transport),
            &webview.page(),
            host_diagnostics.clone(),
        );
        Self {
            events,
            dispatcher,
            client,
            host_diagnostics,
            client_diagnostics,
            effects,
            logs,
            android: None,
            web: None,
        }
    }

    fn web() -> Self {
        let config = BridgeConfig::default();
        let catalog = MiniAppCatalog::from_config(&config);
        let events = EventLoop::new();
        let browser = SimBrowser::with_events(events.clone());
        let frame = browser.embed(HOST_ORIGIN, &catalog.resolve("demo-app1"));
        let host_diagnostics = MemorySink::new();
        let transport = WebTransport::host(
            frame.host_window.clone(),
            frame.frame_window.clone(),
            catalog.target_origin("demo-app1"),
            &config,
            host_diagnostics.clone(),
        );
        let (dispatcher, client, client_diagnostics, effects, logs) = Self::assemble(
            events.clone(),
            Arc::new(transport),
            &frame.page,
            host_diagnostics.clone(),
        );
        Self {
            events,
            dispatcher,
            client,
            host_diagnostics,
            client_diagnostics,
            effects,
            logs,
            android: None,
            web: Some((browser, frame)),
        }
    }

    fn all() -> Vec<Self> {
        vec![Self::android(), Self::ios(), Self::web()]
    }

    fn pump(&self) {
        self.events.run_until_idle();
    }
}

// ---------------------------------------------------------------------------
// Scenario 1: getUserInfo -> userInfo
// ---------------------------------------------------------------------------

#[test]
fn get_user_info_round_trip_on_every_platform() {
    for harness in Harness::all() {
        let platform = harness.client.platform();
        assert!(harness.client.user_info().is_none(), "{platform}");

        harness.client.get_user_info();
        harness.pump();

        assert_eq!(
            harness.client.user_info(),
            Some(UserInfo {
                user_id: "12345".into(),
                name: "John Doe".into(),
                email: "john@example.com".into(),
            }),
            "{platform}"
        );
        assert!(harness.host_diagnostics.is_empty(), "{platform}: {:?}", harness.host_diagnostics.events());
        assert!(harness.client_diagnostics.is_empty(), "{platform}: {:?}", harness.client_diagnostics.events());
    }
}

#[test]
fn user_info_reply_has_the_documented_wire_shape() {
    let harness = Harness::android();
    harness.client.get_user_info();
    harness.pump();

    let webview = harness.android.as_ref().expect("android harness");
    let scripts = webview.evaluated_scripts();
    let (function, argument) = parse_receiver_call(scripts.last().expect("a reply")).expect("receiver call");
    assert_eq!(function, "receiveFromNative");

    let expected = decode(
        r#"{"type":"userInfo","data":{"userId":"12345","name":"John Doe","email":"john@example.com"}}"#,
    )
    .expect("expected envelope");
    assert_eq!(decode(argument).expect("reply"), expected);
}

// ---------------------------------------------------------------------------
// Scenario 2: forged showToast on web
// ---------------------------------------------------------------------------

#[test]
fn forged_show_toast_is_rejected_while_the_real_one_is_accepted() {
    let harness = Harness::web();
    let (browser, frame) = harness.web.as_ref().expect("web harness");
    let forged = json!({"type": "showToast", "data": {"message": "Added Laptop to cart!"}});

    // Foreign window, foreign origin.
    browser
        .forge("https://evil.example", frame.host_id)
        .post_message(forged.clone(), "*")
        .expect("post");
    // Foreign window impersonating the mini-app's origin.
    browser
        .forge("http://localhost:5173", frame.host_id)
        .post_message(forged, "*")
        .expect("post");
    harness.client.show_toast("Added Laptop to cart!");
    harness.pump();

    assert_eq!(harness.effects.entries(), vec!["toast:Added Laptop to cart!"]);
    assert_eq!(harness.host_diagnostics.count(DiagnosticKind::RejectedMessage), 2);
}

#[test]
fn host_target_origin_comes_from_the_catalog() {
    let config = BridgeConfig::default();
    let catalog = MiniAppCatalog::from_config(&config);
    let browser = SimBrowser::new();
    // The frame navigated somewhere else; pushes must not follow it.
    let frame = browser.embed(HOST_ORIGIN, "https://elsewhere.example");
    let transport = WebTransport::host(
        frame.host_window.clone(),
        frame.frame_window.clone(),
        catalog.target_origin("demo-app1"),
        &config,
        MemorySink::new(),
    );
    let dispatcher = HostDispatcher::attach(
        Arc::new(transport),
        HandlerRegistry::new(),
        Arc::new(ImmediateUi),
        MemorySink::new(),
    );
    let client = BridgeClient::connect(&frame.page, &config, MemorySink::new()).expect("connect");

    dispatcher
        .send(&HostMessage::DeepLink(DeepLink {
            url: "superapp://cart".into(),
        }))
        .expect("send");
    browser.run_until_idle();

    assert!(client.state().deep_link.is_none());
}

// ---------------------------------------------------------------------------
// Scenario 3: ordering
// ---------------------------------------------------------------------------

#[test]
fn sequential_logs_arrive_in_order_on_every_platform() {
    for harness in Harness::all() {
        let platform = harness.client.platform();
        harness.client.log("a");
        harness.client.log("b");
        harness.client.log("c");
        harness.pump();

        assert_eq!(harness.logs.entries(), vec!["a", "b", "c"], "{platform}");
    }
}

#[test]
fn shopping_flow_produces_effects_in_order() {
    for harness in Harness::all() {
        let platform = harness.client.platform();
        for product in ["Laptop", "Phone"] {
            harness.client.show_toast(format!("Added {product} to cart!"));
            harness.client.log(format!("Product added: {product}"));
        }
        harness.client.navigate("checkout");
        harness.pump();

        assert_eq!(
            harness.effects.entries(),
            vec![
                "toast:Added Laptop to cart!",
                "toast:Added Phone to cart!",
                "navigate:checkout",
            ],
            "{platform}"
        );
        assert_eq!(
            harness.logs.entries(),
            vec!["Product added: Laptop", "Product added: Phone"],
            "{platform}"
        );
    }
}

// ---------------------------------------------------------------------------
// Tolerance and teardown
// ---------------------------------------------------------------------------

#[test]
fn unknown_types_change_nothing_in_either_direction() {
    for harness in Harness::all() {
        let platform = harness.client.platform();
        harness.client.send_raw("addToWishlist", Some(json!({"productId": 3})));
        harness
            .dispatcher
            .send_envelope(&Envelope::new("promoBanner", Some(json!({"id": 9}))).expect("envelope"))
            .expect("send");
        harness.pump();

        assert_eq!(harness.host_diagnostics.count(DiagnosticKind::UnknownType), 1, "{platform}");
        assert_eq!(harness.client_diagnostics.count(DiagnosticKind::UnknownType), 1, "{platform}");
        assert!(harness.effects.entries().is_empty(), "{platform}");

        harness.client.get_user_info();
        harness.pump();
        assert!(harness.client.user_info().is_some(), "{platform}");
    }
}

#[test]
fn host_detach_drops_later_mini_app_messages() {
    for harness in Harness::all() {
        let platform = harness.client.platform();
        harness.dispatcher.detach();
        harness.client.show_toast("too late");
        harness.pump();

        assert!(harness.effects.entries().is_empty(), "{platform}");
        assert!(harness.client.user_info().is_none(), "{platform}");
    }
}

#[test]
fn in_flight_push_after_client_teardown_is_silently_dropped() {
    for harness in Harness::all() {
        let platform = harness.client.platform();
        harness
            .dispatcher
            .send(&HostMessage::UserInfo(UserInfo::placeholder()))
            .expect("send");
        harness.client.teardown();
        harness.pump();

        assert!(harness.client.user_info().is_none(), "{platform}");
        assert!(harness.client.is_torn_down(), "{platform}");
    }
}

#[test]
fn standalone_mini_app_is_not_mistaken_for_a_connected_one() {
    let harness = Harness::android();
    assert_eq!(harness.client.platform(), Platform::Android);
    assert!(!harness.client.is_standalone());
    assert_eq!(harness.client_diagnostics.count(DiagnosticKind::TransportUnavailable), 0);

    let page = superapp_bridge::sim::SimPage::standalone();
    let diagnostics = MemorySink::new();
    let client = BridgeClient::connect(&page, &BridgeConfig::default(), diagnostics.clone())
        .expect("connect");
    assert!(client.is_standalone());
    assert_eq!(diagnostics.count(DiagnosticKind::TransportUnavailable), 1);
}
