// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The payload contract: which `type` carries which `data` shape, split by
// direction. Both sides validate against these types; the tags still travel
// as plain strings so app-specific types can share the wire.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `showToast` — ask the host to present a short message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastRequest {
    pub message: String,
}

/// `navigate` — ask the host to open one of its own screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateRequest {
    pub screen: String,
}

/// `log` — forward a line to the host's console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    pub message: String,
}

/// `userInfo` — the signed-in user, as resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl UserInfo {
    /// Static record served until a real session lookup is wired in.
    pub fn placeholder() -> Self {
        Self {
            user_id: "12345".into(),
            name: "John Doe".into(),
            email: "john@example.com".into(),
        }
    }
}

/// `notification` — a push notification surfaced to the mini-app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// `deepLink` — a link the host opened on the mini-app's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Type tags
// ---------------------------------------------------------------------------

pub const GET_USER_INFO: &str = "getUserInfo";
pub const SHOW_TOAST: &str = "showToast";
pub const NAVIGATE: &str = "navigate";
pub const LOG: &str = "log";

pub const USER_INFO: &str = "userInfo";
pub const NOTIFICATION: &str = "notification";
pub const DEEP_LINK: &str = "deepLink";

/// Read the `data` of a `message_type` message as `T`. Absent data reads as
/// `null`.
pub fn parse_payload<T: DeserializeOwned>(message_type: &str, data: Option<&Value>) -> Result<T> {
    let data = data.cloned().unwrap_or(Value::Null);
    serde_json::from_value(data).map_err(|e| BridgeError::InvalidPayload {
        message_type: message_type.to_owned(),
        reason: e.to_string(),
    })
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T> {
    parse_payload(envelope.message_type(), envelope.data())
}

// ---------------------------------------------------------------------------
// Mini-app -> host
// ---------------------------------------------------------------------------

/// Messages a mini-app sends to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiniAppMessage {
    GetUserInfo,
    ShowToast(ToastRequest),
    Navigate(NavigateRequest),
    Log(LogRequest),
}

impl MiniAppMessage {
    pub const TYPES: &'static [&'static str] = &[GET_USER_INFO, SHOW_TOAST, NAVIGATE, LOG];

    pub fn show_toast(message: impl Into<String>) -> Self {
        Self::ShowToast(ToastRequest {
            message: message.into(),
        })
    }

    pub fn navigate(screen: impl Into<String>) -> Self {
        Self::Navigate(NavigateRequest {
            screen: screen.into(),
        })
    }

    pub fn log(message: impl Into<String>) -> Self {
        Self::Log(LogRequest {
            message: message.into(),
        })
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::GetUserInfo => GET_USER_INFO,
            Self::ShowToast(_) => SHOW_TOAST,
            Self::Navigate(_) => NAVIGATE,
            Self::Log(_) => LOG,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope> {
        match self {
            Self::GetUserInfo => Ok(Envelope::new(GET_USER_INFO, None)?),
            Self::ShowToast(p) => Envelope::with_payload(SHOW_TOAST, p),
            Self::Navigate(p) => Envelope::with_payload(NAVIGATE, p),
            Self::Log(p) => Envelope::with_payload(LOG, p),
        }
    }

    /// Interpret an envelope. Any `data` on `getUserInfo` is ignored.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        match envelope.message_type() {
            GET_USER_INFO => Ok(Self::GetUserInfo),
            SHOW_TOAST => payload(envelope).map(Self::ShowToast),
            NAVIGATE => payload(envelope).map(Self::Navigate),
            LOG => payload(envelope).map(Self::Log),
            other => Err(BridgeError::UnknownType(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Host -> mini-app
// ---------------------------------------------------------------------------

/// Messages a host pushes down to a mini-app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    UserInfo(UserInfo),
    Notification(Notification),
    DeepLink(DeepLink),
}

impl HostMessage {
    pub const TYPES: &'static [&'static str] = &[USER_INFO, NOTIFICATION, DEEP_LINK];

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::UserInfo(_) => USER_INFO,
            Self::Notification(_) => NOTIFICATION,
            Self::DeepLink(_) => DEEP_LINK,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope> {
        match self {
            Self::UserInfo(p) => Envelope::with_payload(USER_INFO, p),
            Self::Notification(p) => Envelope::with_payload(NOTIFICATION, p),
            Self::DeepLink(p) => Envelope::with_payload(DEEP_LINK, p),
        }
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        match envelope.message_type() {
            USER_INFO => payload(envelope).map(Self::UserInfo),
            NOTIFICATION => payload(envelope).map(Self::Notification),
            DEEP_LINK => payload(envelope).map(Self::DeepLink),
            other => Err(BridgeError::UnknownType(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{decode, encode};
    use serde_json::json;

    fn mini_app_samples() -> Vec<MiniAppMessage> {
        vec![
            MiniAppMessage::GetUserInfo,
            MiniAppMessage::show_toast("Added Laptop to cart!"),
            MiniAppMessage::navigate("checkout"),
            MiniAppMessage::log("Product added: Laptop"),
        ]
    }

    fn host_samples() -> Vec<HostMessage> {
        vec![
            HostMessage::UserInfo(UserInfo::placeholder()),
            HostMessage::Notification(Notification {
                title: "Order shipped".into(),
                body: "Your laptop is on its way".into(),
            }),
            HostMessage::DeepLink(DeepLink {
                url: "superapp://orders/42".into(),
            }),
        ]
    }

    #[test]
    fn every_contract_type_survives_the_wire() {
        for message in mini_app_samples() {
            let envelope = message.to_envelope().expect("to_envelope");
            let decoded = decode(&envelope.to_wire()).expect("decode");
            assert_eq!(decoded, envelope);
            assert_eq!(MiniAppMessage::from_envelope(&decoded).expect("typed"), message);
        }
        for message in host_samples() {
            let envelope = message.to_envelope().expect("to_envelope");
            let decoded = decode(&envelope.to_wire()).expect("decode");
            assert_eq!(decoded, envelope);
            assert_eq!(HostMessage::from_envelope(&decoded).expect("typed"), message);
        }
    }

    #[test]
    fn user_info_uses_camel_case_on_the_wire() {
        let envelope = HostMessage::UserInfo(UserInfo::placeholder())
            .to_envelope()
            .expect("to_envelope");
        assert_eq!(
            envelope.to_value(),
            json!({
                "type": "userInfo",
                "data": {"userId": "12345", "name": "John Doe", "email": "john@example.com"}
            })
        );
    }

    #[test]
    fn get_user_info_carries_no_data() {
        let envelope = MiniAppMessage::GetUserInfo.to_envelope().expect("to_envelope");
        assert!(envelope.data().is_none());

        let with_null = decode(&encode(GET_USER_INFO, Some(Value::Null)).expect("encode"))
            .expect("decode");
        assert_eq!(
            MiniAppMessage::from_envelope(&with_null).expect("typed"),
            MiniAppMessage::GetUserInfo
        );
    }

    #[test]
    fn unknown_tag_is_reported_not_guessed() {
        let envelope = Envelope::new("applePay", None).expect("new");
        assert!(matches!(
            MiniAppMessage::from_envelope(&envelope),
            Err(BridgeError::UnknownType(t)) if t == "applePay"
        ));
        // Direction matters: a host type is unknown to the host-bound parser.
        let envelope = Envelope::new(USER_INFO, Some(json!({}))).expect("new");
        assert!(matches!(
            MiniAppMessage::from_envelope(&envelope),
            Err(BridgeError::UnknownType(_))
        ));
    }

    #[test]
    fn wrong_shape_is_invalid_payload() {
        let envelope = Envelope::new(SHOW_TOAST, Some(json!({"text": "hi"}))).expect("new");
        assert!(matches!(
            MiniAppMessage::from_envelope(&envelope),
            Err(BridgeError::InvalidPayload { message_type, .. }) if message_type == SHOW_TOAST
        ));

        let envelope = Envelope::new(NAVIGATE, None).expect("new");
        assert!(matches!(
            MiniAppMessage::from_envelope(&envelope),
            Err(BridgeError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn tag_lists_match_variants() {
        for message in mini_app_samples() {
            assert!(MiniAppMessage::TYPES.contains(&message.message_type()));
        }
        for message in host_samples() {
            assert!(HostMessage::TYPES.contains(&message.message_type()));
        }
    }
}
