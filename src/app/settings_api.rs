//! JSON settings endpoints.
//!
//! Transport-free handlers for `GET /wificonfig` and `POST /wifisetup`.
//! The web adapter reads the request body, calls in here, and writes the
//! returned [`ApiResponse`] verbatim.
//!
//! Wire keys (shared with the browser control panel):
//! `ssid_AP`, `password_AP`, `ssid_Router`, `password_Router`, `ipAddr`,
//! `hostname`.

use core::fmt;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::{SettingText, SettingsField};

use super::ports::RecordStorePort;
use super::settings::SettingsManager;

/// Largest settings body the endpoint reads.
pub const MAX_SETTINGS_BODY: usize = 512;

const CONTENT_JSON: &str = "application/json";
const CONTENT_TEXT: &str = "text/plain";

/// Status, content type and body for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    fn json(body: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_JSON,
            body,
        }
    }

    fn error(err: SettingsUpdateError) -> Self {
        Self {
            status: err.status(),
            content_type: CONTENT_TEXT,
            body: err.message().into(),
        }
    }
}

/// Reasons a settings update is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsUpdateError {
    /// Body is not a JSON document.
    InvalidJson,
    /// A required key is missing or not a string.
    InvalidParameters,
    /// Applied in memory, but the store could not commit.
    CommitFailed,
}

impl SettingsUpdateError {
    pub fn status(self) -> u16 {
        match self {
            Self::InvalidJson | Self::InvalidParameters => 400,
            Self::CommitFailed => 500,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON",
            Self::InvalidParameters => "Invalid parameters",
            Self::CommitFailed => "Failed to commit EEPROM changes",
        }
    }
}

impl fmt::Display for SettingsUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Serialize)]
struct SettingsView<'a> {
    #[serde(rename = "ssid_AP")]
    ssid_ap: &'a SettingText,
    #[serde(rename = "password_AP")]
    password_ap: &'a SettingText,
    #[serde(rename = "ssid_Router")]
    ssid_router: &'a SettingText,
    #[serde(rename = "password_Router")]
    password_router: &'a SettingText,
    #[serde(rename = "ipAddr")]
    ip_addr: &'a SettingText,
    hostname: &'a SettingText,
}

#[derive(Serialize)]
struct StatusAck {
    status: &'static str,
}

/// `GET /wificonfig`: re-read the store and return every field.
pub fn handle_get<S: RecordStorePort>(settings: &mut SettingsManager<S>) -> ApiResponse {
    settings.load();
    let r = settings.record();
    let view = SettingsView {
        ssid_ap: r.text(SettingsField::SsidAp),
        password_ap: r.text(SettingsField::PasswordAp),
        ssid_router: r.text(SettingsField::SsidRouter),
        password_router: r.text(SettingsField::PasswordRouter),
        ip_addr: r.text(SettingsField::IpAp),
        hostname: r.text(SettingsField::Hostname),
    };
    match serde_json::to_string(&view) {
        Ok(body) => ApiResponse::json(body),
        Err(e) => {
            warn!("Settings API: serialize failed ({})", e);
            ApiResponse {
                status: 500,
                content_type: CONTENT_TEXT,
                body: "Serialization failed".into(),
            }
        }
    }
}

/// `POST /wifisetup`: apply and persist a settings update.
pub fn handle_post<S: RecordStorePort>(settings: &mut SettingsManager<S>, body: &[u8]) -> ApiResponse {
    match apply_update(settings, body) {
        Ok(()) => {
            let ack = StatusAck {
                status: "Network updated",
            };
            ApiResponse::json(serde_json::to_string(&ack).unwrap_or_default())
        }
        Err(e) => {
            warn!("Settings API: update refused ({})", e);
            ApiResponse::error(e)
        }
    }
}

/// Validate `body`, copy it into the record and save.
///
/// `ipAddr` and the four credential fields are required; `hostname` is
/// optional and left unchanged when absent.
pub fn apply_update<S: RecordStorePort>(
    settings: &mut SettingsManager<S>,
    body: &[u8],
) -> Result<(), SettingsUpdateError> {
    let doc: Value = serde_json::from_slice(body).map_err(|_| SettingsUpdateError::InvalidJson)?;

    let text = |key: &str| doc.get(key).and_then(Value::as_str);
    let (Some(ssid_ap), Some(password_ap), Some(ssid_router), Some(password_router), Some(ip_addr)) = (
        text("ssid_AP"),
        text("password_AP"),
        text("ssid_Router"),
        text("password_Router"),
        text("ipAddr"),
    ) else {
        return Err(SettingsUpdateError::InvalidParameters);
    };

    let record = settings.record_mut();
    record.set_password_ap(password_ap);
    record.set_password_router(password_router);
    record.set_ssid_ap(ssid_ap);
    record.set_ssid_router(ssid_router);
    record.set_ip_ap(ip_addr);
    if let Some(hostname) = text("hostname") {
        record.set_hostname(hostname);
    }

    // Every save failure means nothing durable happened.
    let report = settings
        .save()
        .map_err(|_| SettingsUpdateError::CommitFailed)?;
    info!("Settings API: network updated ({} bytes changed)", report.bytes_written);
    Ok(())
}
