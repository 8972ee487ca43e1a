//! Shared fixtures for integration tests against a mock TDX server.

#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::json;
use tdx::clock::ManualClock;
use tdx::config::{Config, Credentials};
use tdx::tdx_client::TdxClient;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "helpdesk.bot";
pub const PASSWORD: &str = "correct-horse-battery";
pub const BEID: &str = "3f1b2c4d-beid";
pub const WEB_SERVICES_KEY: &str = "9a8b7c6d-wskey";
pub const APP_ID: u32 = 42;

/// Fixed start time for manual clocks.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// Builds an unsigned JWT whose `exp` claim is `exp`.
pub fn jwt_expiring_at(exp: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp.timestamp() }).to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

/// A token valid for one hour after [`start`].
pub fn hour_token() -> String {
    jwt_expiring_at(start() + TimeDelta::hours(1))
}

pub fn password_config(server: &MockServer) -> Config {
    Config::new(
        server.uri(),
        Credentials::Password {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
        },
    )
    .unwrap()
}

pub fn admin_config(server: &MockServer) -> Config {
    Config::new(
        server.uri(),
        Credentials::Admin {
            beid: BEID.to_string(),
            web_services_key: WEB_SERVICES_KEY.to_string(),
        },
    )
    .unwrap()
}

/// A password-authenticated client driven by a manual clock at [`start`].
pub fn client_with_clock(server: &MockServer) -> (TdxClient, ManualClock) {
    let clock = ManualClock::new(start());
    let client = TdxClient::with_clock(&password_config(server), Arc::new(clock.clone())).unwrap();
    (client, clock)
}

/// Mounts a password login that returns `token`, expected `times` times.
pub async fn mount_login(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .and(body_json(json!({ "username": USERNAME, "password": PASSWORD })))
        .respond_with(ResponseTemplate::new(200).set_body_string(token))
        .expect(times)
        .mount(server)
        .await;
}

/// A minimal ticket as TDX returns it, with a few fields we do not model.
pub fn ticket_json(id: i64, title: &str, status_id: i64) -> serde_json::Value {
    json!({
        "ID": id,
        "AppID": APP_ID,
        "Title": title,
        "StatusID": status_id,
        "StatusName": "New",
        "CreatedDate": "2024-05-01T09:00:00Z",
        "ModifiedDate": "2024-05-01T09:00:00.123",
        "RespondByDate": "0001-01-01T00:00:00",
        "Uri": format!("api/{}/tickets/{}", APP_ID, id),
        "IsSlaViolated": false,
        "WorkflowID": 0,
        "Permissions": { "CanEdit": true }
    })
}
