//! Ticket operations against a mock TDX server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tdx::clock::{Clock, ManualClock};
use tdx::error::TdxError;
use tdx::models::{CreateTicketOptions, NewTicket, TicketFeedUpdate};
use tdx::tdx_client::{FilePart, TdxClient};
use tdx::tickets::TicketClient;
use wiremock::matchers::{body_json, body_partial_json, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Ticket client whose session token and rate windows follow `clock`.
async fn ticket_client(server: &MockServer) -> (TicketClient, ManualClock) {
    let (client, clock) = client_with_clock(server);
    (TicketClient::new(client).unwrap(), clock)
}

fn printer_ticket() -> NewTicket {
    NewTicket::new(4713, "Printer jam", 8811, 28549, 864, "uid-1", "Tray 2 jams")
        .with_source(1648)
        .with_field("RequestorEmail", "requestor@example.edu")
}

#[tokio::test]
async fn test_create_sends_body_and_flags() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets"))
        .and(query_param("EnableNotifyReviewer", "false"))
        .and(query_param("NotifyRequestor", "true"))
        .and(query_param("NotifyResponsible", "true"))
        .and(query_param("AllowRequestorCreation", "true"))
        .and(query_param("ApplyDefaults", "true"))
        .and(body_json(json!({
            "TypeID": 4713,
            "Title": "Printer jam",
            "AccountID": 8811,
            "StatusID": 28549,
            "PriorityID": 864,
            "RequestorUid": "uid-1",
            "Description": "Tray 2 jams",
            "SourceID": 1648,
            "RequestorEmail": "requestor@example.edu"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(1001, "Printer jam", 28549)))
        .expect(1)
        .mount(&server)
        .await;

    let (tickets, _clock) = ticket_client(&server).await;
    let created = tickets
        .create(APP_ID, &printer_ticket(), &CreateTicketOptions::default())
        .await
        .unwrap();

    assert_eq!(created.id, 1001);
    assert_eq!(created.app_id, Some(42));
    assert_eq!(created.display_title(), "Printer jam");
    assert!(created.created_date.is_some());
}

#[tokio::test]
async fn test_create_accepts_integer_enum_fields_in_response() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 1).await;
    let mut response = ticket_json(1004, "Printer jam", 28549);
    response["Classification"] = json!(46);
    response["StatusClass"] = json!(1);
    response["TypeID"] = json!("4713");
    Mock::given(method("POST"))
        .and(path("/api/42/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .expect(1)
        .mount(&server)
        .await;

    let (tickets, _clock) = ticket_client(&server).await;
    let created = tickets
        .create(APP_ID, &printer_ticket(), &CreateTicketOptions::default())
        .await;

    let created = tokio_test::assert_ok!(created);
    assert_eq!(created.id, 1004);
    assert_eq!(created.classification.as_deref(), Some("46"));
    assert_eq!(created.status_class.as_deref(), Some("1"));
    assert_eq!(created.type_id, Some(4713));
}

#[tokio::test]
async fn test_create_rejects_blank_title_without_calling_api() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 0).await;

    let (tickets, _clock) = ticket_client(&server).await;
    let ticket = NewTicket::new(4713, "  ", 8811, 28549, 864, "uid-1", "d");
    let err = tickets
        .create(APP_ID, &ticket, &CreateTicketOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TdxError::Validation(_)));
}

#[tokio::test]
async fn test_125_creates_are_paced_at_120_per_minute() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(jwt_expiring_at(start() + TimeDelta::days(1))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(1001, "Printer jam", 28549)))
        .expect(125)
        .mount(&server)
        .await;

    let (tickets, clock) = ticket_client(&server).await;
    let ticket = printer_ticket();
    let options = CreateTicketOptions::default();

    for _ in 0..125 {
        tickets.create(APP_ID, &ticket, &options).await.unwrap();
        clock.advance(Duration::from_millis(100));
    }

    // The 121st create arrives at t=12s and waits until the first ages out.
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(48)]);
    assert_eq!(clock.now(), start() + TimeDelta::milliseconds(60_500));
}

#[tokio::test]
async fn test_get_and_edit() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 1).await;
    Mock::given(method("GET"))
        .and(path("/api/42/tickets/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(1001, "Printer jam", 28549)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets/1001"))
        .and(query_param("notifyNewResponsible", "true"))
        .and(body_partial_json(json!({ "Title": "Printer jam (tray 2)" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ticket_json(1001, "Printer jam (tray 2)", 28550)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (tickets, _clock) = ticket_client(&server).await;

    let mut ticket = serde_json::to_value(tickets.get(APP_ID, 1001).await.unwrap()).unwrap();
    ticket["Title"] = json!("Printer jam (tray 2)");

    let edited = tickets.edit(APP_ID, 1001, &ticket, true).await.unwrap();
    assert_eq!(edited.title.as_deref(), Some("Printer jam (tray 2)"));
    assert_eq!(edited.status_id, Some(28550));
}

#[tokio::test]
async fn test_feed_update_and_listing() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets/1001/feed"))
        .and(body_json(json!({
            "NewStatusID": 28552,
            "Comments": "Cleared the jam",
            "IsPrivate": false,
            "IsRichHtml": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ID": 555,
            "Body": "Cleared the jam",
            "ItemID": 1001,
            "CreatedDate": "2024-05-01T09:05:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/42/tickets/1001/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ID": 555, "Body": "Cleared the jam" },
            { "ID": 554, "Body": "Ticket created", "IsPrivate": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (tickets, _clock) = ticket_client(&server).await;

    let update = TicketFeedUpdate::comment("Cleared the jam").with_status(28552);
    let entry = tickets.update(APP_ID, 1001, &update).await.unwrap();
    assert_eq!(entry.id, 555);
    assert_eq!(entry.item_id, Some(1001));

    let feed = tickets.feed(APP_ID, 1001).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[1].is_private, Some(true));
}

#[tokio::test]
async fn test_assets_and_contacts() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets/1001/assets/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Message": "Asset added" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/42/tickets/1001/assets/77"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets/1001/contacts/abc-123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/42/tickets/1001/contacts/abc-123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/42/tickets/1001/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "UID": "abc-123", "FullName": "Pat Doe", "PrimaryEmail": "pat@example.edu" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (tickets, _clock) = ticket_client(&server).await;

    tickets.add_asset(APP_ID, 1001, 77).await.unwrap();
    tickets.remove_asset(APP_ID, 1001, 77).await.unwrap();
    tickets.add_contact(APP_ID, 1001, "abc-123").await.unwrap();

    let contacts = tickets.contacts(APP_ID, 1001).await.unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].display_name(), "Pat Doe");

    tickets.remove_contact(APP_ID, 1001, "abc-123").await.unwrap();
}

#[tokio::test]
async fn test_attachment_upload_is_multipart_and_survives_retry() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 2).await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets/1001/attachments"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/42/tickets/1001/attachments"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ID": "5b1a0a1e-7c4b-4f0e-9a3d-2f1e8d6c4b2a",
            "Name": "error.log",
            "Size": 11
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (tickets, _clock) = ticket_client(&server).await;
    let file = FilePart::new("error.log", b"disk full\r\n".to_vec()).with_mime("text/plain");

    let attachment = tickets.upload_attachment(APP_ID, 1001, file).await.unwrap();
    assert_eq!(attachment.name.as_deref(), Some("error.log"));
    assert_eq!(attachment.size, Some(11));

    let requests = server.received_requests().await.unwrap();
    let uploads: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/42/tickets/1001/attachments")
        .collect();
    assert_eq!(uploads.len(), 2);
    for upload in uploads {
        let body = String::from_utf8_lossy(&upload.body);
        assert!(body.contains("filename=\"error.log\""));
        assert!(body.contains("disk full"));
    }
}

#[tokio::test]
async fn test_ticket_operations_share_one_window() {
    let server = MockServer::start().await;
    mount_login(&server, &hour_token(), 1).await;
    Mock::given(method("GET"))
        .and(path("/api/42/tickets/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(1001, "t", 28549)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/42/tickets/1001/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let clock = ManualClock::new(start());
    let client = TdxClient::with_clock(&password_config(&server), Arc::new(clock.clone())).unwrap();
    let gate = |max| {
        tdx::rate_limit::RateLimiter::with_clock(max, Duration::from_secs(60), Arc::new(clock.clone()))
            .unwrap()
    };
    let tickets = TicketClient::with_gates(client, gate(120), gate(2));

    tickets.get(APP_ID, 1001).await.unwrap();
    tickets.feed(APP_ID, 1001).await.unwrap();
    assert!(clock.sleeps().is_empty());

    // Third ticket operation in the same minute waits for the window.
    tickets.get(APP_ID, 1001).await.unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
}
