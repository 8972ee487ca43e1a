//! Ticket generator against a mock chat-completions endpoint.

use pretty_assertions::assert_eq;
use serde_json::json;
use tdx::config::GeneratorConfig;
use tdx::error::TdxError;
use tdx::generator::{TicketGenerator, TicketTextSource};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "sk-test-0123456789";

fn generator(server: &MockServer) -> TicketGenerator {
    let config = GeneratorConfig::new(API_KEY, "Write a realistic university helpdesk ticket.")
        .with_base_url(format!("{}/v1/", server.uri()));
    TicketGenerator::new(config).unwrap()
}

#[tokio::test]
async fn test_generate_sends_prompt_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.7,
            "max_tokens": 250,
            "messages": [{
                "role": "user",
                "content": "Write a realistic university helpdesk ticket.\nThe ticket should be related to Email Issues."
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Title: Shared mailbox missing\nDescription: The finance shared mailbox disappeared from Outlook."
                },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ticket = generator(&server).generate(Some("Email Issues")).await.unwrap();

    assert_eq!(ticket.title, "Shared mailbox missing");
    assert_eq!(
        ticket.description,
        "The finance shared mailbox disappeared from Outlook."
    );
}

#[tokio::test]
async fn test_generate_api_error_hides_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(format!("Incorrect API key provided: {}", API_KEY)),
        )
        .mount(&server)
        .await;

    let err = generator(&server).generate(None).await.unwrap_err();

    assert!(matches!(err, TdxError::Generator(_)));
    let message = err.to_string();
    assert!(message.contains("401"));
    assert!(!message.contains(API_KEY));
}

#[tokio::test]
async fn test_generate_without_choices_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = generator(&server).generate(None).await.unwrap_err();
    assert!(err.to_string().contains("no message content"));
}
