//! Synthetic ticket text from an OpenAI-compatible chat-completions API.
//!
//! The model is asked for a reply of the form
//!
//! ```text
//! Title: <short title>
//! Description: <longer description>
//! ```
//!
//! and [`parse_generated`] splits it into a [`GeneratedTicket`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{GeneratorConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::TdxError;

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f64 = 0.7;

/// Upper bound on generated tokens.
pub const MAX_TOKENS: u32 = 250;

const MAX_ERROR_BODY_LEN: usize = 300;

/// Title and description for a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTicket {
    pub title: String,
    pub description: String,
}

/// Anything that can produce ticket text.
///
/// The CLI depends on this trait so tests can supply canned text.
#[async_trait]
pub trait TicketTextSource: Send + Sync {
    /// Produces a title and description, optionally about `category`.
    async fn generate(&self, category: Option<&str>) -> Result<GeneratedTicket, TdxError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Chat-completions client that writes ticket text.
#[derive(Debug, Clone)]
pub struct TicketGenerator {
    http: Client,
    config: GeneratorConfig,
}

impl TicketGenerator {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: GeneratorConfig) -> Result<Self, TdxError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(TdxError::HttpClient)?;

        Ok(Self { http, config })
    }

    /// Builds the user prompt for an optional category.
    pub fn prompt_for(&self, category: Option<&str>) -> String {
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => format!(
                "{}\nThe ticket should be related to {}.",
                self.config.prompt, category
            ),
            None => self.config.prompt.clone(),
        }
    }

    fn generator_error(&self, message: impl AsRef<str>) -> TdxError {
        TdxError::generator(TdxError::sanitize_message(
            message.as_ref(),
            &[self.config.api_key()],
        ))
    }
}

#[async_trait]
impl TicketTextSource for TicketGenerator {
    async fn generate(&self, category: Option<&str>) -> Result<GeneratedTicket, TdxError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(self.prompt_for(category)),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(
            model = %self.config.model,
            category = category.unwrap_or("none"),
            "Requesting generated ticket"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| self.generator_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
            return Err(self.generator_error(format!("API error {}: {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.generator_error(format!("invalid response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TdxError::generator("response contained no message content"))?;

        parse_generated(&content)
    }
}

/// Splits a model reply into title and description.
///
/// The reply is split once on `Description:`. The title is the first part
/// with `Title:` removed; the description is the remainder, or the whole
/// reply when there is no `Description:` marker.
///
/// # Errors
///
/// Returns `TdxError::Generator` if no title remains.
pub fn parse_generated(content: &str) -> Result<GeneratedTicket, TdxError> {
    let (head, description) = match content.split_once("Description:") {
        Some((head, rest)) => (head, rest.trim()),
        None => (content, content.trim()),
    };

    let title = head.replace("Title:", "").trim().to_string();
    if title.is_empty() {
        return Err(TdxError::generator("generated reply had no title"));
    }

    Ok(GeneratedTicket {
        title,
        description: description.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_title_and_description() {
        let parsed = parse_generated(
            "Title: Outlook keeps asking for password\nDescription: Since this morning Outlook prompts every few minutes.",
        )
        .unwrap();

        assert_eq!(
            parsed,
            GeneratedTicket {
                title: "Outlook keeps asking for password".to_string(),
                description: "Since this morning Outlook prompts every few minutes.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_without_description_marker_uses_whole_reply() {
        let parsed = parse_generated("Printer on 3rd floor is offline").unwrap();
        assert_eq!(parsed.title, "Printer on 3rd floor is offline");
        assert_eq!(parsed.description, "Printer on 3rd floor is offline");
    }

    #[test]
    fn test_parse_splits_only_once() {
        let parsed = parse_generated("Title: A\nDescription: first Description: second").unwrap();
        assert_eq!(parsed.description, "first Description: second");
    }

    #[test]
    fn test_parse_rejects_missing_title() {
        let err = parse_generated("Title:\nDescription: body only").unwrap_err();
        assert!(matches!(err, TdxError::Generator(_)));
    }

    #[test]
    fn test_prompt_appends_category() {
        let generator =
            TicketGenerator::new(GeneratorConfig::new("sk-test", "Write a helpdesk ticket.")).unwrap();

        assert_eq!(
            generator.prompt_for(Some("Printer Problems")),
            "Write a helpdesk ticket.\nThe ticket should be related to Printer Problems."
        );
        assert_eq!(generator.prompt_for(None), "Write a helpdesk ticket.");
        assert_eq!(generator.prompt_for(Some("  ")), "Write a helpdesk ticket.");
    }
}
