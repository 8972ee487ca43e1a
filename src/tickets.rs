//! Ticket operations against the TDX Web API.
//!
//! Every call passes through a rolling-window gate before it reaches the
//! session client. Ticket creation has its own 120 calls/60 s budget; all
//! other ticket operations share one 60 calls/60 s budget.

use std::time::Duration;

use serde::de::IgnoredAny;

use crate::error::TdxError;
use crate::models::{
    Attachment, Contact, CreateTicketOptions, FeedEntry, NewTicket, Ticket, TicketFeedUpdate,
};
use crate::rate_limit::{RateLimiter, DEFAULT_MAX_CALLS, DEFAULT_PERIOD};
use crate::tdx_client::{FilePart, RequestOptions, TdxClient};

/// Calls per window allowed for ticket creation.
pub const CREATE_MAX_CALLS: usize = 120;

/// Window for ticket creation.
pub const CREATE_PERIOD: Duration = Duration::from_secs(60);

/// Ticket operations bound to one session.
///
/// Clones share the session and both rate windows.
#[derive(Clone)]
pub struct TicketClient {
    client: TdxClient,
    create_gate: RateLimiter,
    ticket_gate: RateLimiter,
}

impl TicketClient {
    /// Creates a ticket client with the standard rate limits.
    ///
    /// Both gates read time from the session client's clock.
    pub fn new(client: TdxClient) -> Result<Self, TdxError> {
        let clock = client.clock();
        let create_gate = RateLimiter::with_clock(CREATE_MAX_CALLS, CREATE_PERIOD, clock.clone())?;
        let ticket_gate = RateLimiter::with_clock(DEFAULT_MAX_CALLS, DEFAULT_PERIOD, clock)?;
        Ok(Self::with_gates(client, create_gate, ticket_gate))
    }

    /// Creates a ticket client with explicit gates.
    pub fn with_gates(client: TdxClient, create_gate: RateLimiter, ticket_gate: RateLimiter) -> Self {
        Self {
            client,
            create_gate,
            ticket_gate,
        }
    }

    /// The underlying session client.
    pub fn session(&self) -> &TdxClient {
        &self.client
    }

    fn ticket_path(app_id: u32, ticket_id: i64, suffix: &str) -> String {
        format!("api/{}/tickets/{}{}", app_id, ticket_id, suffix)
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// Creates a ticket.
    ///
    /// # Arguments
    ///
    /// * `app_id` - Ticketing application ID
    /// * `ticket` - Ticket fields
    /// * `options` - Notification and defaulting flags
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Validation` for a blank title or requestor before
    /// any request is made, otherwise any session client error.
    pub async fn create(
        &self,
        app_id: u32,
        ticket: &NewTicket,
        options: &CreateTicketOptions,
    ) -> Result<Ticket, TdxError> {
        ticket.validate()?;

        let request = options
            .query_pairs()
            .into_iter()
            .fold(RequestOptions::new(), |req, (key, value)| req.with_query(key, value))
            .with_body(ticket)?;

        let path = format!("api/{}/tickets", app_id);
        let created: Ticket = self
            .create_gate
            .call(|| self.client.post(&path, request))
            .await?
            .ok_or_else(|| TdxError::empty_response("ticket create"))?;

        tracing::info!(
            app_id = app_id,
            ticket_id = created.id,
            "Created ticket"
        );
        Ok(created)
    }

    /// Fetches a ticket.
    pub async fn get(&self, app_id: u32, ticket_id: i64) -> Result<Ticket, TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, "");
        self.ticket_gate
            .call(|| self.client.get(&path, RequestOptions::new()))
            .await?
            .ok_or_else(|| TdxError::empty_response("ticket get"))
    }

    /// Replaces a ticket's editable fields.
    ///
    /// `changes` is the full ticket body as TDX expects it for an edit.
    pub async fn edit(
        &self,
        app_id: u32,
        ticket_id: i64,
        changes: &serde_json::Value,
        notify_new_responsible: bool,
    ) -> Result<Ticket, TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, "");
        let request = RequestOptions::new()
            .with_query("notifyNewResponsible", notify_new_responsible)
            .with_json(changes.clone());

        let edited: Ticket = self
            .ticket_gate
            .call(|| self.client.post(&path, request))
            .await?
            .ok_or_else(|| TdxError::empty_response("ticket edit"))?;

        tracing::info!(app_id = app_id, ticket_id = ticket_id, "Edited ticket");
        Ok(edited)
    }

    // ========================================================================
    // Feed
    // ========================================================================

    /// Posts a comment or status change to a ticket's feed.
    pub async fn update(
        &self,
        app_id: u32,
        ticket_id: i64,
        update: &TicketFeedUpdate,
    ) -> Result<FeedEntry, TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, "/feed");
        let request = RequestOptions::new().with_body(update)?;

        self.ticket_gate
            .call(|| self.client.post(&path, request))
            .await?
            .ok_or_else(|| TdxError::empty_response("ticket update"))
    }

    /// Lists a ticket's feed entries.
    pub async fn feed(&self, app_id: u32, ticket_id: i64) -> Result<Vec<FeedEntry>, TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, "/feed");
        let entries = self
            .ticket_gate
            .call(|| self.client.get(&path, RequestOptions::new()))
            .await?;
        Ok(entries.unwrap_or_default())
    }

    // ========================================================================
    // Assets
    // ========================================================================

    /// Links an asset to a ticket.
    pub async fn add_asset(&self, app_id: u32, ticket_id: i64, asset_id: i64) -> Result<(), TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, &format!("/assets/{}", asset_id));
        self.ticket_gate
            .call(|| self.client.post::<IgnoredAny>(&path, RequestOptions::new()))
            .await?;
        Ok(())
    }

    /// Unlinks an asset from a ticket.
    pub async fn remove_asset(
        &self,
        app_id: u32,
        ticket_id: i64,
        asset_id: i64,
    ) -> Result<(), TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, &format!("/assets/{}", asset_id));
        self.ticket_gate
            .call(|| self.client.delete::<IgnoredAny>(&path, RequestOptions::new()))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Contacts
    // ========================================================================

    /// Lists a ticket's contacts.
    pub async fn contacts(&self, app_id: u32, ticket_id: i64) -> Result<Vec<Contact>, TdxError> {
        let path = Self::ticket_path(app_id, ticket_id, "/contacts");
        let contacts = self
            .ticket_gate
            .call(|| self.client.get(&path, RequestOptions::new()))
            .await?;
        Ok(contacts.unwrap_or_default())
    }

    /// Adds a person to a ticket's contacts.
    pub async fn add_contact(&self, app_id: u32, ticket_id: i64, uid: &str) -> Result<(), TdxError> {
        let path = Self::contact_path(app_id, ticket_id, uid)?;
        self.ticket_gate
            .call(|| self.client.post::<IgnoredAny>(&path, RequestOptions::new()))
            .await?;
        Ok(())
    }

    /// Removes a person from a ticket's contacts.
    pub async fn remove_contact(
        &self,
        app_id: u32,
        ticket_id: i64,
        uid: &str,
    ) -> Result<(), TdxError> {
        let path = Self::contact_path(app_id, ticket_id, uid)?;
        self.ticket_gate
            .call(|| self.client.delete::<IgnoredAny>(&path, RequestOptions::new()))
            .await?;
        Ok(())
    }

    fn contact_path(app_id: u32, ticket_id: i64, uid: &str) -> Result<String, TdxError> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(TdxError::validation("contact UID must not be empty"));
        }
        Ok(Self::ticket_path(
            app_id,
            ticket_id,
            &format!("/contacts/{}", urlencoding::encode(uid)),
        ))
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// Uploads a file to a ticket.
    pub async fn upload_attachment(
        &self,
        app_id: u32,
        ticket_id: i64,
        file: FilePart,
    ) -> Result<Attachment, TdxError> {
        if file.file_name.trim().is_empty() {
            return Err(TdxError::validation("attachment file name must not be empty"));
        }

        let path = Self::ticket_path(app_id, ticket_id, "/attachments");
        let file_name = file.file_name.clone();
        let request = RequestOptions::new().with_file(file);

        let attachment: Attachment = self
            .ticket_gate
            .call(|| self.client.post(&path, request))
            .await?
            .ok_or_else(|| TdxError::empty_response("attachment upload"))?;

        tracing::info!(
            app_id = app_id,
            ticket_id = ticket_id,
            file_name = %file_name,
            "Uploaded attachment"
        );
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_paths() {
        assert_eq!(TicketClient::ticket_path(42, 1001, ""), "api/42/tickets/1001");
        assert_eq!(
            TicketClient::ticket_path(42, 1001, "/feed"),
            "api/42/tickets/1001/feed"
        );
    }

    #[test]
    fn test_contact_path_encodes_uid() {
        assert_eq!(
            TicketClient::contact_path(42, 1001, "a b/c").unwrap(),
            "api/42/tickets/1001/contacts/a%20b%2Fc"
        );
        assert!(TicketClient::contact_path(42, 1001, "  ").is_err());
    }
}
