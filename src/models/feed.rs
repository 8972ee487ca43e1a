//! Ticket feed models.
//!
//! The feed is the comment/update stream of a ticket. Posting a
//! [`TicketFeedUpdate`] can also change the ticket's status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{
    deserialize_lenient_bool, deserialize_lenient_i64, deserialize_lenient_string,
    deserialize_tdx_date,
};

/// An entry in a ticket's feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedEntry {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub body: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_uid: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub created_full_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub created_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_tdx_date")]
    pub last_updated_date: Option<DateTime<Utc>>,

    #[serde(rename = "ItemID", default, deserialize_with = "deserialize_lenient_i64")]
    pub item_id: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub item_title: Option<String>,

    /// Kind of update as a TDX enum value.
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub update_type: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_private: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub reply_count: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub uri: Option<String>,
}

/// A comment or status change posted to a ticket's feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TicketFeedUpdate {
    /// Status to move the ticket to; `None` leaves it unchanged.
    #[serde(rename = "NewStatusID", skip_serializing_if = "Option::is_none")]
    pub new_status_id: Option<i64>,

    pub comments: String,

    /// Email addresses or UIDs to notify.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notify: Vec<String>,

    pub is_private: bool,

    pub is_rich_html: bool,

    /// Whether a status change also applies to child tickets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade_status: Option<bool>,
}

impl TicketFeedUpdate {
    /// Creates a public plain-text comment.
    pub fn comment(comments: impl Into<String>) -> Self {
        Self {
            comments: comments.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status_id: i64) -> Self {
        self.new_status_id = Some(status_id);
        self
    }

    pub fn with_notify(mut self, recipient: impl Into<String>) -> Self {
        self.notify.push(recipient.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}
