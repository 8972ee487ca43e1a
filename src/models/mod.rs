//! Data models for the TeamDynamix Web API.
//!
//! This module contains the ticket record, the payloads for creating and
//! updating tickets, feed entries, contacts and attachments.

mod common;
mod feed;
mod ticket;

pub use common::*;
pub use feed::*;
pub use ticket::*;
