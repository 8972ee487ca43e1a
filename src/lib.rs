//! # tdx
//!
//! A client for the TeamDynamix (TDX) Web API helpdesk.
//!
//! It logs in with a username/password or an administrative BEID/web
//! services key pair, keeps the bearer token fresh, paces calls under the
//! API's rate limits and exposes ticket operations. A small CLI creates
//! tickets interactively, optionally with text written by an LLM.
//!
//! ## Features
//!
//! - **Sessions**: Lazy login, proactive refresh five minutes before the
//!   token's `exp`, and a single re-authenticated retry after a 401
//! - **Rate limiting**: Rolling-window gates that delay, never reject
//! - **Tickets**: Create, get, edit, feed updates, assets, contacts and
//!   attachments
//! - **Security**: Passwords, keys and tokens are never logged and are
//!   stripped from error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with message sanitization
//! - [`clock`] - Injectable time source
//! - [`token`] - Bearer tokens and JWT expiry decoding
//! - [`rate_limit`] - Rolling-window rate limiter
//! - [`tdx_client`] - Authenticated HTTP client for the TDX API
//! - [`models`] - Ticket, feed, contact and attachment models
//! - [`tickets`] - Rate-limited ticket operations
//! - [`generator`] - Synthetic ticket text from a chat-completions API
//! - [`cli`] - Interactive ticket creation
//!
//! ## Configuration
//!
//! Required:
//! - `TDX_BASE_URL`: Base URL of the Web API (e.g. `https://example.teamdynamix.com/TDWebApi`)
//! - Either `TDX_USERNAME` and `TDX_PASSWORD`, or `TDX_BEID` and
//!   `TDX_WEB_SERVICES_KEY`
//!
//! Optional:
//! - `TDX_TIMEOUT_SECS`: Per-request timeout (default 30)
//! - `RUST_LOG`: Log level (e.g., `tdx=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use tdx::config::{Config, TicketDefaults};
//! use tdx::models::{CreateTicketOptions, NewTicket};
//! use tdx::tdx_client::TdxClient;
//! use tdx::tickets::TicketClient;
//!
//! async fn example() -> Result<(), tdx::error::TdxError> {
//!     let config = Config::from_env()?;
//!     let defaults = TicketDefaults::from_env()?;
//!     let tickets = TicketClient::new(TdxClient::new(&config)?)?;
//!
//!     let ticket = NewTicket::from_defaults(&defaults, "Printer jam", "Tray 2 jams", 28549);
//!     let created = tickets
//!         .create(defaults.app_id, &ticket, &CreateTicketOptions::default())
//!         .await?;
//!     println!("#{}: {}", created.id, created.display_title());
//!
//!     Ok(())
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod rate_limit;
pub mod tdx_client;
pub mod tickets;
pub mod token;
