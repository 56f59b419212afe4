//! Slack Integration - Events API webhook interface
//!
//! This crate provides the Slack side of promptbot:
//! - **Events** (`events`) - payload parsing and the `EventRouter`
//! - **Block Kit** (`blocks`) - message builders and the prompt result card
//! - **Web API** (`client`) - `chat.postMessage` through the `MessagePoster` seam
//!
//! # Architecture
//!
//! ```text
//! POST /slack/events → parse_payload → EventRouter → PromptRequestService
//!                                                          ↓
//!                            chat.postMessage ← prompt_result_message
//! ```
//!
//! Signature verification happens before any of this, in the server, because
//! it needs the raw request bytes.
//!
//! # Key Types
//!
//! - `SlackEvent` - handshake, button click, message, or ignored
//! - `EventRouter` - answers handshakes and hands prompt requests to the service
//! - `PromptRequestService` - trait implemented by the server's pipeline
//! - `SlackWebClient` - bearer-token client for `chat.postMessage`

pub mod blocks;
pub mod client;
pub mod events;

pub use blocks::{prompt_result_message, MessageTemplate, REGENERATE_ACTION_ID};
pub use client::{MessagePoster, SlackClientError, SlackWebClient};
pub use events::{
    parse_payload, EventContext, EventRouter, PromptRequestService, RouteOutcome, SlackEvent,
};
