//! Chat platform adapter (Discord HTTP API).
//!
//! Implements `AccessGateway` with guild member role endpoints and
//! per-member channel permission overwrites.

mod discord_gateway;

pub use discord_gateway::{DiscordAccessGateway, DiscordConfig};
