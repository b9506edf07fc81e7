//! Access Reconciler - Commerce subscriptions to community chat access
//!
//! Keeps a chat community's roles and private channels in line with what
//! each subscriber has paid for on the commerce platform, plus community
//! tiers earned through performance metrics.
//!
//! # Layers
//!
//! - `domain` - Tiers, catalog, subscriber record, webhook verification
//! - `ports` - Store and gateway contracts
//! - `application` - Reconciliation engine, command handlers, webhook router, sweeper
//! - `adapters` - Podia, Discord, PostgreSQL, in-memory store, HTTP API
//! - `config` - Environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;
