//! `codial-providers` — provider-bridge catalog and clients.
//!
//! A *bridge* is an external HTTP adapter in front of one model vendor.
//! This crate provides:
//! - The [`BridgeProvider`] trait — the narrow capability the turn engine
//!   programs against: one `run` call per tool-loop round.
//! - A [`ProviderCatalog`] that instantiates a client per enabled
//!   provider and resolves session selections.
//! - The Copilot auth bootstrap (injected token → cache file → login
//!   endpoint).

pub mod bridge;
pub mod catalog;
pub mod copilot;
pub mod traits;

pub use catalog::ProviderCatalog;
pub use traits::{
    BridgeOutcome, BridgeProvider, BridgeReply, BridgeRequest, ToolManifestEntry, ToolRequest,
    ToolResultEntry,
};
