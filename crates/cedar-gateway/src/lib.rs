//! Cedar Gateway - HTTP API for dual-agent chat, memories, notes and voice

pub mod api;
pub mod auth;
pub mod config;
pub mod extract;
pub mod notes;
pub mod server;
pub mod voice;

pub use config::CedarConfig;
pub use server::{router, start_gateway, AppState};
