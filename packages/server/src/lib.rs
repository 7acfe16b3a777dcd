// Chorus Moderation - API Core
//
// This crate provides the moderation backend for the Chorus music platform:
// report intake with per-reporter quotas, the moderation action lifecycle
// (authorization, cascading apply across albums and their tracks, and
// tamper-evident reversal with append-only history), and moderation analytics.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
