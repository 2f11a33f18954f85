//! Core data models for the static-site host.
//!
//! `Site` is the one durable record, mapped to SQLite via `sqlx::FromRow`.
//! Everything in `upload` is ephemeral pipeline state that serializes
//! naturally as JSON via `serde` where it crosses the HTTP boundary.

pub mod site;
pub mod upload;
