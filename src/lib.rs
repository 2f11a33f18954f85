//! Multi-tenant static-site host: upload ingestion, sanitization, and
//! deployment, plus the thin HTTP surface around it.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
