//! Document checklist tracking for citizenship application intake.
//!
//! The [`intake`] module owns the checklist catalog, the in-memory application
//! registry and the HTTP surface staff use to review documents. The [`upload`]
//! module relays base64 file payloads to blob storage and hands back a URL the
//! registry attaches to a checklist entry.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
pub mod upload;
