//! `listcast-core`: domain model for the listing publishing workflow.
//!
//! This crate has zero internal deps so it can be shared by the HTTP
//! client, the workflow engine and any CLI tooling.

pub mod channel;
pub mod draft;
pub mod draft_status;
pub mod error;
pub mod export;
pub mod generation;
pub mod language;
pub mod publishing;
pub mod services;
pub mod types;
pub mod validation;
