//! HTTP client for the listing backend.
//!
//! [`BackendApi`] implements the collaborator traits from
//! `listcast_core::services` against the backend's social publishing REST
//! endpoints.

pub mod api;
pub mod config;
pub mod dto;

pub use api::{ApiError, BackendApi};
pub use config::ClientConfig;
