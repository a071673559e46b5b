//! REST API client module for the wault resource API.
//!
//! `ApiClient` is the authenticated request envelope; `WaultClient` layers
//! the individual endpoints (entries, claims, access requests, sharing) on
//! top of it.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, DEVICE_ID_HEADER, JSON_CONTENT_TYPE};
pub use endpoints::WaultClient;
pub use error::ApiError;
