//! Request types for the resource API.
//!
//! Responses are passed through as `serde_json::Value`; the API owns their
//! shape.

pub mod entry;

pub use entry::{AccessTokenRequest, EntryQuery, Permission, PermissionType, ShareRequest};
