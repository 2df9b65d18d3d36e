//! Glue Home cloud API integration
//!
//! - `models`: Lock snapshot types returned by the API
//! - `client`: HTTP client (`list_locks`, lock operations)

pub mod client;
pub mod models;

pub use client::{GlueHomeClient, LocksApi};
pub use models::{Lock, LockOperation};

/// Catalog namespace for Glue Home devices
pub const DOMAIN: &str = "gluehome";

pub const DEVICE_MANUFACTURER: &str = "Glue";

/// Model reported when the API does not name one
pub const DEFAULT_MODEL: &str = "Glue Lock";
