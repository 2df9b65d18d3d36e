//! Periodic data refresh
//!
//! - `coordinator`: single-flight refresh with timeout and failure classification
//! - `state`: lifecycle state and status reporting

pub mod coordinator;
pub mod state;

pub use coordinator::{RefreshCoordinator, RefreshPolicy, UpdateSource};
pub use state::RefreshStatus;
