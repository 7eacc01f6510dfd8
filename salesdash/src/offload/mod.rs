//! Background revalidation of stale cache entries.
//!
//! Used by the coordinator under
//! [`StalePolicy::OffloadRevalidate`](crate::StalePolicy::OffloadRevalidate):
//! stale data is returned immediately while the refresh runs in a task
//! tracked here.

mod manager;
mod policy;

pub use manager::OffloadManager;
pub use policy::{OffloadConfig, TimeoutPolicy};
