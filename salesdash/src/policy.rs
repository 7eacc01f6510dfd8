use serde::{Deserialize, Serialize};

/// How the coordinator treats a stale cache entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Treat stale as expired and wait for fresh data; the stale value is
    /// only used if the refetch fails.
    #[default]
    Revalidate,
    /// Return stale data without any revalidation.
    Return,
    /// Return stale data immediately and refresh the entry in background.
    OffloadRevalidate,
}
