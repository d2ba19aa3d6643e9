use thiserror::Error;

/// Failure taxonomy shared by every handler chain.
///
/// `NotFound` is a normal negative result (no channel matched, no record for
/// a subject) and handlers turn it into a plain reply. `Persistence` never
/// escapes the store layer as a process failure — the in-memory state stays
/// authoritative and the process keeps running.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An outbound call outlived its deadline and was cancelled.
    #[error("deadline exceeded")]
    Timeout,

    /// Non-2xx status or a response body we could not make sense of.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Semantic absence — reported, not retried.
    #[error("not found")]
    NotFound,

    /// Snapshot read/write failure. Logged; the store keeps its last-known
    /// in-memory state.
    #[error("persistence error: {0}")]
    Persistence(String),
}
