use std::future::Future;
use std::time::Duration;

use warden_types::error::CoreError;

/// Single-use deadline around one outbound call.
///
/// On expiry the wrapped future is dropped, which cancels the underlying
/// transport cooperatively (reqwest aborts the request when its future is
/// dropped), so a gated call releases its slot the moment it times out.
pub struct DeadlineGuard {
    deadline: Duration,
}

impl DeadlineGuard {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Consumes the guard: one guard, one call.
    pub async fn run<F, T>(self, fut: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout),
        }
    }
}
