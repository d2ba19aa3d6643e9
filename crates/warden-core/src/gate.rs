use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Process-wide bound on in-flight outbound calls.
///
/// Every feature routes its network calls through the one gate built at
/// startup, so the process never holds more than `limit` sockets against
/// remote services. Excess submissions queue FIFO (tokio's semaphore is
/// fair) and start as slots free. One task failing does not affect the
/// scheduling of the others.
///
/// Do not submit a task that itself awaits `run` on the same gate: with
/// every slot occupied by such tasks, nobody can finish. Flatten call
/// chains before submission instead.
#[derive(Clone)]
pub struct ConcurrencyGate {
    permits: Arc<Semaphore>,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Run `fut` once a slot is free. The slot is held for exactly the
    /// lifetime of the future — cancellation (e.g. a deadline firing and
    /// dropping us) releases it immediately via the permit guard.
    pub async fn run<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire only fails if we close
        // it ourselves — which we don't.
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("gate semaphore closed");
        fut.await
    }
}
