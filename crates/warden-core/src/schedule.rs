use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A one-shot deferred callback: fires at most once, after a delay.
///
/// Timers live only in this process. Components whose records outlive a
/// restart (giveaways) must re-derive the remaining delay from their
/// persisted end instant on load and arm a fresh action.
///
/// Dropping the handle also withdraws an unfired action (the cancel
/// channel closes), so owners must hold the handle until the action
/// fires.
pub struct ScheduledAction {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ScheduledAction {
    /// Schedule `action` to run once, `delay` from now. A zero delay fires
    /// on the next tick — used when a loaded record is already past due.
    pub fn arm<F>(delay: Duration, action: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // The deadline is fixed here, not at the spawned task's first
        // poll — a late first poll must not push it back.
        let deadline = tokio::time::Instant::now() + delay;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => action.await,
                _ = cancel_rx => {}
            }
        });
        Self {
            cancel: Some(cancel_tx),
            handle,
        }
    }

    /// Withdraw the action before it fires. A no-op if it already fired.
    pub fn cancel(mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }

    /// Whether the timer task has finished (fired or cancelled).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in = fired.clone();

        let action = ScheduledAction::arm(Duration::from_secs(10), async move {
            fired_in.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::advance(Duration::from_secs(9)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(action.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in = fired.clone();

        let action = ScheduledAction::arm(Duration::from_secs(10), async move {
            fired_in.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::advance(Duration::from_secs(5)).await;
        action.cancel();

        tokio::time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_from_arm_not_first_poll() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in = fired.clone();

        let action = ScheduledAction::arm(Duration::from_secs(10), async move {
            fired_in.fetch_add(1, Ordering::SeqCst);
        });

        // Advance the clock before the timer task has ever been polled;
        // the full delay has now elapsed, so it must fire right away.
        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(action.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_fires_immediately() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in = fired.clone();

        let _action = ScheduledAction::arm(Duration::ZERO, async move {
            fired_in.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
