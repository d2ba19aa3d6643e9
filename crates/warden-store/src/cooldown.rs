use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Per-(subject, action) expiry tracking.
///
/// An entry whose expiry has passed is logically absent; `set` always
/// overwrites. Each `set` also arms a lazy cleanup task so one-off users
/// don't accumulate in the map forever — the cleanup only removes the
/// entry if it still holds the expiry it was armed for, so overwriting a
/// cooldown never gets clipped by an older entry's sweeper.
#[derive(Clone, Default)]
pub struct CooldownStore {
    entries: Arc<Mutex<HashMap<(String, String), Instant>>>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a cooldown for `subject` on `action`.
    pub fn set(&self, subject: &str, action: &str, duration: Duration) {
        let key = (subject.to_string(), action.to_string());
        let expiry = Instant::now() + duration;
        self.entries.lock().unwrap().insert(key.clone(), expiry);
        self.arm_sweeper(key, expiry);
    }

    /// Check-then-start under one lock: begins the cooldown and returns
    /// true only if none was running. Handlers run on their own spawned
    /// tasks, so a separate `ready` check followed by `set` would let two
    /// simultaneous events through — this is the guard they use instead.
    pub fn try_start(&self, subject: &str, action: &str, duration: Duration) -> bool {
        let key = (subject.to_string(), action.to_string());
        let now = Instant::now();
        let expiry = now + duration;
        {
            let mut entries = self.entries.lock().unwrap();
            if entries.get(&key).is_some_and(|e| *e > now) {
                return false;
            }
            entries.insert(key.clone(), expiry);
        }
        self.arm_sweeper(key, expiry);
        true
    }

    fn arm_sweeper(&self, key: (String, String), expiry: Instant) {
        let entries = self.entries.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(expiry).await;
            let mut entries = entries.lock().unwrap();
            if entries.get(&key) == Some(&expiry) {
                entries.remove(&key);
            }
        });
    }

    /// Time left on the cooldown; zero means usable now.
    pub fn remaining(&self, subject: &str, action: &str) -> Duration {
        let key = (subject.to_string(), action.to_string());
        let entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(expiry) => expiry.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// True if the subject may act now. Does not start a cooldown.
    pub fn ready(&self, subject: &str, action: &str) -> bool {
        self.remaining(subject, action).is_zero()
    }

    #[cfg(test)]
    fn raw_len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
