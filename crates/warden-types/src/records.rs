use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One giveaway, persisted for the whole of its life.
///
/// Keyed by `{channel_id}-{start_millis}`. The participant set is a
/// `BTreeSet` so the snapshot serializes as a sorted JSON array — persists
/// are deterministic and the set round-trips as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiveawayRecord {
    pub message_ref: String,
    pub channel_id: String,
    pub ends_at: DateTime<Utc>,
    pub winner_count: u32,
    pub prize: String,
    pub participants: BTreeSet<String>,
    pub creator_id: String,
}

/// A subject's warning history.
///
/// `threshold_crossed` guards the ban side effect: it flips to true when
/// the third warning lands and stays true until the record is cleared, so
/// warnings past three never re-trigger the ban.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningRecord {
    pub entries: Vec<WarningEntry>,
    #[serde(default)]
    pub threshold_crossed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningEntry {
    pub reason: String,
    pub warned_at: DateTime<Utc>,
}

/// Per-subject, per-scope leveling state.
///
/// Invariant: `xp < required_xp(level)` at rest. The grant that crosses
/// the threshold bumps the level and resets xp to zero in the same atomic
/// update — leftover xp never carries over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelRecord {
    pub xp: u64,
    pub level: u32,
}

impl Default for LevelRecord {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

/// XP needed to finish a level: `L * L * 50`.
pub fn required_xp(level: u32) -> u64 {
    u64::from(level) * u64::from(level) * 50
}

/// Result of probing one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    Up,
    Down,
    Unknown,
    /// Was Down in the previous snapshot, Up now.
    Fixed,
}

/// One service's row in a status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: String,
    pub state: ServiceState,
}

/// The full status readout at one instant. Immutable once produced; a
/// fresher probe supersedes it, never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub services: Vec<ServiceStatus>,
    pub checked_at: DateTime<Utc>,
}

/// In-memory AFK marker; never persisted.
#[derive(Debug, Clone)]
pub struct AfkRecord {
    pub note: String,
    pub since: DateTime<Utc>,
}
