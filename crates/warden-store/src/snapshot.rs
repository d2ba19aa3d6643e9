use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// Load-at-startup / mutate-in-memory / rewrite-on-change keyed store.
///
/// One instance exclusively owns one snapshot file. Every mutator rewrites
/// the whole file synchronously while the map lock is held, so the bytes on
/// disk always reflect a consistent map (write-through — fine at human
/// mutation rates). There is no atomic rename: a crash mid-write can
/// corrupt the snapshot, and a corrupt or missing snapshot loads as an
/// empty store rather than failing startup.
///
/// Keys live in a `BTreeMap` so repeated persists of the same map are
/// byte-identical.
pub struct PersistedKeyedStore<T> {
    path: PathBuf,
    map: Mutex<BTreeMap<String, T>>,
}

impl<T> PersistedKeyedStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Read the snapshot at `path` if it exists. Absence is a normal cold
    /// start; a parse failure is logged and also yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, T>>(&raw) {
                Ok(map) => {
                    info!("loaded {} records from {}", map.len(), path.display());
                    map
                }
                Err(e) => {
                    warn!(
                        "snapshot {} is unreadable ({}), starting cold",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            // Absence is a normal cold start; anything else is worth a
            // warning before we start cold anyway.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(
                    "could not read snapshot {} ({}), starting cold",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.map.lock().unwrap().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: T) {
        let mut map = self.map.lock().unwrap();
        map.insert(key.into(), value);
        self.persist_locked(&map);
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        let mut map = self.map.lock().unwrap();
        let removed = map.remove(key);
        if removed.is_some() {
            self.persist_locked(&map);
        }
        removed
    }

    /// Atomic check-then-act on one key: `f` sees the slot (absent or
    /// present), mutates it in place, and the result is persisted before
    /// the lock drops. `f` must not block — the map lock is a plain mutex
    /// held for the whole read-modify-write-persist step.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        let mut map = self.map.lock().unwrap();
        let mut slot = map.remove(key);
        let result = f(&mut slot);
        if let Some(value) = slot {
            map.insert(key.to_string(), value);
        }
        self.persist_locked(&map);
        result
    }

    /// Snapshot of all entries, for iteration without holding the lock.
    pub fn entries(&self) -> Vec<(String, T)> {
        self.map
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().unwrap().is_empty()
    }

    /// Rewrite the snapshot from the current map.
    pub fn persist(&self) {
        let map = self.map.lock().unwrap();
        self.persist_locked(&map);
    }

    fn persist_locked(&self, map: &BTreeMap<String, T>) {
        let serialized = match serde_json::to_string_pretty(map) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to serialize {}: {}", self.path.display(), e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, serialized) {
            warn!(
                "failed to write snapshot {} ({}), keeping in-memory state",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        count: u32,
        tags: BTreeSet<String>,
    }

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("warden-{}-{}.json", name, std::process::id()));
        path
    }

    #[test]
    fn missing_file_loads_empty() {
        let store: PersistedKeyedStore<Sample> = PersistedKeyedStore::load("/nonexistent/nowhere.json");
        assert!(store.is_empty());
    }

    #[test]
    fn unreadable_path_loads_empty() {
        // A directory fails the read with something other than NotFound.
        let store: PersistedKeyedStore<Sample> = PersistedKeyedStore::load(std::env::temp_dir());
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let path = scratch_path("corrupt");
        std::fs::write(&path, "{ not json ").unwrap();
        let store: PersistedKeyedStore<Sample> = PersistedKeyedStore::load(&path);
        assert!(store.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn persists_and_round_trips_including_sets() {
        let path = scratch_path("roundtrip");
        std::fs::remove_file(&path).ok();

        let store = PersistedKeyedStore::load(&path);
        let mut tags = BTreeSet::new();
        tags.insert("a".to_string());
        tags.insert("b".to_string());
        store.set("u1-g1", Sample { count: 3, tags: tags.clone() });
        store.set("u2-g1", Sample { count: 0, tags: BTreeSet::new() });

        let reloaded: PersistedKeyedStore<Sample> = PersistedKeyedStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("u1-g1"), Some(Sample { count: 3, tags }));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn repeated_persist_is_byte_identical() {
        let path = scratch_path("idempotent");
        std::fs::remove_file(&path).ok();

        let store = PersistedKeyedStore::load(&path);
        store.set(
            "k",
            Sample {
                count: 1,
                tags: BTreeSet::new(),
            },
        );
        let first = std::fs::read(&path).unwrap();
        store.persist();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn update_is_check_then_act_on_one_key() {
        let path = scratch_path("update");
        std::fs::remove_file(&path).ok();

        let store: PersistedKeyedStore<Sample> = PersistedKeyedStore::load(&path);
        let created = store.update("k", |slot| {
            let sample = slot.get_or_insert_with(|| Sample {
                count: 0,
                tags: BTreeSet::new(),
            });
            sample.count += 1;
            sample.count
        });
        assert_eq!(created, 1);
        assert_eq!(store.get("k").unwrap().count, 1);

        // Dropping the slot inside the closure removes the key.
        store.update("k", |slot| *slot = None);
        assert!(store.get("k").is_none());

        std::fs::remove_file(&path).ok();
    }
}
