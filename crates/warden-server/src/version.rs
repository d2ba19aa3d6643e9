use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize, Deserialize)]
struct VersionData {
    version: String,
}

/// Bump the stored version on every boot and write it back.
///
/// The file holds one object (`{"version": "x.y.z"}`); absence or a
/// parse failure restarts the count at 1.0.0. Carry works like an
/// odometer capped at 9 per slot: 1.0.9 -> 1.1.0, 1.9.9 -> 2.0.0.
pub fn bump(path: &Path) -> String {
    let current = std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<VersionData>(&raw).ok())
        .map(|data| data.version)
        .unwrap_or_else(|| "1.0.0".to_string());

    let next = increment(&current);

    let data = VersionData {
        version: next.clone(),
    };
    match serde_json::to_string_pretty(&data) {
        Ok(serialized) => {
            if let Err(e) = std::fs::write(path, serialized) {
                warn!("could not write {}: {}", path.display(), e);
            }
        }
        Err(e) => warn!("could not serialize version data: {}", e),
    }

    next
}

fn increment(version: &str) -> String {
    let mut parts: Vec<u32> = version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect();
    parts.resize(3, 0);

    if parts[2] < 9 {
        parts[2] += 1;
    } else {
        parts[2] = 0;
        if parts[1] < 9 {
            parts[1] += 1;
        } else {
            parts[1] = 0;
            parts[0] += 1;
        }
    }

    format!("{}.{}.{}", parts[0], parts[1], parts[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn increments_with_carry() {
        assert_eq!(increment("1.0.0"), "1.0.1");
        assert_eq!(increment("1.0.9"), "1.1.0");
        assert_eq!(increment("1.9.9"), "2.0.0");
        assert_eq!(increment("2.3.4"), "2.3.5");
    }

    #[test]
    fn garbage_restarts_the_count() {
        assert_eq!(increment("not-a-version"), "0.0.1");
    }

    #[test]
    fn bump_round_trips_through_the_file() {
        let mut path = PathBuf::from(std::env::temp_dir());
        path.push(format!("warden-version-{}.json", std::process::id()));
        std::fs::remove_file(&path).ok();

        assert_eq!(bump(&path), "1.0.1");
        assert_eq!(bump(&path), "1.0.2");

        std::fs::remove_file(&path).ok();
    }
}
