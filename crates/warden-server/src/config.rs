use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use warden_upstream::{ServiceTarget, UpstreamConfig};

/// Everything read from the environment, parsed once at startup. The
/// core crates never touch the environment themselves — they get plain
/// values from here.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub gate_limit: usize,
    pub upstream: UpstreamConfig,
    pub status_services: Vec<ServiceTarget>,
    pub xp_per_message: u64,
    pub xp_cooldown: Duration,
    pub reload_cooldown: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_or("WARDEN_HOST", "0.0.0.0");
        let port: u16 = env_or("WARDEN_PORT", "3100")
            .parse()
            .context("WARDEN_PORT must be a port number")?;
        let data_dir = PathBuf::from(env_or("WARDEN_DATA_DIR", "data"));
        let gate_limit: usize = env_or("WARDEN_GATE_LIMIT", "3")
            .parse()
            .context("WARDEN_GATE_LIMIT must be a positive integer")?;

        let upstream = UpstreamConfig {
            youtube_api_base: env_or(
                "WARDEN_YOUTUBE_API_BASE",
                "https://www.googleapis.com/youtube/v3",
            ),
            youtube_api_key: env_or("WARDEN_YOUTUBE_API_KEY", ""),
            subscriber_api_base: env_or(
                "WARDEN_SUBSCRIBER_API_BASE",
                "https://backend.mixerno.space",
            ),
            feed_api_base: env_or("WARDEN_FEED_API_BASE", "https://meme-api.com/gimme"),
        };

        let status_services = parse_services(&env_or("WARDEN_STATUS_SERVICES", ""));

        let xp_per_message: u64 = env_or("WARDEN_XP_PER_MESSAGE", "15")
            .parse()
            .context("WARDEN_XP_PER_MESSAGE must be an integer")?;
        let xp_cooldown_secs: u64 = env_or("WARDEN_XP_COOLDOWN_SECS", "60")
            .parse()
            .context("WARDEN_XP_COOLDOWN_SECS must be an integer")?;
        let reload_cooldown_ms: u64 = env_or("WARDEN_RELOAD_COOLDOWN_MS", "5000")
            .parse()
            .context("WARDEN_RELOAD_COOLDOWN_MS must be an integer")?;

        Ok(Self {
            host,
            port,
            data_dir,
            gate_limit,
            upstream,
            status_services,
            xp_per_message,
            xp_cooldown: Duration::from_secs(xp_cooldown_secs),
            reload_cooldown: Duration::from_millis(reload_cooldown_ms),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// `name=url,name=url` — empty input means no status targets configured.
fn parse_services(raw: &str) -> Vec<ServiceTarget> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, url) = pair.split_once('=')?;
            let name = name.trim();
            let url = url.trim();
            if name.is_empty() || url.is_empty() {
                return None;
            }
            Some(ServiceTarget {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
