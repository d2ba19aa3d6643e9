use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use warden_core::{ConcurrencyGate, DeadlineGuard};
use warden_types::error::CoreError;

/// Deadline for data APIs (lookups, counts, feed posts).
pub const DATA_DEADLINE: Duration = Duration::from_secs(5);

/// Deadline for liveness probes — slower services still count as up.
pub const PROBE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub youtube_api_base: String,
    pub youtube_api_key: String,
    pub subscriber_api_base: String,
    pub feed_api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedPost {
    pub title: String,
    pub url: String,
}

/// Whether a probed endpoint answered, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx.
    Up,
    /// Answered with a non-2xx status, or took longer than the probe
    /// deadline.
    Down,
    /// Transport-level failure — we can't tell either way.
    Unreachable,
}

/// All outbound HTTP goes through here: one shared gate bounds the
/// process-wide in-flight count, and every call carries its deadline.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    gate: ConcurrencyGate,
    config: UpstreamConfig,
}

// Response shapes for the two-step channel lookup, trimmed to the fields
// we read. Everything is optional: a missing field is a NotFound or an
// Upstream error, not a deserialization panic.

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    channel_id: Option<String>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    items: Vec<DetailsItem>,
}

#[derive(Deserialize)]
struct DetailsItem {
    snippet: Option<DetailsSnippet>,
}

#[derive(Deserialize)]
struct DetailsSnippet {
    title: Option<String>,
}

#[derive(Deserialize)]
struct EstimateResponse {
    #[serde(default)]
    items: Vec<EstimateItem>,
}

#[derive(Deserialize)]
struct EstimateItem {
    statistics: Option<EstimateStatistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateStatistics {
    subscriber_count: Option<u64>,
}

impl UpstreamClient {
    pub fn new(gate: ConcurrencyGate, config: UpstreamConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            gate,
            config,
        }
    }

    /// Two-step channel lookup: search by name, then fetch the canonical
    /// title. `Ok(None)` means no channel matched — a normal negative
    /// result, not an error.
    ///
    /// The two requests are flattened into one gated unit so a lookup
    /// never waits on the gate against its own second half.
    pub async fn lookup_channel(&self, name: &str) -> Result<Option<ChannelInfo>, CoreError> {
        let search_url = self.search_url(name);

        let search: SearchResponse = self
            .gate
            .run(DeadlineGuard::new(DATA_DEADLINE).run(self.get_json(&search_url)))
            .await?;

        let Some(channel_id) = search
            .items
            .into_iter()
            .next()
            .and_then(|item| item.id)
            .and_then(|id| id.channel_id)
        else {
            debug!("no channel matched {:?}", name);
            return Ok(None);
        };

        let details_url = format!(
            "{}/channels?part=snippet&id={}&key={}",
            self.config.youtube_api_base, channel_id, self.config.youtube_api_key
        );
        let details: DetailsResponse = self
            .gate
            .run(DeadlineGuard::new(DATA_DEADLINE).run(self.get_json(&details_url)))
            .await?;

        let title = details
            .items
            .into_iter()
            .next()
            .and_then(|item| item.snippet)
            .and_then(|snippet| snippet.title)
            .unwrap_or_else(|| channel_id.clone());

        Ok(Some(ChannelInfo { channel_id, title }))
    }

    /// Estimated subscriber count for a channel id.
    pub async fn subscriber_count(&self, channel_id: &str) -> Result<u64, CoreError> {
        let url = format!(
            "{}/api/youtube/estv3/{}",
            self.config.subscriber_api_base, channel_id
        );
        let estimate: EstimateResponse = self
            .gate
            .run(DeadlineGuard::new(DATA_DEADLINE).run(self.get_json(&url)))
            .await?;

        Ok(estimate
            .items
            .into_iter()
            .next()
            .and_then(|item| item.statistics)
            .and_then(|stats| stats.subscriber_count)
            .unwrap_or(0))
    }

    /// A random post from the configured social feed. The base URL is the
    /// whole endpoint — it returns a fresh random post per request.
    pub async fn random_post(&self) -> Result<FeedPost, CoreError> {
        let url = self.config.feed_api_base.clone();
        self.gate
            .run(DeadlineGuard::new(DATA_DEADLINE).run(self.get_json(&url)))
            .await
    }

    /// Liveness probe with the long deadline. Never returns an error —
    /// the outcome itself is the answer.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let request = async {
            match self.http.get(url).send().await {
                Ok(response) if response.status().is_success() => Ok(ProbeOutcome::Up),
                Ok(_) => Ok(ProbeOutcome::Down),
                Err(e) if e.is_connect() => {
                    debug!("probe {} unreachable: {}", url, e);
                    Ok(ProbeOutcome::Unreachable)
                }
                Err(e) => {
                    debug!("probe {} failed: {}", url, e);
                    Ok(ProbeOutcome::Down)
                }
            }
        };

        match self
            .gate
            .run(DeadlineGuard::new(PROBE_DEADLINE).run(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(CoreError::Timeout) => ProbeOutcome::Down,
            Err(_) => ProbeOutcome::Unreachable,
        }
    }

    fn search_url(&self, name: &str) -> String {
        format!(
            "{}/search?part=snippet&q={}&type=channel&key={}",
            self.config.youtube_api_base,
            urlencoding::encode(name),
            self.config.youtube_api_key
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, CoreError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Upstream(format!("status {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::Upstream(format!("malformed response: {e}")))
    }
}
