pub mod youtube;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::roster::ChannelDescriptor;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no streams listing found")]
    MissingListing,
    #[error("malformed page: {0}")]
    MalformedPage(&'static str),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of a channel's current-streams listing, as reported by the
/// platform. Metric fields stay `None` when the platform omits them.
#[derive(Debug, Clone, Default)]
pub struct StreamEntry {
    pub is_live: bool,
    pub viewers: Option<u64>,
    pub likes: Option<u64>,
    /// Broadcast start, unix seconds.
    pub release_timestamp: Option<i64>,
    /// Canonical watch URL for this stream.
    pub url: Option<String>,
}

/// Metrics of a broadcast found live during one tick. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStatusResult {
    pub label: String,
    pub url: String,
    pub viewers: u64,
    pub likes: u64,
    pub duration: Option<String>,
}

/// A platform's current-streams lookup. One attempt per call; retries are the
/// caller's business.
#[async_trait]
pub trait LiveStatusSource: Send + Sync {
    async fn live_streams(&self, channel_url: &str) -> Result<Vec<StreamEntry>, ProbeError>;
}

/// Probe one channel. Every failure mode collapses to `None` after logging,
/// so one bad channel never takes the rest of the tick down.
pub async fn probe_channel(
    source: &dyn LiveStatusSource,
    channel: &ChannelDescriptor,
    now: DateTime<Utc>,
) -> Option<LiveStatusResult> {
    tracing::debug!("probing {} {}", channel.label, channel.url);

    let entries = match source.live_streams(&channel.url).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("probe failed for {} {}: {e}", channel.label, channel.url);
            return None;
        }
    };

    let live = entries.into_iter().find(|entry| entry.is_live)?;
    let (Some(release_timestamp), Some(url)) = (live.release_timestamp, live.url) else {
        tracing::warn!(
            "live entry for {} {} is missing required fields",
            channel.label,
            channel.url
        );
        return None;
    };

    // Clock skew between us and the platform can make the stream start look
    // like the future; clamp instead of underflowing.
    let elapsed = (now.timestamp() - release_timestamp).max(0);

    Some(LiveStatusResult {
        label: channel.label.clone(),
        url,
        viewers: live.viewers.unwrap_or(0),
        likes: live.likes.unwrap_or(0),
        duration: Some(format_duration(elapsed.unsigned_abs())),
    })
}

/// Zero-padded `HH:MM:SS`; hours run past 24 for marathon streams.
pub fn format_duration(total_secs: u64) -> String {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
