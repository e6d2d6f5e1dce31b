use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::probe::{self, LiveStatusSource};
use crate::publish::Publisher;
use crate::report;
use crate::roster::ChannelRepository;

const MIN_INTERVAL_SECS: u64 = 5;

/// Drive the probe→rank→render→publish cycle on a fixed interval. The first
/// tick fires immediately; a tick still running when the next is due makes
/// the scheduler skip ahead instead of overlapping. Tick failures are logged
/// and never stop the schedule.
pub async fn run(
    interval_secs: u64,
    repo: &dyn ChannelRepository,
    source: &dyn LiveStatusSource,
    publisher: &Publisher,
) -> Result<()> {
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(MIN_INTERVAL_SECS)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if let Err(e) = tick(repo, source, publisher).await {
            tracing::error!("tick failed: {e:#}");
        }
    }
}

/// One full pass over the current roster snapshot.
pub async fn tick(
    repo: &dyn ChannelRepository,
    source: &dyn LiveStatusSource,
    publisher: &Publisher,
) -> Result<()> {
    let channels = repo
        .enabled_channels()
        .await
        .context("loading channel roster")?;

    // One clock read per tick keeps the rendered durations mutually
    // consistent no matter how long the probes take.
    let now = Utc::now();

    let mut live = Vec::new();
    for channel in &channels {
        if let Some(result) = probe::probe_channel(source, channel, now).await {
            live.push(result);
        }
    }

    let ranked = report::rank(live);
    tracing::info!("tick: {} channels probed, {} live", channels.len(), ranked.len());

    let rendered = report::render(&ranked);
    publisher.publish(rendered.as_deref()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, StreamEntry};
    use crate::roster::ChannelDescriptor;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingRoster;

    #[async_trait]
    impl ChannelRepository for FailingRoster {
        async fn enabled_channels(&self) -> Result<Vec<ChannelDescriptor>> {
            anyhow::bail!("roster unavailable")
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::probe::LiveStatusSource for CountingSource {
        async fn live_streams(&self, _url: &str) -> Result<Vec<StreamEntry>, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProbeError::MissingListing)
        }
    }

    fn idle_publisher(tmp: &tempfile::TempDir) -> Publisher {
        // Points at a closed port, but a quiet tick never dials out.
        let api = crate::telegram::TelegramApi::new("TEST".into())
            .with_api_base("http://127.0.0.1:9".into());
        let store = crate::state::MessageStateStore::new(tmp.path().join("message_id"));
        Publisher::new(api, store, "42".into())
    }

    #[tokio::test]
    async fn roster_failure_surfaces_as_tick_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let publisher = idle_publisher(&tmp);

        let result = tick(&FailingRoster, &source, &publisher).await;
        assert!(result.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_channel_is_probed_despite_failures() {
        struct TwoChannelRoster;

        #[async_trait]
        impl ChannelRepository for TwoChannelRoster {
            async fn enabled_channels(&self) -> Result<Vec<ChannelDescriptor>> {
                Ok(vec![
                    ChannelDescriptor {
                        url: "https://example.com/@a".into(),
                        label: "A".into(),
                        enabled: true,
                        owner: None,
                    },
                    ChannelDescriptor {
                        url: "https://example.com/@b".into(),
                        label: "B".into(),
                        enabled: true,
                        owner: None,
                    },
                ])
            }
        }

        let tmp = tempfile::TempDir::new().unwrap();
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        let publisher = idle_publisher(&tmp);

        // All probes fail, so the tick is quiet - but both channels were tried.
        tick(&TwoChannelRoster, &source, &publisher).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
