//! Network-synchronised wall clock
//!
//! A successful sync anchors an epoch value to the monotonic clock; later
//! timestamps are the anchor plus monotonic time elapsed since it. Until a
//! sync succeeds, timestamps are the 0 sentinel.

use super::sntp::{NtpQuery, TimeSyncError};
use super::Clock;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use iotmon_shared::limits::MIN_VALID_EPOCH_SECS;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a tick does while the clock is unsynchronised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeSyncPolicy {
    /// Skip delivery and write the sample to the CSV fallback
    #[default]
    SuppressSend,
    /// Deliver anyway; the transport stamps readings with its own clock
    SendAnyway,
}

/// Time source configuration
#[derive(Debug, Clone)]
pub struct TimeSourceConfig {
    /// Primary NTP server
    pub primary_server: String,
    /// Secondary NTP server, used on alternate attempts
    pub secondary_server: String,
    /// Attempts per sync round
    pub attempts: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Earliest epoch second accepted as a plausible result
    pub min_valid_epoch: u64,
    /// Offset applied for human-readable display only
    pub utc_offset_secs: i32,
}

impl Default for TimeSourceConfig {
    fn default() -> Self {
        Self {
            primary_server: "pool.ntp.org".into(),
            secondary_server: "time.nist.gov".into(),
            attempts: 10,
            retry_delay: Duration::from_millis(500),
            min_valid_epoch: MIN_VALID_EPOCH_SECS,
            utc_offset_secs: -3 * 3600,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SyncAnchor {
    epoch_secs: u64,
    at_ms: u64,
}

/// Wall-clock time for sample timestamps
pub struct TimeSource {
    config: TimeSourceConfig,
    ntp: Box<dyn NtpQuery>,
    clock: Arc<dyn Clock>,
    anchor: Option<SyncAnchor>,
}

impl TimeSource {
    pub fn new(config: TimeSourceConfig, ntp: Box<dyn NtpQuery>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            ntp,
            clock,
            anchor: None,
        }
    }

    /// Synchronise with the configured NTP servers
    ///
    /// A result before the sanity threshold triggers one more full round;
    /// if that is still too early, the source stays unsynchronised.
    pub async fn sync(&mut self) -> Result<u64, TimeSyncError> {
        let mut resolved = self.sync_round().await?;

        if resolved < self.config.min_valid_epoch {
            warn!(
                "[TIME] Resolved {} is before the sanity threshold, resyncing",
                resolved
            );
            resolved = self.sync_round().await?;
        }

        if resolved < self.config.min_valid_epoch {
            self.anchor = None;
            return Err(TimeSyncError::BeforeThreshold(resolved));
        }

        self.anchor = Some(SyncAnchor {
            epoch_secs: resolved,
            at_ms: self.clock.now_ms(),
        });
        info!("[TIME] Synchronised: {}", self.format_local(resolved));
        Ok(resolved)
    }

    async fn sync_round(&self) -> Result<u64, TimeSyncError> {
        let attempts = self.config.attempts.max(1);

        for attempt in 0..attempts {
            let server = if attempt % 2 == 0 {
                &self.config.primary_server
            } else {
                &self.config.secondary_server
            };

            match self.ntp.query(server).await {
                Ok(secs) => return Ok(secs),
                Err(e) => debug!(
                    "[TIME] Attempt {}/{} via {} failed: {}",
                    attempt + 1,
                    attempts,
                    server,
                    e
                ),
            }

            if attempt + 1 < attempts && !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(TimeSyncError::Exhausted(attempts))
    }

    /// Whether a plausible time has been obtained
    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Current epoch seconds, if synchronised
    pub fn now_epoch_secs(&self) -> Option<u64> {
        self.anchor.map(|anchor| {
            let elapsed_ms = self.clock.now_ms().saturating_sub(anchor.at_ms);
            anchor.epoch_secs + elapsed_ms / 1000
        })
    }

    /// Timestamp for a new sample (0 when unsynchronised)
    pub fn timestamp(&self) -> u64 {
        self.now_epoch_secs().unwrap_or(0)
    }

    /// Format epoch seconds in the configured display offset
    pub fn format_local(&self, epoch_secs: u64) -> String {
        let offset =
            FixedOffset::east_opt(self.config.utc_offset_secs).unwrap_or_else(|| Utc.fix());
        match DateTime::from_timestamp(epoch_secs as i64, 0) {
            Some(utc) => utc
                .with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S %:z")
                .to_string(),
            None => format!("epoch {}", epoch_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed list of answers and records which servers were asked
    struct ScriptedNtp {
        answers: Mutex<Vec<Result<u64, ()>>>,
        asked: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedNtp {
        fn new(answers: Vec<Result<u64, ()>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let asked = Arc::new(Mutex::new(Vec::new()));
            let mut answers = answers;
            answers.reverse();
            (
                Self {
                    answers: Mutex::new(answers),
                    asked: asked.clone(),
                },
                asked,
            )
        }
    }

    #[async_trait]
    impl NtpQuery for ScriptedNtp {
        async fn query(&self, server: &str) -> Result<u64, TimeSyncError> {
            self.asked.lock().unwrap().push(server.to_string());
            match self.answers.lock().unwrap().pop() {
                Some(Ok(secs)) => Ok(secs),
                _ => Err(TimeSyncError::Timeout(server.to_string())),
            }
        }
    }

    fn config() -> TimeSourceConfig {
        TimeSourceConfig {
            primary_server: "primary".into(),
            secondary_server: "secondary".into(),
            attempts: 10,
            retry_delay: Duration::ZERO,
            utc_offset_secs: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unsynced_timestamp_is_sentinel() {
        let (ntp, _) = ScriptedNtp::new(vec![]);
        let source = TimeSource::new(config(), Box::new(ntp), Arc::new(ManualClock::new(0)));
        assert!(!source.is_synced());
        assert_eq!(source.timestamp(), 0);
    }

    #[tokio::test]
    async fn test_sync_alternates_servers() {
        let (ntp, asked) = ScriptedNtp::new(vec![Err(()), Err(()), Ok(1_718_000_000)]);
        let mut source = TimeSource::new(config(), Box::new(ntp), Arc::new(ManualClock::new(0)));

        assert_eq!(source.sync().await.unwrap(), 1_718_000_000);
        assert_eq!(
            *asked.lock().unwrap(),
            vec!["primary", "secondary", "primary"]
        );
    }

    #[tokio::test]
    async fn test_sync_exhausts_attempts() {
        let (ntp, asked) = ScriptedNtp::new(vec![]);
        let mut source = TimeSource::new(config(), Box::new(ntp), Arc::new(ManualClock::new(0)));

        assert!(matches!(
            source.sync().await,
            Err(TimeSyncError::Exhausted(10))
        ));
        assert_eq!(asked.lock().unwrap().len(), 10);
        assert!(!source.is_synced());
    }

    #[tokio::test]
    async fn test_early_result_triggers_one_resync() {
        // 1970-era answer, then a plausible one
        let (ntp, asked) = ScriptedNtp::new(vec![Ok(3_600), Ok(1_718_000_000)]);
        let mut source = TimeSource::new(config(), Box::new(ntp), Arc::new(ManualClock::new(0)));

        assert_eq!(source.sync().await.unwrap(), 1_718_000_000);
        assert_eq!(asked.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_early_result_twice_stays_unsynced() {
        let (ntp, _) = ScriptedNtp::new(vec![Ok(3_600), Ok(7_200)]);
        let mut source = TimeSource::new(config(), Box::new(ntp), Arc::new(ManualClock::new(0)));

        assert!(matches!(
            source.sync().await,
            Err(TimeSyncError::BeforeThreshold(7_200))
        ));
        assert_eq!(source.timestamp(), 0);
    }

    #[tokio::test]
    async fn test_timestamp_tracks_monotonic_clock() {
        let clock = Arc::new(ManualClock::new(5_000));
        let (ntp, _) = ScriptedNtp::new(vec![Ok(1_718_000_000)]);
        let mut source = TimeSource::new(config(), Box::new(ntp), clock.clone());
        source.sync().await.unwrap();

        clock.advance(12_500);
        assert_eq!(source.timestamp(), 1_718_000_012);
    }

    #[test]
    fn test_format_local_offset() {
        let (ntp, _) = ScriptedNtp::new(vec![]);
        let source = TimeSource::new(
            TimeSourceConfig {
                utc_offset_secs: -3 * 3600,
                ..config()
            },
            Box::new(ntp),
            Arc::new(ManualClock::new(0)),
        );
        // 2024-01-01T00:00:00Z
        assert_eq!(
            source.format_local(1_704_067_200),
            "2023-12-31 21:00:00 -03:00"
        );
    }
}
