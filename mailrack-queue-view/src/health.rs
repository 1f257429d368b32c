//! Staleness probe over the per-queue browse-start cursors.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use mailrack_common::MailQueueName;
use mailrack_health::{ComponentHealth, HealthCheck};

use crate::dao::BrowseStartDao;

/// Default staleness threshold: one week.
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const COMPONENT_NAME: &str = "MailQueueBrowseStart";

/// Detects queues whose browse-start cursor has stalled.
///
/// A cursor that stops advancing — say, because deletion bookkeeping is
/// broken and no slice can ever be proven fully tombstoned — makes the
/// index grow without bound and every browse slower. This probe reads
/// every queue's cursor and reports degraded when the oldest one
/// exceeds the threshold.
#[derive(Debug, Clone)]
pub struct BrowseStartHealthCheck {
    browse_start: Arc<dyn BrowseStartDao>,
    threshold: TimeDelta,
}

impl BrowseStartHealthCheck {
    /// Build the probe with an explicit staleness threshold.
    #[must_use]
    pub fn new(browse_start: Arc<dyn BrowseStartDao>, threshold: Duration) -> Self {
        Self {
            browse_start,
            threshold: TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Build the probe with the one-week default threshold.
    #[must_use]
    pub fn with_default_threshold(browse_start: Arc<dyn BrowseStartDao>) -> Self {
        Self::new(browse_start, DEFAULT_STALENESS_THRESHOLD)
    }
}

#[async_trait]
impl HealthCheck for BrowseStartHealthCheck {
    fn component_name(&self) -> &str {
        COMPONENT_NAME
    }

    async fn check(&self) -> ComponentHealth {
        let starts = match self.browse_start.list_browse_starts().await {
            Ok(starts) => starts,
            // Unreadable cursors count as "no data for that queue"
            Err(error) => {
                tracing::warn!(%error, "Could not read browse starts; reporting healthy");
                return ComponentHealth::healthy(COMPONENT_NAME);
            }
        };

        let now = Utc::now();
        let mut worst: Option<(MailQueueName, TimeDelta)> = None;
        for (queue, start) in starts {
            let age = now - start;
            if worst.as_ref().is_none_or(|(_, worst_age)| age > *worst_age) {
                worst = Some((queue, age));
            }
        }

        match worst {
            Some((queue, age)) if age > self.threshold => ComponentHealth::degraded(
                COMPONENT_NAME,
                format!(
                    "Browse start for queue {queue} is {} days old, higher than the threshold of {} days",
                    age.num_days(),
                    self.threshold.num_days()
                ),
            ),
            _ => ComponentHealth::healthy(COMPONENT_NAME),
        }
    }
}
