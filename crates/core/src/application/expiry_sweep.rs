// Expiry Sweeper
// Periodically removes expired posts and deals from storage

use crate::application::constants::MIN_TICK_PERIOD;
use crate::application::listing::ListingService;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{Deal, Post};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub posts_removed: usize,
    pub deals_removed: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.posts_removed + self.deals_removed
    }
}

pub struct ExpirySweeper {
    posts: Arc<ListingService<Post>>,
    deals: Arc<ListingService<Deal>>,
    interval: Duration,
}

impl ExpirySweeper {
    /// # Arguments
    /// * `posts` - Post listings to sweep
    /// * `deals` - Deal listings to sweep
    /// * `interval` - Pause between passes
    pub fn new(
        posts: Arc<ListingService<Post>>,
        deals: Arc<ListingService<Deal>>,
        interval: Duration,
    ) -> Self {
        Self {
            posts,
            deals,
            interval: interval.max(MIN_TICK_PERIOD),
        }
    }

    /// Remove everything that has expired as of now
    pub async fn sweep_once(&self) -> Result<SweepStats> {
        let stats = SweepStats {
            posts_removed: self.posts.remove_expired().await?.len(),
            deals_removed: self.deals.remove_expired().await?.len(),
        };

        if stats.total() > 0 {
            info!(
                posts_removed = stats.posts_removed,
                deals_removed = stats.deals_removed,
                "Expiry sweep completed"
            );
        } else {
            debug!("Expiry sweep found nothing to remove");
        }
        Ok(stats)
    }

    /// Sweep every interval until shutdown
    ///
    /// The first pass happens one interval after start. A failed pass is
    /// logged and the loop carries on.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(interval_secs = self.interval.as_secs(), "Expiry sweeper started");

        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tick.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = ?e, "Expiry sweep failed");
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }
}
