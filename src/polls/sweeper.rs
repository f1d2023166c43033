use std::sync::Arc;
use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::db::{PurgeReport, Storage};
use crate::utils::clock::Clock;

/// Removes every poll past its `expires_at`, and its votes. Safe to run
/// repeatedly and alongside normal traffic.
pub async fn sweep_once(storage: &dyn Storage, clock: &dyn Clock) -> Option<PurgeReport> {
    match storage.purge_expired(clock.now()).await {
        Ok(report) => {
            if report.polls > 0 {
                info!(polls = report.polls, votes = report.votes, "purged expired polls");
            } else {
                debug!("expiry sweep found nothing to purge");
            }
            Some(report)
        }
        Err(err) => {
            warn!(error = %err, "expiry sweep failed, retrying next tick");
            None
        }
    }
}

pub fn spawn_expiry_sweep(
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(storage.as_ref(), clock.as_ref()).await;
        }
    })
}
