//! Periodic reconciliation of every active user's auto-update records.

use std::time::Duration;

use cflink_core::Reconciler;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

/// Run one scheduled pass and report it through tracing
pub async fn run_pass(reconciler: &Reconciler) {
    match reconciler.reconcile_everyone().await {
        Ok(runs) => {
            for run in &runs {
                match &run.result {
                    Ok(summary) if summary.failed > 0 => {
                        warn!(user_id = run.user_id, "{}", summary.message())
                    }
                    Ok(summary) => debug!(user_id = run.user_id, "{}", summary.message()),
                    Err(e) => warn!(user_id = run.user_id, "Scheduled update failed: {}", e),
                }
            }
            info!(users = runs.len(), "Scheduled IP update pass finished");
        }
        Err(e) => error!("Scheduled IP update pass aborted: {}", e),
    }
}

/// Start the scheduler task
///
/// The first pass runs one full period after startup. A pass that overruns
/// its period delays the next tick instead of bunching ticks up. The task
/// returns once `shutdown` flips to `true`; a pass already in flight is
/// finished first.
pub fn spawn(
    reconciler: Reconciler,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        info!(period_secs = period.as_secs(), "IP update scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => run_pass(&reconciler).await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("IP update scheduler stopped");
    })
}
