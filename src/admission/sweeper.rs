//! Background reclamation of expired admission records.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::clock::Clock;
use super::controller::AdmissionController;

/// Spawn a task that purges expired records every `every`.
///
/// The task holds only a weak reference and exits once the controller is
/// dropped.
pub fn spawn_sweeper<C>(controller: &Arc<AdmissionController<C>>, every: Duration) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    let controller: Weak<AdmissionController<C>> = Arc::downgrade(controller);

    info!(interval_ms = every.as_millis() as u64, "Starting admission sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(controller) = controller.upgrade() else {
                debug!("Admission controller dropped, stopping sweeper");
                break;
            };

            let purged = controller.purge_now();
            if purged > 0 {
                debug!(purged = purged, "Sweeper reclaimed expired records");
            }
        }
    })
}
