use std::sync::Arc;

use crate::core::Core;

/// Spawns a background task that periodically prunes stream history for any
/// stream with retention configured (`Core::configure_room_retention`).
/// Pinned messages are exempt, enforced by the orchestrator, which never
/// configures retention tight enough to reach a pinned message without the
/// room owner's consent.
pub fn spawn_retention_task(core: Arc<Core>) {
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        loop {
            let pruned = core.sweep_retention();
            if pruned > 0 {
                log::info!("retention sweep pruned {pruned} messages");
            }
            tokio::time::sleep(core.retention_sweep_interval()).await;
        }
    });
}
