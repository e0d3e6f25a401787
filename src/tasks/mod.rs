//! Background scheduled tasks for the application.
//!
//! Currently one recurring job: sweeping generations stuck in `processing`
//! so orphaned jobs fail and refund without waiting for a client poll.
//! Call `spawn_all` once during startup.

use crate::services::GenerationService;

const SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(generation_service: GenerationService) {
    {
        let svc = generation_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.expire_stale_generations().await {
                    Ok(n) if n > 0 => log::info!("Stale generations expired: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire stale generations: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
            }
        });
    }
}
