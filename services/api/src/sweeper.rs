//! Periodic removal of expired login sessions

use anyhow::Result;
use corkboard::Client;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Purge expired login sessions once
pub async fn sweep(client: &Client) -> corkboard::Result<u64> {
    client.connect(None).user_sessions().purge_expired().await
}

/// Schedule [`sweep`] on a cron expression
///
/// The returned scheduler must be kept alive for the job to keep running.
pub async fn start(client: Client, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_, _| {
        let client = client.clone();
        Box::pin(async move {
            match sweep(&client).await {
                Ok(purged) => info!("Session sweep removed {} expired sessions", purged),
                Err(e) => error!("Session sweep failed: {}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Started session sweeper with schedule: {}", schedule);
    Ok(scheduler)
}
