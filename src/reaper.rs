//! The daily expiry reaper.
//!
//! Fires at local midnight and wipes the verification and views namespaces -
//! OTP state is ephemeral by design and the view ledger rolls over per
//! calendar day. Short links and block flags are durable and are left alone.
//! Store errors are logged and swallowed: a missed sweep is tolerated until
//! the next firing.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::stores::{VerificationStore, ViewStore};

/// Every day at 00:00:00.
const DAILY_MIDNIGHT: &str = "0 0 0 * * *";

/// Schedules the daily sweep. The returned scheduler must be kept alive for
/// the lifetime of the process.
pub async fn start(
    verification: Arc<dyn VerificationStore>,
    views: Arc<dyn ViewStore>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async_tz(DAILY_MIDNIGHT, chrono::Local, move |_uuid, _lock| {
        let verification = verification.clone();
        let views = views.clone();

        Box::pin(async move {
            sweep(verification.as_ref(), views.as_ref()).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!("expiry reaper scheduled for daily midnight");

    Ok(scheduler)
}

async fn sweep(verification: &dyn VerificationStore, views: &dyn ViewStore) {
    if let Err(e) = verification.clear().await {
        tracing::error!("reaper failed to clear the verification namespace: {e:#}");
    }
    if let Err(e) = views.clear().await {
        tracing::error!("reaper failed to clear the views namespace: {e:#}");
    }

    tracing::info!("daily ephemeral-state sweep finished");
}
