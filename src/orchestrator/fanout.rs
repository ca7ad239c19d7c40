use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use tracing::{Instrument, error, info, info_span};

use crate::entities::Listing;
use crate::orchestrator::Notifier;

/// Outcome of one notification batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReport {
    pub sent: usize,
    pub failed: usize,
    /// Listings still unsent when the deadline passed.
    pub dropped: usize,
}

/// Notify about every listing concurrently, at most `concurrency` at once.
///
/// Failures are logged and counted, never returned. Once `deadline` passes,
/// notifications in flight are aborted and every listing not yet settled is
/// logged at `error` with its link.
pub async fn notify_all(
    notifier: Arc<dyn Notifier>,
    subject: &str,
    listings: Vec<Listing>,
    concurrency: usize,
    deadline: Instant,
) -> FanoutReport {
    let links: Vec<String> = listings.iter().map(|l| l.post_link.clone()).collect();
    let mut settled = vec![false; listings.len()];
    let mut report = FanoutReport::default();

    let dispatch = dispatch(
        notifier,
        subject,
        listings,
        concurrency,
        &mut report,
        &mut settled,
    );
    if tokio::time::timeout_at(deadline, dispatch).await.is_err() {
        for (link, _) in links.iter().zip(&settled).filter(|(_, done)| !**done) {
            error!(link = %link, "Notification dropped at scrape deadline");
            report.dropped += 1;
        }
    }

    info!(
        "Sent {} email notifications ({} failed, {} dropped)",
        report.sent, report.failed, report.dropped
    );
    report
}

async fn dispatch(
    notifier: Arc<dyn Notifier>,
    subject: &str,
    listings: Vec<Listing>,
    concurrency: usize,
    report: &mut FanoutReport,
    settled: &mut [bool],
) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let subject: Arc<str> = Arc::from(subject);
    // Dropped with this future, which aborts whatever is still running
    let mut tasks = JoinSet::new();

    for (index, listing) in listings.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let notifier = notifier.clone();
        let subject = subject.clone();
        let span = info_span!("notify", link = %listing.post_link);

        tasks.spawn(
            async move {
                // The semaphore is never closed; the permit is held until
                // delivery finishes
                let _permit = semaphore.acquire_owned().await.ok();
                let result = notifier.notify(&subject, &listing).await;
                (index, listing, result)
            }
            .instrument(span),
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(()))) => {
                settled[index] = true;
                report.sent += 1;
            }
            Ok((index, listing, Err(e))) => {
                error!(link = %listing.post_link, "Failed to send email notification: {}", e);
                settled[index] = true;
                report.failed += 1;
            }
            Err(e) => {
                // The listing is unknown here; it stays unsettled and is
                // only reported if the deadline also passes.
                error!("Notification task did not complete: {}", e);
                report.failed += 1;
            }
        }
    }
}
