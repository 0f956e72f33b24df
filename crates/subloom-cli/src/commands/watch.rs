//! Live dashboard: polls the running-job set and keeps one progress stream per job.
//!
//! Each poll walks every page of the running listing under a single snapshot ticket.

use std::collections::HashMap;
use std::future::Future;

use subloom_api_models::{Job, JobListQuery, JobListResponse, JobStatus};
use subloom_events::JobId;
use subloom_progress::{
    MessageOutcome, PollTicket, SnapshotGate, SubscriptionManager, display_progress,
};
use subloom_stream::ChannelConnector;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::cli::{OutputFormat, WatchArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::jobs::fetch_all_jobs;
use crate::output::{render_reconcile, render_watch_finished, render_watch_progress};

type SnapshotResult = (PollTicket, CliResult<JobListResponse>);

pub(crate) async fn handle_watch(
    ctx: &AppContext,
    args: WatchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    watch_until(ctx, args, format, tokio::signal::ctrl_c()).await
}

/// Run the watch loop until `shutdown` resolves, a render fails, or (with
/// `exit_when_idle`) no running job is left to follow.
pub(crate) async fn watch_until<F>(
    ctx: &AppContext,
    args: WatchArgs,
    format: OutputFormat,
    shutdown: F,
) -> CliResult<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let (connector, mut messages) = ChannelConnector::new(ctx.stream_client()?);
    let mut manager = SubscriptionManager::new(connector);
    let mut gate = SnapshotGate::new();
    let (snapshot_tx, mut snapshots) = mpsc::unbounded_channel::<SnapshotResult>();
    let mut polled: HashMap<JobId, Job> = HashMap::new();

    let query = JobListQuery {
        status: Some(JobStatus::Running),
        kind: args.kind.clone(),
        page: 1,
        page_size: args.page_size.max(1),
    };
    let mut ticker = interval(ctx.settings.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted; closing progress streams");
                break Ok(());
            }
            _ = ticker.tick() => {
                let ticket = gate.issue();
                let ctx = ctx.clone();
                let query = query.clone();
                let sender = snapshot_tx.clone();
                tokio::spawn(async move {
                    let result = fetch_all_jobs(&ctx, &query).await;
                    let _ = sender.send((ticket, result));
                });
            }
            Some((ticket, result)) = snapshots.recv() => {
                if !gate.accept(ticket) {
                    debug!(ticket = ticket.sequence(), "discarding stale job snapshot");
                    continue;
                }
                match result {
                    Ok(list) => {
                        let report = manager.reconcile_jobs(&list.jobs);
                        polled = list.jobs.into_iter().map(|job| (job.id.clone(), job)).collect();
                        if let Err(err) = render_reconcile(&report, format) {
                            break Err(err);
                        }
                        if args.exit_when_idle && manager.is_empty() {
                            break Ok(());
                        }
                    }
                    Err(err) => {
                        warn!(error = %err.display_message(), "job poll failed; keeping current streams");
                    }
                }
            }
            Some((key, message)) = messages.recv() => {
                let rendered = match manager.handle(&key, message) {
                    MessageOutcome::Ignored => Ok(()),
                    MessageOutcome::Applied => match manager.progress(&key.job_id) {
                        Some(progress) => {
                            let percent = polled.get(&key.job_id).map_or_else(
                                || progress.progress_percent(),
                                |job| display_progress(job, Some(progress)),
                            );
                            render_watch_progress(&key.job_id, progress, percent, format)
                        }
                        None => Ok(()),
                    },
                    MessageOutcome::Finished { job_id, transition } => {
                        render_watch_finished(&job_id, &transition, format)
                    }
                };
                if let Err(err) = rendered {
                    break Err(err);
                }
                if args.exit_when_idle && manager.is_empty() {
                    break Ok(());
                }
            }
        }
    };

    manager.shutdown();
    result
}
