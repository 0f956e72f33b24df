use std::future::Future;

use anyhow::anyhow;
use futures_util::StreamExt;
use subloom_api_models::JobId;
use subloom_events::{ProgressEvent, StreamMessage, TranslationLine};
use subloom_progress::{JobProgress, Transition};
use tracing::info;

use crate::cli::{OutputFormat, PreviewArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_preview_line, render_preview_progress, render_preview_summary};

pub(crate) async fn handle_preview(
    ctx: &AppContext,
    args: PreviewArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let job_id = parse_job_id(&args.job_id)?;
    preview_until(ctx, &job_id, format, tokio::signal::ctrl_c()).await
}

fn parse_job_id(raw: &str) -> CliResult<JobId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation("job id must not be empty"));
    }
    Ok(JobId::from(trimmed))
}

/// Follow one job's stream until it ends or `shutdown` resolves.
pub(crate) async fn preview_until<F>(
    ctx: &AppContext,
    job_id: &JobId,
    format: OutputFormat,
    shutdown: F,
) -> CliResult<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut subscription = ctx.stream_client()?.open(job_id);
    let mut progress = JobProgress::new();
    tokio::pin!(shutdown);

    let transition = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(job_id = %job_id, "preview interrupted");
                subscription.close();
                break None;
            }
            message = subscription.next() => {
                let Some(message) = message else {
                    break None;
                };
                let (update, transition) = fold_message(&mut progress, message);
                if let Some(update) = update {
                    render_update(&update, format)?;
                }
                if let Some(transition) = transition {
                    subscription.close();
                    break Some(transition);
                }
            }
        }
    };

    render_preview_summary(job_id, &progress, format)?;
    match transition {
        Some(Transition::Failed { message }) => Err(CliError::failure(anyhow!(
            "job {job_id} failed: {message}"
        ))),
        Some(Transition::Completed) | None => Ok(()),
    }
}

/// Something worth printing after folding one message into the job state.
#[derive(Debug, PartialEq)]
enum PreviewUpdate {
    Line(TranslationLine),
    Progress(f64),
}

/// Apply `message` to `progress` and report what changed.
///
/// Progress updates carry the reducer's clamped percentage, not the raw value
/// from the wire.
fn fold_message(
    progress: &mut JobProgress,
    message: StreamMessage,
) -> (Option<PreviewUpdate>, Option<Transition>) {
    if progress.is_terminal() {
        return (None, progress.apply_message(message));
    }
    let update = match &message {
        StreamMessage::Event(ProgressEvent::Line(line)) => Some(PreviewUpdate::Line(line.clone())),
        _ => None,
    };
    let shows_progress = matches!(
        &message,
        StreamMessage::Event(ProgressEvent::Progress { progress }) if progress.is_finite()
    );
    let transition = progress.apply_message(message);
    let update = if shows_progress {
        Some(PreviewUpdate::Progress(progress.progress_percent()))
    } else {
        update
    };
    (update, transition)
}

fn render_update(update: &PreviewUpdate, format: OutputFormat) -> CliResult<()> {
    match update {
        PreviewUpdate::Line(line) => render_preview_line(line, format),
        PreviewUpdate::Progress(percent) => render_preview_progress(*percent, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::context_with;
    use httpmock::prelude::*;
    use std::time::Duration;
    use subloom_test_support::fixtures::{
        complete_frame, error_frame, line_frame, ndjson, progress_frame, sse,
    };

    async fn preview_body(body: String, format: OutputFormat) -> CliResult<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/jobs/j1/stream")
                .header("x-api-key", "secret");
            then.status(200).body(body);
        });

        let ctx = context_with(&server, Some("secret"));
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            preview_until(&ctx, &JobId::from("j1"), format, std::future::pending()),
        )
        .await
        .expect("preview finished in time");
        mock.assert();
        result
    }

    #[tokio::test]
    async fn completed_stream_succeeds() -> CliResult<()> {
        let body = ndjson(&[
            progress_frame(50.0),
            line_frame(1, "World", "Monde"),
            line_frame(0, "Hello", "Bonjour"),
            complete_frame(),
        ]);
        preview_body(body, OutputFormat::Table).await
    }

    #[tokio::test]
    async fn error_frame_fails_with_its_message() {
        let body = sse(&[line_frame(0, "Hello", "Bonjour"), error_frame(Some("quota exceeded"))]);
        let err = preview_body(body, OutputFormat::Json)
            .await
            .expect_err("job failed");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "job j1 failed: quota exceeded");
    }

    #[tokio::test]
    async fn early_close_is_reported_as_failure() {
        let body = ndjson(&[progress_frame(10.0)]);
        let err = preview_body(body, OutputFormat::Table)
            .await
            .expect_err("stream closed early");
        assert_eq!(
            err.display_message(),
            "job j1 failed: stream closed by server"
        );
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_stream() -> CliResult<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/jobs/j2/stream");
            then.status(200)
                .body(ndjson(&[progress_frame(5.0)]))
                .delay(Duration::from_secs(30));
        });

        let ctx = context_with(&server, None);
        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<(), std::io::Error>(())
        };
        tokio::time::timeout(
            Duration::from_secs(5),
            preview_until(&ctx, &JobId::from("j2"), OutputFormat::Table, shutdown),
        )
        .await
        .expect("shutdown honoured")
    }

    #[test]
    fn progress_updates_show_the_clamped_percentage() {
        let mut progress = JobProgress::new();
        assert_eq!(fold_message(&mut progress, StreamMessage::Opened), (None, None));

        let over = StreamMessage::Event(ProgressEvent::Progress { progress: 140.0 });
        assert_eq!(
            fold_message(&mut progress, over),
            (Some(PreviewUpdate::Progress(100.0)), None)
        );
        let under = StreamMessage::Event(ProgressEvent::Progress { progress: -3.0 });
        assert_eq!(
            fold_message(&mut progress, under),
            (Some(PreviewUpdate::Progress(0.0)), None)
        );
        let nan = StreamMessage::Event(ProgressEvent::Progress { progress: f64::NAN });
        assert_eq!(fold_message(&mut progress, nan), (None, None));
    }

    #[test]
    fn nothing_is_shown_after_the_job_finished() {
        let mut progress = JobProgress::new();
        fold_message(&mut progress, StreamMessage::Opened);
        let (_, transition) =
            fold_message(&mut progress, StreamMessage::Event(ProgressEvent::Complete));
        assert_eq!(transition, Some(Transition::Completed));

        let late = StreamMessage::Event(ProgressEvent::Progress { progress: 20.0 });
        assert_eq!(fold_message(&mut progress, late), (None, None));
    }

    #[test]
    fn blank_job_id_is_rejected() {
        assert_eq!(parse_job_id("  ").expect_err("blank").exit_code(), 2);
        assert_eq!(parse_job_id(" j1 ").ok(), Some(JobId::from("j1")));
    }
}
