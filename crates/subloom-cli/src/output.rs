//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use serde::Serialize;
use serde_json::{Value, json};
use subloom_api_models::{BatchJobResponse, Job, JobAction, JobListResponse, SettingsDocument};
use subloom_events::{JobId, TranslationLine};
use subloom_progress::{JobProgress, ReconcileReport, Transition};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_job_list(
    list: &JobListResponse,
    jobs: &[&Job],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let document = json!({
                "jobs": jobs,
                "total": list.total,
                "page": list.page,
                "page_size": list.page_size,
            });
            println!("{}", to_json(&document, true)?);
        }
        OutputFormat::Table => {
            println!(
                "{:<24} {:<10} {:>7} {:<12} {:<12} NAME",
                "ID", "STATUS", "PROG", "TYPE", "PHASE"
            );
            for job in jobs {
                println!(
                    "{:<24} {:<10} {:>7} {:<12} {:<12} {}",
                    job.id.as_str(),
                    job.status.as_str(),
                    format_progress(job.progress),
                    job.kind.as_deref().unwrap_or("-"),
                    job.phase.as_deref().unwrap_or("-"),
                    job.name.as_deref().unwrap_or("<unnamed>")
                );
            }
            println!("{}", page_footer(list));
        }
    }
    Ok(())
}

pub(crate) fn render_batch_result(
    action: JobAction,
    result: &BatchJobResponse,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(result, true)?),
        OutputFormat::Table => {
            for id in &result.succeeded {
                println!("{}: {id}", action.as_str());
            }
            for failure in &result.failed {
                println!("{} failed: {} ({})", action.as_str(), failure.id, failure.error);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_action_ok(action: JobAction, job_id: &JobId, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let document = json!({"action": action, "job_id": job_id, "ok": true});
            println!("{}", to_json(&document, false)?);
        }
        OutputFormat::Table => println!("{}: {job_id}", action.as_str()),
    }
    Ok(())
}

pub(crate) fn render_settings(document: &SettingsDocument, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(document, true)?),
        OutputFormat::Table => {
            for line in settings_lines(document) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_reconcile(report: &ReconcileReport, format: OutputFormat) -> CliResult<()> {
    for line in reconcile_lines(report, format)? {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn render_watch_progress(
    job_id: &JobId,
    progress: &JobProgress,
    percent: f64,
    format: OutputFormat,
) -> CliResult<()> {
    println!("{}", watch_progress_line(job_id, progress, percent, format)?);
    Ok(())
}

pub(crate) fn render_watch_finished(
    job_id: &JobId,
    transition: &Transition,
    format: OutputFormat,
) -> CliResult<()> {
    println!("{}", watch_finished_line(job_id, transition, format)?);
    Ok(())
}

pub(crate) fn render_preview_line(line: &TranslationLine, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(line, false)?),
        OutputFormat::Table => println!("{}", preview_line(line)),
    }
    Ok(())
}

pub(crate) fn render_preview_progress(percent: f64, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", to_json(&json!({"progress": percent}), false)?);
        }
        OutputFormat::Table => println!("progress: {}", format_progress(percent)),
    }
    Ok(())
}

pub(crate) fn render_preview_summary(
    job_id: &JobId,
    progress: &JobProgress,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(&preview_summary(job_id, progress), true)?),
        OutputFormat::Table => {
            println!("job: {job_id}");
            println!("status: {}", progress.status().as_str());
            println!("progress: {}", format_progress(progress.progress_percent()));
            println!(
                "lines: {} ({} completed)",
                progress.line_count(),
                progress.completed_lines()
            );
            if let Some(message) = progress.error_message() {
                println!("error: {message}");
            }
        }
    }
    Ok(())
}

pub(crate) fn format_progress(percent: f64) -> String {
    if percent.is_finite() {
        format!("{percent:.1}%")
    } else {
        "-".to_string()
    }
}

fn page_footer(list: &JobListResponse) -> String {
    let page_size = u64::from(list.page_size.max(1));
    let pages = list.total.div_ceil(page_size).max(1);
    format!(
        "page {} of {pages} ({} jobs total)",
        list.page.max(1),
        list.total
    )
}

fn settings_lines(document: &SettingsDocument) -> Vec<String> {
    let mut keys: Vec<&String> = document.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| match &document[key] {
            Value::String(text) => format!("{key}: {text}"),
            other => format!("{key}: {other}"),
        })
        .collect()
}

fn reconcile_lines(report: &ReconcileReport, format: OutputFormat) -> CliResult<Vec<String>> {
    let opened = report.opened.iter().map(|id| ("opened", id));
    let closed = report.closed.iter().map(|id| ("closed", id));
    closed
        .chain(opened)
        .map(|(event, id)| match format {
            OutputFormat::Json => to_json(&json!({"event": event, "job_id": id}), false),
            OutputFormat::Table => Ok(format!("{id}: stream {event}")),
        })
        .collect()
}

fn watch_progress_line(
    job_id: &JobId,
    progress: &JobProgress,
    percent: f64,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(
            &json!({
                "event": "progress",
                "job_id": job_id,
                "status": progress.status().as_str(),
                "progress": percent,
                "lines": progress.line_count(),
            }),
            false,
        ),
        OutputFormat::Table => Ok(format!(
            "{job_id}: {} {} lines {}",
            progress.status().as_str(),
            format_progress(percent),
            progress.line_count()
        )),
    }
}

fn watch_finished_line(
    job_id: &JobId,
    transition: &Transition,
    format: OutputFormat,
) -> CliResult<String> {
    match (format, transition) {
        (OutputFormat::Json, Transition::Completed) => {
            to_json(&json!({"event": "completed", "job_id": job_id}), false)
        }
        (OutputFormat::Json, Transition::Failed { message }) => to_json(
            &json!({"event": "failed", "job_id": job_id, "message": message}),
            false,
        ),
        (OutputFormat::Table, Transition::Completed) => Ok(format!("{job_id}: completed")),
        (OutputFormat::Table, Transition::Failed { message }) => {
            Ok(format!("{job_id}: failed: {message}"))
        }
    }
}

fn preview_line(line: &TranslationLine) -> String {
    let translated = if line.translated.is_empty() {
        "..."
    } else {
        line.translated.as_str()
    };
    format!(
        "[{:>5}] {:<11} {} => {translated}",
        line.index,
        line.status.as_str(),
        line.source
    )
}

fn preview_summary(job_id: &JobId, progress: &JobProgress) -> Value {
    json!({
        "job_id": job_id,
        "status": progress.status().as_str(),
        "progress": progress.progress_percent(),
        "error": progress.error_message(),
        "lines": progress.lines().collect::<Vec<_>>(),
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> CliResult<String> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}
