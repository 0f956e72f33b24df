//! Job snapshots and progress-stream frames for tests.

use serde_json::json;
use subloom_api_models::{Job, JobId, JobStatus};

/// Job in the given status with no optional fields set.
#[must_use]
pub fn job(id: &str, status: JobStatus) -> Job {
    Job {
        id: JobId::from(id),
        status,
        progress: 0.0,
        phase: None,
        kind: Some("translation".to_string()),
        name: None,
        created_at: None,
        updated_at: None,
    }
}

/// Running job.
#[must_use]
pub fn running_job(id: &str) -> Job {
    job(id, JobStatus::Running)
}

/// Job list where every listed id is running.
#[must_use]
pub fn running_jobs(ids: &[&str]) -> Vec<Job> {
    ids.iter().map(|id| running_job(id)).collect()
}

/// `progress` frame.
#[must_use]
pub fn progress_frame(progress: f64) -> String {
    json!({"type": "progress", "progress": progress}).to_string()
}

/// Completed `line` frame.
#[must_use]
pub fn line_frame(index: u32, source: &str, translated: &str) -> String {
    json!({
        "type": "line",
        "index": index,
        "source": source,
        "translated": translated,
        "status": "completed",
    })
    .to_string()
}

/// `complete` frame.
#[must_use]
pub fn complete_frame() -> String {
    json!({"type": "complete"}).to_string()
}

/// `error` frame, with or without a message.
#[must_use]
pub fn error_frame(message: Option<&str>) -> String {
    message.map_or_else(
        || json!({"type": "error"}).to_string(),
        |text| json!({"type": "error", "message": text}).to_string(),
    )
}

/// Join frames into a newline-delimited body.
#[must_use]
pub fn ndjson(frames: &[String]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str(frame);
        body.push('\n');
    }
    body
}

/// Join frames into a Server-Sent-Events body.
#[must_use]
pub fn sse(frames: &[String]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    body
}
