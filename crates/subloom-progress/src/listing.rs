//! Client-side helpers over an already fetched job list.

use std::collections::BTreeSet;

use subloom_api_models::{Job, JobId, JobStatus};

use crate::reducer::{JobProgress, MAX_PERCENT, PreviewStatus};

/// Client-side narrowing of a job list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Keep only jobs in this status.
    pub status: Option<JobStatus>,
    /// Keep only jobs of this type (case-insensitive).
    pub kind: Option<String>,
    /// Case-insensitive substring matched against the id and display name.
    pub search: Option<String>,
}

impl JobFilter {
    /// Whether the job passes every configured criterion.
    #[must_use]
    pub fn matches(&self, job: &Job) -> bool {
        if self.status.is_some_and(|status| status != job.status) {
            return false;
        }
        if let Some(kind) = self.kind.as_deref() {
            let same_kind = job
                .kind
                .as_deref()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(kind));
            if !same_kind {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                job.id.as_str().to_lowercase().contains(&needle)
                    || job
                        .name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Jobs passing `filter`, in their original order.
#[must_use]
pub fn filter_jobs<'a>(jobs: &'a [Job], filter: &JobFilter) -> Vec<&'a Job> {
    jobs.iter().filter(|job| filter.matches(job)).collect()
}

/// One page of a client-side paginated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on the page.
    pub items: Vec<T>,
    /// One-based page number actually served.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
    /// Total number of items across all pages.
    pub total: usize,
    /// Number of pages (at least one).
    pub page_count: u32,
}

/// Slice `items` into one-based pages.
///
/// Page and page size are clamped to at least one; a page past the end is
/// served as the last page.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: u32, page_size: u32) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let size = page_size as usize;
    let page_count = u32::try_from(total.div_ceil(size).max(1)).unwrap_or(u32::MAX);
    let page = page.clamp(1, page_count);
    let start = (page as usize - 1).saturating_mul(size).min(total);
    let end = start.saturating_add(size).min(total);
    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total,
        page_count,
    }
}

/// Ids of the jobs currently running.
#[must_use]
pub fn running_ids(jobs: &[Job]) -> BTreeSet<JobId> {
    jobs.iter()
        .filter(|job| job.is_running())
        .map(|job| job.id.clone())
        .collect()
}

/// Percentage to display for a job, preferring streamed progress over the polled value.
///
/// Streamed progress only wins once the stream is connected; a stream still
/// connecting has nothing newer than the poll.
#[must_use]
pub fn display_progress(job: &Job, streamed: Option<&JobProgress>) -> f64 {
    let polled = if job.progress.is_finite() {
        job.progress.clamp(0.0, MAX_PERCENT)
    } else {
        0.0
    };
    streamed
        .filter(|state| state.status() != PreviewStatus::Connecting)
        .map_or(polled, JobProgress::progress_percent)
}
