use anyhow::anyhow;
use subloom_api_models::{
    BatchJobRequest, BatchJobResponse, JobAction, JobId, JobListQuery, JobListResponse,
};
use subloom_progress::{JobFilter, filter_jobs, paginate};
use tracing::warn;

use crate::cli::{JobIdsArgs, JobListArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_problem};
use crate::output::{render_action_ok, render_batch_result, render_job_list};

/// Pages fetched at most when walking a whole listing.
const MAX_LISTING_PAGES: u32 = 1_000;

pub(crate) async fn handle_job_list(
    ctx: &AppContext,
    args: JobListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let query = JobListQuery {
        status: args.status,
        kind: args.kind.clone(),
        page: args.page.max(1),
        page_size: args.page_size.max(1),
    };
    let filter = JobFilter {
        status: args.status,
        kind: args.kind,
        search: args.search,
    };

    if filter.search.is_none() {
        let list = fetch_jobs(ctx, &query).await?;
        let jobs = filter_jobs(&list.jobs, &filter);
        return render_job_list(&list, &jobs, format);
    }

    // Search matches client-side, over every page of the listing.
    let all = fetch_all_jobs(ctx, &query).await?;
    let matched = filter_jobs(&all.jobs, &filter);
    let page = paginate(&matched, query.page, query.page_size);
    let footer = JobListResponse {
        jobs: Vec::new(),
        total: u64::try_from(page.total).unwrap_or(u64::MAX),
        page: page.page,
        page_size: page.page_size,
    };
    render_job_list(&footer, &page.items, format)
}

/// Fetch every page of the listing selected by `query`, starting at page one.
///
/// Stops at the reported total, at a short or empty page, or after
/// [`MAX_LISTING_PAGES`] requests.
pub(crate) async fn fetch_all_jobs(
    ctx: &AppContext,
    query: &JobListQuery,
) -> CliResult<JobListResponse> {
    let page_size = query.page_size.max(1);
    let mut merged = JobListResponse {
        jobs: Vec::new(),
        total: 0,
        page: 1,
        page_size,
    };
    for page in 1..=MAX_LISTING_PAGES {
        let request = JobListQuery {
            page,
            page_size,
            ..query.clone()
        };
        let list = fetch_jobs(ctx, &request).await?;
        let received = list.jobs.len();
        merged.total = merged.total.max(list.total);
        merged.jobs.extend(list.jobs);

        let seen = u64::try_from(merged.jobs.len()).unwrap_or(u64::MAX);
        let short_page = received < usize::try_from(page_size).unwrap_or(usize::MAX);
        if received == 0 || short_page || (list.total > 0 && seen >= list.total) {
            return Ok(merged);
        }
    }
    warn!(
        pages = MAX_LISTING_PAGES,
        jobs = merged.jobs.len(),
        "job listing truncated at page limit"
    );
    Ok(merged)
}

/// Fetch one page of the job listing.
pub(crate) async fn fetch_jobs(
    ctx: &AppContext,
    query: &JobListQuery,
) -> CliResult<JobListResponse> {
    let url = ctx.endpoint(&ctx.settings.jobs_path, &[])?;
    let response = ctx
        .rest(ctx.client.get(url).query(&query.query_pairs()))
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to list jobs failed: {err}")))?;

    if response.status().is_success() {
        response
            .json::<JobListResponse>()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to parse job list: {err}")))
    } else {
        Err(classify_problem(response).await)
    }
}

pub(crate) async fn handle_job_action(
    ctx: &AppContext,
    action: JobAction,
    args: JobIdsArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let ids = normalize_ids(args.ids)?;
    if let [id] = ids.as_slice() {
        send_single_action(ctx, action, id).await?;
        return render_action_ok(action, id, format);
    }

    let result = send_batch_action(ctx, action, ids).await?;
    render_batch_result(action, &result, format)?;
    if result.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(
            "{} of {} jobs could not {}",
            result.failed.len(),
            result.failed.len() + result.succeeded.len(),
            action.as_str()
        )))
    }
}

fn normalize_ids(raw: Vec<String>) -> CliResult<Vec<JobId>> {
    let mut ids: Vec<JobId> = Vec::with_capacity(raw.len());
    for value in raw {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CliError::validation("job id must not be empty"));
        }
        let id = JobId::from(trimmed);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

async fn send_single_action(ctx: &AppContext, action: JobAction, id: &JobId) -> CliResult<()> {
    let builder = if action == JobAction::Delete {
        let url = ctx.endpoint(&ctx.settings.jobs_path, &[id.as_str()])?;
        ctx.client.delete(url)
    } else {
        let url = ctx.endpoint(&ctx.settings.jobs_path, &[id.as_str(), action.as_str()])?;
        ctx.client.post(url)
    };

    let response = ctx.rest(builder).send().await.map_err(|err| {
        CliError::failure(anyhow!("request to {} job failed: {err}", action.as_str()))
    })?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(classify_problem(response).await)
    }
}

async fn send_batch_action(
    ctx: &AppContext,
    action: JobAction,
    ids: Vec<JobId>,
) -> CliResult<BatchJobResponse> {
    let url = ctx.endpoint(&ctx.settings.jobs_path, &["batch", action.as_str()])?;
    let response = ctx
        .rest(ctx.client.post(url).json(&BatchJobRequest { ids }))
        .send()
        .await
        .map_err(|err| {
            CliError::failure(anyhow!("batch request to {} jobs failed: {err}", action.as_str()))
        })?;

    if response.status().is_success() {
        response
            .json::<BatchJobResponse>()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to parse batch response: {err}")))
    } else {
        Err(classify_problem(response).await)
    }
}
