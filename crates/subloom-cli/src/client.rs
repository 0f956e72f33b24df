//! Shared HTTP context and error types for the CLI.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use subloom_api_models::ApiErrorBody;
use subloom_config::{ClientSettings, ConfigError};
use subloom_stream::ProgressStreamClient;
use subloom_stream::client::HEADER_API_KEY;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) settings: ClientSettings,
}

impl AppContext {
    /// Build the shared HTTP client from validated settings.
    ///
    /// The client has no total timeout so progress streams stay open; REST
    /// calls apply the configured timeout per request.
    pub(crate) fn from_settings(settings: ClientSettings, trace_id: &str) -> CliResult<Self> {
        let base_url = subloom_config::validate::parse_api_url(&settings.api_url)
            .map_err(|err| CliError::validation(describe_config_error(&err)))?;

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .connect_timeout(settings.http_timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    /// Append `path` and the percent-encoded `segments` to the base URL.
    ///
    /// The base URL's own path is kept, so a backend mounted under a prefix
    /// serves REST calls and progress streams from the same root.
    pub(crate) fn endpoint(&self, path: &str, segments: &[&str]) -> CliResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| CliError::failure(anyhow!("base URL cannot hold a path")))?;
            parts.pop_if_empty();
            parts.extend(path.split('/').filter(|part| !part.is_empty()));
            parts.extend(segments);
        }
        Ok(url)
    }

    /// Apply credentials and the REST timeout to a request.
    pub(crate) fn rest(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.settings.http_timeout());
        match &self.settings.api_key {
            Some(key) => builder.header(HEADER_API_KEY, key),
            None => builder,
        }
    }

    /// Stream client configured from the same settings.
    pub(crate) fn stream_client(&self) -> CliResult<ProgressStreamClient> {
        ProgressStreamClient::new(self.client.clone(), self.base_url.clone())
            .with_path_template(self.settings.stream_path.clone())
            .map(|client| client.with_api_key(self.settings.api_key.clone()))
            .map_err(|_| {
                CliError::validation("stream path must contain the {job_id} placeholder")
            })
    }
}

/// Render a settings error with its context.
pub(crate) fn describe_config_error(err: &ConfigError) -> String {
    match err {
        ConfigError::InvalidField {
            field,
            value: Some(value),
            reason,
        } if !value.is_empty() => format!("invalid {field} '{value}': {reason}"),
        ConfigError::InvalidField { field, reason, .. } => format!("invalid {field}: {reason}"),
        ConfigError::Io { path, source } => {
            format!("failed to read settings file '{}': {source}", path.display())
        }
        ConfigError::Json { path, source } => {
            format!("settings file '{}' is invalid: {source}", path.display())
        }
    }
}

/// Classify an HTTP response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let body = serde_json::from_slice::<ApiErrorBody>(&bytes).ok();
    let message = body
        .as_ref()
        .and_then(ApiErrorBody::best_message)
        .map_or(body_text, str::to_string);

    if matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    ) {
        if message.is_empty() {
            CliError::validation(format!("request rejected with status {status}"))
        } else {
            CliError::validation(message)
        }
    } else if message.is_empty() {
        CliError::failure(anyhow!("request failed with status {status}"))
    } else {
        CliError::failure(anyhow!("{message} (status {status})"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;
    use subloom_events::JobId;

    pub(crate) fn context_with(server: &MockServer, api_key: Option<&str>) -> AppContext {
        let settings = ClientSettings {
            api_url: server.base_url(),
            api_key: api_key.map(str::to_string),
            poll_interval_ms: 250,
            ..ClientSettings::default()
        };
        AppContext::from_settings(settings, "trace-test").expect("context")
    }

    #[test]
    fn endpoint_encodes_segments() {
        let settings = ClientSettings {
            api_url: "http://backend.local".into(),
            ..ClientSettings::default()
        };
        let ctx = AppContext::from_settings(settings, "trace").expect("context");
        let url = ctx.endpoint("/api/jobs", &["a/b", "start"]).expect("url");
        assert_eq!(url.as_str(), "http://backend.local/api/jobs/a%2Fb/start");
    }

    #[test]
    fn endpoint_keeps_the_base_path_prefix() {
        let settings = ClientSettings {
            api_url: "http://backend.local/subloom/".into(),
            ..ClientSettings::default()
        };
        let ctx = AppContext::from_settings(settings, "trace").expect("context");
        let jobs = ctx.endpoint("/api/jobs", &[]).expect("url");
        assert_eq!(jobs.as_str(), "http://backend.local/subloom/api/jobs");
        let action = ctx.endpoint("/api/jobs", &["j1", "start"]).expect("url");
        assert_eq!(action.as_str(), "http://backend.local/subloom/api/jobs/j1/start");

        let stream = ctx
            .stream_client()
            .expect("stream client")
            .stream_url(&JobId::from("j1"))
            .expect("stream url");
        assert!(stream.as_str().starts_with(jobs.as_str()));
    }

    #[test]
    fn invalid_api_url_is_a_validation_error() {
        let settings = ClientSettings {
            api_url: "not a url".into(),
            ..ClientSettings::default()
        };
        let err = AppContext::from_settings(settings, "trace")
            .err()
            .expect("invalid url");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "invalid api_url 'not a url': must be an absolute URL"
        );
    }

    #[tokio::test]
    async fn classify_problem_prefers_detail_for_conflicts() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/conflict");
            then.status(409)
                .json_body(serde_json::json!({"detail": "job is already running"}));
        });

        let response = reqwest::get(format!("{}/conflict", server.base_url()))
            .await
            .expect("response");
        let err = classify_problem(response).await;
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "job is already running");
    }

    #[tokio::test]
    async fn classify_problem_falls_back_to_body_text() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/boom");
            then.status(500).body("upstream exploded");
        });

        let response = reqwest::get(format!("{}/boom", server.base_url()))
            .await
            .expect("response");
        let err = classify_problem(response).await;
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "upstream exploded (status 500 Internal Server Error)"
        );
    }

    #[tokio::test]
    async fn classify_problem_handles_empty_body() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/empty");
            then.status(503);
        });

        let response = reqwest::get(format!("{}/empty", server.base_url()))
            .await
            .expect("response");
        let err = classify_problem(response).await;
        assert_eq!(
            err.display_message(),
            "request failed with status 503 Service Unavailable"
        );
    }
}
