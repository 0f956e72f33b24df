use std::fs;
use std::path::Path;

use anyhow::anyhow;
use serde_json::Value;
use subloom_api_models::SettingsDocument;

use crate::cli::{OutputFormat, SettingsPatchArgs};
use crate::client::{AppContext, CliError, CliResult, classify_problem};
use crate::output::render_settings;

pub(crate) async fn handle_settings_get(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let url = ctx.endpoint(&ctx.settings.settings_path, &[])?;
    let response = ctx
        .rest(ctx.client.get(url))
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to fetch settings failed: {err}")))?;

    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let document = response
        .json::<SettingsDocument>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to parse settings: {err}")))?;
    render_settings(&document, format)
}

pub(crate) async fn handle_settings_patch(
    ctx: &AppContext,
    args: SettingsPatchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let patch = build_patch(args.file.as_deref(), &args.set)?;
    let url = ctx.endpoint(&ctx.settings.settings_path, &[])?;
    let response = ctx
        .rest(ctx.client.patch(url).json(&patch))
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to update settings failed: {err}")))?;

    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    // An empty 204 body echoes the patch that was sent.
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to read settings response: {err}")))?;
    let document = if bytes.iter().all(u8::is_ascii_whitespace) {
        patch
    } else {
        serde_json::from_slice::<SettingsDocument>(&bytes)
            .map_err(|err| CliError::failure(anyhow!("failed to parse settings: {err}")))?
    };
    render_settings(&document, format)
}

fn build_patch(file: Option<&Path>, assignments: &[String]) -> CliResult<SettingsDocument> {
    let mut patch = match file {
        Some(path) => read_patch_file(path)?,
        None => SettingsDocument::new(),
    };
    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        patch.insert(key, value);
    }
    if patch.is_empty() {
        return Err(CliError::validation(
            "settings patch is empty; pass --file or at least one --set key=value",
        ));
    }
    Ok(patch)
}

fn read_patch_file(path: &Path) -> CliResult<SettingsDocument> {
    let raw = fs::read_to_string(path).map_err(|err| {
        CliError::failure(anyhow!(
            "failed to read settings patch '{}': {err}",
            path.display()
        ))
    })?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::validation(format!(
            "settings patch '{}' must be a JSON object",
            path.display()
        ))),
        Err(err) => Err(CliError::validation(format!(
            "settings patch '{}' is not valid JSON: {err}",
            path.display()
        ))),
    }
}

fn parse_assignment(raw: &str) -> CliResult<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::validation(format!("expected key=value, got '{raw}'")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::validation(format!("missing key in '{raw}'")));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::context_with;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn patch_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write patch");
        file
    }

    #[test]
    fn assignments_parse_json_or_fall_back_to_text() -> CliResult<()> {
        assert_eq!(parse_assignment("batch_size=40")?, ("batch_size".into(), json!(40)));
        assert_eq!(parse_assignment("enabled=true")?, ("enabled".into(), json!(true)));
        assert_eq!(
            parse_assignment("target_language=fr")?,
            ("target_language".into(), json!("fr"))
        );
        assert_eq!(parse_assignment("prompt=a=b")?, ("prompt".into(), json!("a=b")));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
        Ok(())
    }

    #[test]
    fn flags_override_file_keys() -> CliResult<()> {
        let file = patch_file(r#"{"batch_size": 10, "model": "small"}"#);
        let patch = build_patch(Some(file.path()), &["batch_size=25".to_string()])?;
        assert_eq!(patch.get("batch_size"), Some(&json!(25)));
        assert_eq!(patch.get("model"), Some(&json!("small")));
        Ok(())
    }

    #[test]
    fn non_object_file_is_rejected() {
        let file = patch_file("[1, 2]");
        let err = build_patch(Some(file.path()), &[]).expect_err("array rejected");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("must be a JSON object"));
    }

    #[test]
    fn empty_patch_is_rejected() {
        let err = build_patch(None, &[]).expect_err("empty patch");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn get_reads_the_settings_document() -> CliResult<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/settings")
                .header("x-api-key", "secret");
            then.status(200)
                .json_body(json!({"target_language": "fr", "batch_size": 40}));
        });

        let ctx = context_with(&server, Some("secret"));
        handle_settings_get(&ctx, OutputFormat::Table).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn patch_sends_merged_document() -> CliResult<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/settings")
                .json_body(json!({"target_language": "de"}));
            then.status(204);
        });

        let ctx = context_with(&server, None);
        let args = SettingsPatchArgs {
            file: None,
            set: vec!["target_language=de".into()],
        };
        handle_settings_patch(&ctx, args, OutputFormat::Json).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_patch_is_a_validation_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PATCH).path("/api/settings");
            then.status(422)
                .json_body(json!({"message": "batch_size must be positive"}));
        });

        let ctx = context_with(&server, None);
        let args = SettingsPatchArgs {
            file: None,
            set: vec!["batch_size=-1".into()],
        };
        let err = handle_settings_patch(&ctx, args, OutputFormat::Table)
            .await
            .expect_err("rejected");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "batch_size must be positive");
    }
}
