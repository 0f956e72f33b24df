//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use subloom_api_models::{DEFAULT_PAGE_SIZE, JobAction, JobStatus};
use subloom_config::{ClientSettings, ClientSettingsOverlay, load_settings};
use subloom_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, init_logging};
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, describe_config_error};
use crate::commands::jobs::{handle_job_action, handle_job_list};
use crate::commands::preview::handle_preview;
use crate::commands::settings::{handle_settings_get, handle_settings_patch};
use crate::commands::watch::handle_watch;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let logging = LoggingConfig {
        level: &settings.log_level,
        format: LogFormat::from_setting(&settings.log_format),
        build_sha: option_env!("SUBLOOM_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }
    let _context = GlobalContextGuard::new(command_name);
    tracing::debug!(
        trace_id = %trace_id,
        settings = ?settings.redacted(),
        "starting command"
    );

    let result = match AppContext::from_settings(settings, &trace_id) {
        Ok(ctx) => dispatch(cli, &ctx).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, ctx: &AppContext) -> CliResult<()> {
    let output = cli.output;
    match cli.command {
        Command::Jobs(jobs) => match jobs {
            JobsCommand::Ls(args) => handle_job_list(ctx, args, output).await,
            JobsCommand::Start(args) => handle_job_action(ctx, JobAction::Start, args, output).await,
            JobsCommand::Cancel(args) => {
                handle_job_action(ctx, JobAction::Cancel, args, output).await
            }
            JobsCommand::Retry(args) => handle_job_action(ctx, JobAction::Retry, args, output).await,
            JobsCommand::Delete(args) => {
                handle_job_action(ctx, JobAction::Delete, args, output).await
            }
        },
        Command::Watch(args) => handle_watch(ctx, args, output).await,
        Command::Preview(args) => handle_preview(ctx, args, output).await,
        Command::Settings(settings) => match settings {
            SettingsCommand::Get => handle_settings_get(ctx, output).await,
            SettingsCommand::Patch(args) => handle_settings_patch(ctx, args, output).await,
        },
    }
}

fn resolve_settings(cli: &Cli) -> CliResult<ClientSettings> {
    load_settings(cli.config.as_deref(), cli.overlay())
        .map_err(|err| CliError::validation(describe_config_error(&err)))
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Jobs(JobsCommand::Ls(_)) => "jobs.ls",
        Command::Jobs(JobsCommand::Start(_)) => "jobs.start",
        Command::Jobs(JobsCommand::Cancel(_)) => "jobs.cancel",
        Command::Jobs(JobsCommand::Retry(_)) => "jobs.retry",
        Command::Jobs(JobsCommand::Delete(_)) => "jobs.delete",
        Command::Watch(_) => "watch",
        Command::Preview(_) => "preview",
        Command::Settings(SettingsCommand::Get) => "settings.get",
        Command::Settings(SettingsCommand::Patch(_)) => "settings.patch",
    }
}

#[derive(Parser)]
#[command(name = "subloom", about = "Operator CLI for Subloom translation jobs")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "SUBLOOM_CONFIG", help = "JSON settings file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, env = "SUBLOOM_API_URL")]
    api_url: Option<String>,
    #[arg(long, global = true, env = "SUBLOOM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long = "timeout", global = true, env = "SUBLOOM_HTTP_TIMEOUT_SECS")]
    http_timeout_secs: Option<u64>,
    #[arg(long, global = true, env = "SUBLOOM_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,
    #[arg(long, global = true, env = "SUBLOOM_STREAM_PATH")]
    stream_path: Option<String>,
    #[arg(long, global = true, env = "SUBLOOM_LOG_LEVEL")]
    log_level: Option<String>,
    #[arg(long, global = true, env = "SUBLOOM_LOG_FORMAT")]
    log_format: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn overlay(&self) -> ClientSettingsOverlay {
        ClientSettingsOverlay {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            http_timeout_secs: self.http_timeout_secs,
            poll_interval_ms: self.poll_interval_ms,
            stream_path: self.stream_path.clone(),
            jobs_path: None,
            settings_path: None,
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List and control jobs.
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Follow live progress of every running job.
    Watch(WatchArgs),
    /// Stream the translated lines of one job.
    Preview(PreviewArgs),
    /// Read or update backend settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
enum JobsCommand {
    /// List jobs.
    Ls(JobListArgs),
    /// Start queued or paused jobs.
    Start(JobIdsArgs),
    /// Cancel jobs.
    Cancel(JobIdsArgs),
    /// Retry failed or cancelled jobs.
    Retry(JobIdsArgs),
    /// Delete job records.
    Delete(JobIdsArgs),
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the settings document.
    Get,
    /// Apply a partial settings update.
    Patch(SettingsPatchArgs),
}

#[derive(Args, Default)]
pub(crate) struct JobListArgs {
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Option<JobStatus>,
    #[arg(long = "type")]
    pub(crate) kind: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub(crate) page_size: u32,
    #[arg(long, help = "Case-insensitive filter on job id or name")]
    pub(crate) search: Option<String>,
}

#[derive(Args)]
pub(crate) struct JobIdsArgs {
    #[arg(required = true, num_args = 1.., help = "Job identifiers")]
    pub(crate) ids: Vec<String>,
}

#[derive(Args, Default)]
pub(crate) struct WatchArgs {
    #[arg(long = "type", help = "Only follow jobs of this type")]
    pub(crate) kind: Option<String>,
    #[arg(long, default_value_t = 100, help = "Running jobs fetched per poll")]
    pub(crate) page_size: u32,
    #[arg(long, help = "Exit once no running job is left to follow")]
    pub(crate) exit_when_idle: bool,
}

#[derive(Args)]
pub(crate) struct PreviewArgs {
    #[arg(help = "Job identifier")]
    pub(crate) job_id: String,
}

#[derive(Args, Default)]
pub(crate) struct SettingsPatchArgs {
    #[arg(short = 'f', long = "file", help = "JSON object with the keys to change")]
    pub(crate) file: Option<PathBuf>,
    #[arg(long = "set", value_name = "KEY=VALUE", help = "Set one key; JSON values are parsed")]
    pub(crate) set: Vec<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_status(input: &str) -> Result<JobStatus, String> {
    input.parse()
}
