// src/config.rs
use crate::constants::{
    ACCESS_TOKEN_ENV, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_LISTING_TIMEOUT,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT, MAX_LISTING_TIMEOUT_SECS,
    MAX_REQUEST_TIMEOUT_SECS, MAX_RETRY_ATTEMPTS,
};
use crate::error::AppError;
use crate::steps::Scheduler;
use crate::types::{AccessToken, BaseUrl, StepId, ValidationError};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Root URL of the inventory API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Write the ingested graph as JSON to this file
    #[arg(short, long)]
    pub output_file: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Number of steps running at once (default: CPU count, max 16)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Time budget for a single listing request, in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout: u64,

    /// Time budget for one whole listing across all of its pages, in seconds
    #[arg(long, default_value_t = DEFAULT_LISTING_TIMEOUT.as_secs())]
    pub listing_timeout: u64,

    /// Attempts per request when the API reports a transient failure
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Run only these step ids (comma separated) plus their dependencies
    #[arg(long, value_delimiter = ',')]
    pub steps: Vec<String>,

    /// Pretty-print the JSON written to --output-file
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub access_token: AccessToken,
    pub base_url: BaseUrl,
    pub output_file: Option<PathBuf>,
    pub verbose: bool,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub listing_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    /// Empty means every declared step.
    pub steps: Vec<StepId>,
    pub pretty: bool,
}

impl PipelineConfig {
    /// Resolves the configuration from CLI input and the environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let token = std::env::var(ACCESS_TOKEN_ENV).map_err(|_| {
            AppError::MissingConfiguration(format!(
                "{} environment variable not set",
                ACCESS_TOKEN_ENV
            ))
        })?;
        Self::from_parts(cli, token)
    }

    /// Validates CLI input against an already obtained token.
    pub fn from_parts(cli: CommandLineInput, token: impl Into<String>) -> Result<Self, AppError> {
        let access_token = AccessToken::new(token)?;
        let base_url = BaseUrl::parse(&cli.base_url)?;

        let max_attempts = bounded(cli.max_attempts.into(), 1, MAX_RETRY_ATTEMPTS.into())? as u32;
        let request_timeout = Duration::from_secs(bounded(
            cli.request_timeout,
            1,
            MAX_REQUEST_TIMEOUT_SECS,
        )?);
        let listing_timeout = Duration::from_secs(bounded(
            cli.listing_timeout,
            1,
            MAX_LISTING_TIMEOUT_SECS,
        )?);

        let steps = cli
            .steps
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(StepId::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PipelineConfig {
            access_token,
            base_url,
            output_file: cli.output_file.map(PathBuf::from),
            verbose: cli.verbose,
            concurrency: Scheduler::new(
                cli.concurrency
                    .unwrap_or_else(Scheduler::default_concurrency),
            )
            .concurrency(),
            request_timeout,
            listing_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts,
            steps,
            pretty: cli.pretty,
        })
    }
}

fn bounded(value: u64, min: u64, max: u64) -> Result<u64, ValidationError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfBounds { value, min, max })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            access_token: AccessToken::new("test-token-0123456789abcdef")
                .expect("Default access token should be valid"),
            base_url: BaseUrl::parse(DEFAULT_BASE_URL).expect("Default base URL should be valid"),
            output_file: None,
            verbose: false,
            concurrency: Scheduler::default_concurrency(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            listing_timeout: DEFAULT_LISTING_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            steps: Vec::new(),
            pretty: false,
        }
    }
}
