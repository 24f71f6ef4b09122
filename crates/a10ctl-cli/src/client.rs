//! Shared HTTP client, credentials, and the CLI-level error type.

use std::io::{self, IsTerminal};
use std::time::Duration;

use a10ctl_axapi::Credentials;
use a10ctl_config::{OptionBag, keys};
use anyhow::anyhow;
use clap::error::ErrorKind;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::OperatorError;
use crate::session::SessionParams;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI-level error type to distinguish usage errors from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Usage { kind: ErrorKind, message: String },
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// A required value was not supplied.
    pub(crate) fn missing(message: impl Into<String>) -> Self {
        Self::Usage {
            kind: ErrorKind::MissingRequiredArgument,
            message: message.into(),
        }
    }

    /// A supplied value was rejected.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Usage {
            kind: ErrorKind::InvalidValue,
            message: message.into(),
        }
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Usage errors keep their message; everything else becomes a failure
    /// carrying the full cause chain.
    pub(crate) fn from_operator(error: OperatorError) -> Self {
        if !error.is_usage() {
            return Self::Failure(error.into());
        }
        let kind = match &error {
            OperatorError::CommandNotFound { .. } => ErrorKind::InvalidSubcommand,
            _ => ErrorKind::MissingRequiredArgument,
        };
        Self::Usage {
            kind,
            message: error.to_string(),
        }
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } => 2,
            Self::Failure(_) => 1,
        }
    }

    pub(crate) fn display_message(&self, traceback: bool) -> String {
        match self {
            Self::Usage { message, .. } => message.clone(),
            Self::Failure(error) if traceback => format!("{error:?}"),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Dependencies constructed from the merged options.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) http: Client,
}

impl CliDependencies {
    /// Build the HTTP client honouring `timeout` and `insecure`.
    pub(crate) fn from_options(options: &OptionBag, trace_id: &str) -> CliResult<Self> {
        let timeout = match options.get_non_empty(keys::TIMEOUT) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CliError::invalid(format!("timeout must be a whole number of seconds, got '{raw}'"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let insecure = options
            .get_non_empty(keys::INSECURE)
            .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true"));

        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let http = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .default_headers(default_headers)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self { http })
    }
}

/// Assemble session parameters; host and username are mandatory.
pub(crate) fn session_params(options: &OptionBag) -> CliResult<SessionParams> {
    let host = options
        .get_non_empty(keys::HOST)
        .ok_or_else(|| CliError::missing("a device host is required (--host or A10CTL_HOST)"))?;
    let username = options.get_non_empty(keys::USERNAME).ok_or_else(|| {
        CliError::missing("a username is required (--username or A10CTL_USERNAME)")
    })?;
    let password = resolve_password(options, username, host)?;

    let params = SessionParams::new(host, Credentials::new(username, password));
    Ok(match options.get_non_empty(keys::PARTITION) {
        Some(partition) => params.with_partition(partition),
        None => params,
    })
}

fn resolve_password(options: &OptionBag, username: &str, host: &str) -> CliResult<String> {
    if let Some(password) = options.get(keys::PASSWORD).filter(|value| !value.is_empty()) {
        return Ok(password.to_string());
    }

    if io::stdin().is_terminal() {
        let password = rpassword::prompt_password(format!("Password for {username}@{host}: "))
            .map_err(|err| CliError::failure(anyhow!("failed to read password: {err}")))?;
        if password.is_empty() {
            return Err(CliError::invalid("password cannot be empty"));
        }
        Ok(password)
    } else {
        Err(CliError::missing(
            "password required; supply --password or A10CTL_PASSWORD when running non-interactively",
        ))
    }
}
