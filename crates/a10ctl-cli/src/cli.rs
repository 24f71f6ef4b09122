//! Command-line entry point: argument parsing, option layering, and dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use a10ctl_axapi::{AxapiConnector, Connector};
use a10ctl_config::{OptionBag, expand_home, keys};
use a10ctl_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LogSink, LoggingConfig, TracingSink, init_logging,
};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::client::{CliDependencies, CliError, CliResult, session_params};
use crate::dispatch::{CommandOutput, Dispatcher};
use crate::error::OperatorResult;
use crate::output;
use crate::session::{Session, SessionParams, with_session};

/// Parses arguments, runs the selected command, and reports the outcome.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let traceback = cli.traceback;
    match execute(cli).await {
        Ok(()) => 0,
        Err(err) => report(&err, traceback),
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let defaults = a10ctl_config::load(cli.config.as_deref()).map_err(CliError::failure)?;
    let options = cli.option_bag().layered_over(defaults.into_bag());
    init_logging_from(&options)?;

    let trace_id = Uuid::new_v4().to_string();
    let deps = CliDependencies::from_options(&options, &trace_id)?;
    let params = session_params(&options)?;
    let log: Arc<dyn LogSink> = Arc::new(TracingSink::new(&params.host, &trace_id));
    tracing::debug!(options = ?options, command = cli.command.name(), "resolved options");

    let connector = AxapiConnector::new(deps.http);
    let result = run_command(&connector, params, log, cli.command.name(), &options)
        .await
        .map_err(CliError::from_operator)?;
    output::render(&result, cli.output)
}

/// Open a session, dispatch `command` with `options`, and close the session.
async fn run_command(
    connector: &dyn Connector,
    params: SessionParams,
    log: Arc<dyn LogSink>,
    command: &str,
    options: &OptionBag,
) -> OperatorResult<CommandOutput> {
    let dispatch_log = Arc::clone(&log);
    with_session(connector, params, log, async move |session: &mut Session| {
        Dispatcher::new(session, dispatch_log)
            .resolve(command)?
            .invoke(options)
            .await
    })
    .await
}

fn report(err: &CliError, traceback: bool) -> i32 {
    let message = err.display_message(traceback);
    match err {
        CliError::Usage { kind, .. } => {
            let usage = Cli::command().error(*kind, message);
            let _ = usage.print();
        }
        CliError::Failure(_) if tracing::dispatcher::has_been_set() => {
            tracing::error!("{message}");
        }
        CliError::Failure(_) => eprintln!("error: {message}"),
    }
    err.exit_code()
}

fn init_logging_from(options: &OptionBag) -> CliResult<()> {
    let level = options
        .get_non_empty(keys::LOG_LEVEL)
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let format = match options.get_non_empty(keys::LOG_FORMAT) {
        Some(raw) => LogFormat::parse(raw)
            .ok_or_else(|| CliError::invalid(format!("unknown log format '{raw}'")))?,
        None => LogFormat::Pretty,
    };
    let log_file = options
        .get_non_empty(keys::LOG_FILE)
        .map(|raw| expand_home(Path::new(raw)))
        .transpose()
        .map_err(CliError::failure)?;

    init_logging(&LoggingConfig {
        level,
        format,
        log_file: log_file.as_deref(),
    })
    .map_err(CliError::failure)
}

#[derive(Parser)]
#[command(
    name = "a10ctl",
    version,
    about = "Manage servers behind an A10 load-balancer partition"
)]
pub(crate) struct Cli {
    /// Device host name, address, or URL.
    #[arg(short = 'H', long, global = true, env = "A10CTL_HOST")]
    host: Option<String>,
    /// Account name.
    #[arg(short, long, global = true, env = "A10CTL_USERNAME")]
    username: Option<String>,
    /// Account password; prompted for when omitted on a terminal.
    #[arg(
        short,
        long,
        global = true,
        env = "A10CTL_PASSWORD",
        hide_env_values = true
    )]
    password: Option<String>,
    /// Partition to activate (defaults to `shared`).
    #[arg(short = 'P', long, global = true, env = "A10CTL_PARTITION")]
    partition: Option<String>,
    /// Configuration file (defaults to `~/.a10ctl.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Append log output to this file as well as stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Log line format.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    log_format: Option<String>,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    debug: bool,
    /// Print the full error chain on failure.
    #[arg(long, global = true)]
    traceback: bool,
    /// Skip TLS certificate verification.
    #[arg(long, global = true)]
    insecure: bool,
    /// HTTP timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for command results"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Flatten the parsed arguments into the option bag shared with the
    /// configuration file.
    fn option_bag(&self) -> OptionBag {
        let mut options = OptionBag::new();
        options.insert_opt(keys::HOST, self.host.clone());
        options.insert_opt(keys::USERNAME, self.username.clone());
        options.insert_opt(keys::PASSWORD, self.password.clone());
        options.insert_opt(keys::PARTITION, self.partition.clone());
        options.insert_opt(
            keys::LOG_FILE,
            self.log_file
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned()),
        );
        options.insert_opt(keys::LOG_FORMAT, self.log_format.clone());
        if self.debug {
            options.insert(keys::LOG_LEVEL, "debug");
        }
        if self.insecure {
            options.insert(keys::INSECURE, "true");
        }
        options.insert_opt(keys::TIMEOUT, self.timeout.map(|secs| secs.to_string()));
        self.command.fill(&mut options);
        options
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Put a server into rotation.
    Up(ServerArgs),
    /// Take a server out of rotation.
    Down(ServerArgs),
    /// Show a server's state and current connections.
    Status(ServerArgs),
    /// Show a server's statistics.
    Stats(StatsArgs),
    /// List servers, optionally filtered by a name pattern.
    List(ListArgs),
    /// Save the running configuration to a local file.
    Backup(BackupArgs),
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Up(_) => "up",
            Self::Down(_) => "down",
            Self::Status(_) => "status",
            Self::Stats(_) => "stats",
            Self::List(_) => "list",
            Self::Backup(_) => "backup",
        }
    }

    fn fill(&self, options: &mut OptionBag) {
        match self {
            Self::Up(args) | Self::Down(args) | Self::Status(args) => {
                options.insert(keys::SERVER, args.server.clone());
            }
            Self::Stats(args) => {
                options.insert(keys::SERVER, args.server.clone());
                options.insert_opt(keys::STAT, args.stat.clone());
            }
            Self::List(args) => options.insert_opt(keys::NFILTER, args.nfilter.clone()),
            Self::Backup(args) => options.insert(keys::FILENAME, args.filename.clone()),
        }
    }
}

#[derive(Args)]
struct ServerArgs {
    /// Server name.
    server: String,
}

#[derive(Args)]
struct StatsArgs {
    /// Server name.
    server: String,
    /// Only show this statistic.
    stat: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    /// Regular expression matched anywhere in the server name.
    nfilter: Option<String>,
}

#[derive(Args)]
struct BackupArgs {
    /// Destination file; `~` is expanded.
    filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use a10ctl_axapi::Credentials;
    use a10ctl_config::FileDefaults;
    use a10ctl_test_support::MemorySink;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    const PATH: &str = "/services/rest/V2.1/";

    fn parse(args: &[&str]) -> Result<Cli> {
        Cli::try_parse_from(args).map_err(|err| anyhow!(err.to_string()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_and_subcommand_fill_the_bag() -> Result<()> {
        let cli = parse(&[
            "a10ctl", "-H", "lb1", "-u", "admin", "-p", "secret", "-P", "p-web", "-d",
            "--insecure", "--timeout", "5", "stats", "s1", "cur_conns",
        ])?;
        let options = cli.option_bag();

        assert_eq!(cli.command.name(), "stats");
        assert_eq!(options.get(keys::HOST), Some("lb1"));
        assert_eq!(options.get(keys::PARTITION), Some("p-web"));
        assert_eq!(options.get(keys::LOG_LEVEL), Some("debug"));
        assert_eq!(options.get(keys::INSECURE), Some("true"));
        assert_eq!(options.get(keys::TIMEOUT), Some("5"));
        assert_eq!(options.get(keys::SERVER), Some("s1"));
        assert_eq!(options.get(keys::STAT), Some("cur_conns"));
        assert_eq!(cli.output, OutputFormat::Table);
        Ok(())
    }

    #[test]
    fn global_flags_follow_the_subcommand() -> Result<()> {
        let cli = parse(&["a10ctl", "list", "^web", "--host", "lb2", "--output", "json"])?;
        let options = cli.option_bag();
        assert_eq!(options.get(keys::NFILTER), Some("^web"));
        assert_eq!(options.get(keys::HOST), Some("lb2"));
        assert!(!options.contains(keys::INSECURE));
        assert_eq!(cli.output, OutputFormat::Json);
        Ok(())
    }

    #[test]
    fn arguments_override_file_defaults() -> Result<()> {
        let defaults = FileDefaults {
            host: Some("lb-file".into()),
            username: Some("operator".into()),
            partition: Some("p-file".into()),
            insecure: Some(true),
            ..FileDefaults::default()
        };
        let cli = parse(&["a10ctl", "-H", "lb-flag", "backup", "~/lb.cfg"])?;
        let options = cli.option_bag().layered_over(defaults.into_bag());

        assert_eq!(options.get(keys::HOST), Some("lb-flag"));
        assert_eq!(options.get(keys::USERNAME), Some("operator"));
        assert_eq!(options.get(keys::PARTITION), Some("p-file"));
        assert_eq!(options.get(keys::INSECURE), Some("true"));
        assert_eq!(options.get(keys::FILENAME), Some("~/lb.cfg"));
        Ok(())
    }

    #[test]
    fn missing_subcommand_argument_is_a_parse_error() {
        assert!(Cli::try_parse_from(["a10ctl", "up"]).is_err());
        assert!(Cli::try_parse_from(["a10ctl", "reboot", "s1"]).is_err());
        assert!(Cli::try_parse_from(["a10ctl", "--log-format", "xml", "list"]).is_err());
    }

    #[test]
    fn usage_errors_exit_with_two() {
        assert_eq!(report(&CliError::missing("a device host is required"), false), 2);
        assert_eq!(report(&CliError::invalid("unknown log format 'xml'"), false), 2);
        assert_eq!(
            report(&CliError::failure(anyhow!("device exploded")), true),
            1
        );
    }

    #[tokio::test]
    async fn list_runs_against_device() -> Result<()> {
        let server = MockServer::start_async().await;
        let auth = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "authenticate");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"session_id": "sess-1"}));
        });
        let partition = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "system.partition.active")
                .query_param("session_id", "sess-1")
                .json_body(json!({"name": "shared"}));
            then.status(200)
                .json_body(json!({"response": {"status": "OK"}}));
        });
        let list = server.mock(|when, then| {
            when.method(GET)
                .path(PATH)
                .query_param("method", "slb.server.getAll")
                .query_param("session_id", "sess-1");
            then.status(200).json_body(json!({
                "server_list": [
                    {"name": "web-2", "host": "10.0.0.12", "status": 1,
                     "port_list": [{"port_num": 443}, {"port_num": 80}]},
                    {"name": "db-1", "host": "10.0.1.1", "status": 0,
                     "port_list": [{"port_num": 5432}]},
                    {"name": "web-1", "host": "10.0.0.11", "status": 0,
                     "port_list": [{"port_num": 80}]}
                ]
            }));
        });
        let close = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "session.close");
            then.status(200)
                .json_body(json!({"response": {"status": "OK"}}));
        });

        let sink = Arc::new(MemorySink::new());
        let connector = AxapiConnector::new(Client::new());
        let params = SessionParams::new(server.base_url(), Credentials::new("admin", "secret"));
        let options = OptionBag::new().with(keys::NFILTER, "web");

        let output = run_command(&connector, params, sink.clone(), "list", &options).await?;

        let CommandOutput::Servers(servers) = output else {
            return Err(anyhow!("list should return servers"));
        };
        let names: Vec<&str> = servers.iter().map(|server| server.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
        assert!(sink.contains("web-1 [10.0.0.11:{80}]: Down"));
        assert!(sink.contains("web-2 [10.0.0.12:{80,443}]: Up"));
        auth.assert();
        partition.assert();
        list.assert();
        close.assert();
        Ok(())
    }

    #[tokio::test]
    async fn failed_command_still_closes_the_device_session() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "authenticate");
            then.status(200)
                .json_body(json!({"session_id": "sess-2"}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "system.partition.active");
            then.status(200)
                .json_body(json!({"response": {"status": "OK"}}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "slb.server.search");
            then.status(200).json_body(json!({
                "response": {"status": "fail", "err": {"code": 67_174_402, "msg": "No such Server"}}
            }));
        });
        let close = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "session.close");
            then.status(200)
                .json_body(json!({"response": {"status": "OK"}}));
        });

        let sink = Arc::new(MemorySink::new());
        let connector = AxapiConnector::new(Client::new());
        let params = SessionParams::new(server.base_url(), Credentials::new("admin", "secret"));
        let options = OptionBag::new().with(keys::SERVER, "ghost");

        let err = run_command(&connector, params, sink.clone(), "up", &options)
            .await
            .expect_err("unknown server should fail");
        let cli_error = CliError::from_operator(err);
        assert_eq!(cli_error.exit_code(), 1);
        assert!(cli_error.display_message(false).contains("No such Server"));
        close.assert();
        Ok(())
    }
}
