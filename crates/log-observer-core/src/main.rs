//! Log Observer CLI
//!
//! Command-line interface for browsing log and query history.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::{Map, Value};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use log_observer::api::DemoServer;
use log_observer::client::{ApiClient, Backend, ConnectionHandle};
use log_observer::config::LoggingConfig;
use log_observer::filter::{generate_suggestions, validate_where_condition, SuggestionKind};
use log_observer::models::{mask_dsn, ConnectionStatus, ParsedDsn, StreamKind, TimeRange};
use log_observer::viewer::{ListOptions, Logs, Queries, RecordKind, RecordList, RecordListController};
use log_observer::Config;

/// Log Observer - log and query history viewer
#[derive(Parser)]
#[command(name = "log-observer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LOG_OBSERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides server.base_url)
    #[arg(short, long, global = true, env = "LOG_OBSERVER_SERVER")]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
struct ListArgs {
    /// Page number
    #[arg(long, default_value = "1")]
    page: u32,

    /// Time range (5m, 15m, 30m, 1h, 3h, 6h, 12h, 24h, 2d)
    #[arg(long)]
    last: Option<TimeRange>,

    /// Free-text search; query ids are detected automatically
    #[arg(long)]
    search: Option<String>,

    /// WHERE condition, may be repeated
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Print full bodies and details
    #[arg(long)]
    expand: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the terminal viewer
    Tui {
        /// Initial time range
        #[arg(long)]
        last: Option<TimeRange>,
    },

    /// Print one page of log history
    Logs {
        /// Level filter (error, warning, info, debug)
        #[arg(long)]
        level: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Print one page of query history
    Queries {
        /// Status filter (success, error)
        #[arg(long)]
        status: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Show the backend connection status
    Status,

    /// Configure the backend database connection
    Connect {
        /// Connection string; prompted for when omitted
        dsn: Option<String>,
    },

    /// Parse and mask a connection string without contacting the backend
    Dsn {
        /// Connection string
        dsn: String,
    },

    /// Show filter suggestions for partial input
    Suggest {
        /// Partial WHERE condition
        #[arg(default_value = "")]
        input: String,

        /// Table the condition applies to (logs, queries)
        #[arg(long, default_value = "logs")]
        table: StreamKind,
    },

    /// Serve generated history on the backend API
    DemoServer {
        /// Bind host (overrides demo.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides demo.port)
        #[arg(long)]
        port: Option<u16>,

        /// Start connected as if this DSN had been configured
        #[arg(long)]
        connect: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }

    // The TUI owns the terminal, so its logs go to a file
    let to_file = matches!(cli.command, Commands::Tui { .. });
    let _guard = init_logging(&config.logging, cli.verbose, to_file);

    // Execute command
    let result = match cli.command {
        Commands::Tui { last } => run_tui(config, last).await,
        Commands::Logs { level, list } => {
            run_list::<Logs>(&config, level, list, cli.format).await
        }
        Commands::Queries { status, list } => {
            run_list::<Queries>(&config, status, list, cli.format).await
        }
        Commands::Status => run_status(&config, cli.format).await,
        Commands::Connect { dsn } => run_connect(&config, dsn, cli.format).await,
        Commands::Dsn { dsn } => {
            print_dsn(&dsn, cli.format);
            Ok(())
        }
        Commands::Suggest { input, table } => {
            print_suggestions(&input, table, cli.format);
            Ok(())
        }
        Commands::DemoServer {
            host,
            port,
            connect,
        } => run_demo_server(&config, host, port, connect).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig, verbose: bool, to_file: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = config.format.eq_ignore_ascii_case("json");

    if to_file {
        let appender = tracing_appender::rolling::daily(config.log_directory(), "log-observer.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        return Some(guard);
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    None
}

fn backend(config: &Config) -> anyhow::Result<Arc<dyn Backend>> {
    Ok(Arc::new(ApiClient::from_config(&config.server)?))
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_tui(mut config: Config, last: Option<TimeRange>) -> anyhow::Result<()> {
    if let Some(range) = last {
        config.viewer.default_time_range = range;
    }
    info!(
        server = %config.server.base_url,
        time_range = %config.viewer.default_time_range,
        "Starting terminal viewer"
    );

    let backend = backend(&config)?;
    log_observer::tui::run(&config, backend).await?;
    Ok(())
}

async fn run_list<K: RecordKind>(
    config: &Config,
    level: Option<String>,
    args: ListArgs,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    K::Record: Serialize,
{
    let stream = &K::CONFIG;
    if let Some(level) = level.as_deref() {
        if !stream.is_known_level(level) {
            anyhow::bail!(
                "unknown {} '{}', expected one of: {}",
                stream.filter_key,
                level,
                stream.levels.join(", ")
            );
        }
    }

    let mut controller =
        RecordListController::<K>::new(backend(config)?, ConnectionHandle::default(), &config.viewer);
    controller.set_active(true);
    controller.apply_options(ListOptions {
        page: args.page,
        level,
        time_range: args.last,
        search: args.search,
        filters: args.filters,
    });

    let progress =
        (format == OutputFormat::Text).then(|| spinner(format!("Fetching {}...", stream.item_name)));
    controller.load_data().await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    if let Some(error) = controller.last_error() {
        anyhow::bail!("{error}");
    }

    let view = controller.render();
    if format == OutputFormat::Json {
        let mut body = Map::new();
        body.insert("total".into(), Value::from(controller.state().total_records));
        body.insert("page".into(), Value::from(controller.state().current_page));
        body.insert("stats".into(), serde_json::to_value(controller.stats())?);
        body.insert(stream.data_key.into(), serde_json::to_value(controller.records())?);
        return print_json(&body);
    }

    for row in &view.rows {
        let record = &row.record;
        let badge = match record.badge.category.as_str() {
            "error" => style(&record.badge.label).red().bold(),
            "warning" => style(&record.badge.label).yellow().bold(),
            "success" => style(&record.badge.label).green().bold(),
            "debug" => style(&record.badge.label).dim(),
            _ => style(&record.badge.label).cyan().bold(),
        };
        let chips: String = record.chips.iter().map(|c| format!("[{c}] ")).collect();
        println!(
            "{} {:<7} {}{}",
            style(&record.timestamp).dim(),
            badge,
            style(chips).magenta(),
            record.preview_text()
        );
        if args.expand {
            for line in record.body_text().lines() {
                println!("    {line}");
            }
            for (label, value) in &record.meta {
                println!("    {}: {}", style(label).dim(), value);
            }
            println!();
        }
    }

    println!();
    println!("{}", style(&view.pagination.summary).bold());
    let counters: Vec<String> = view
        .stats
        .iter()
        .map(|c| format!("{}: {}", c.label, c.value))
        .collect();
    println!("{}", style(counters.join("  ")).dim());
    Ok(())
}

fn print_status(status: &ConnectionStatus) {
    let label = if status.connected {
        style(status.label()).green().bold()
    } else {
        style(status.label()).red().bold()
    };
    println!("{label}");
    if let Some(dsn) = &status.dsn_masked {
        println!("  DSN:      {dsn}");
    }
    if let Some(database) = &status.database {
        println!("  Database: {database}");
    }
    if let Some(message) = &status.message {
        println!("  {message}");
    }
    if let Some(error) = &status.error {
        println!("  {}", style(error).red());
    }
}

async fn run_status(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let backend = backend(config)?;
    let status = ConnectionHandle::default().refresh(backend.as_ref()).await;
    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            print_status(&status);
            Ok(())
        }
    }
}

async fn run_connect(config: &Config, dsn: Option<String>, format: OutputFormat) -> anyhow::Result<()> {
    let dsn = match dsn {
        Some(dsn) => dsn,
        None => {
            let dsn: String = dialoguer::Input::new()
                .with_prompt("Connection string")
                .validate_with(|input: &String| {
                    if input.trim().is_empty() {
                        Err("DSN is required")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?;

            for (label, value) in ParsedDsn::parse(&dsn).preview_entries() {
                println!("  {label}: {value}");
            }
            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Connect with these settings?")
                .default(true)
                .interact()?;
            if !confirmed {
                return Ok(());
            }
            dsn
        }
    };

    let dsn = dsn.trim();
    if dsn.is_empty() {
        anyhow::bail!("DSN is required");
    }

    let backend = backend(config)?;
    let response = backend.configure_connection(dsn).await?;
    let status = response.resulting_status();

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text => print_status(&status),
    }
    if !response.success {
        anyhow::bail!(
            "{}",
            response
                .error
                .or(status.error)
                .unwrap_or_else(|| "Connection failed".to_string())
        );
    }
    Ok(())
}

fn print_dsn(dsn: &str, format: OutputFormat) {
    let parsed = ParsedDsn::parse(dsn);
    let masked = mask_dsn(dsn);
    match format {
        OutputFormat::Json => {
            let mut body = Map::new();
            body.insert("masked".into(), Value::from(masked));
            for (label, value) in parsed.entries() {
                body.insert(label.to_ascii_lowercase(), Value::from(value));
            }
            println!("{}", Value::Object(body));
        }
        OutputFormat::Text => {
            println!("{masked}");
            for (label, value) in parsed.entries() {
                println!("  {label:<10} {value}");
            }
        }
    }
}

fn print_suggestions(input: &str, table: StreamKind, format: OutputFormat) {
    let suggestions = generate_suggestions(input, table);
    if format == OutputFormat::Json {
        match serde_json::to_string_pretty(&suggestions) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: {e}"),
        }
        return;
    }

    for suggestion in &suggestions {
        let kind = match suggestion.kind {
            SuggestionKind::Field => style("field").magenta(),
            SuggestionKind::Value => style("value").green(),
        };
        println!(
            "{kind} {:<40} {}",
            suggestion.text,
            style(&suggestion.description).dim()
        );
    }

    if !input.trim().is_empty() {
        match validate_where_condition(input, table) {
            Ok(parsed) => println!(
                "{} {} {} {}",
                style("valid:").green(),
                parsed.field,
                parsed.operator,
                parsed.value
            ),
            Err(e) => println!("{} {e}", style("invalid:").red()),
        }
    }
}

async fn run_demo_server(
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
    connect: Option<String>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.demo.host.clone());
    let port = port.unwrap_or(config.demo.port);
    let addr = format!("{host}:{port}");

    let mut server = DemoServer::new(&config.demo);
    if let Some(dsn) = connect.as_deref() {
        server = server.connect(dsn);
    }
    info!(
        logs = config.demo.log_count,
        queries = config.demo.query_count,
        "Generated demo dataset"
    );

    println!("Demo backend: http://{addr}");
    println!("Press Ctrl+C to stop");

    tokio::select! {
        result = server.serve(&addr) => result?,
        _ = tokio::signal::ctrl_c() => println!("\nShutting down..."),
    }
    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "log-observer", &mut io::stdout());
}
