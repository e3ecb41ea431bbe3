#![forbid(unsafe_code)]

mod cmd;
mod output;
mod workspace;

use clap::{CommandFactory, Parser, Subcommand};
use ohm_core::timing;
use output::{OutputMode, fail, resolve_output_mode};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use workspace::Workspace;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ohm: current-flow betweenness for weighted networks",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json, FORMAT and the user config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Network",
        about = "Load an edge table as the session graph",
        long_about = "Parse a CSV with `source`, `target` and `weight` columns, validate it, and replace the session graph.",
        after_help = "EXAMPLES:\n    # Upload a network\n    ohm upload edges.csv\n\n    # Emit machine-readable output\n    ohm upload edges.csv --json"
    )]
    Upload(cmd::upload::UploadArgs),

    #[command(
        next_help_heading = "Analysis",
        about = "Score edges between a source and its sinks",
        long_about = "Compute current-flow edge betweenness and list the edges incident to the source that touch a sink.",
        after_help = "EXAMPLES:\n    # One sink\n    ohm calculate --source 1 --sink 3\n\n    # Several sinks, raw sums\n    ohm calculate --source 1 --sink 3 --sink 4 --scale raw"
    )]
    Calculate(cmd::calculate::CalculateArgs),

    #[command(
        next_help_heading = "Network",
        about = "Show summary statistics for the session graph"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Selection",
        about = "Save a selection record",
        after_help = "EXAMPLES:\n    # From a file\n    ohm save --file selection.json\n\n    # From stdin\n    echo '{\"selectedNodes\":{}}' | ohm save"
    )]
    Save(cmd::save::SaveArgs),

    #[command(next_help_heading = "Selection", about = "Print the saved selection record")]
    Load(cmd::load::LoadArgs),

    #[command(
        next_help_heading = "Selection",
        about = "Render the network report",
        after_help = "EXAMPLES:\n    # Report on the saved selection\n    ohm report\n\n    # Write to a file\n    ohm report --out network_report.txt"
    )]
    Report(cmd::report::ReportArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Bash\n    ohm completions bash > ~/.local/share/bash-completion/completions/ohm"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("OHM_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ohm=debug,info"
        } else {
            "ohm=info,warn"
        })
    });

    let format = env::var("OHM_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;

    let command_result = match cli.command {
        Commands::Completions(args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }),
        command => {
            let ws = Workspace::open(&project_root, cli.json)
                .map_err(|e| fail(flag_output_mode(cli.format, cli.json), &e))?;
            let output = resolve_output_mode(cli.format, &ws.config().resolved_output);
            dispatch(&command, &ws, output)
        }
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    command_result
}

/// Output mode from flags alone, for errors raised before config is loaded.
const fn flag_output_mode(format: Option<OutputMode>, json: bool) -> OutputMode {
    match format {
        Some(mode) => mode,
        None if json => OutputMode::Json,
        None => OutputMode::Text,
    }
}

fn dispatch(command: &Commands, ws: &Workspace, output: OutputMode) -> anyhow::Result<()> {
    match command {
        Commands::Upload(args) => {
            timing::timed("cmd.upload", || cmd::upload::run_upload(args, ws, output))
        }
        Commands::Calculate(args) => timing::timed("cmd.calculate", || {
            cmd::calculate::run_calculate(args, ws, output)
        }),
        Commands::Graph(args) => {
            timing::timed("cmd.graph", || cmd::graph::run_graph(args, ws, output))
        }
        Commands::Save(args) => timing::timed("cmd.save", || cmd::save::run_save(args, ws, output)),
        Commands::Load(args) => timing::timed("cmd.load", || cmd::load::run_load(args, ws, output)),
        Commands::Report(args) => {
            timing::timed("cmd.report", || cmd::report::run_report(args, ws, output))
        }
        Commands::Completions(_) => Ok(()),
    }
}
