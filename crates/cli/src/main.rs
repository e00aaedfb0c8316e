mod commands;
mod input;
mod manifest;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use kbx_core::{Direction, SynthError};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Which generated direction an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    Forward,
    Backward,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::Forward => Direction::Forward,
            DirectionArg::Backward => Direction::Backward,
        }
    }
}

/// Bidirectional transformation synthesis for rewrite-rule specifications.
#[derive(Parser)]
#[command(
    name = "kbx",
    version,
    about = "Bidirectional transformation synthesis for rewrite-rule specifications"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log pipeline progress
    #[arg(long, global = true)]
    verbose: bool,

    /// Log per-rule analysis details
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate forward and backward specifications
    Gen {
        /// Path to the parsed specification (JSON)
        spec: PathBuf,
        /// Synthesis configuration (default: kbx.toml next to the specification)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory (default: <stem>-kbx-workspace next to the specification)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Report how every rule would be transformed
    Check {
        /// Path to the parsed specification (JSON)
        spec: PathBuf,
        /// Synthesis configuration (default: kbx.toml next to the specification)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Substitute placeholder defaults into a rendered backward specification
    Fill {
        /// Path to the rendered backward specification
        file: PathBuf,
        /// Synthesis configuration (default: kbx.toml in the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Remove bookkeeping text from an artifact produced by a generated specification
    Mask {
        /// Path to the artifact
        file: PathBuf,
        /// Direction that produced the artifact
        #[arg(long, value_enum)]
        direction: DirectionArg,
        /// Synthesis configuration (default: kbx.toml in the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    match cli.command {
        Commands::Gen { spec, config, out } => {
            commands::generate::cmd_gen(
                &spec,
                config.as_deref(),
                out.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Check { spec, config } => {
            commands::check::cmd_check(&spec, config.as_deref(), cli.output, cli.quiet);
        }
        Commands::Fill { file, config } => {
            commands::fill::cmd_fill(&file, config.as_deref(), cli.output, cli.quiet);
        }
        Commands::Mask {
            file,
            direction,
            config,
        } => {
            commands::mask::cmd_mask(
                &file,
                direction.into(),
                config.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Log to stderr. `RUST_LOG` applies unless a verbosity flag is given.
fn init_tracing(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

pub(crate) fn report_synth_error(e: &SynthError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("synthesis error: {}", e);
            }
        }
    }
}
