use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stepviz_runtime::{CommandSource, EngineConfig};
use tracing_subscriber::EnvFilter;

use crate::command::HELP;
use crate::driver::Driver;
use crate::error::{CliError, Result};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "STEPVIZ_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "stepviz",
    about = "Step through data-structure operations one atomic change at a time, with undo and redo",
    version
)]
pub struct Cli {
    /// Engine configuration file (TOML, or JSON by extension).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit one JSON object per response.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read commands interactively from stdin.
    Repl,

    /// Execute a command script.
    Run(RunArgs),

    /// Print the effective engine configuration as a JSON line.
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Script with one command per line.
    pub script: PathBuf,

    /// Report failing lines and continue instead of stopping.
    #[arg(long = "keep-going")]
    pub keep_going: bool,

    /// Tag committed composites as replayed rather than user-issued.
    #[arg(long)]
    pub replay: bool,
}

pub fn run_from_env() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

/// Install the stderr subscriber, filtered by `STEPVIZ_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Repl => run_repl(config, &mut out, cli.json),
        Commands::Run(args) => run_script(config, &args, &mut out, cli.json),
        Commands::Config => {
            writeln!(out, "{}", config.to_jsonl())?;
            Ok(())
        }
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    if !path.exists() {
        return Err(CliError::MissingPath { path: path.clone() });
    }
    let config = EngineConfig::load(path)?;
    tracing::info!(target: "stepviz.cli", config = %config.to_jsonl(), "config loaded");
    Ok(config)
}

fn run_repl<W: Write>(config: EngineConfig, out: &mut W, json: bool) -> Result<()> {
    let stdin = io::stdin();
    if stdin.is_terminal() && !json {
        writeln!(out, "stepviz: type 'help' for commands, 'quit' to leave")?;
        writeln!(out, "{HELP}")?;
    }
    Driver::new(config).repl(stdin.lock(), out, json)
}

pub fn run_script<W: Write>(
    config: EngineConfig,
    args: &RunArgs,
    out: &mut W,
    json: bool,
) -> Result<()> {
    if !args.script.exists() {
        return Err(CliError::MissingPath {
            path: args.script.clone(),
        });
    }
    let reader = BufReader::new(File::open(&args.script)?);
    let source = if args.replay {
        CommandSource::Replay
    } else {
        CommandSource::User
    };
    let mut driver = Driver::new(config).with_source(source);
    let failures = driver.run_script(&args.script, reader, out, json, args.keep_going)?;
    if failures > 0 {
        return Err(CliError::exit(
            3,
            format!("{failures} line(s) failed in {}", args.script.display()),
        ));
    }
    Ok(())
}
