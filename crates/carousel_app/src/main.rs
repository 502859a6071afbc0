mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use carousel_logging::LogDestination;
use settings::{Settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser)]
#[command(name = "carousel")]
#[command(about = "Build a random image carousel from IIIF manifests")]
#[command(version)]
struct Cli {
    /// Settings file (RON)
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE, global = true)]
    config: PathBuf,

    /// Results file; overrides `output` from the settings file
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Log destination: terminal, file or both
    #[arg(long, default_value = "terminal", global = true)]
    log: String,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: LevelFilter,

    /// Seed the random source for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest once and replace the stored images
    Run,
    /// Keep rebuilding on the configured interval
    Watch,
    /// Print the stored images in display order
    Show,
    /// Show which canvases the selection rules pick
    Rules {
        /// Number of canvases in the hypothetical manifest
        #[arg(long)]
        count: usize,
        /// How many selections to sample
        #[arg(long, default_value_t = 1000)]
        samples: usize,
    },
    /// Print a settings file with every option at its default
    GenConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let destination = LogDestination::from_name(&cli.log)
        .ok_or_else(|| anyhow!("unknown log destination {:?}", cli.log))?;
    carousel_logging::initialize(destination, cli.log_level);

    if let Command::GenConfig = cli.command {
        print!("{}", Settings::default().to_ron()?);
        return Ok(());
    }

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("invalid settings in {}", cli.config.display()))?;
    let output = cli.output.unwrap_or_else(|| settings.output.clone());

    match cli.command {
        Command::Run => commands::run_once(&settings, &output, cli.seed),
        Command::Watch => commands::watch(&settings, &output, cli.seed),
        Command::Show => commands::show(&output),
        Command::Rules { count, samples } => {
            commands::print_rule_preview(&settings, count, samples, cli.seed);
            Ok(())
        }
        Command::GenConfig => Ok(()),
    }
}
