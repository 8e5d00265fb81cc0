use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use market_collector_deploy::{load_config, synth};

#[derive(Parser)]
#[command(name = "market-collector-deploy")]
#[command(about = "Generates deployment descriptors for market data collector hosts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate descriptors for every collector of one stage
    Generate {
        /// Deployment configuration file
        #[arg(short, long, default_value = "deploy.json")]
        config: PathBuf,

        /// Stage to synthesize (e.g. dev, staging, prod)
        #[arg(short, long)]
        stage: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Directory to write into (stdout when omitted)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Validate the collector table and every stage
    Validate {
        #[arg(short, long, default_value = "deploy.json")]
        config: PathBuf,
    },

    /// List pipeline stages in promotion order
    Stages {
        #[arg(short, long, default_value = "deploy.json")]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON manifest with every descriptor
    Json,
    /// One rendered user-data script per collector
    UserData,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Generate {
            config,
            stage,
            format,
            out_dir,
        } => {
            let cfg = load_config(&config)?;
            let manifest = synth::synthesize(&cfg, &stage)?;
            match format {
                OutputFormat::Json => manifest.write_json(out_dir.as_deref())?,
                OutputFormat::UserData => {
                    manifest.write_user_data(out_dir.as_deref())?;
                }
            }
        }

        Commands::Validate { config } => {
            let cfg = load_config(&config)?;
            cfg.validate()?;
            info!(
                "{} is valid: {} collectors, stages [{}]",
                config.display(),
                cfg.collectors.len(),
                cfg.stage_names().join(", ")
            );
        }

        Commands::Stages { config } => {
            let cfg = load_config(&config)?;
            for (i, stage) in cfg.stages.iter().enumerate() {
                println!(
                    "{}. {:<10} account={} region={}{}",
                    i + 1,
                    stage.name,
                    stage.account,
                    stage.region,
                    if stage.requires_approval { " (manual approval)" } else { "" }
                );
            }
        }
    }

    Ok(())
}
