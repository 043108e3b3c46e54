mod prompt;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use std::io;
use std::path::PathBuf;

use car_catalog_core::{
    AssetIdentifier, CarCatalog, Config, LogLevel, SizePolicy, StepOutcome, CONFIRMATION_TOKEN,
};

#[derive(Parser)]
#[command(name = "car-catalog")]
#[command(about = "Import car photographs into a published catalog")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to rotating files in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render, catalog and sync every image under the source directory
    Process {
        /// Source directory (defaults to the configured source root)
        source: Option<PathBuf>,

        /// Output size: original, 250x150, 512x512, 1200x800 or 1280x1920
        #[arg(long, value_parser = parse_preset)]
        size: Option<SizePolicy>,

        /// Choose the output size from a menu
        #[arg(short, long, conflicts_with = "size")]
        interactive: bool,

        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Delete every rendition, the catalog and all store rows
    DeleteAll,

    /// Delete one image everywhere
    DeleteOne {
        /// Identifier of the image (32 hex digits)
        #[arg(value_parser = parse_identifier)]
        id: AssetIdentifier,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "car-catalog.json")]
        path: PathBuf,
    },
}

fn parse_preset(raw: &str) -> Result<SizePolicy, String> {
    let policy: SizePolicy = raw.parse().map_err(|e| format!("{}", e))?;
    if !policy.is_preset() {
        let presets: Vec<String> = SizePolicy::PRESETS.iter().map(|p| p.to_string()).collect();
        return Err(format!("{} is not one of {}", raw, presets.join(", ")));
    }
    Ok(policy)
}

fn parse_identifier(raw: &str) -> Result<AssetIdentifier, String> {
    raw.parse().map_err(|e| format!("{}", e))
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    let mut config = config.with_env_store()?;

    let level: LevelFilter = match cli.verbose {
        0 => config.log_level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
    .into();
    init_logging(cli.log_dir.as_ref(), level)?;

    match cli.command {
        Commands::Process {
            source,
            size,
            interactive,
            no_progress,
        } => {
            let source = source.unwrap_or_else(|| config.source_root.clone());
            let policy = match size {
                Some(policy) => policy,
                None if interactive => {
                    prompt::choose_size_policy(&mut io::stdin().lock(), &mut io::stdout())?
                }
                None => config.size_policy,
            };
            if no_progress {
                config.show_progress = false;
            }

            let catalog = CarCatalog::new(config)?;
            let summary = catalog.process(&source, policy)?;

            println!(
                "Discovered {} files, processed {}, failed {}, cataloged {}",
                summary.discovered, summary.processed, summary.failed, summary.cataloged
            );
            match summary.sync {
                Some(report) if report.is_degraded() => {
                    warn!("Store sync degraded");
                    println!(
                        "Store sync: {} rows upserted, {} failed",
                        report.upserted,
                        report.failures.len()
                    );
                    for failure in &report.failures {
                        println!("  {}", failure);
                    }
                }
                Some(report) => println!("Store sync: {} rows upserted", report.upserted),
                None => println!("Nothing to publish"),
            }
            Ok(())
        }

        Commands::DeleteAll => {
            let catalog = CarCatalog::new(config)?;
            let store = catalog.connect_store()?;

            let token = prompt::read_token(
                &mut io::stdin().lock(),
                &mut io::stdout(),
                &format!(
                    "This deletes every image, the catalog and all store rows. Type {} to continue: ",
                    CONFIRMATION_TOKEN
                ),
            )?;
            let summary = catalog.delete_all(&store, &token)?;

            println!(
                "Removed {} images, {} thumbnails, {} rows{}",
                summary.primaries_removed,
                summary.thumbnails_removed,
                summary.rows_removed,
                if summary.catalog_removed { " and the catalog" } else { "" }
            );
            if summary.failures > 0 {
                bail!("{} files could not be deleted", summary.failures);
            }
            Ok(())
        }

        Commands::DeleteOne { id } => {
            let catalog = CarCatalog::new(config)?;
            let store = catalog.connect_store()?;
            let report = catalog.delete_one(&store, &id)?;

            for (location, outcome) in [
                ("image", &report.primary),
                ("thumbnail", &report.thumbnail),
                ("catalog", &report.catalog),
                ("store", &report.store),
            ] {
                match outcome {
                    StepOutcome::Removed => println!("{}: removed", location),
                    StepOutcome::Absent => println!("{}: not found", location),
                    StepOutcome::Failed(reason) => println!("{}: FAILED ({})", location, reason),
                }
            }
            if !report.is_clean() {
                bail!("Retraction of {} was incomplete", id);
            }
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(log_dir: Option<&PathBuf>, level: LevelFilter) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => {
            car_catalog_core::logging::init_logger(dir, level).map_err(|e| anyhow!("{}", e))?;
        }
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_env(car_catalog_core::logging::LOG_ENV)
                .init();
        }
    }
    info!("Log level {}", level);
    Ok(())
}
