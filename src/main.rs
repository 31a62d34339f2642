use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cloudfield::cli::commands;
use cloudfield::config::simulation::SimulationConfig;
use cloudfield::persistence;

#[derive(Parser)]
#[command(name = "cloudfield")]
#[command(about = "A stochastic cloud-field simulator that drives a solar irradiance estimator")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "cloudfield.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation and write one JSON frame record per tick
    Run {
        /// CSV file of panel locations (x,y)
        #[arg(short, long)]
        panels: Option<String>,

        /// Frame output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Snapshot file to resume from
        #[arg(short, long)]
        resume: Option<String>,

        /// Emit logs as JSON
        #[arg(long)]
        json_logs: bool,
    },

    /// Show the weather and clouds stored in a snapshot
    Inspect {
        /// Snapshot file (latest valid snapshot when omitted)
        #[arg(short, long)]
        snapshot: Option<String>,
    },

    /// Manage simulation snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List available snapshots
    List {
        /// Snapshot directory (the configured one when omitted)
        #[arg(short, long)]
        dir: Option<String>,
    },
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &str) -> SimulationConfig {
    match SimulationConfig::from_file_or_default(Path::new(path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            panels,
            output,
            resume,
            json_logs,
        } => {
            let config = load_config(&cli.config);
            init_logging(&config.log_level, json_logs);

            if let Err(e) = commands::run_simulation(
                &config,
                panels.as_deref(),
                output.as_deref(),
                resume.as_deref(),
            ) {
                eprintln!("Simulation error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Inspect { snapshot } => {
            let config = load_config(&cli.config);
            init_logging(&config.log_level, false);

            if let Err(e) = commands::inspect(&config, snapshot.as_deref()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Snapshots { action } => match action {
            SnapshotAction::List { dir } => {
                let dir = dir.unwrap_or_else(|| load_config(&cli.config).snapshot_directory);
                let snapshot_dir = Path::new(&dir);
                match persistence::list_snapshots(snapshot_dir) {
                    Ok(snapshots) => {
                        if snapshots.is_empty() {
                            println!("No snapshots found in {}", snapshot_dir.display());
                        } else {
                            println!("{:<40} {:>8} {:>12}", "File", "Tick", "Size");
                            println!("{}", "-".repeat(62));
                            for s in &snapshots {
                                let name = s
                                    .path
                                    .file_name()
                                    .and_then(|n| n.to_str())
                                    .unwrap_or("?");
                                let size_kb = s.file_size / 1024;
                                println!("{:<40} {:>8} {:>9} KB", name, s.tick, size_kb);
                            }
                            println!(
                                "\n{} snapshot(s) in {}",
                                snapshots.len(),
                                snapshot_dir.display()
                            );
                        }
                    }
                    Err(e) => {
                        eprintln!("Error listing snapshots: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
    }
}
