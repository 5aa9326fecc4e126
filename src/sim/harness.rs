//! CLI entry point for the simulation harness: single runs, parameter sweeps and CSV/JSONL output.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use procsim::config::{SimConfig, load_config};
use procsim::stats::write_records_csv;
use procsim::sweep::{run_sweep, write_sweep_csv};

/// Simulation Harness CLI
#[derive(Parser, Debug)]
#[command(name = "sim-harness", about = "Process/memory/CPU contention simulator with parameter sweeps.")]
pub struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for CSV/JSONL files
    #[arg(short, long, default_value = "./sim_output")]
    output: PathBuf,

    /// Parameter override (e.g. --param simulation.cpu_speed=2.0)
    #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
    param: Vec<(String, String)>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single simulation (default)
    Run,
    /// Run the interval x process-count sweep
    Sweep,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=');
    match pos {
        Some(pos) => Ok((s[..pos].to_string(), s[pos + 1..].to_string())),
        None => Err(format!("Invalid KEY=VAL: no `=` found in '{}'.", s)),
    }
}

fn effective_config(cli: &Cli) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().ok_or("config path is not valid UTF-8")?;
            tracing::info!("Loading configuration from: {}", path);
            load_config(path)?
        }
        None => SimConfig::default(),
    };
    for (key, val) in &cli.param {
        tracing::info!("Override param: {}={}", key, val);
        config.apply_override(key, val)?;
    }
    config.validate()?;
    Ok(config)
}

fn create_output(dir: &Path, name: &str) -> Result<BufWriter<File>, Box<dyn std::error::Error>> {
    let path = dir.join(name);
    let file = File::create(&path)?;
    tracing::info!("Writing {}", path.display());
    Ok(BufWriter::new(file))
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = effective_config(cli)?;

    if let Some(Commands::ShowConfig) = cli.command {
        print!("{}", toml::to_string(&config)?);
        return Ok(());
    }

    std::fs::create_dir_all(&cli.output)?;

    match cli.command {
        Some(Commands::Sweep) => {
            let points = run_sweep(&config, &config.sweep)?;
            println!("{:>10} {:>10} {:>10} {:>12} {:>12} {:>10}", "interval", "processes", "completed", "mean", "std_dev", "in_flight");
            for p in &points {
                println!(
                    "{:>10.2} {:>10} {:>10} {:>12.3} {:>12.3} {:>10}",
                    p.interval, p.process_count, p.summary.count, p.summary.mean, p.summary.std_dev, p.in_flight
                );
            }
            write_sweep_csv(&points, create_output(&cli.output, "sweep.csv")?)?;
        }
        _ => {
            let output = procsim::run_simulation(&config)?;
            let summary = output.summary();
            println!(
                "completed={} in_flight={} mean_latency={:.3} std_dev={:.3}",
                summary.count, output.in_flight, summary.mean, summary.std_dev
            );
            write_records_csv(&output.records, create_output(&cli.output, "records.csv")?)?;
            output.log.write_jsonl(create_output(&cli.output, "events.jsonl")?)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(&cli) {
        tracing::error!("sim-harness failed: {}", e);
        return Err(e);
    }
    Ok(())
}
