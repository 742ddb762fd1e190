use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod anomaly;
mod benchmark;
mod config;
mod encoder;
mod error;
mod intensity;
mod io;
mod models;
mod pipeline;
mod pooling;
mod regression;
mod report;

use config::PipelineConfig;
use models::{ComplianceDataset, EfficiencyFlag, EnrichedVoyageRecord};

#[derive(Parser)]
#[command(name = "fleet-compliance")]
#[command(about = "GHG intensity compliance engine for vessel voyage records", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the emission model and write the enriched compliance dataset
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "compliance_data.json")]
        out: PathBuf,
        #[arg(long, env = "COMPLIANCE_REDUCTION", default_value_t = config::DEFAULT_REDUCTION_FRACTION)]
        reduction: f64,
        #[arg(long, env = "COMPLIANCE_TARGET_YEAR", default_value_t = config::DEFAULT_TARGET_YEAR)]
        target_year: i32,
        #[arg(long, env = "COMPLIANCE_TEST_FRACTION", default_value_t = config::DEFAULT_TEST_FRACTION)]
        test_fraction: f64,
        #[arg(long, env = "COMPLIANCE_SPLIT_SEED", default_value_t = config::DEFAULT_SPLIT_SEED)]
        seed: u64,
    },
    /// Pool one deficit voyage against one surplus voyage
    Pool {
        #[arg(long)]
        dataset: PathBuf,
        /// Index of the deficit voyage in the dataset
        #[arg(long)]
        deficit: usize,
        /// Index of the surplus voyage in the dataset
        #[arg(long)]
        surplus: usize,
    },
    /// Generate a markdown compliance report
    Report {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List voyages with outlying fuel efficiency
    Anomalies {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long, default_value_t = anomaly::DEFAULT_Z_THRESHOLD)]
        threshold: f64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            input,
            out,
            reduction,
            target_year,
            test_fraction,
            seed,
        } => {
            let config = PipelineConfig {
                target_year,
                reduction_fraction: reduction,
                test_fraction,
                split_seed: seed,
            };
            let records = io::load_records(&input)?;
            let dataset = pipeline::run_pipeline(&records, &config, Utc::now())
                .context("compliance pipeline failed")?;
            io::write_dataset(&dataset, &out)?;

            let summary = &dataset.metadata.compliance_summary;
            println!(
                "Target intensity {:.4} kg/km: {} surplus, {} deficit, {} without intensity.",
                summary.target_intensity,
                summary.surplus_count,
                summary.deficit_count,
                summary.undefined_intensity_count
            );
            println!("Dataset written to {}.", out.display());
        }
        Commands::Pool {
            dataset,
            deficit,
            surplus,
        } => {
            let dataset = io::read_dataset(&dataset)?;
            let outcome = pooling::evaluate_pool(
                voyage_at(&dataset, deficit)?,
                voyage_at(&dataset, surplus)?,
            )?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Report {
            dataset,
            out,
            limit,
        } => {
            let dataset = io::read_dataset(&dataset)?;
            let report = report::build_report(&dataset, limit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Anomalies {
            dataset,
            threshold,
            limit,
        } => {
            let dataset = io::read_dataset(&dataset)?;
            let anomalies = anomaly::detect_fuel_anomalies(&dataset.vessels, threshold);

            if anomalies.is_empty() {
                println!("No voyages beyond {threshold} standard deviations.");
            } else {
                println!("Voyages by fuel efficiency outlier:");
                for entry in anomalies.iter().take(limit) {
                    println!(
                        "- #{} {} ({}, {}, {}) {:.3} L/km, z {:.2}, {:+.1}% vs type, {:+.1}% vs fleet",
                        entry.index,
                        entry.vessel_id,
                        entry.ship_type,
                        entry.route_id,
                        entry.month,
                        entry.fuel_efficiency,
                        entry.z_score,
                        entry.ship_type_deviation_pct,
                        entry.fleet_deviation_pct
                    );
                }
            }

            println!();
            println!("Fuel efficiency by ship type:");
            for stats in anomaly::efficiency_by_ship_type(&dataset.vessels) {
                println!(
                    "- {}: {} voyages, mean {:.3}, std {:.3}, range {:.3}-{:.3} L/km",
                    stats.ship_type, stats.count, stats.mean, stats.std, stats.min, stats.max
                );
            }

            println!();
            println!("Fuel efficiency by ship type and weather:");
            for entry in anomaly::efficiency_by_weather(&dataset.vessels) {
                println!(
                    "- {} / {}: {} voyages, mean {:.3} L/km",
                    entry.ship_type, entry.weather_conditions, entry.count, entry.mean
                );
            }

            print_flags(
                "Calm-weather voyages above 1.3x their type mean",
                &anomaly::calm_weather_overconsumption(&dataset.vessels),
                limit,
            );
            print_flags(
                "Voyages with engine efficiency below 75% and above-mean consumption",
                &anomaly::low_engine_overconsumption(&dataset.vessels),
                limit,
            );
        }
    }

    Ok(())
}

fn print_flags(title: &str, flags: &[EfficiencyFlag], limit: usize) {
    println!();
    println!("{title}: {}", flags.len());
    for flag in flags.iter().take(limit) {
        let engine = flag
            .engine_efficiency
            .map(|e| format!("{e:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "- #{} {} ({}, {}) {:.3} L/km vs mean {:.3}, engine {}",
            flag.index,
            flag.vessel_id,
            flag.ship_type,
            flag.route_id,
            flag.fuel_efficiency,
            flag.ship_type_mean,
            engine
        );
    }
}

fn voyage_at(dataset: &ComplianceDataset, index: usize) -> anyhow::Result<&EnrichedVoyageRecord> {
    dataset.vessels.get(index).with_context(|| {
        format!(
            "no voyage at index {index} (dataset has {})",
            dataset.vessels.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_uses_default_benchmark_settings() {
        let cli = Cli::try_parse_from(["fleet-compliance", "run", "--input", "voyages.csv"]).unwrap();
        match cli.command {
            Commands::Run {
                out,
                reduction,
                target_year,
                test_fraction,
                seed,
                ..
            } => {
                assert_eq!(out, PathBuf::from("compliance_data.json"));
                assert_eq!(test_fraction, 0.2);
                assert_eq!(reduction, 0.05);
                assert_eq!(target_year, 2026);
                assert_eq!(seed, 42);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_accepts_explicit_test_fraction() {
        let cli = Cli::try_parse_from([
            "fleet-compliance",
            "run",
            "--input",
            "voyages.csv",
            "--test-fraction",
            "0.25",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run { test_fraction, .. } if test_fraction == 0.25
        ));
    }

    #[test]
    fn test_fraction_reads_from_environment() {
        let cmd = <Cli as clap::CommandFactory>::command();
        let run = cmd.find_subcommand("run").unwrap();
        let arg = run
            .get_arguments()
            .find(|a| a.get_id() == "test_fraction")
            .unwrap();
        assert_eq!(
            arg.get_env(),
            Some(std::ffi::OsStr::new("COMPLIANCE_TEST_FRACTION"))
        );
    }

    #[test]
    fn pool_requires_both_indices() {
        assert!(Cli::try_parse_from([
            "fleet-compliance",
            "pool",
            "--dataset",
            "compliance_data.json",
            "--deficit",
            "4"
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "fleet-compliance",
            "-v",
            "pool",
            "--dataset",
            "compliance_data.json",
            "--deficit",
            "4",
            "--surplus",
            "9",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Commands::Pool {
                deficit: 4,
                surplus: 9,
                ..
            }
        ));
    }
}
