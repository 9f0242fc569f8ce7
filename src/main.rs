use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};

use case_registry::app::reconcile_use_case::{ReconcileRequest, ReconcileUseCase};
use case_registry::app::supplier_use_case::{SupplierRequest, SupplierUseCase};
use case_registry::config::Config;
use case_registry::domain::Channel;
use case_registry::error::SyncError;
use case_registry::infra::artifact_output_adapter::FsArtifactSink;
use case_registry::infra::json_table_adapter::JsonTableSource;
use case_registry::{logging, metrics};

#[derive(Parser)]
#[command(name = "case_registry")]
#[command(about = "Case registry reconciliation against channel extracts")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to $CASE_REGISTRY_CONFIG, then ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of the run's metrics here
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the registry against this run's channel extracts
    Reconcile {
        #[arg(long)]
        pisa: String,
        #[arg(long)]
        esm: String,
        #[arg(long)]
        pm7: String,
        #[arg(long)]
        rgpa: String,
        #[arg(long)]
        workon: Option<String>,
        /// Registry snapshot written by the previous run
        #[arg(long)]
        registry: String,
        /// Company code to region mapping table
        #[arg(long)]
        region_mapping: Option<String>,
        #[arg(long)]
        output: String,
        /// Run date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        run_date: Option<String>,
    },
    /// Classify incoming supplier requests as New or Hold
    Suppliers {
        #[arg(long)]
        incoming: String,
        #[arg(long)]
        reference: String,
        #[arg(long)]
        output: String,
    },
}

fn parse_run_date(raw: Option<&str>) -> Result<NaiveDate, SyncError> {
    match raw {
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|_| SyncError::InvalidRunDate(text.to_string())),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let result = run(cli.command, &config).await;

    if let Some(path) = &cli.metrics_out {
        metrics::write_snapshot(path)
            .with_context(|| format!("writing metrics snapshot to {}", path.display()))?;
    }

    if let Err(e) = &result {
        error!("Run failed: {:#}", e);
        println!("❌ Run failed: {:#}", e);
    }
    result
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Reconcile {
            pisa,
            esm,
            pm7,
            rgpa,
            workon,
            registry,
            region_mapping,
            output,
            run_date,
        } => {
            println!("🔄 Reconciling registry...");
            let run_date = parse_run_date(run_date.as_deref())?;

            let mut extracts = BTreeMap::new();
            extracts.insert(Channel::Pisa, pisa);
            extracts.insert(Channel::Esm, esm);
            extracts.insert(Channel::Pm7, pm7);
            extracts.insert(Channel::Rgpa, rgpa);
            if let Some(workon) = workon {
                extracts.insert(Channel::Workon, workon);
            }

            let request = ReconcileRequest {
                extracts,
                registry,
                region_mapping,
                output,
                run_date,
            };
            let use_case = ReconcileUseCase::new(Box::new(JsonTableSource), Box::new(FsArtifactSink));
            let report = use_case
                .execute(&request, config)
                .await
                .context("reconciliation run")?;
            info!("Reconciliation run {} finished", report.run_id);

            println!("\n📊 Registry Results ({}):", report.run_date);
            for channel in &report.channels {
                if channel.skipped {
                    println!("   {}: skipped", channel.channel);
                } else {
                    println!(
                        "   {}: {} rows ({} filtered out)",
                        channel.channel, channel.rows, channel.filtered_out
                    );
                }
            }
            let stats = &report.reconcile;
            println!("   Untouched: {}", stats.untouched);
            println!("   Reopened: {}", stats.reopened);
            println!("   Renewed: {}", stats.renewed);
            println!("   Needs review: {}", stats.needs_review);
            println!("   Inserted: {} (+{} without key)", stats.inserted, stats.keyless_inserted);
            println!("   Regions filled: {}", report.enrich.regions_filled);
            println!(
                "   Registry rows: {} -> {}",
                report.registry_rows_in, report.registry_rows_out
            );
            println!("   Output file: {}", request.output);
            if let Some(digest) = &report.output_sha256 {
                println!("   SHA-256: {}", digest);
            }

            if !report.warnings.is_empty() {
                println!("\n⚠️  Warnings:");
                for warning in &report.warnings {
                    println!("   - {}", warning);
                }
            }
            println!("✅ Registry reconciled");
        }
        Commands::Suppliers {
            incoming,
            reference,
            output,
        } => {
            println!("🔄 Classifying supplier requests...");
            let request = SupplierRequest {
                incoming,
                reference,
                output,
            };
            let use_case = SupplierUseCase::new(Box::new(JsonTableSource), Box::new(FsArtifactSink));
            let report = use_case
                .execute(&request, &config.supplier)
                .await
                .context("supplier classification")?;

            println!("\n📊 Supplier Results:");
            println!("   Classified: {}", report.classified);
            println!("   New: {}", report.new);
            println!("   Hold: {}", report.hold);
            println!("   Excluded by country: {}", report.excluded);
            println!("   Output file: {}", request.output);
            for warning in &report.warnings {
                println!("   ⚠️  {}", warning);
            }
            println!("✅ Supplier requests classified");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_date() {
        assert_eq!(
            parse_run_date(Some("2025-06-02")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
        assert!(matches!(
            parse_run_date(Some("06/02/2025")),
            Err(SyncError::InvalidRunDate(_))
        ));
        assert!(parse_run_date(None).is_ok());
    }
}
