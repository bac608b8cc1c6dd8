pub mod providers;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use claimflow_agent::{AdapterSettings, AutonomousAdapter};
use claimflow_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, Strategy};
use claimflow_core::records::CsvPolicyRecords;
use claimflow_core::{ClaimInfo, EngineSettings, WorkflowEngine, WorkflowOutcome};

use crate::providers::{HttpPriceDiscovery, JsonCorpusSearch, OpenAiChat};

#[derive(Debug, Parser)]
#[command(
    name = "claimflow",
    about = "Insurance claim decision workflow",
    long_about = "Process auto insurance claims through either a deterministic state graph \
                  or an autonomous tool-calling agent, producing a coverage decision with \
                  a full processing trace.",
    after_help = "Examples:\n  claimflow process --claim claim.json\n  claimflow process --claim claim.json --strategy agent\n  claimflow config"
)]
pub struct Cli {
    /// Path to a claimflow.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Process a claim file and print the coverage decision as JSON")]
    Process {
        /// Path to the claim JSON file.
        #[arg(long)]
        claim: PathBuf,
        /// Override the configured strategy (graph|agent).
        #[arg(long)]
        strategy: Option<Strategy>,
    },
    #[command(about = "Print the effective configuration with secrets redacted")]
    Config,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process { claim, strategy } => {
            let config = load_config(cli.config, strategy)?;
            init_logging(&config);
            process(&config, &claim).await
        }
        Command::Config => {
            let config = load_config(cli.config, None)?;
            println!("{}", render_config(&config));
            Ok(())
        }
    }
}

fn load_config(config_path: Option<PathBuf>, strategy: Option<Strategy>) -> Result<AppConfig> {
    let require_file = config_path.is_some();
    let config = AppConfig::load(LoadOptions {
        config_path,
        require_file,
        overrides: ConfigOverrides { strategy, ..ConfigOverrides::default() },
    })?;
    Ok(config)
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

async fn process(config: &AppConfig, claim_path: &PathBuf) -> Result<()> {
    let claim = read_claim(claim_path)?;

    let records = Arc::new(CsvPolicyRecords::new(&config.data.coverage_csv));
    let search = Arc::new(JsonCorpusSearch::open(&config.data.policy_corpus)?);
    let discovery = Arc::new(HttpPriceDiscovery::new(
        config.search.endpoint.clone(),
        config.search.timeout_secs,
    ));
    let reasoning = Arc::new(OpenAiChat::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.api_key.clone(),
        config.llm.timeout_secs,
    ));

    tracing::info!(
        claim_number = %claim.claim_number,
        strategy = ?config.pipeline.strategy,
        "processing claim"
    );

    let outcome: WorkflowOutcome = match config.pipeline.strategy {
        Strategy::Graph => {
            let engine = WorkflowEngine::new(
                records,
                search,
                discovery,
                reasoning,
                EngineSettings {
                    inflation_threshold: config.pipeline.inflation_threshold,
                    results_per_query: config.retrieval.results_per_query,
                    max_steps: config.pipeline.max_steps,
                },
            );
            engine.process_claim(claim).await?
        }
        Strategy::Agent => {
            let adapter = AutonomousAdapter::new(
                records,
                search,
                discovery,
                reasoning,
                AdapterSettings {
                    inflation_threshold: config.pipeline.inflation_threshold,
                    results_per_query: config.retrieval.results_per_query,
                    max_steps: config.pipeline.agent_max_steps,
                },
            );
            adapter.process_claim(claim).await?
        }
    };

    tracing::info!(
        claim_number = %outcome.decision.claim_number,
        covered = outcome.decision.covered,
        stages = outcome.trace.len(),
        "claim processed"
    );
    println!("{}", serde_json::to_string_pretty(&outcome.decision)?);
    Ok(())
}

fn read_claim(path: &PathBuf) -> Result<ClaimInfo> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read claim file {}", path.display()))?;
    let claim: ClaimInfo = serde_json::from_str(&raw)
        .with_context(|| format!("could not parse claim file {}", path.display()))?;
    claim
        .validate_shape()
        .map_err(|reason| anyhow::anyhow!("claim file {} is invalid: {reason}", path.display()))?;
    Ok(claim)
}

fn render_config(config: &AppConfig) -> String {
    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    format!(
        "[data]\n\
         coverage_csv = {:?}\n\
         policy_corpus = {:?}\n\n\
         [llm]\n\
         base_url = {:?}\n\
         model = {:?}\n\
         api_key = {api_key}\n\
         timeout_secs = {}\n\n\
         [search]\n\
         endpoint = {:?}\n\
         timeout_secs = {}\n\n\
         [retrieval]\n\
         results_per_query = {}\n\n\
         [pipeline]\n\
         strategy = {:?}\n\
         inflation_threshold = {}\n\
         max_steps = {}\n\
         agent_max_steps = {}\n\n\
         [logging]\n\
         level = {:?}\n\
         format = {:?}",
        config.data.coverage_csv,
        config.data.policy_corpus,
        config.llm.base_url,
        config.llm.model,
        config.llm.timeout_secs,
        config.search.endpoint,
        config.search.timeout_secs,
        config.retrieval.results_per_query,
        config.pipeline.strategy,
        config.pipeline.inflation_threshold,
        config.pipeline.max_steps,
        config.pipeline.agent_max_steps,
        config.logging.level,
        config.logging.format,
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use claimflow_core::config::AppConfig;

    use super::{read_claim, render_config};

    #[test]
    fn claim_file_round_trips_through_the_boundary_check() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"claim_number":"CLM-1","policy_number":"PN-1","claimant_name":"Jo",
                "date_of_loss":"2026-02-15","loss_description":"Fender bender",
                "estimated_repair_cost":1200.0}}"#
        )
        .expect("write claim");

        let claim = read_claim(&file.path().to_path_buf()).expect("claim should load");
        assert_eq!(claim.claim_number, "CLM-1");
        assert!(claim.vehicle_details.is_none());
    }

    #[test]
    fn malformed_claim_file_names_the_offending_field() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"claim_number":"CLM-1","policy_number":"PN-1","claimant_name":"Jo",
                "date_of_loss":"2026-02-15","loss_description":"Fender bender",
                "estimated_repair_cost":-5.0}}"#
        )
        .expect("write claim");

        let error = read_claim(&file.path().to_path_buf()).expect_err("negative cost must fail");
        assert!(error.to_string().contains("estimated_repair_cost"));
    }

    #[test]
    fn rendered_config_never_exposes_the_api_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-super-secret".to_string().into());

        let rendered = render_config(&config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("sk-super-secret"));
    }
}
