use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use dossier::config::{ClassifierKind, EngineConfig};
use dossier::dataset::BatchFile;
use dossier::environment::pipeline_config_from_env;
use dossier::logging::configure_logging;
use dossier::{Pipeline, TARGET_PIPELINE};

#[derive(Parser)]
#[clap(
    name = "dossier",
    about = "Validate news clusters and write an intelligence report for every story"
)]
struct Cli {
    /// Batch file holding clusters, articles and embeddings
    #[clap(short, long)]
    input: PathBuf,

    /// Where to write the JSON output (stdout when omitted)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Cluster classifier, overriding DOSSIER_CLASSIFIER
    #[clap(short, long, value_enum)]
    classifier: Option<ClassifierKind>,

    /// JSON array of canned model responses; replaces the configured LLM
    #[clap(long)]
    stub: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();
    let cli = Cli::parse();

    let mut config = pipeline_config_from_env()?;
    if let Some(classifier) = cli.classifier {
        config.validator.classifier = classifier;
    }
    if let Some(path) = &cli.stub {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stub responses {}", path.display()))?;
        let responses: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("Stub responses in {} are not a JSON string array", path.display()))?;
        config.engine = EngineConfig::Stub { responses };
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!(target: TARGET_PIPELINE, "Failed to listen for ctrl-c");
            return;
        }
        info!(target: TARGET_PIPELINE, "Interrupted, cancelling outstanding stories");
        let _ = cancel_tx.send(true);
    });

    let (source, store) = BatchFile::load(&cli.input).await?.into_sources();
    let pipeline = Pipeline::from_config(config).with_cancellation(cancel_rx);
    let output = pipeline.run(&source, &store).await?;

    let status = &output.intelligence_reports.processing_status;
    info!(
        target: TARGET_PIPELINE,
        "Finished: {} stories, {} succeeded, {} failed, {} clusters rejected",
        status.total_stories,
        status.completed_analyses,
        status.failed_analyses,
        output.validated_stories.rejected_clusters.len()
    );

    let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
    match &cli.output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_flag_parses_into_config_kind() {
        let cli = Cli::try_parse_from(["dossier", "--input", "batch.json", "--classifier", "llm"])
            .unwrap();
        assert_eq!(cli.classifier, Some(ClassifierKind::Llm));
        assert!(cli.output.is_none());

        let bad = Cli::try_parse_from(["dossier", "-i", "batch.json", "-c", "oracle"]);
        assert!(bad.is_err());
    }
}
