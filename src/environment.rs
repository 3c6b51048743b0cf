use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{ClassifierKind, EngineConfig, PipelineConfig};

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>`
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reads and parses `var`, falling back to `default` when it is unset.
/// A value that is set but does not parse is an error rather than silently ignored.
fn parse_env<T: FromStr>(var: &str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} has an invalid value: {}", var, raw)),
        _ => Ok(default),
    }
}

/// Builds the pipeline configuration from the process environment.
///
/// Only the binary calls this; library code always receives an explicit
/// [`PipelineConfig`].
///
/// - `DOSSIER_MIN_ARTICLES` (default 2)
/// - `DOSSIER_CLASSIFIER`: `heuristic` or `llm` (default `heuristic`)
/// - `DOSSIER_MAX_CONCURRENCY` (default 4)
/// - `DOSSIER_STORY_TIMEOUT_SECS` (default 180)
/// - `DOSSIER_MAX_RETRIES` (default 3)
/// - `DOSSIER_LLM_TYPE`: `ollama`, `openai` or `stub` (default `ollama`)
/// - `DOSSIER_MODEL` (default `llama3`), `DOSSIER_TEMPERATURE` (default 0.0)
/// - `OLLAMA_HOST` (default `http://localhost`), `OLLAMA_PORT` (default 11434)
/// - `OPENAI_API_KEY`: required when the LLM type is `openai`
/// - `DOSSIER_STUB_RESPONSES`: `;`-separated scripted replies for the stub engine
pub fn pipeline_config_from_env() -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();

    config.validator.min_articles =
        parse_env("DOSSIER_MIN_ARTICLES", config.validator.min_articles)?;
    config.validator.classifier = match env::var("DOSSIER_CLASSIFIER")
        .unwrap_or_else(|_| "heuristic".to_string())
        .to_lowercase()
        .as_str()
    {
        "llm" => ClassifierKind::Llm,
        "heuristic" => ClassifierKind::Heuristic,
        other => return Err(anyhow!("DOSSIER_CLASSIFIER has an invalid value: {}", other)),
    };

    config.orchestrator.max_concurrency =
        parse_env("DOSSIER_MAX_CONCURRENCY", config.orchestrator.max_concurrency)?;
    config.orchestrator.per_story_timeout = Duration::from_secs(parse_env(
        "DOSSIER_STORY_TIMEOUT_SECS",
        config.orchestrator.per_story_timeout.as_secs(),
    )?);
    config.orchestrator.max_retries =
        parse_env("DOSSIER_MAX_RETRIES", config.orchestrator.max_retries)?;

    let model = env::var("DOSSIER_MODEL").unwrap_or_else(|_| "llama3".to_string());
    let temperature: f32 = parse_env("DOSSIER_TEMPERATURE", 0.0)?;

    config.engine = match env::var("DOSSIER_LLM_TYPE")
        .unwrap_or_else(|_| "ollama".to_string())
        .to_lowercase()
        .as_str()
    {
        "openai" => EngineConfig::OpenAI {
            api_key: env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("OPENAI_API_KEY environment variable must be set"))?,
            model,
            temperature,
        },
        "stub" => EngineConfig::Stub {
            responses: get_env_var_as_vec("DOSSIER_STUB_RESPONSES", ';'),
        },
        _ => EngineConfig::Ollama {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".to_string()),
            port: parse_env("OLLAMA_PORT", 11434)?,
            model,
            temperature,
        },
    };

    Ok(config)
}
