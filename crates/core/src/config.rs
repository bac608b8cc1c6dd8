use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub retrieval: RetrievalConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    /// Policy coverage records (CSV).
    pub coverage_csv: PathBuf,
    /// Policy document corpus (JSON snippet file).
    pub policy_corpus: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Web-search endpoint for price discovery.
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub results_per_query: usize,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    pub inflation_threshold: f64,
    /// Step budget for the deterministic graph.
    pub max_steps: u32,
    /// Step budget for the autonomous agent loop.
    pub agent_max_steps: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Which execution strategy drives the claim workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Deterministic state graph with hard-coded branching.
    Graph,
    /// Autonomous tool-calling agent constrained by a system prompt.
    Agent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub coverage_csv: Option<PathBuf>,
    pub policy_corpus: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub log_level: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                coverage_csv: PathBuf::from("data/coverage_data.csv"),
                policy_corpus: PathBuf::from("data/policy_corpus.json"),
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                model: "llama3.1".to_string(),
                api_key: None,
                timeout_secs: 60,
            },
            search: SearchConfig {
                endpoint: "https://html.duckduckgo.com/html".to_string(),
                timeout_secs: 15,
            },
            retrieval: RetrievalConfig { results_per_query: 5 },
            pipeline: PipelineConfig {
                strategy: Strategy::Graph,
                inflation_threshold: 0.40,
                max_steps: 16,
                agent_max_steps: 12,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "graph" => Ok(Self::Graph),
            "agent" => Ok(Self::Agent),
            other => Err(ConfigError::Validation(format!(
                "unsupported pipeline strategy `{other}` (expected graph|agent)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("claimflow.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(coverage_csv) = data.coverage_csv {
                self.data.coverage_csv = coverage_csv;
            }
            if let Some(policy_corpus) = data.policy_corpus {
                self.data.policy_corpus = policy_corpus;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(search) = patch.search {
            if let Some(endpoint) = search.endpoint {
                self.search.endpoint = endpoint;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(results_per_query) = retrieval.results_per_query {
                self.retrieval.results_per_query = results_per_query;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(strategy) = pipeline.strategy {
                self.pipeline.strategy = strategy;
            }
            if let Some(inflation_threshold) = pipeline.inflation_threshold {
                self.pipeline.inflation_threshold = inflation_threshold;
            }
            if let Some(max_steps) = pipeline.max_steps {
                self.pipeline.max_steps = max_steps;
            }
            if let Some(agent_max_steps) = pipeline.agent_max_steps {
                self.pipeline.agent_max_steps = agent_max_steps;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLAIMFLOW_COVERAGE_CSV") {
            self.data.coverage_csv = PathBuf::from(value);
        }
        if let Some(value) = read_env("CLAIMFLOW_POLICY_CORPUS") {
            self.data.policy_corpus = PathBuf::from(value);
        }

        if let Some(value) = read_env("CLAIMFLOW_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CLAIMFLOW_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CLAIMFLOW_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("CLAIMFLOW_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CLAIMFLOW_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLAIMFLOW_SEARCH_ENDPOINT") {
            self.search.endpoint = value;
        }
        if let Some(value) = read_env("CLAIMFLOW_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("CLAIMFLOW_SEARCH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLAIMFLOW_RESULTS_PER_QUERY") {
            self.retrieval.results_per_query =
                parse_u64("CLAIMFLOW_RESULTS_PER_QUERY", &value)? as usize;
        }

        if let Some(value) = read_env("CLAIMFLOW_STRATEGY") {
            self.pipeline.strategy = value.parse()?;
        }
        if let Some(value) = read_env("CLAIMFLOW_INFLATION_THRESHOLD") {
            self.pipeline.inflation_threshold =
                parse_f64("CLAIMFLOW_INFLATION_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("CLAIMFLOW_MAX_STEPS") {
            self.pipeline.max_steps = parse_u32("CLAIMFLOW_MAX_STEPS", &value)?;
        }
        if let Some(value) = read_env("CLAIMFLOW_AGENT_MAX_STEPS") {
            self.pipeline.agent_max_steps = parse_u32("CLAIMFLOW_AGENT_MAX_STEPS", &value)?;
        }

        if let Some(value) = read_env("CLAIMFLOW_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CLAIMFLOW_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(coverage_csv) = overrides.coverage_csv {
            self.data.coverage_csv = coverage_csv;
        }
        if let Some(policy_corpus) = overrides.policy_corpus {
            self.data.policy_corpus = policy_corpus;
        }
        if let Some(strategy) = overrides.strategy {
            self.pipeline.strategy = strategy;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(llm_api_key.into());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
        }
        if self.llm.timeout_secs == 0 || self.llm.timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be in range 1..=300".to_string(),
            ));
        }
        if self.search.timeout_secs == 0 || self.search.timeout_secs > 120 {
            return Err(ConfigError::Validation(
                "search.timeout_secs must be in range 1..=120".to_string(),
            ));
        }
        if self.retrieval.results_per_query == 0 {
            return Err(ConfigError::Validation(
                "retrieval.results_per_query must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&self.pipeline.inflation_threshold) {
            return Err(ConfigError::Validation(
                "pipeline.inflation_threshold must be a fraction in range 0.0..=10.0".to_string(),
            ));
        }
        if self.pipeline.max_steps < 8 {
            return Err(ConfigError::Validation(
                "pipeline.max_steps must be at least 8 (the graph has 8 stages)".to_string(),
            ));
        }
        if self.pipeline.agent_max_steps == 0 {
            return Err(ConfigError::Validation(
                "pipeline.agent_max_steps must be greater than zero".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }

    /// True when the configured LLM endpoint requires an API key header.
    pub fn llm_api_key(&self) -> Option<&str> {
        self.llm.api_key.as_ref().map(|key| key.expose_secret())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("claimflow.toml"), PathBuf::from("config/claimflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    llm: Option<LlmPatch>,
    search: Option<SearchPatch>,
    retrieval: Option<RetrievalPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    coverage_csv: Option<PathBuf>,
    policy_corpus: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    results_per_query: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    strategy: Option<Strategy>,
    inflation_threshold: Option<f64>,
    max_steps: Option<u32>,
    agent_max_steps: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, Strategy};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_validate_cleanly() {
        let _guard = env_lock().lock().expect("env lock");
        let config = AppConfig::load(LoadOptions::default()).expect("defaults should load");
        assert_eq!(config.pipeline.strategy, Strategy::Graph);
        assert_eq!(config.pipeline.inflation_threshold, 0.40);
        assert!(matches!(config.logging.format, LogFormat::Compact));
    }

    #[test]
    fn file_values_are_applied_with_env_interpolation() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("TEST_CLAIMFLOW_MODEL", "gpt-4o-mini");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("claimflow.toml");
        fs::write(
            &path,
            r#"
[llm]
model = "${TEST_CLAIMFLOW_MODEL}"

[pipeline]
strategy = "agent"
inflation_threshold = 0.25
"#,
        )
        .expect("write config");

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .expect("config should load");

        clear_vars(&["TEST_CLAIMFLOW_MODEL"]);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.pipeline.strategy, Strategy::Agent);
        assert_eq!(config.pipeline.inflation_threshold, 0.25);
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("CLAIMFLOW_STRATEGY", "agent");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("claimflow.toml");
        fs::write(&path, "[pipeline]\nstrategy = \"graph\"\n").expect("write config");

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .expect("config should load");

        clear_vars(&["CLAIMFLOW_STRATEGY"]);
        assert_eq!(config.pipeline.strategy, Strategy::Agent);
    }

    #[test]
    fn programmatic_overrides_win_over_everything() {
        let _guard = env_lock().lock().expect("env lock");

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                strategy: Some(Strategy::Agent),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");

        assert_eq!(config.pipeline.strategy, Strategy::Agent);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn step_budget_below_the_stage_count_is_rejected() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("CLAIMFLOW_MAX_STEPS", "4");

        let error = AppConfig::load(LoadOptions::default()).expect_err("must reject tiny budget");
        clear_vars(&["CLAIMFLOW_MAX_STEPS"]);
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("max_steps")
        ));
    }

    #[test]
    fn unknown_strategy_is_an_actionable_error() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("CLAIMFLOW_STRATEGY", "magic");

        let error = AppConfig::load(LoadOptions::default()).expect_err("must reject strategy");
        clear_vars(&["CLAIMFLOW_STRATEGY"]);
        assert!(error.to_string().contains("expected graph|agent"));
    }
}
