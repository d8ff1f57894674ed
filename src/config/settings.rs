use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const MODEL_KEY_VAR: &str = "OPENAI_API_KEY";
pub const WEATHER_KEY_VAR: &str = "OPENWEATHER_API_KEY";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a flood and disaster information assistant for Indonesia. \
Use the available tools to look up water levels, pump stations, earthquakes, crowd-sourced \
flood reports, weather and locations before answering. Ground every statement in tool results \
and name the sources you used. If a tool fails, say what could not be checked instead of guessing. \
Use send_notification only for conditions that put people at risk.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool round trips allowed per chat message
    pub max_iterations: usize,
    pub max_concurrency: usize,
    /// Extra model exchanges attempted after a failed one
    pub model_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ProviderConfig {
    fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub water_level: ProviderConfig,
    pub pumps: ProviderConfig,
    pub seismic: ProviderConfig,
    pub crowd_reports: ProviderConfig,
    pub weather: ProviderConfig,
    pub geocode: ProviderConfig,
    pub notification: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LLMConfig {
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                max_tokens: 1024,
                temperature: 0.2,
                timeout_ms: 30_000,
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
            agent: AgentConfig {
                max_iterations: 5,
                max_concurrency: 6,
                model_retries: 1,
            },
            tools: ToolsConfig { max_retries: 1 },
            providers: ProvidersConfig {
                water_level: ProviderConfig::new("http://127.0.0.1:8600", 8_000),
                pumps: ProviderConfig::new("http://127.0.0.1:8600", 8_000),
                seismic: ProviderConfig::new("https://data.bmkg.go.id/DataMKG/TEWS", 8_000),
                crowd_reports: ProviderConfig::new("https://data.petabencana.id", 15_000),
                weather: ProviderConfig::new("https://api.openweathermap.org/data/2.5", 8_000),
                geocode: ProviderConfig::new("https://api.openweathermap.org/geo/1.0", 5_000),
                notification: ProviderConfig::new("", 2_000),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Defaults, then `config/{CONFIG_ENV}.toml` if present, then `APP__*` variables
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with one explicit file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()).required(true))
            .build()?
            .try_deserialize()
    }
}

/// Secrets read from the environment only, never from config files
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub model_api_key: Option<String>,
    pub weather_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            model_api_key: read_secret(MODEL_KEY_VAR),
            weather_api_key: read_secret(WEATHER_KEY_VAR),
        }
    }

    /// Names of the required variables that are absent
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.model_api_key.is_none() {
            missing.push(MODEL_KEY_VAR.to_string());
        }
        if self.weather_api_key.is_none() {
            missing.push(WEATHER_KEY_VAR.to_string());
        }
        missing
    }
}

fn read_secret(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}
