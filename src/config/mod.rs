mod settings;

pub use settings::{
    AgentConfig, Credentials, LLMConfig, LoggingConfig, ProviderConfig, ProvidersConfig, Settings,
    ToolsConfig, MODEL_KEY_VAR, WEATHER_KEY_VAR,
};
