//! Configuration management

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::application::errors::ConfigError;
use crate::domain::entities::OperatorSet;
use crate::infrastructure::resolver::{DEFAULT_SOURCES, DEFAULT_TIMEOUT_SECS};

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    /// Telegram user ids allowed to run privileged commands; also the
    /// recipients of diagnostic broadcasts. Must be non-empty.
    #[serde(deserialize_with = "de_id_list")]
    pub operators: Vec<String>,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Optional http(s) proxy URL for all Bot API traffic
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            sources: default_sources(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "ipsentry".to_string(),
            },
            telegram: TelegramConfig {
                token: None,
                proxy: None,
            },
            operators: Vec::new(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Operator ids are strings internally, but YAML authors write Telegram
/// ids as bare numbers; accept both.
fn de_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Num(i64),
        Text(String),
    }

    let ids = Vec::<Id>::deserialize(deserializer)?;
    Ok(ids
        .into_iter()
        .map(|id| match id {
            Id::Num(n) => n.to_string(),
            Id::Text(s) => s,
        })
        .collect())
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.telegram.token = Some(token);
        }
        if let Ok(proxy) = std::env::var("BOT_PROXY") {
            config.telegram.proxy = Some(proxy);
        }
        if let Ok(operators) = std::env::var("BOT_OPERATORS") {
            config.operators = operators
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
        }

        config
    }

    /// Validate the operator list into the immutable set shared with the
    /// gate and the reporter
    pub fn operator_set(&self) -> Result<OperatorSet, ConfigError> {
        OperatorSet::new(self.operators.iter().cloned())
    }

    /// Default config rendered as YAML, for `init-config`
    pub fn default_yaml() -> String {
        let mut config = Config::default();
        config.operators = vec!["123456789".to_string()];
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
