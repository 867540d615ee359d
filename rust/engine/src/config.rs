use std::fs;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{DealerStand, RuleSet};

pub const CONFIG_ENV: &str = "BLACKJACK_CONFIG";
pub const SEED_ENV: &str = "BLACKJACK_SEED";
pub const DECKS_ENV: &str = "BLACKJACK_DECKS";
pub const PENETRATION_ENV: &str = "BLACKJACK_PENETRATION";
pub const DEALER_STAND_ENV: &str = "BLACKJACK_DEALER_STAND";

/// Everything needed to open a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    pub rules: RuleSet,
    /// Percent of the shoe dealt before the cut card (0-100)
    pub penetration: f64,
    pub house_bankroll: i64,
    pub starting_bankroll: u64,
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            penetration: 75.0,
            house_bankroll: 1_000_000,
            starting_bankroll: 1_000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ConfigSources {
    pub deck_count: ValueSource,
    pub dealer_stand: ValueSource,
    pub penetration: ValueSource,
    pub seed: ValueSource,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            deck_count: ValueSource::Default,
            dealer_stand: ValueSource::Default,
            penetration: ValueSource::Default,
            seed: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: TableConfig,
    pub sources: ConfigSources,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parses and validates a TOML table description. Missing keys keep their
/// defaults.
pub fn from_toml_str(s: &str) -> Result<TableConfig, ConfigError> {
    let cfg: TableConfig = toml::from_str(s)?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load() -> Result<TableConfig, ConfigError> {
    load_with_sources().map(|resolved| resolved.config)
}

/// Defaults, then the file named by `BLACKJACK_CONFIG`, then environment
/// overrides.
pub fn load_with_sources() -> Result<ConfigResolved, ConfigError> {
    let mut cfg = TableConfig::default();
    let mut sources = ConfigSources::default();

    if let Some(path) = env_value(CONFIG_ENV) {
        let s = fs::read_to_string(path)?;
        let defaults = cfg.clone();
        cfg = toml::from_str(&s)?;
        if cfg.rules.deck_count != defaults.rules.deck_count {
            sources.deck_count = ValueSource::File;
        }
        if cfg.rules.dealer_stand != defaults.rules.dealer_stand {
            sources.dealer_stand = ValueSource::File;
        }
        if cfg.penetration != defaults.penetration {
            sources.penetration = ValueSource::File;
        }
        if cfg.seed.is_some() {
            sources.seed = ValueSource::File;
        }
    }

    if let Some(seed) = env_value(SEED_ENV) {
        cfg.seed = Some(
            seed.parse()
                .map_err(|_| ConfigError::Invalid("Invalid seed".into()))?,
        );
        sources.seed = ValueSource::Env;
    }
    if let Some(decks) = env_value(DECKS_ENV) {
        cfg.rules.deck_count = decks
            .parse()
            .map_err(|_| ConfigError::Invalid("Invalid deck count".into()))?;
        sources.deck_count = ValueSource::Env;
    }
    if let Some(pen) = env_value(PENETRATION_ENV) {
        cfg.penetration = pen
            .parse()
            .map_err(|_| ConfigError::Invalid("Invalid penetration".into()))?;
        sources.penetration = ValueSource::Env;
    }
    if let Some(stand) = env_value(DEALER_STAND_ENV) {
        cfg.rules.dealer_stand = match stand.to_ascii_lowercase().as_str() {
            "s17" => DealerStand::S17,
            "h17" => DealerStand::H17,
            _ => return Err(ConfigError::Invalid("Invalid dealer stand rule".into())),
        };
        sources.dealer_stand = ValueSource::Env;
    }

    validate(&cfg)?;
    Ok(ConfigResolved {
        config: cfg,
        sources,
    })
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn validate(cfg: &TableConfig) -> Result<(), ConfigError> {
    if !(1..=8).contains(&cfg.rules.deck_count) {
        return Err(ConfigError::Invalid("deck_count must be between 1 and 8".into()));
    }
    if !(0.0..=100.0).contains(&cfg.penetration) {
        return Err(ConfigError::Invalid("penetration must be within 0-100".into()));
    }
    if cfg.house_bankroll <= 0 {
        return Err(ConfigError::Invalid("house_bankroll must be >0".into()));
    }
    if cfg.starting_bankroll == 0 {
        return Err(ConfigError::Invalid("starting_bankroll must be >0".into()));
    }
    if cfg.rules.max_playable_hands == 0 {
        return Err(ConfigError::Invalid("max_playable_hands must be >=1".into()));
    }
    if cfg.rules.blackjack_payout.denominator == 0 {
        return Err(ConfigError::Invalid("blackjack_payout denominator must be >0".into()));
    }
    Ok(())
}
