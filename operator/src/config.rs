//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use nanobskt::{AccountId, Amount, BasketConfig, Schedule, TokenId};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub basket: BasketSection,
    pub schedule: ScheduleConfig,
    pub registry: RegistryConfig,
    pub accounts: AccountsConfig,
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasketSection {
    pub symbol: String,
    #[serde(default = "default_natural_unit")]
    pub natural_unit: Amount,
    /// `[numerator, denominator]`
    #[serde(default = "default_max_bid_ratio")]
    pub max_bid_ratio: [u128; 2],
}

fn default_natural_unit() -> Amount {
    1
}
fn default_max_bid_ratio() -> [u128; 2] {
    [2, 1]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub period: u64,
    #[serde(default)]
    pub phase_offset: u64,
    pub opt_out_duration: u64,
    pub auction_offset: u64,
    pub auction_duration: u64,
    pub settle_duration: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub data_manager: u64,
    pub fee_token: String,
    #[serde(default)]
    pub fee_amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    pub basket: u64,
    pub escrow: u64,
    pub registry: u64,
}

/// One entry of the initial creation unit.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub quantity: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
    #[serde(default = "default_events_file")]
    pub events_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
            events_file: default_events_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}
fn default_events_file() -> String {
    "events.jsonl".into()
}

/// Parse a ticker, rejecting empty or over-long symbols.
pub(crate) fn parse_token(symbol: &str) -> std::result::Result<TokenId, String> {
    if symbol.is_empty() {
        return Err("empty symbol".into());
    }
    TokenId::try_new(symbol).ok_or_else(|| format!("symbol '{symbol}' exceeds 8 bytes"))
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse from a TOML string (useful for testing).
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        parse_token(&self.basket.symbol).map_err(Error::Config)?;
        parse_token(&self.registry.fee_token).map_err(Error::Config)?;
        if self.tokens.is_empty() {
            return Err(Error::Config("at least one [[tokens]] entry is required".into()));
        }
        let mut seen = FxHashSet::default();
        for t in &self.tokens {
            parse_token(&t.symbol).map_err(Error::Config)?;
            if !seen.insert(t.symbol.as_str()) {
                return Err(Error::Config(format!("duplicate token: {}", t.symbol)));
            }
        }
        // Everything else is checked by the basket itself.
        self.basket_config()?
            .validate()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Build the basket's static configuration.
    pub fn basket_config(&self) -> Result<BasketConfig> {
        let token = |s: &str| parse_token(s).map_err(Error::Config);
        let s = &self.schedule;
        let [numerator, denominator] = self.basket.max_bid_ratio;
        Ok(BasketConfig {
            symbol: token(&self.basket.symbol)?,
            natural_unit: self.basket.natural_unit,
            max_bid_ratio: (numerator, denominator),
            schedule: Schedule {
                period: s.period,
                phase_offset: s.phase_offset,
                opt_out_duration: s.opt_out_duration,
                auction_offset: s.auction_offset,
                auction_duration: s.auction_duration,
                settle_duration: s.settle_duration,
            },
            basket_account: AccountId(self.accounts.basket),
            escrow_account: AccountId(self.accounts.escrow),
            registry_account: AccountId(self.accounts.registry),
            data_manager: AccountId(self.registry.data_manager),
            fee_token: token(&self.registry.fee_token)?,
            fee_amount: self.registry.fee_amount,
            creation_unit: self
                .tokens
                .iter()
                .map(|t| -> Result<(TokenId, Amount)> { Ok((token(&t.symbol)?, t.quantity)) })
                .collect::<Result<_>>()?,
        })
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Full path to the basket's event log.
    pub fn events_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.events_file)
    }
}
