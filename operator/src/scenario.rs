//! Scenario scripts (scenario.json) loading and validation.
//!
//! A scenario is a list of timed steps. Each step names one basket entry
//! point and, optionally, a fragment of the error message it is expected
//! to fail with.

use std::path::Path;

use nanobskt::{Amount, Timestamp, TokenId};
use serde::Deserialize;

use crate::config::parse_token;
use crate::error::{Error, Result};

/// A scripted sequence of basket calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

/// One basket call at time `at`.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at: Timestamp,
    pub action: Action,
    /// Fragment of the expected error message; `""` accepts any error.
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// Basket entry points, keyed by snake_case name in JSON.
///
/// Accounts are plain integers and tokens are tickers of at most 8 bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Issue {
        caller: u64,
        amount: Amount,
    },
    Redeem {
        caller: u64,
        amount: Amount,
        #[serde(default)]
        override_skip: Vec<String>,
    },
    ReportFrozen {
        caller: u64,
        token: String,
    },
    Propose {
        caller: u64,
    },
    Bid {
        bidder: u64,
        numerator: u128,
        denominator: u128,
    },
    Rebalance,
    ClaimRefund {
        caller: u64,
        token: String,
    },
    RegistrySet {
        caller: u64,
        index: usize,
        token: String,
        quantity: Amount,
    },
    RegistryBatchSet {
        caller: u64,
        tokens: Vec<String>,
        quantities: Vec<Amount>,
    },
    RegistryRemove {
        caller: u64,
        token: String,
    },
    RegistrySetFrozen {
        caller: u64,
        tokens: Vec<String>,
    },
    RegistryWithdraw {
        caller: u64,
        token: String,
        amount: Amount,
    },
    RegistryGet {
        caller: u64,
        token: String,
    },
    RegistryGetQuantities {
        caller: u64,
        tokens: Vec<String>,
    },
    RegistryGetAll {
        caller: u64,
    },
    ListToken {
        token: String,
    },
    Mint {
        token: String,
        to: u64,
        amount: Amount,
    },
    Approve {
        token: String,
        owner: u64,
        spender: u64,
        amount: Amount,
    },
    Pause {
        token: String,
    },
    Unpause {
        token: String,
    },
}

impl Action {
    /// Short name used in the audit trail.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Issue { .. } => "issue",
            Action::Redeem { .. } => "redeem",
            Action::ReportFrozen { .. } => "report_frozen",
            Action::Propose { .. } => "propose",
            Action::Bid { .. } => "bid",
            Action::Rebalance => "rebalance",
            Action::ClaimRefund { .. } => "claim_refund",
            Action::RegistrySet { .. } => "registry_set",
            Action::RegistryBatchSet { .. } => "registry_batch_set",
            Action::RegistryRemove { .. } => "registry_remove",
            Action::RegistrySetFrozen { .. } => "registry_set_frozen",
            Action::RegistryWithdraw { .. } => "registry_withdraw",
            Action::RegistryGet { .. } => "registry_get",
            Action::RegistryGetQuantities { .. } => "registry_get_quantities",
            Action::RegistryGetAll { .. } => "registry_get_all",
            Action::ListToken { .. } => "list_token",
            Action::Mint { .. } => "mint",
            Action::Approve { .. } => "approve",
            Action::Pause { .. } => "pause",
            Action::Unpause { .. } => "unpause",
        }
    }

    /// Every ticker the action mentions.
    pub fn tickers(&self) -> Vec<&str> {
        match self {
            Action::Redeem { override_skip, .. } => {
                override_skip.iter().map(String::as_str).collect()
            }
            Action::RegistryBatchSet { tokens, .. }
            | Action::RegistrySetFrozen { tokens, .. }
            | Action::RegistryGetQuantities { tokens, .. } => {
                tokens.iter().map(String::as_str).collect()
            }
            Action::ReportFrozen { token, .. }
            | Action::ClaimRefund { token, .. }
            | Action::RegistrySet { token, .. }
            | Action::RegistryRemove { token, .. }
            | Action::RegistryWithdraw { token, .. }
            | Action::RegistryGet { token, .. }
            | Action::ListToken { token }
            | Action::Mint { token, .. }
            | Action::Approve { token, .. }
            | Action::Pause { token }
            | Action::Unpause { token } => vec![token.as_str()],
            Action::Issue { .. }
            | Action::Propose { .. }
            | Action::Bid { .. }
            | Action::Rebalance
            | Action::RegistryGetAll { .. } => Vec::new(),
        }
    }
}

/// Convert a ticker that already passed scenario validation.
pub(crate) fn token(symbol: &str) -> Result<TokenId> {
    parse_token(symbol).map_err(Error::Scenario)
}

/// Convert a list of tickers.
pub(crate) fn tokens(symbols: &[String]) -> Result<Vec<TokenId>> {
    symbols.iter().map(|s| token(s)).collect()
}

impl Scenario {
    /// Load and validate a scenario.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ScenarioRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Validate the scenario.
    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Scenario("steps list is empty".into()));
        }

        // Time never runs backwards
        for (i, pair) in self.steps.windows(2).enumerate() {
            if pair[1].at < pair[0].at {
                return Err(Error::Scenario(format!(
                    "step {} at {} is earlier than step {} at {}",
                    i + 1,
                    pair[1].at,
                    i,
                    pair[0].at
                )));
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            for ticker in step.action.tickers() {
                parse_token(ticker)
                    .map_err(|e| Error::Scenario(format!("step {i}: {e}")))?;
            }
        }

        Ok(())
    }

    /// Time of the last step.
    pub fn end(&self) -> Timestamp {
        self.steps.last().map_or(0, |s| s.at)
    }
}
