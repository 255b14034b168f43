//! Read-only basket snapshots.

use crate::delta::TokenDelta;
use crate::{AccountId, Amount, Phase, SignedAmount, Timestamp, TokenId};

/// The basket's public state at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasketSnapshot {
    /// Time the snapshot was taken for
    pub timestamp: Timestamp,
    pub phase: Phase,
    /// Schedule cycle containing `timestamp`
    pub cycle: u64,
    pub total_supply: Amount,
    pub total_units: Amount,
    pub creation_unit: Vec<(TokenId, Amount)>,
    /// Frozen tokens, sorted
    pub skip_list: Vec<TokenId>,
    /// Best bidder and ratio (numerator, denominator)
    pub best_bid: Option<(AccountId, u128, u128)>,
    /// Deltas of the most recent proposal
    pub deltas: Vec<TokenDelta>,
    /// Bid collateral held in escrow while its token was paused
    #[cfg_attr(feature = "serde", serde(default))]
    pub unclaimed: Vec<(AccountId, TokenId, Amount)>,
}

impl BasketSnapshot {
    /// Quantity of `token` per natural unit.
    pub fn quantity(&self, token: TokenId) -> Amount {
        self.creation_unit
            .iter()
            .find(|(t, _)| *t == token)
            .map_or(0, |&(_, q)| q)
    }

    /// Per-unit delta for `token`, if it is part of the pending rebalance.
    pub fn delta(&self, token: TokenId) -> Option<SignedAmount> {
        self.deltas
            .iter()
            .find(|d| d.token == token)
            .map(|d| d.delta)
    }

    /// True while a rebalance is pending for the snapshot's cycle.
    pub fn rebalance_pending(&self) -> bool {
        self.phase != Phase::Open
    }
}
