//! Rebalance state machine: Open -> OptOut -> Auction -> Settle -> Open.
//!
//! The phase is never stored. It is derived on every call from the schedule,
//! the time passed in, and whether a proposal exists for the cycle that time
//! falls in.

use rustc_hash::FxHashSet;

use crate::bank::TokenBank;
use crate::delta::PendingDelta;
use crate::error::{BasketError, Result};
use crate::escrow::{AuctionEscrow, Refund, Settlement};
use crate::schedule::{Schedule, Window};
use crate::{AccountId, Amount, Phase, Ratio, Timestamp, TokenId};

/// A rebalance proposal pinned to one cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proposal {
    pub cycle: u64,
    pub proposed_at: Timestamp,
    pub delta: PendingDelta,
}

#[derive(Clone, Debug)]
pub struct RebalanceCycle {
    schedule: Schedule,
    proposal: Option<Proposal>,
    escrow: AuctionEscrow,
}

impl RebalanceCycle {
    pub fn new(schedule: Schedule, escrow_account: AccountId) -> Self {
        Self {
            schedule,
            proposal: None,
            escrow: AuctionEscrow::new(escrow_account),
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn escrow(&self) -> &AuctionEscrow {
        &self.escrow
    }

    /// The most recent proposal, live or lapsed.
    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    /// The proposal driving the cycle at `now`, if one is live.
    pub fn live_proposal(&self, now: Timestamp) -> Option<&Proposal> {
        let proposal = self.proposal.as_ref()?;
        let same_cycle = proposal.cycle == self.schedule.cycle(now);
        let open = self.schedule.window(self.schedule.position(now)) != Window::Closed;
        (same_cycle && open && now >= proposal.proposed_at).then_some(proposal)
    }

    /// Phase at `now`.
    pub fn status(&self, now: Timestamp) -> Phase {
        if self.live_proposal(now).is_none() {
            return Phase::Open;
        }
        match self.schedule.window(self.schedule.position(now)) {
            Window::Lead => Phase::OptOut,
            Window::Auction => Phase::Auction,
            Window::Settle => Phase::Settle,
            Window::Closed => Phase::Open,
        }
    }

    /// Check that a proposal at `now` would leave a full opt-out window.
    pub fn ensure_can_propose(&self, now: Timestamp) -> Result<()> {
        let phase = self.status(now);
        if phase != Phase::Open || !self.schedule.can_propose_at(self.schedule.position(now)) {
            return Err(BasketError::PhaseViolation {
                operation: "propose_rebalance",
                phase,
            });
        }
        Ok(())
    }

    /// Refund owed to the bidder of a lapsed cycle.
    pub fn stale_refund(&self, bank: &TokenBank) -> Result<Refund> {
        self.escrow.refund(bank)
    }

    /// Pin `delta` to the cycle containing `now`.
    ///
    /// Callers must have executed the ops of [`stale_refund`](Self::stale_refund)
    /// in the same batch that validated the proposal, and pass its `held`
    /// part here.
    pub fn install(
        &mut self,
        now: Timestamp,
        delta: PendingDelta,
        held: &[(TokenId, Amount)],
    ) {
        self.escrow.retire(held);
        self.proposal = Some(Proposal {
            cycle: self.schedule.cycle(now),
            proposed_at: now,
            delta,
        });
    }

    /// Pay out collateral held for `owner` since its token was paused.
    pub fn claim_refund(
        &mut self,
        bank: &mut TokenBank,
        owner: AccountId,
        token: TokenId,
    ) -> Result<Amount> {
        self.escrow.claim(bank, owner, token)
    }

    /// Place a bid. Valid only during the auction window.
    #[allow(clippy::too_many_arguments)]
    pub fn bid(
        &mut self,
        bank: &mut TokenBank,
        now: Timestamp,
        spender: AccountId,
        bidder: AccountId,
        ratio: Ratio,
        total_units: Amount,
        skip: &FxHashSet<TokenId>,
    ) -> Result<()> {
        let phase = self.status(now);
        if phase != Phase::Auction {
            return Err(BasketError::PhaseViolation {
                operation: "bid",
                phase,
            });
        }
        let proposal = self.proposal.as_ref().ok_or(BasketError::NoBid)?;
        self.escrow
            .place(bank, spender, bidder, ratio, &proposal.delta, total_units, skip)
    }

    /// Settle the best bid. Valid only during the settle window.
    pub fn rebalance(
        &mut self,
        bank: &mut TokenBank,
        now: Timestamp,
        basket: AccountId,
        total_units: Amount,
        skip: &FxHashSet<TokenId>,
    ) -> Result<Settlement> {
        let phase = self.status(now);
        if phase != Phase::Settle {
            return Err(BasketError::PhaseViolation {
                operation: "rebalance",
                phase,
            });
        }
        let proposal = self.proposal.as_ref().ok_or(BasketError::NoBid)?;
        let settlement = self
            .escrow
            .settle(bank, basket, &proposal.delta, total_units, skip)?;
        self.proposal = None;
        Ok(settlement)
    }
}
