//! Event log for deterministic replay.
//!
//! Every accepted input to the basket is recorded as an event. A call that
//! fails changes nothing and is not recorded, so replaying the log against
//! the same config succeeds step for step and rebuilds identical state.

use crate::{AccountId, Amount, Timestamp, TokenId};
#[cfg(feature = "event-log")]
use crate::{Basket, BasketConfig, Result};

/// An input that can be applied to a basket.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    Issue {
        caller: AccountId,
        amount: Amount,
        at: Timestamp,
    },
    Redeem {
        caller: AccountId,
        amount: Amount,
        override_skip: Vec<TokenId>,
        at: Timestamp,
    },
    ReportFrozenToken {
        caller: AccountId,
        token: TokenId,
    },
    ProposeRebalance {
        caller: AccountId,
        at: Timestamp,
    },
    Bid {
        bidder: AccountId,
        numerator: u128,
        denominator: u128,
        at: Timestamp,
    },
    Rebalance {
        at: Timestamp,
    },
    ClaimRefund {
        caller: AccountId,
        token: TokenId,
    },
    RegistrySet {
        caller: AccountId,
        index: usize,
        token: TokenId,
        quantity: Amount,
    },
    RegistryBatchSet {
        caller: AccountId,
        tokens: Vec<TokenId>,
        quantities: Vec<Amount>,
    },
    RegistryRemove {
        caller: AccountId,
        token: TokenId,
    },
    RegistrySetFrozen {
        caller: AccountId,
        tokens: Vec<TokenId>,
    },
    RegistryWithdraw {
        caller: AccountId,
        token: TokenId,
        amount: Amount,
    },
    /// Fee-gated reads are recorded because they move the fee.
    RegistryGet {
        caller: AccountId,
        token: TokenId,
    },
    RegistryGetQuantities {
        caller: AccountId,
        tokens: Vec<TokenId>,
    },
    RegistryGetAll {
        caller: AccountId,
    },
    ListToken {
        token: TokenId,
    },
    MintUnderlying {
        token: TokenId,
        to: AccountId,
        amount: Amount,
    },
    ApproveUnderlying {
        token: TokenId,
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
    },
    SetTokenPaused {
        token: TokenId,
        paused: bool,
    },
}

impl Event {
    /// Wall-clock time carried by time-gated events.
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Event::Issue { at, .. }
            | Event::Redeem { at, .. }
            | Event::ProposeRebalance { at, .. }
            | Event::Bid { at, .. }
            | Event::Rebalance { at } => Some(*at),
            _ => None,
        }
    }
}

#[cfg(feature = "event-log")]
impl Basket {
    /// Apply a single event.
    ///
    /// The event goes through the same entry point as a direct call and is
    /// recorded if it succeeds.
    pub fn apply(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Issue { caller, amount, at } => self.issue(*caller, *amount, *at),
            Event::Redeem {
                caller,
                amount,
                override_skip,
                at,
            } => self.redeem(*caller, *amount, override_skip, *at),
            Event::ReportFrozenToken { caller, token } => {
                self.report_frozen_token(*caller, *token).map(|_| ())
            }
            Event::ProposeRebalance { caller, at } => self.propose_rebalance(*caller, *at),
            Event::Bid {
                bidder,
                numerator,
                denominator,
                at,
            } => self.bid(*bidder, *numerator, *denominator, *at),
            Event::Rebalance { at } => self.rebalance(*at).map(|_| ()),
            Event::ClaimRefund { caller, token } => {
                self.claim_refund(*caller, *token).map(|_| ())
            }
            Event::RegistrySet {
                caller,
                index,
                token,
                quantity,
            } => self.registry_set(*caller, *index, *token, *quantity),
            Event::RegistryBatchSet {
                caller,
                tokens,
                quantities,
            } => self.registry_batch_set(*caller, tokens, quantities),
            Event::RegistryRemove { caller, token } => {
                self.registry_remove(*caller, *token).map(|_| ())
            }
            Event::RegistrySetFrozen { caller, tokens } => {
                self.registry_set_frozen(*caller, tokens)
            }
            Event::RegistryWithdraw {
                caller,
                token,
                amount,
            } => self.registry_withdraw(*caller, *token, *amount),
            Event::RegistryGet { caller, token } => {
                self.registry_get(*caller, *token).map(|_| ())
            }
            Event::RegistryGetQuantities { caller, tokens } => {
                self.registry_get_quantities(*caller, tokens).map(|_| ())
            }
            Event::RegistryGetAll { caller } => self.registry_get_all(*caller).map(|_| ()),
            Event::ListToken { token } => {
                self.list_token(*token);
                Ok(())
            }
            Event::MintUnderlying { token, to, amount } => {
                self.mint_underlying(*token, *to, *amount)
            }
            Event::ApproveUnderlying {
                token,
                owner,
                spender,
                amount,
            } => self.approve_underlying(*token, *owner, *spender, *amount),
            Event::SetTokenPaused { token, paused } => self.set_token_paused(*token, *paused),
        }
    }

    /// Apply events in order, stopping at the first failure.
    pub fn apply_all(&mut self, events: &[Event]) -> Result<()> {
        events.iter().try_for_each(|e| self.apply(e))
    }

    /// Rebuild a basket from `config` and a recorded log.
    ///
    /// A recorded log only holds accepted inputs, so any failure here means
    /// the log does not belong to this config.
    pub fn replay(config: BasketConfig, events: &[Event]) -> Result<Self> {
        let mut basket = Self::new(config)?;
        basket.apply_all(events)?;
        Ok(basket)
    }

    /// Get all recorded events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Clear the event log.
    ///
    /// Useful after persisting events to external storage.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Time of the latest time-gated event, if any.
    pub fn last_event_time(&self) -> Option<Timestamp> {
        self.events.iter().rev().find_map(Event::timestamp)
    }
}
