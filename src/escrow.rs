//! Single-slot auction escrow and bid evaluation.
//!
//! Only the current best bid is ever escrowed. A strictly better bid pulls
//! its delivery into the escrow account and refunds the previous bidder in
//! the same atomic batch.
//!
//! A paused token cannot move, so collateral in a paused token is never
//! part of a refund batch. It stays in the escrow account, owed to its
//! bidder, until [`AuctionEscrow::claim`] runs after the token unpauses.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::bank::{LedgerOp, TokenBank};
use crate::delta::PendingDelta;
use crate::error::{BasketError, Result};
use crate::unit::CreationUnit;
use crate::{AccountId, Amount, Ratio, SignedAmount, TokenId};

/// The escrowed best bid.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bid {
    pub bidder: AccountId,
    pub ratio: Ratio,
    /// Candidate per-unit quantity for every token in the pending delta.
    pub quantities: Vec<(TokenId, Amount)>,
    /// Amounts pulled from the bidder and held in escrow.
    pub escrowed: Vec<(TokenId, Amount)>,
    /// Tokens on the skip-list when the bid was placed.
    pub excluded: Vec<TokenId>,
}

impl Bid {
    /// Escrowed amount of `token` (zero if none).
    pub fn escrowed_amount(&self, token: TokenId) -> Amount {
        self.escrowed
            .iter()
            .find(|(t, _)| *t == token)
            .map_or(0, |&(_, a)| a)
    }
}

/// Outcome of a settled auction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub bid: Bid,
    pub creation_unit: CreationUnit,
    /// Tokens that kept their current quantity because they were frozen.
    pub skipped: Vec<TokenId>,
    /// Collateral of skipped tokens left in escrow for the bidder to claim.
    pub held: Vec<(TokenId, Amount)>,
}

/// Collateral owed back to a bidder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Refund {
    /// Transfers that can run now.
    pub ops: Vec<LedgerOp>,
    /// Amounts in paused tokens, left in escrow.
    pub held: Vec<(TokenId, Amount)>,
}

/// `current + floor(ratio * (target - current))` for every delta entry.
///
/// Fails with `Overdraw` if any candidate is negative.
pub fn candidate_quantities(delta: &PendingDelta, ratio: Ratio) -> Result<Vec<(TokenId, Amount)>> {
    delta
        .entries()
        .iter()
        .map(|e| {
            let current = SignedAmount::try_from(e.current).map_err(|_| BasketError::Overflow)?;
            let candidate = ratio
                .floor_mul(e.delta)
                .and_then(|step| current.checked_add(step))
                .ok_or(BasketError::Overflow)?;
            let quantity = Amount::try_from(candidate).map_err(|_| BasketError::Overdraw {
                token: e.token,
                candidate,
            })?;
            Ok((e.token, quantity))
        })
        .collect()
}

/// Holds the collateral of the best bid for the current auction.
#[derive(Clone, Debug)]
pub struct AuctionEscrow {
    account: AccountId,
    best: Option<Bid>,
    unclaimed: FxHashMap<(AccountId, TokenId), Amount>,
}

impl AuctionEscrow {
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            best: None,
            unclaimed: FxHashMap::default(),
        }
    }

    /// Ledger account holding escrowed collateral.
    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn best(&self) -> Option<&Bid> {
        self.best.as_ref()
    }

    /// Evaluate and escrow a bid.
    ///
    /// `spender` is the account the bidder approved. On success the bid
    /// becomes the best bid and the previous one has been refunded.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        bank: &mut TokenBank,
        spender: AccountId,
        bidder: AccountId,
        ratio: Ratio,
        delta: &PendingDelta,
        total_units: Amount,
        skip: &FxHashSet<TokenId>,
    ) -> Result<()> {
        if let Some(best) = &self.best {
            if ratio <= best.ratio {
                return Err(BasketError::BidNotImproved {
                    offered: ratio,
                    best: best.ratio,
                });
            }
        }

        let quantities = candidate_quantities(delta, ratio)?;
        let mut escrowed = Vec::new();
        for (entry, &(token, candidate)) in delta.entries().iter().zip(&quantities) {
            if candidate <= entry.current || skip.contains(&token) {
                continue;
            }
            let amount = (candidate - entry.current)
                .checked_mul(total_units)
                .ok_or(BasketError::Overflow)?;
            escrowed.push((token, amount));
        }

        let refund = self.refund(bank)?;
        let mut ops = refund.ops;
        ops.extend(escrowed.iter().map(|&(token, amount)| LedgerOp::TransferFrom {
            token,
            spender,
            owner: bidder,
            to: self.account,
            amount,
        }));
        bank.execute(&ops)?;
        self.retire(&refund.held);

        let mut excluded: Vec<TokenId> = skip.iter().copied().collect();
        excluded.sort_unstable();
        self.best = Some(Bid {
            bidder,
            ratio,
            quantities,
            escrowed,
            excluded,
        });
        Ok(())
    }

    /// Refund of the best bid's collateral to its bidder.
    pub fn refund(&self, bank: &TokenBank) -> Result<Refund> {
        match &self.best {
            Some(bid) => self.split_refund(bank, bid.bidder, &bid.escrowed),
            None => Ok(Refund::default()),
        }
    }

    fn split_refund(
        &self,
        bank: &TokenBank,
        bidder: AccountId,
        amounts: &[(TokenId, Amount)],
    ) -> Result<Refund> {
        let mut refund = Refund::default();
        for &(token, amount) in amounts {
            if amount == 0 {
                continue;
            }
            if bank.is_paused(token)? {
                refund.held.push((token, amount));
            } else {
                refund.ops.push(LedgerOp::Transfer {
                    token,
                    from: self.account,
                    to: bidder,
                    amount,
                });
            }
        }
        Ok(refund)
    }

    /// Drop the best bid, keeping `held` owed to its bidder.
    ///
    /// Callers must have executed the matching [`refund`](Self::refund)
    /// ops first.
    pub fn retire(&mut self, held: &[(TokenId, Amount)]) -> Option<Bid> {
        let bid = self.best.take()?;
        for &(token, amount) in held {
            self.hold(bid.bidder, token, amount);
        }
        Some(bid)
    }

    // bounded by the escrow account's balance, so the sum cannot overflow
    fn hold(&mut self, owner: AccountId, token: TokenId, amount: Amount) {
        *self.unclaimed.entry((owner, token)).or_insert(0) += amount;
    }

    /// Collateral in `token` held for `owner`.
    pub fn unclaimed(&self, owner: AccountId, token: TokenId) -> Amount {
        self.unclaimed.get(&(owner, token)).copied().unwrap_or(0)
    }

    /// Every held refund, sorted by owner then token.
    pub fn unclaimed_refunds(&self) -> Vec<(AccountId, TokenId, Amount)> {
        let mut refunds: Vec<_> = self
            .unclaimed
            .iter()
            .map(|(&(owner, token), &amount)| (owner, token, amount))
            .collect();
        refunds.sort_unstable();
        refunds
    }

    /// Pay out a held refund. Fails with `TokenPaused` while the token is
    /// still paused, leaving the refund held.
    pub fn claim(
        &mut self,
        bank: &mut TokenBank,
        owner: AccountId,
        token: TokenId,
    ) -> Result<Amount> {
        let amount = self.unclaimed(owner, token);
        if amount == 0 {
            return Err(BasketError::NothingToClaim { owner, token });
        }
        bank.execute(&[LedgerOp::Transfer {
            token,
            from: self.account,
            to: owner,
            amount,
        }])?;
        self.unclaimed.remove(&(owner, token));
        Ok(amount)
    }

    /// Execute the best bid against basket holdings.
    ///
    /// Tokens excluded at bid time or on `skip` now keep their current
    /// quantity and move in neither direction. Their escrow, if any, goes
    /// back to the bidder, or is held for a later claim if the token is
    /// paused.
    pub fn settle(
        &mut self,
        bank: &mut TokenBank,
        basket: AccountId,
        delta: &PendingDelta,
        total_units: Amount,
        skip: &FxHashSet<TokenId>,
    ) -> Result<Settlement> {
        let bid = self.best.as_ref().ok_or(BasketError::NoBid)?;

        let mut ops = Vec::new();
        let mut skipped = Vec::new();
        let mut returned = Vec::new();
        let mut unit = Vec::with_capacity(bid.quantities.len());
        for (entry, &(token, candidate)) in delta.entries().iter().zip(&bid.quantities) {
            let escrowed = bid.escrowed_amount(token);
            if skip.contains(&token) || bid.excluded.contains(&token) {
                skipped.push(token);
                unit.push((token, entry.current));
                returned.push((token, escrowed));
                continue;
            }
            if escrowed > 0 {
                ops.push(LedgerOp::Transfer {
                    token,
                    from: self.account,
                    to: basket,
                    amount: escrowed,
                });
            }
            if candidate < entry.current {
                let owed = (entry.current - candidate)
                    .checked_mul(total_units)
                    .ok_or(BasketError::Overflow)?;
                ops.push(LedgerOp::Transfer {
                    token,
                    from: basket,
                    to: bid.bidder,
                    amount: owed,
                });
            }
            unit.push((token, candidate));
        }
        let refund = self.split_refund(bank, bid.bidder, &returned)?;
        ops.extend(refund.ops);
        bank.execute(&ops)?;

        let creation_unit = CreationUnit::from_settlement(unit);
        let bid = self.retire(&refund.held).ok_or(BasketError::NoBid)?;
        Ok(Settlement {
            bid,
            creation_unit,
            skipped,
            held: refund.held,
        })
    }
}
