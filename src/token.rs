//! Fungible token ledger: balances, allowances, and a pause flag.
//!
//! The basket treats underlying tokens as external collaborators reached
//! through [`FungibleLedger`] and [`Pausable`]. [`TokenLedger`] is the
//! in-memory implementation used by [`TokenBank`](crate::TokenBank).

use rustc_hash::FxHashMap;

use crate::error::{BasketError, Result};
use crate::{AccountId, Amount, TokenId};

/// Balance/transfer/approve capability of a fungible token.
///
/// The basket only ever pulls funds from participants through a
/// pre-approved allowance (`transfer_from`); plain `transfer` is used for
/// payouts from accounts the basket controls.
pub trait FungibleLedger {
    fn token(&self) -> TokenId;
    fn balance_of(&self, owner: AccountId) -> Amount;
    fn allowance(&self, owner: AccountId, spender: AccountId) -> Amount;
    fn total_supply(&self) -> Amount;
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<()>;
    fn transfer_from(
        &mut self,
        spender: AccountId,
        owner: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<()>;
    fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Amount);
    fn mint(&mut self, to: AccountId, amount: Amount) -> Result<()>;
}

/// Frozen/paused query on an underlying token.
pub trait Pausable {
    fn is_paused(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
}

/// In-memory fungible token.
#[derive(Clone, Debug)]
pub struct TokenLedger {
    token: TokenId,
    balances: FxHashMap<AccountId, Amount>,
    allowances: FxHashMap<(AccountId, AccountId), Amount>,
    total_supply: Amount,
    paused: bool,
}

impl TokenLedger {
    /// Create an empty, unpaused ledger for `token`.
    pub fn new(token: TokenId) -> Self {
        Self {
            token,
            balances: FxHashMap::default(),
            allowances: FxHashMap::default(),
            total_supply: 0,
            paused: false,
        }
    }

    /// Number of accounts holding a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|&&b| b > 0).count()
    }

    fn ensure_unpaused(&self) -> Result<()> {
        if self.paused {
            return Err(BasketError::TokenPaused(self.token));
        }
        Ok(())
    }

    fn debit(&mut self, owner: AccountId, amount: Amount) -> Result<()> {
        let available = self.balance_of(owner);
        if available < amount {
            return Err(BasketError::InsufficientFunds {
                token: self.token,
                account: owner,
                needed: amount,
                available,
            });
        }
        self.balances.insert(owner, available - amount);
        Ok(())
    }

    fn credit(&mut self, to: AccountId, amount: Amount) -> Result<()> {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(BasketError::Overflow)?;
        Ok(())
    }
}

impl FungibleLedger for TokenLedger {
    fn token(&self) -> TokenId {
        self.token
    }

    fn balance_of(&self, owner: AccountId) -> Amount {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: AccountId, spender: AccountId) -> Amount {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        self.ensure_unpaused()?;
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: AccountId,
        owner: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_unpaused()?;
        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            return Err(BasketError::InsufficientAllowance {
                token: self.token,
                owner,
                spender,
                needed: amount,
                available: allowed,
            });
        }
        self.debit(owner, amount)?;
        self.credit(to, amount)?;
        self.allowances.insert((owner, spender), allowed - amount);
        Ok(())
    }

    fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    fn mint(&mut self, to: AccountId, amount: Amount) -> Result<()> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(BasketError::Overflow)?;
        self.credit(to, amount)
    }
}

impl Pausable for TokenLedger {
    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
