//! Basket-token bookkeeping: supply, holder balances, creation unit and
//! the frozen-token skip-list.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::bank::{LedgerOp, TokenBank};
use crate::error::{BasketError, Result};
use crate::unit::CreationUnit;
use crate::{AccountId, Amount, TokenId};

#[derive(Clone, Debug)]
pub struct BasketLedger {
    symbol: TokenId,
    account: AccountId,
    natural_unit: Amount,
    creation_unit: CreationUnit,
    total_supply: Amount,
    balances: FxHashMap<AccountId, Amount>,
    skip_list: FxHashSet<TokenId>,
}

impl BasketLedger {
    /// `account` holds the underlying tokens and is the spender participants
    /// approve for issue and frozen-token reports.
    pub fn new(
        symbol: TokenId,
        account: AccountId,
        natural_unit: Amount,
        creation_unit: CreationUnit,
    ) -> Result<Self> {
        if natural_unit == 0 {
            return Err(BasketError::InvalidConfig(
                "natural unit must be positive".into(),
            ));
        }
        Ok(Self {
            symbol,
            account,
            natural_unit,
            creation_unit,
            total_supply: 0,
            balances: FxHashMap::default(),
            skip_list: FxHashSet::default(),
        })
    }

    pub fn symbol(&self) -> TokenId {
        self.symbol
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn natural_unit(&self) -> Amount {
        self.natural_unit
    }

    pub fn creation_unit(&self) -> &CreationUnit {
        &self.creation_unit
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, owner: AccountId) -> Amount {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    /// Whole natural units outstanding.
    pub fn total_units(&self) -> Amount {
        self.total_supply / self.natural_unit
    }

    /// Smallest amount that can be issued or redeemed.
    pub fn creation_size(&self) -> Amount {
        self.natural_unit
    }

    pub fn skip_list(&self) -> &FxHashSet<TokenId> {
        &self.skip_list
    }

    pub fn is_skipped(&self, token: TokenId) -> bool {
        self.skip_list.contains(&token)
    }

    /// Skip-list in token order.
    pub fn tokens_to_skip(&self) -> Vec<TokenId> {
        let mut tokens: Vec<TokenId> = self.skip_list.iter().copied().collect();
        tokens.sort_unstable();
        tokens
    }

    /// Install a settled unit. Skip-list entries for tokens the unit no
    /// longer holds are dropped, since they could never be reported again.
    pub(crate) fn set_creation_unit(&mut self, unit: CreationUnit) {
        self.skip_list.retain(|&token| unit.contains(token));
        self.creation_unit = unit;
    }

    /// Pull the creation unit's tokens from `caller` and mint `amount`.
    ///
    /// Skipped tokens are neither pulled nor owed.
    pub fn issue(&mut self, bank: &mut TokenBank, caller: AccountId, amount: Amount) -> Result<()> {
        self.check_amount(amount)?;
        let mut ops = Vec::new();
        for (token, owed) in self.creation_unit.scaled(amount, self.natural_unit)? {
            if owed == 0 || self.is_skipped(token) {
                continue;
            }
            ops.push(LedgerOp::TransferFrom {
                token,
                spender: self.account,
                owner: caller,
                to: self.account,
                amount: owed,
            });
        }
        // checked before any token moves
        self.total_supply
            .checked_add(amount)
            .ok_or(BasketError::Overflow)?;
        bank.execute(&ops)?;
        self.mint(caller, amount)
    }

    /// Burn `amount` from `caller` and pay out the backing tokens.
    ///
    /// Tokens on the skip-list are withheld unless named in
    /// `override_skip`. If any payout fails the burn is undone.
    pub fn redeem(
        &mut self,
        bank: &mut TokenBank,
        caller: AccountId,
        amount: Amount,
        override_skip: &[TokenId],
    ) -> Result<()> {
        self.check_amount(amount)?;
        if let Some(&token) = override_skip
            .iter()
            .find(|&&t| !self.creation_unit.contains(t))
        {
            return Err(BasketError::UnknownToken(token));
        }

        let mut ops = Vec::new();
        for (token, owed) in self.creation_unit.scaled(amount, self.natural_unit)? {
            if owed == 0 || (self.is_skipped(token) && !override_skip.contains(&token)) {
                continue;
            }
            ops.push(LedgerOp::Transfer {
                token,
                from: self.account,
                to: caller,
                amount: owed,
            });
        }

        self.burn(caller, amount)?;
        if let Err(err) = bank.execute(&ops) {
            self.mint(caller, amount)?;
            return Err(err);
        }
        Ok(())
    }

    /// Sync skip-list membership of `token` with its pause flag.
    ///
    /// `caller` must hold, and have approved to the basket account, at least
    /// the token's creation-unit quantity. Returns the new membership.
    pub fn report_frozen_token(
        &mut self,
        bank: &TokenBank,
        caller: AccountId,
        token: TokenId,
    ) -> Result<bool> {
        if !self.creation_unit.contains(token) {
            return Err(BasketError::UnknownToken(token));
        }
        let needed = self.creation_unit.quantity(token);
        let available = bank.balance_of(token, caller);
        if available < needed {
            return Err(BasketError::InsufficientFunds {
                token,
                account: caller,
                needed,
                available,
            });
        }
        let allowed = bank.allowance(token, caller, self.account);
        if allowed < needed {
            return Err(BasketError::InsufficientAllowance {
                token,
                owner: caller,
                spender: self.account,
                needed,
                available: allowed,
            });
        }

        let frozen = bank.is_paused(token)?;
        if frozen {
            self.skip_list.insert(token);
        } else {
            self.skip_list.remove(&token);
        }
        Ok(frozen)
    }

    fn check_amount(&self, amount: Amount) -> Result<()> {
        if amount == 0 || amount % self.natural_unit != 0 {
            return Err(BasketError::InvalidAmount {
                amount,
                reason: format!(
                    "must be a positive multiple of the natural unit {}",
                    self.natural_unit
                ),
            });
        }
        Ok(())
    }

    fn mint(&mut self, to: AccountId, amount: Amount) -> Result<()> {
        let balance = self.balance_of(to);
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(BasketError::Overflow)?;
        let balance = balance.checked_add(amount).ok_or(BasketError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    fn burn(&mut self, from: AccountId, amount: Amount) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(BasketError::InsufficientFunds {
                token: self.symbol,
                account: from,
                needed: amount,
                available,
            });
        }
        self.balances.insert(from, available - amount);
        self.total_supply -= amount;
        Ok(())
    }
}
