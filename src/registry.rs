//! Target-weight registry maintained by a data manager.
//!
//! Entries are unique by token. Removal swaps the target slot with the last
//! one, so slot order is not stable across removals; consumers treat the
//! entries as a set.

use rustc_hash::FxHashMap;

use crate::bank::{LedgerOp, TokenBank};
use crate::error::{BasketError, Result};
use crate::{AccountId, Amount, TokenId};

/// A single (token, target quantity per unit) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightEntry {
    pub token: TokenId,
    pub quantity: Amount,
}

/// Registry of target weights with fee-gated reads.
#[derive(Clone, Debug)]
pub struct WeightRegistry {
    account: AccountId,
    data_manager: AccountId,
    fee_token: TokenId,
    fee_amount: Amount,
    entries: Vec<WeightEntry>,
    index: FxHashMap<TokenId, usize>,
    frozen: Vec<TokenId>,
}

impl WeightRegistry {
    /// Create an empty registry.
    ///
    /// `account` is the registry's own ledger account: the spender readers
    /// approve for the fee, and the holder of any tokens sent to it directly.
    pub fn new(
        account: AccountId,
        data_manager: AccountId,
        fee_token: TokenId,
        fee_amount: Amount,
    ) -> Self {
        Self {
            account,
            data_manager,
            fee_token,
            fee_amount,
            entries: Vec::new(),
            index: FxHashMap::default(),
            frozen: Vec::new(),
        }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn data_manager(&self) -> AccountId {
        self.data_manager
    }

    /// Fee token and per-read amount.
    pub fn fee(&self) -> (TokenId, Amount) {
        (self.fee_token, self.fee_amount)
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in slot order, without charging a fee.
    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    /// Advisory frozen list last published by the data manager.
    pub fn frozen(&self) -> &[TokenId] {
        &self.frozen
    }

    // === Writes (data manager only) ===

    /// Write `(token, quantity)` into slot `index`.
    ///
    /// `index == len()` appends; `index < len()` overwrites that slot.
    pub fn set(
        &mut self,
        caller: AccountId,
        index: usize,
        token: TokenId,
        quantity: Amount,
    ) -> Result<()> {
        self.authorize(caller, "set registry entries")?;
        let len = self.entries.len();
        if index > len {
            return Err(BasketError::IndexOutOfRange { index, len });
        }
        if self.index.get(&token).is_some_and(|&slot| slot != index) {
            return Err(BasketError::DuplicateToken(token));
        }
        self.write_slot(index, token, quantity);
        Ok(())
    }

    /// Overwrite or append each `(token, quantity)` pair.
    ///
    /// Fails before any write if the slices differ in length.
    pub fn batch_set(
        &mut self,
        caller: AccountId,
        tokens: &[TokenId],
        quantities: &[Amount],
    ) -> Result<()> {
        self.authorize(caller, "set registry entries")?;
        if tokens.len() != quantities.len() {
            return Err(BasketError::LengthMismatch {
                tokens: tokens.len(),
                quantities: quantities.len(),
            });
        }
        for (&token, &quantity) in tokens.iter().zip(quantities) {
            let slot = self
                .index
                .get(&token)
                .copied()
                .unwrap_or(self.entries.len());
            self.write_slot(slot, token, quantity);
        }
        Ok(())
    }

    /// Remove `token`. Returns false if it was not registered.
    pub fn remove(&mut self, caller: AccountId, token: TokenId) -> Result<bool> {
        self.authorize(caller, "remove registry entries")?;
        let Some(slot) = self.index.remove(&token) else {
            return Ok(false);
        };
        self.entries.swap_remove(slot);
        if let Some(moved) = self.entries.get(slot) {
            self.index.insert(moved.token, slot);
        }
        Ok(true)
    }

    /// Replace the advisory frozen list.
    pub fn set_frozen(&mut self, caller: AccountId, tokens: &[TokenId]) -> Result<()> {
        self.authorize(caller, "set frozen tokens")?;
        if tokens.len() > self.entries.len() {
            return Err(BasketError::FrozenListTooLong {
                len: tokens.len(),
                registered: self.entries.len(),
            });
        }
        self.frozen = tokens.to_vec();
        Ok(())
    }

    /// Send `amount` of `token` held by the registry account to the data manager.
    pub fn withdraw_tokens(
        &self,
        bank: &mut TokenBank,
        caller: AccountId,
        token: TokenId,
        amount: Amount,
    ) -> Result<()> {
        self.authorize(caller, "withdraw tokens")?;
        bank.execute(&[LedgerOp::Transfer {
            token,
            from: self.account,
            to: self.data_manager,
            amount,
        }])
    }

    // === Fee-gated reads ===

    /// Target quantity for `token` (zero if unregistered).
    pub fn get(&self, bank: &mut TokenBank, caller: AccountId, token: TokenId) -> Result<Amount> {
        self.charge(bank, caller)?;
        Ok(self.quantity(token))
    }

    /// Target quantities for `tokens`, in the order given.
    pub fn get_quantities(
        &self,
        bank: &mut TokenBank,
        caller: AccountId,
        tokens: &[TokenId],
    ) -> Result<Vec<Amount>> {
        self.charge(bank, caller)?;
        Ok(tokens.iter().map(|&t| self.quantity(t)).collect())
    }

    /// Every `(token, quantity)` pair, in slot order.
    pub fn get_all_quantities(
        &self,
        bank: &mut TokenBank,
        caller: AccountId,
    ) -> Result<Vec<WeightEntry>> {
        self.charge(bank, caller)?;
        Ok(self.entries.clone())
    }

    /// Registered tokens, in slot order. Free.
    pub fn get_tokens(&self) -> Vec<TokenId> {
        self.entries.iter().map(|e| e.token).collect()
    }

    /// The pull-payment a read by `caller` costs, or `None` if it is free.
    pub fn fee_op(&self, caller: AccountId) -> Option<LedgerOp> {
        if caller == self.data_manager || self.fee_amount == 0 {
            return None;
        }
        Some(LedgerOp::TransferFrom {
            token: self.fee_token,
            spender: self.account,
            owner: caller,
            to: self.data_manager,
            amount: self.fee_amount,
        })
    }

    fn charge(&self, bank: &mut TokenBank, caller: AccountId) -> Result<()> {
        match self.fee_op(caller) {
            Some(op) => bank.execute(&[op]),
            None => Ok(()),
        }
    }

    fn quantity(&self, token: TokenId) -> Amount {
        self.index
            .get(&token)
            .map_or(0, |&slot| self.entries[slot].quantity)
    }

    fn authorize(&self, caller: AccountId, operation: &'static str) -> Result<()> {
        if caller != self.data_manager {
            return Err(BasketError::NotAuthorized { caller, operation });
        }
        Ok(())
    }

    /// `slot` must be `<= len()` and `token` must not occupy another slot.
    fn write_slot(&mut self, slot: usize, token: TokenId, quantity: Amount) {
        let entry = WeightEntry { token, quantity };
        if slot == self.entries.len() {
            self.entries.push(entry);
        } else {
            let old = self.entries[slot].token;
            if old != token {
                self.index.remove(&old);
            }
            self.entries[slot] = entry;
        }
        self.index.insert(token, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: AccountId = AccountId(50);
    const MANAGER: AccountId = AccountId(7);
    const READER: AccountId = AccountId(3);

    fn fee() -> TokenId {
        TokenId::new("FEE")
    }
    fn tok(s: &str) -> TokenId {
        TokenId::new(s)
    }

    fn registry() -> WeightRegistry {
        WeightRegistry::new(REGISTRY, MANAGER, fee(), 10)
    }

    fn sorted(mut entries: Vec<WeightEntry>) -> Vec<(TokenId, Amount)> {
        entries.sort_by_key(|e| e.token);
        entries.into_iter().map(|e| (e.token, e.quantity)).collect()
    }

    fn fee_bank() -> TokenBank {
        let mut bank = TokenBank::new();
        bank.list(fee());
        bank.mint(fee(), READER, 100).unwrap();
        bank
    }

    #[test]
    fn set_appends_and_overwrites() {
        let mut reg = registry();
        reg.set(MANAGER, 0, tok("A"), 1).unwrap();
        reg.set(MANAGER, 1, tok("B"), 2).unwrap();
        reg.set(MANAGER, 0, tok("C"), 3).unwrap();

        assert_eq!(reg.get_tokens(), vec![tok("C"), tok("B")]);
        assert_eq!(reg.quantity(tok("A")), 0);
        assert_eq!(reg.quantity(tok("C")), 3);
    }

    #[test]
    fn set_rejects_gap_and_duplicate() {
        let mut reg = registry();
        reg.set(MANAGER, 0, tok("A"), 1).unwrap();
        assert_eq!(
            reg.set(MANAGER, 2, tok("B"), 1),
            Err(BasketError::IndexOutOfRange { index: 2, len: 1 })
        );
        reg.set(MANAGER, 1, tok("B"), 1).unwrap();
        assert_eq!(
            reg.set(MANAGER, 1, tok("A"), 5),
            Err(BasketError::DuplicateToken(tok("A")))
        );
        // same slot, same token: plain overwrite
        reg.set(MANAGER, 0, tok("A"), 5).unwrap();
        assert_eq!(reg.quantity(tok("A")), 5);
    }

    #[test]
    fn writes_require_data_manager() {
        let mut reg = registry();
        let err = reg.set(READER, 0, tok("A"), 1).unwrap_err();
        assert!(matches!(err, BasketError::NotAuthorized { caller: READER, .. }));
        assert!(reg.remove(READER, tok("A")).is_err());
        assert!(reg.batch_set(READER, &[], &[]).is_err());
        assert!(reg.set_frozen(READER, &[]).is_err());
    }

    #[test]
    fn remove_swaps_last_into_slot() {
        let mut reg = registry();
        reg.batch_set(MANAGER, &[tok("A"), tok("B"), tok("C")], &[1, 2, 3])
            .unwrap();

        assert!(reg.remove(MANAGER, tok("A")).unwrap());
        assert!(!reg.remove(MANAGER, tok("A")).unwrap());
        assert_eq!(reg.get_tokens(), vec![tok("C"), tok("B")]);

        // moved entry is still addressable by its new slot
        reg.set(MANAGER, 0, tok("C"), 30).unwrap();
        assert_eq!(
            sorted(reg.entries().to_vec()),
            vec![(tok("B"), 2), (tok("C"), 30)]
        );

        assert!(reg.remove(MANAGER, tok("B")).unwrap());
        assert!(reg.remove(MANAGER, tok("C")).unwrap());
        assert!(reg.is_empty());
    }

    #[test]
    fn batch_set_overwrites_present_tokens() {
        let mut reg = registry();
        reg.batch_set(MANAGER, &[tok("A"), tok("B")], &[1, 2]).unwrap();
        reg.batch_set(MANAGER, &[tok("B"), tok("C")], &[20, 3]).unwrap();
        assert_eq!(
            sorted(reg.entries().to_vec()),
            vec![(tok("A"), 1), (tok("B"), 20), (tok("C"), 3)]
        );
    }

    #[test]
    fn batch_set_length_mismatch_writes_nothing() {
        let mut reg = registry();
        assert_eq!(
            reg.batch_set(MANAGER, &[tok("A"), tok("B")], &[1]),
            Err(BasketError::LengthMismatch {
                tokens: 2,
                quantities: 1
            })
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn frozen_list_is_bounded_by_registered_tokens() {
        let mut reg = registry();
        reg.set(MANAGER, 0, tok("A"), 1).unwrap();
        assert_eq!(
            reg.set_frozen(MANAGER, &[tok("A"), tok("B")]),
            Err(BasketError::FrozenListTooLong {
                len: 2,
                registered: 1
            })
        );
        reg.set_frozen(MANAGER, &[tok("A")]).unwrap();
        assert_eq!(reg.frozen(), &[tok("A")]);
    }

    #[test]
    fn reads_charge_fee_to_non_manager() {
        let mut reg = registry();
        let mut bank = fee_bank();
        reg.set(MANAGER, 0, tok("A"), 42).unwrap();

        bank.execute(&[LedgerOp::Approve {
            token: fee(),
            owner: READER,
            spender: REGISTRY,
            amount: 25,
        }])
        .unwrap();

        assert_eq!(reg.get(&mut bank, READER, tok("A")).unwrap(), 42);
        assert_eq!(
            reg.get_quantities(&mut bank, READER, &[tok("A"), tok("Z")])
                .unwrap(),
            vec![42, 0]
        );
        assert_eq!(bank.balance_of(fee(), READER), 80);
        assert_eq!(bank.balance_of(fee(), MANAGER), 20);

        // allowance of 5 left: the third read fails and charges nothing
        let err = reg.get_all_quantities(&mut bank, READER).unwrap_err();
        assert!(matches!(err, BasketError::InsufficientAllowance { .. }));
        assert_eq!(bank.balance_of(fee(), READER), 80);
    }

    #[test]
    fn manager_and_zero_fee_reads_are_free() {
        let mut bank = fee_bank();
        let reg = registry();
        assert!(reg.fee_op(MANAGER).is_none());
        reg.get_all_quantities(&mut bank, MANAGER).unwrap();

        let free = WeightRegistry::new(REGISTRY, MANAGER, fee(), 0);
        assert!(free.fee_op(READER).is_none());
        free.get(&mut bank, READER, tok("A")).unwrap();
        assert_eq!(bank.balance_of(fee(), READER), 100);
    }

    #[test]
    fn withdraw_sends_registry_holdings_to_manager() {
        let reg = registry();
        let mut bank = fee_bank();
        bank.mint(fee(), REGISTRY, 9).unwrap();
        reg.withdraw_tokens(&mut bank, MANAGER, fee(), 9).unwrap();
        assert_eq!(bank.balance_of(fee(), MANAGER), 9);
        assert!(reg.withdraw_tokens(&mut bank, READER, fee(), 1).is_err());
    }
}
