//! Multi-token bank: one `TokenLedger` per token, with atomic batches.

use rustc_hash::FxHashMap;

use crate::error::{BasketError, Result};
use crate::token::{FungibleLedger, Pausable, TokenLedger};
use crate::{AccountId, Amount, TokenId};

/// A single token movement or approval inside an atomic batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    /// `owner` sets `spender`'s allowance to `amount`.
    Approve {
        token: TokenId,
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
    },
    /// Push payment from an account the caller controls.
    Transfer {
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Pull payment through `owner`'s allowance to `spender`.
    TransferFrom {
        token: TokenId,
        spender: AccountId,
        owner: AccountId,
        to: AccountId,
        amount: Amount,
    },
}

impl LedgerOp {
    /// Token this operation touches.
    pub fn token(&self) -> TokenId {
        match self {
            LedgerOp::Approve { token, .. }
            | LedgerOp::Transfer { token, .. }
            | LedgerOp::TransferFrom { token, .. } => *token,
        }
    }

    fn apply(&self, ledger: &mut TokenLedger) -> Result<()> {
        match *self {
            LedgerOp::Approve {
                owner,
                spender,
                amount,
                ..
            } => {
                ledger.approve(owner, spender, amount);
                Ok(())
            }
            LedgerOp::Transfer {
                from, to, amount, ..
            } => ledger.transfer(from, to, amount),
            LedgerOp::TransferFrom {
                spender,
                owner,
                to,
                amount,
                ..
            } => ledger.transfer_from(spender, owner, to, amount),
        }
    }
}

/// A collection of per-token ledgers.
///
/// ```
/// use nanobskt::{AccountId, LedgerOp, TokenBank, TokenId};
///
/// let weth = TokenId::new("WETH");
/// let mut bank = TokenBank::new();
/// bank.list(weth);
/// bank.mint(weth, AccountId(1), 100).unwrap();
///
/// // The second transfer overdraws, so neither is applied.
/// let ops = [
///     LedgerOp::Transfer { token: weth, from: AccountId(1), to: AccountId(2), amount: 60 },
///     LedgerOp::Transfer { token: weth, from: AccountId(1), to: AccountId(3), amount: 60 },
/// ];
/// assert!(bank.execute(&ops).is_err());
/// assert_eq!(bank.balance_of(weth, AccountId(1)), 100);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TokenBank {
    ledgers: FxHashMap<TokenId, TokenLedger>,
}

impl TokenBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the ledger for `token` if it does not exist yet.
    ///
    /// Returns true if a new ledger was created.
    pub fn list(&mut self, token: TokenId) -> bool {
        if self.ledgers.contains_key(&token) {
            return false;
        }
        self.ledgers.insert(token, TokenLedger::new(token));
        true
    }

    /// Returns true if `token` has a ledger.
    pub fn contains(&self, token: &TokenId) -> bool {
        self.ledgers.contains_key(token)
    }

    /// Get the ledger for a token, if it exists.
    pub fn get(&self, token: &TokenId) -> Option<&TokenLedger> {
        self.ledgers.get(token)
    }

    /// Iterator over all listed tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.ledgers.keys()
    }

    /// Number of listed tokens.
    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    /// Returns true if no tokens are listed.
    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    /// Balance of `owner` in `token` (zero for unlisted tokens).
    pub fn balance_of(&self, token: TokenId, owner: AccountId) -> Amount {
        self.ledgers
            .get(&token)
            .map_or(0, |ledger| ledger.balance_of(owner))
    }

    /// Allowance from `owner` to `spender` in `token` (zero for unlisted tokens).
    pub fn allowance(&self, token: TokenId, owner: AccountId, spender: AccountId) -> Amount {
        self.ledgers
            .get(&token)
            .map_or(0, |ledger| ledger.allowance(owner, spender))
    }

    /// Whether `token` is paused on its own ledger.
    pub fn is_paused(&self, token: TokenId) -> Result<bool> {
        self.ledger(token).map(|ledger| ledger.is_paused())
    }

    /// Mint new units of `token` to `to`.
    pub fn mint(&mut self, token: TokenId, to: AccountId, amount: Amount) -> Result<()> {
        self.ledger_mut(token)?.mint(to, amount)
    }

    /// Pause or unpause `token`.
    pub fn set_paused(&mut self, token: TokenId, paused: bool) -> Result<()> {
        self.ledger_mut(token)?.set_paused(paused);
        Ok(())
    }

    /// Apply a batch of operations all-or-nothing.
    ///
    /// Touched ledgers are staged and every operation runs against the staged
    /// copies in order; the copies replace the live ledgers only if every
    /// operation succeeded.
    pub fn execute(&mut self, ops: &[LedgerOp]) -> Result<()> {
        let mut staged: FxHashMap<TokenId, TokenLedger> = FxHashMap::default();
        for op in ops {
            let token = op.token();
            if !staged.contains_key(&token) {
                staged.insert(token, self.ledger(token)?.clone());
            }
            if let Some(ledger) = staged.get_mut(&token) {
                op.apply(ledger)?;
            }
        }
        self.ledgers.extend(staged);
        Ok(())
    }

    fn ledger(&self, token: TokenId) -> Result<&TokenLedger> {
        self.ledgers
            .get(&token)
            .ok_or(BasketError::UnknownToken(token))
    }

    fn ledger_mut(&mut self, token: TokenId) -> Result<&mut TokenLedger> {
        self.ledgers
            .get_mut(&token)
            .ok_or(BasketError::UnknownToken(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);
    const POOL: AccountId = AccountId(100);

    fn weth() -> TokenId {
        TokenId::new("WETH")
    }
    fn wbtc() -> TokenId {
        TokenId::new("WBTC")
    }

    fn bank() -> TokenBank {
        let mut bank = TokenBank::new();
        bank.list(weth());
        bank.list(wbtc());
        bank.mint(weth(), ALICE, 1_000).unwrap();
        bank.mint(wbtc(), ALICE, 10).unwrap();
        bank
    }

    #[test]
    fn list_is_idempotent() {
        let mut bank = TokenBank::new();
        assert!(bank.list(weth()));
        assert!(!bank.list(weth()));
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn unknown_token_is_an_error() {
        let mut bank = TokenBank::new();
        assert_eq!(
            bank.mint(weth(), ALICE, 1),
            Err(BasketError::UnknownToken(weth()))
        );
        assert_eq!(bank.balance_of(weth(), ALICE), 0);
    }

    #[test]
    fn execute_applies_in_order() {
        let mut bank = bank();
        let ops = [
            LedgerOp::Approve {
                token: weth(),
                owner: ALICE,
                spender: POOL,
                amount: 500,
            },
            LedgerOp::TransferFrom {
                token: weth(),
                spender: POOL,
                owner: ALICE,
                to: POOL,
                amount: 500,
            },
            LedgerOp::Transfer {
                token: weth(),
                from: POOL,
                to: BOB,
                amount: 200,
            },
        ];
        bank.execute(&ops).unwrap();
        assert_eq!(bank.balance_of(weth(), ALICE), 500);
        assert_eq!(bank.balance_of(weth(), POOL), 300);
        assert_eq!(bank.balance_of(weth(), BOB), 200);
        assert_eq!(bank.allowance(weth(), ALICE, POOL), 0);
    }

    #[test]
    fn execute_is_all_or_nothing_across_tokens() {
        let mut bank = bank();
        let ops = [
            LedgerOp::Transfer {
                token: weth(),
                from: ALICE,
                to: BOB,
                amount: 100,
            },
            LedgerOp::Transfer {
                token: wbtc(),
                from: ALICE,
                to: BOB,
                amount: 11,
            },
        ];
        let err = bank.execute(&ops).unwrap_err();
        assert!(matches!(err, BasketError::InsufficientFunds { .. }));
        assert_eq!(bank.balance_of(weth(), ALICE), 1_000);
        assert_eq!(bank.balance_of(weth(), BOB), 0);
    }

    #[test]
    fn paused_token_fails_the_whole_batch() {
        let mut bank = bank();
        bank.set_paused(wbtc(), true).unwrap();
        let ops = [
            LedgerOp::Transfer {
                token: weth(),
                from: ALICE,
                to: BOB,
                amount: 1,
            },
            LedgerOp::Transfer {
                token: wbtc(),
                from: ALICE,
                to: BOB,
                amount: 1,
            },
        ];
        assert_eq!(bank.execute(&ops), Err(BasketError::TokenPaused(wbtc())));
        assert_eq!(bank.balance_of(weth(), BOB), 0);
        assert!(bank.is_paused(wbtc()).unwrap());
    }
}
