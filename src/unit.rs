//! Creation unit: the bundle of underlying tokens backing one natural unit.

use crate::error::{BasketError, Result};
use crate::{Amount, TokenId};

/// Ordered `(token, quantity)` pairs, unique by token.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreationUnit {
    entries: Vec<(TokenId, Amount)>,
}

impl CreationUnit {
    /// Build a creation unit from `(token, quantity)` pairs.
    ///
    /// Fails on an empty list or a repeated token.
    pub fn new(entries: Vec<(TokenId, Amount)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(BasketError::InvalidConfig(
                "creation unit must hold at least one token".into(),
            ));
        }
        for (i, (token, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(t, _)| t == token) {
                return Err(BasketError::InvalidConfig(format!(
                    "creation unit lists {token} twice"
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Unit produced by a settlement. Zero-quantity tokens are dropped.
    pub(crate) fn from_settlement(entries: impl IntoIterator<Item = (TokenId, Amount)>) -> Self {
        Self {
            entries: entries.into_iter().filter(|&(_, q)| q > 0).collect(),
        }
    }

    /// Quantity of `token` per natural unit (zero if absent).
    pub fn quantity(&self, token: TokenId) -> Amount {
        self.entries
            .iter()
            .find(|(t, _)| *t == token)
            .map_or(0, |&(_, q)| q)
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.entries.iter().any(|(t, _)| *t == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TokenId, Amount)> {
        self.entries.iter()
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.entries.iter().map(|&(t, _)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-token amounts backing `basket_amount`, i.e.
    /// `quantity * basket_amount / natural_unit` for every token.
    ///
    /// `basket_amount` is expected to be a multiple of `natural_unit`.
    pub fn scaled(
        &self,
        basket_amount: Amount,
        natural_unit: Amount,
    ) -> Result<Vec<(TokenId, Amount)>> {
        if natural_unit == 0 {
            return Err(BasketError::InvalidConfig(
                "natural unit must be positive".into(),
            ));
        }
        let units = basket_amount / natural_unit;
        self.entries
            .iter()
            .map(|&(token, quantity)| {
                quantity
                    .checked_mul(units)
                    .map(|amount| (token, amount))
                    .ok_or(BasketError::Overflow)
            })
            .collect()
    }
}
