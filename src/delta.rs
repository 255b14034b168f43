//! Per-token deltas between the current creation unit and registry targets.

use rustc_hash::FxHashMap;

use crate::error::{BasketError, Result};
use crate::registry::WeightEntry;
use crate::unit::CreationUnit;
use crate::{Amount, SignedAmount, TokenId};

/// Current and target per-unit quantity of one token, and their difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenDelta {
    pub token: TokenId,
    pub current: Amount,
    pub target: Amount,
    /// `target - current`, per natural unit.
    pub delta: SignedAmount,
}

/// Deltas computed at proposal time, consumed by the auction and settlement.
///
/// Entries are sorted by token; callers should still treat them as a set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingDelta {
    entries: Vec<TokenDelta>,
}

impl PendingDelta {
    pub fn entries(&self) -> &[TokenDelta] {
        &self.entries
    }

    pub fn tokens(&self) -> Vec<TokenId> {
        self.entries.iter().map(|e| e.token).collect()
    }

    /// Per-unit signed deltas, parallel to [`tokens`](Self::tokens).
    pub fn deltas(&self) -> Vec<SignedAmount> {
        self.entries.iter().map(|e| e.delta).collect()
    }

    pub fn get(&self, token: TokenId) -> Option<&TokenDelta> {
        self.entries.iter().find(|e| e.token == token)
    }

    /// Deltas scaled to absolute amounts for `total_units` outstanding units.
    pub fn absolute(&self, total_units: Amount) -> Result<Vec<(TokenId, SignedAmount)>> {
        let units = SignedAmount::try_from(total_units).map_err(|_| BasketError::Overflow)?;
        self.entries
            .iter()
            .map(|e| {
                e.delta
                    .checked_mul(units)
                    .map(|abs| (e.token, abs))
                    .ok_or(BasketError::Overflow)
            })
            .collect()
    }

    /// True when no token would change.
    pub fn is_degenerate(&self) -> bool {
        self.entries.iter().all(|e| e.delta == 0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute `target - current` for every token in either side.
///
/// A token only in `target` yields `+target`; a token only in `current`
/// yields `-current`.
pub fn compute_delta(
    current: &CreationUnit,
    target: &[WeightEntry],
    total_units: Amount,
) -> Result<PendingDelta> {
    if total_units == 0 {
        return Err(BasketError::NoOutstandingSupply);
    }

    let mut union: FxHashMap<TokenId, (Amount, Amount)> = FxHashMap::default();
    for &(token, quantity) in current.iter() {
        union.entry(token).or_default().0 = quantity;
    }
    for entry in target {
        union.entry(entry.token).or_default().1 = entry.quantity;
    }

    let mut entries = union
        .into_iter()
        .map(|(token, (current, target))| {
            let cur = SignedAmount::try_from(current).map_err(|_| BasketError::Overflow)?;
            let tgt = SignedAmount::try_from(target).map_err(|_| BasketError::Overflow)?;
            Ok(TokenDelta {
                token,
                current,
                target,
                delta: tgt - cur,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort_unstable_by_key(|e| e.token);

    Ok(PendingDelta { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(s: &str) -> TokenId {
        TokenId::new(s)
    }

    fn entry(s: &str, quantity: Amount) -> WeightEntry {
        WeightEntry {
            token: tok(s),
            quantity,
        }
    }

    #[test]
    fn doubles_every_weight() {
        let unit = CreationUnit::new(vec![(tok("A"), 100), (tok("B"), 100)]).unwrap();
        let delta = compute_delta(&unit, &[entry("A", 200), entry("B", 200)], 3).unwrap();

        assert_eq!(delta.tokens(), vec![tok("A"), tok("B")]);
        assert_eq!(delta.deltas(), vec![100, 100]);
        assert_eq!(
            delta.absolute(3).unwrap(),
            vec![(tok("A"), 300), (tok("B"), 300)]
        );
        assert!(!delta.is_degenerate());
    }

    #[test]
    fn union_of_current_and_target() {
        let unit = CreationUnit::new(vec![(tok("A"), 100), (tok("B"), 100)]).unwrap();
        let delta = compute_delta(&unit, &[entry("A", 50), entry("C", 150)], 1).unwrap();

        assert_eq!(delta.len(), 3);
        assert_eq!(delta.get(tok("A")).unwrap().delta, -50);
        assert_eq!(delta.get(tok("B")).unwrap().delta, -100);
        let c = delta.get(tok("C")).unwrap();
        assert_eq!((c.current, c.target, c.delta), (0, 150, 150));
    }

    #[test]
    fn identical_target_is_degenerate() {
        let unit = CreationUnit::new(vec![(tok("A"), 5)]).unwrap();
        let delta = compute_delta(&unit, &[entry("A", 5)], 1).unwrap();
        assert!(delta.is_degenerate());
    }

    #[test]
    fn zero_supply_fails() {
        let unit = CreationUnit::new(vec![(tok("A"), 5)]).unwrap();
        assert_eq!(
            compute_delta(&unit, &[], 0),
            Err(BasketError::NoOutstandingSupply)
        );
    }

    #[test]
    fn absolute_overflow_is_an_error() {
        let unit = CreationUnit::new(vec![(tok("A"), 1)]).unwrap();
        let delta = compute_delta(&unit, &[entry("A", u64::MAX as Amount)], 1).unwrap();
        assert_eq!(delta.absolute(u128::MAX), Err(BasketError::Overflow));
    }
}
