//! Error types for basket operations.

use crate::{AccountId, Amount, Phase, Ratio, SignedAmount, TokenId};

/// Every way a basket, registry, or ledger call can fail.
///
/// A call that returns an error has changed nothing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BasketError {
    #[error("{operation} not allowed during {phase} phase")]
    PhaseViolation {
        operation: &'static str,
        phase: Phase,
    },

    #[error("{caller} is not authorized to {operation}")]
    NotAuthorized {
        caller: AccountId,
        operation: &'static str,
    },

    #[error("insufficient {token} balance for {account}: need {needed}, have {available}")]
    InsufficientFunds {
        token: TokenId,
        account: AccountId,
        needed: Amount,
        available: Amount,
    },

    #[error(
        "insufficient {token} allowance from {owner} to {spender}: need {needed}, have {available}"
    )]
    InsufficientAllowance {
        token: TokenId,
        owner: AccountId,
        spender: AccountId,
        needed: Amount,
        available: Amount,
    },

    #[error("no basket tokens outstanding")]
    NoOutstandingSupply,

    #[error("proposal is degenerate: every delta is zero")]
    DegenerateProposal,

    #[error("bid ratio {offered} does not improve on current best {best}")]
    BidNotImproved { offered: Ratio, best: Ratio },

    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    #[error("length mismatch: {tokens} tokens vs {quantities} quantities")]
    LengthMismatch { tokens: usize, quantities: usize },

    #[error("bid would overdraw {token}: candidate quantity {candidate} is negative")]
    Overdraw {
        token: TokenId,
        candidate: SignedAmount,
    },

    #[error("invalid bid ratio {numerator}/{denominator}: {reason}")]
    InvalidRatio {
        numerator: u128,
        denominator: u128,
        reason: &'static str,
    },

    #[error("no bid was escrowed during the auction")]
    NoBid,

    #[error("no {token} refund held for {owner}")]
    NothingToClaim { owner: AccountId, token: TokenId },

    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: String },

    #[error("index {index} out of range for registry of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("token {0} is already registered in another slot")]
    DuplicateToken(TokenId),

    #[error("frozen list of {len} tokens exceeds {registered} registered tokens")]
    FrozenListTooLong { len: usize, registered: usize },

    #[error("token {0} is paused")]
    TokenPaused(TokenId),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("arithmetic overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, BasketError>;
