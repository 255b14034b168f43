//! # nanobskt
//!
//! A deterministic rebalancing basket token with an auction-driven rebalance.
//!
//! ## Features
//!
//! - **Creation units**: issue and redeem the basket token against a fixed bundle of underlying tokens
//! - **Weight registry**: a data manager publishes target weights; reads are fee-gated
//! - **Periodic auction**: Open, OptOut, Auction and Settle phases derived from wall-clock time
//! - **Single-slot escrow**: only the best bid's collateral is held, replaced atomically
//! - **Frozen tokens**: paused underlying tokens are skipped by issue, redeem and settlement
//! - **Deterministic replay**: record accepted inputs and replay them to rebuild exact state
//! - **Exact arithmetic**: integer amounts and rational bid ratios, no floating point
//!
//! ## Quick Start
//!
//! ```
//! use nanobskt::{AccountId, Basket, BasketConfig, Phase, Schedule, TokenId};
//!
//! let (a, b, c) = (TokenId::new("A"), TokenId::new("B"), TokenId::new("C"));
//! let vault = AccountId(1000);
//! let manager = AccountId(7);
//! let (alice, bidder) = (AccountId(1), AccountId(2));
//!
//! let mut basket = Basket::new(BasketConfig {
//!     symbol: TokenId::new("BSKT"),
//!     natural_unit: 1,
//!     max_bid_ratio: (2, 1),
//!     // 100s cycles: auction at [40, 60), settlement at [60, 80)
//!     schedule: Schedule::new(100, 0, 20, 40, 20, 20).unwrap(),
//!     basket_account: vault,
//!     escrow_account: AccountId(1001),
//!     registry_account: AccountId(1002),
//!     data_manager: manager,
//!     fee_token: TokenId::new("FEE"),
//!     fee_amount: 0,
//!     creation_unit: vec![(a, 100), (b, 100)],
//! })
//! .unwrap();
//! basket.list_token(c);
//!
//! // Alice deposits one creation unit
//! for t in [a, b] {
//!     basket.mint_underlying(t, alice, 100).unwrap();
//!     basket.approve_underlying(t, alice, vault, 100).unwrap();
//! }
//! basket.issue(alice, 1, 0).unwrap();
//!
//! // The data manager publishes new targets and a rebalance is proposed
//! basket.registry_batch_set(manager, &[a, c], &[50, 150]).unwrap();
//! basket.propose_rebalance(alice, 0).unwrap();
//! assert_eq!(basket.status(10), Phase::OptOut);
//!
//! // A bidder supplies C and takes the surplus A and B
//! basket.mint_underlying(c, bidder, 150).unwrap();
//! basket.approve_underlying(c, bidder, vault, 150).unwrap();
//! basket.bid(bidder, 1, 1, 45).unwrap();
//! basket.rebalance(65).unwrap();
//!
//! assert_eq!(basket.creation_unit().quantity(c), 150);
//! assert_eq!(basket.bank().balance_of(b, bidder), 100);
//! assert_eq!(basket.status(65), Phase::Open);
//! ```
//!
//! ## Phases
//!
//! | Phase | Entered | Accepts |
//! |-------|---------|---------|
//! | **Open** | no live proposal | issue, redeem, propose_rebalance |
//! | **OptOut** | after a proposal, until the auction offset | issue, redeem |
//! | **Auction** | `[auction_offset, auction_offset + auction_duration)` | bid |
//! | **Settle** | the following `settle_duration` seconds | rebalance |
//!
//! A proposal that is not settled before its settle window closes lapses and
//! the basket returns to Open. Any bid it escrowed is refunded by the next
//! proposal.
//!
//! ## Bid Ratios
//!
//! A bid at `n/d` offers the candidate unit
//! `current + floor(n/d * (target - current))` for every token. `1/1` lands
//! exactly on the target, smaller ratios are partial moves, and ratios above
//! one overshoot up to the configured `max_bid_ratio`:
//!
//! ```
//! use nanobskt::Ratio;
//!
//! let half = Ratio::new(1, 2).unwrap();
//! assert!(half < Ratio::ONE);
//! assert_eq!(half.floor_mul(-5), Some(-3));
//! assert_eq!(Ratio::new(2, 4), Some(half));
//! ```
//!
//! ## Event Replay
//!
//! Every accepted input is recorded for deterministic replay (requires the
//! `event-log` feature, enabled by default):
//!
//! ```ignore
//! let events = basket.events().to_vec();
//! let replayed = Basket::replay(config, &events).unwrap();
//! assert_eq!(basket.creation_unit(), replayed.creation_unit());
//! ```

pub mod bank;
mod basket;
pub mod cycle;
pub mod delta;
mod error;
pub mod escrow;
mod event;
mod ledger;
#[cfg(feature = "persistence")]
pub mod persistence;
mod phase;
pub mod registry;
pub mod schedule;
mod snapshot;
pub mod token;
mod types;
mod unit;

pub use bank::{LedgerOp, TokenBank};
pub use basket::{Basket, BasketConfig};
pub use cycle::{Proposal, RebalanceCycle};
pub use delta::{PendingDelta, TokenDelta, compute_delta};
pub use error::{BasketError, Result};
pub use escrow::{AuctionEscrow, Bid, Refund, Settlement};
pub use event::Event;
pub use ledger::BasketLedger;
pub use phase::Phase;
pub use registry::{WeightEntry, WeightRegistry};
pub use schedule::{Schedule, Window};
pub use snapshot::BasketSnapshot;
pub use token::{FungibleLedger, Pausable, TokenLedger};
pub use types::{AccountId, Amount, Ratio, SignedAmount, Timestamp, TokenId};
pub use unit::CreationUnit;
