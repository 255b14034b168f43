//! End-to-end rebalance cycles: proposal, auction, settlement, and the
//! issue/redeem and registry behaviour around them.

use nanobskt::{
    AccountId, Amount, Basket, BasketConfig, BasketError, Phase, Schedule, TokenId, WeightEntry,
};

const VAULT: AccountId = AccountId(1000);
const ESCROW: AccountId = AccountId(1001);
const REGISTRY: AccountId = AccountId(1002);
const MANAGER: AccountId = AccountId(7);
const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);
const CAROL: AccountId = AccountId(3);

// Schedule: 100s period, phase offset 0.
// Proposals allowed at positions [0, 20], auction [40, 60), settle [60, 80).
const PROPOSE_AT: u64 = 10;
const AUCTION_AT: u64 = 45;
const SETTLE_AT: u64 = 65;

fn a() -> TokenId {
    TokenId::new("A")
}
fn b() -> TokenId {
    TokenId::new("B")
}
fn c() -> TokenId {
    TokenId::new("C")
}
fn fee() -> TokenId {
    TokenId::new("FEE")
}

fn config(fee_amount: Amount) -> BasketConfig {
    BasketConfig {
        symbol: TokenId::new("BSKT"),
        natural_unit: 1,
        max_bid_ratio: (2, 1),
        schedule: Schedule::new(100, 0, 20, 40, 20, 20).unwrap(),
        basket_account: VAULT,
        escrow_account: ESCROW,
        registry_account: REGISTRY,
        data_manager: MANAGER,
        fee_token: fee(),
        fee_amount,
        creation_unit: vec![(a(), 100), (b(), 100)],
    }
}

/// Fund `who` with `amount` of `token` and approve the vault for all of it.
fn fund(basket: &mut Basket, token: TokenId, who: AccountId, amount: Amount) {
    basket.mint_underlying(token, who, amount).unwrap();
    basket.approve_underlying(token, who, VAULT, amount).unwrap();
}

/// Alice holds `units` units; bidders hold plenty of C.
fn basket_with_units(units: Amount) -> Basket {
    let mut basket = Basket::new(config(0)).unwrap();
    basket.list_token(c());
    fund(&mut basket, a(), ALICE, 100 * units);
    fund(&mut basket, b(), ALICE, 100 * units);
    for bidder in [BOB, CAROL] {
        fund(&mut basket, c(), bidder, 10_000);
    }
    basket.issue(ALICE, units, 0).unwrap();
    basket
}

fn sorted(mut entries: Vec<WeightEntry>) -> Vec<(TokenId, Amount)> {
    entries.sort_by_key(|e| e.token);
    entries.into_iter().map(|e| (e.token, e.quantity)).collect()
}

// ============================================================================
// Issue / redeem
// ============================================================================

#[test]
fn issue_redeem_round_trip_restores_balances() {
    let mut basket = basket_with_units(3);
    assert_eq!(basket.bank().balance_of(a(), ALICE), 0);
    assert_eq!(basket.bank().balance_of(a(), VAULT), 300);

    basket.redeem(ALICE, 3, &[], 5).unwrap();
    assert_eq!(basket.bank().balance_of(a(), ALICE), 300);
    assert_eq!(basket.bank().balance_of(b(), ALICE), 300);
    assert_eq!(basket.bank().balance_of(a(), VAULT), 0);
    assert_eq!(basket.total_supply(), 0);
}

#[test]
fn frozen_token_is_not_pulled_on_issue() {
    let mut basket = basket_with_units(1);
    fund(&mut basket, a(), BOB, 100);
    fund(&mut basket, b(), BOB, 100);

    basket.set_token_paused(a(), true).unwrap();
    assert!(basket.report_frozen_token(BOB, a()).unwrap());
    assert_eq!(basket.tokens_to_skip(), vec![a()]);

    basket.issue(BOB, 1, 5).unwrap();
    assert_eq!(basket.bank().balance_of(a(), BOB), 100);
    assert_eq!(basket.bank().balance_of(b(), BOB), 0);
    assert_eq!(basket.balance_of(BOB), 1);
}

#[test]
fn holders_can_leave_during_opt_out() {
    let mut basket = basket_with_units(2);
    basket.registry_set(MANAGER, 0, c(), 10).unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();

    assert_eq!(basket.status(30), Phase::OptOut);
    basket.redeem(ALICE, 1, &[], 30).unwrap();
    assert_eq!(basket.total_units(), 1);

    assert!(matches!(
        basket.redeem(ALICE, 1, &[], AUCTION_AT),
        Err(BasketError::PhaseViolation {
            operation: "redeem",
            phase: Phase::Auction
        })
    ));
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registry_entries_after_overwrite_and_remove() {
    let mut basket = basket_with_units(1);
    let t = |s: &str| TokenId::new(s);
    basket
        .registry_batch_set(
            MANAGER,
            &[t("T1"), t("T2"), t("T3"), t("T4"), t("T5")],
            &[1000, 10000, 31200, 123013, 100],
        )
        .unwrap();
    assert!(basket.registry_remove(MANAGER, t("T2")).unwrap());
    basket.registry_set(MANAGER, 0, t("T6"), 7).unwrap();

    let all = basket.registry_get_all(MANAGER).unwrap();
    assert_eq!(
        sorted(all),
        vec![(t("T3"), 31200), (t("T4"), 123013), (t("T5"), 100), (t("T6"), 7)]
    );
}

#[test]
fn registry_reads_charge_fee() {
    let mut basket = Basket::new(config(5)).unwrap();
    basket.registry_set(MANAGER, 0, a(), 42).unwrap();
    basket.mint_underlying(fee(), BOB, 12).unwrap();
    basket.approve_underlying(fee(), BOB, REGISTRY, 12).unwrap();

    assert_eq!(basket.registry_get(BOB, a()).unwrap(), 42);
    assert_eq!(
        basket.registry_get_quantities(BOB, &[a(), b()]).unwrap(),
        vec![42, 0]
    );
    assert_eq!(basket.bank().balance_of(fee(), BOB), 2);
    assert_eq!(basket.bank().balance_of(fee(), MANAGER), 10);

    assert!(matches!(
        basket.registry_get_all(BOB),
        Err(BasketError::InsufficientAllowance { .. })
    ));
    // the data manager reads for free, and `get_tokens` is always free
    basket.registry_get_all(MANAGER).unwrap();
    assert_eq!(basket.registry().get_tokens(), vec![a()]);
    assert_eq!(basket.bank().balance_of(fee(), MANAGER), 10);
}

// ============================================================================
// Proposal and deltas
// ============================================================================

#[test]
fn doubling_weights_yields_positive_deltas() {
    let mut basket = basket_with_units(4);
    basket
        .registry_batch_set(MANAGER, &[a(), b()], &[200, 200])
        .unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();

    let delta = basket.rebalance_deltas().unwrap();
    assert_eq!(delta.get(a()).unwrap().delta, 100);
    assert_eq!(delta.get(b()).unwrap().delta, 100);
    assert_eq!(
        delta.absolute(basket.total_units()).unwrap(),
        vec![(a(), 400), (b(), 400)]
    );
}

#[test]
fn proposal_window_closes_before_auction() {
    let mut basket = basket_with_units(1);
    basket.registry_set(MANAGER, 0, c(), 10).unwrap();
    assert!(matches!(
        basket.propose_rebalance(ALICE, 21),
        Err(BasketError::PhaseViolation { .. })
    ));
    basket.propose_rebalance(ALICE, 20).unwrap();
    assert_eq!(basket.status(39), Phase::OptOut);
    assert_eq!(basket.status(40), Phase::Auction);
}

// ============================================================================
// Auction and settlement
// ============================================================================

#[test]
fn settlement_moves_tokens_between_vault_and_bidder() {
    let mut basket = basket_with_units(1);
    basket
        .registry_batch_set(MANAGER, &[a(), c()], &[50, 150])
        .unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    basket.bid(BOB, 100, 100, AUCTION_AT).unwrap();
    basket.rebalance(SETTLE_AT).unwrap();

    let bank = basket.bank();
    assert_eq!(bank.balance_of(a(), VAULT), 50);
    assert_eq!(bank.balance_of(b(), VAULT), 0);
    assert_eq!(bank.balance_of(c(), VAULT), 150);

    assert_eq!(bank.balance_of(a(), BOB), 50);
    assert_eq!(bank.balance_of(b(), BOB), 100);
    assert_eq!(bank.balance_of(c(), BOB), 10_000 - 150);

    let unit: Vec<_> = basket.creation_unit().iter().copied().collect();
    assert_eq!(unit, vec![(a(), 50), (c(), 150)]);
}

#[test]
fn better_bid_refunds_previous_bidder() {
    let mut basket = basket_with_units(2);
    basket.registry_set(MANAGER, 0, c(), 100).unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();

    basket.bid(BOB, 1, 2, AUCTION_AT).unwrap();
    assert_eq!(basket.bank().balance_of(c(), BOB), 10_000 - 100);

    basket.bid(CAROL, 3, 4, AUCTION_AT + 1).unwrap();
    assert_eq!(basket.bank().balance_of(c(), BOB), 10_000);
    assert_eq!(basket.bank().balance_of(c(), CAROL), 10_000 - 150);
    assert_eq!(basket.bank().balance_of(c(), ESCROW), 150);

    // equal ratio does not replace
    let err = basket.bid(BOB, 6, 8, AUCTION_AT + 2).unwrap_err();
    assert!(matches!(err, BasketError::BidNotImproved { .. }));
    assert_eq!(basket.best_bid().unwrap().bidder, CAROL);
    assert_eq!(basket.bank().balance_of(c(), BOB), 10_000);
}

#[test]
fn partial_fill_moves_part_way() {
    let mut basket = basket_with_units(1);
    basket
        .registry_batch_set(MANAGER, &[a(), b()], &[0, 300])
        .unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    fund(&mut basket, b(), BOB, 100);
    basket.bid(BOB, 1, 2, AUCTION_AT).unwrap();
    basket.rebalance(SETTLE_AT).unwrap();

    assert_eq!(basket.creation_unit().quantity(a()), 50);
    assert_eq!(basket.creation_unit().quantity(b()), 200);
    assert_eq!(basket.bank().balance_of(a(), BOB), 50);
}

#[test]
fn rebalance_requires_a_bid() {
    let mut basket = basket_with_units(1);
    basket.registry_set(MANAGER, 0, c(), 10).unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    assert_eq!(basket.rebalance(SETTLE_AT).unwrap_err(), BasketError::NoBid);
    assert!(matches!(
        basket.rebalance(AUCTION_AT),
        Err(BasketError::PhaseViolation { .. })
    ));
}

#[test]
fn frozen_token_skipped_at_settlement() {
    let mut basket = basket_with_units(1);
    basket
        .registry_batch_set(MANAGER, &[a(), c()], &[50, 150])
        .unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    basket.bid(BOB, 1, 1, AUCTION_AT).unwrap();

    // B freezes between bid and settlement
    fund(&mut basket, b(), CAROL, 100);
    basket.set_token_paused(b(), true).unwrap();
    assert!(basket.report_frozen_token(CAROL, b()).unwrap());

    let settlement = basket.rebalance(SETTLE_AT).unwrap();
    assert_eq!(settlement.skipped, vec![b()]);
    assert_eq!(basket.creation_unit().quantity(b()), 100);
    assert_eq!(basket.creation_unit().quantity(c()), 150);
    assert_eq!(basket.bank().balance_of(b(), VAULT), 100);
}

#[test]
fn frozen_delivery_token_is_held_in_escrow() {
    let mut basket = basket_with_units(1);
    basket
        .registry_batch_set(MANAGER, &[a(), b()], &[150, 50])
        .unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    fund(&mut basket, a(), BOB, 50);
    basket.bid(BOB, 1, 1, AUCTION_AT).unwrap();
    assert_eq!(basket.bank().balance_of(a(), ESCROW), 50);

    // A, which the bidder delivers, freezes before settlement
    fund(&mut basket, a(), CAROL, 100);
    basket.set_token_paused(a(), true).unwrap();
    assert!(basket.report_frozen_token(CAROL, a()).unwrap());

    let settlement = basket.rebalance(SETTLE_AT).unwrap();
    assert_eq!(settlement.skipped, vec![a()]);
    assert_eq!(settlement.held, vec![(a(), 50)]);
    assert_eq!(basket.creation_unit().quantity(a()), 100);
    assert_eq!(basket.creation_unit().quantity(b()), 50);
    assert_eq!(basket.bank().balance_of(b(), BOB), 50);
    assert_eq!(basket.bank().balance_of(a(), VAULT), 100);
    assert_eq!(basket.bank().balance_of(a(), ESCROW), 50);
    assert_eq!(basket.unclaimed_refund(BOB, a()), 50);
    assert_eq!(basket.snapshot(SETTLE_AT).unclaimed, vec![(BOB, a(), 50)]);

    // the next cycle is not blocked
    basket.propose_rebalance(ALICE, 105).unwrap();
    assert_eq!(basket.status(105), Phase::OptOut);

    assert_eq!(
        basket.claim_refund(BOB, a()),
        Err(BasketError::TokenPaused(a()))
    );
    basket.set_token_paused(a(), false).unwrap();
    assert_eq!(basket.claim_refund(BOB, a()), Ok(50));
    assert_eq!(basket.bank().balance_of(a(), BOB), 50);
    assert_eq!(basket.bank().balance_of(a(), ESCROW), 0);
    assert!(basket.unclaimed_refunds().is_empty());
    assert_eq!(
        basket.claim_refund(BOB, a()),
        Err(BasketError::NothingToClaim {
            owner: BOB,
            token: a()
        })
    );

    let replayed = Basket::replay(config(0), basket.events()).unwrap();
    assert_eq!(replayed.bank().balance_of(a(), BOB), 50);
    assert!(replayed.unclaimed_refunds().is_empty());
}

#[test]
fn lapsed_bid_in_frozen_token_does_not_block_proposal() {
    let mut basket = basket_with_units(1);
    basket
        .registry_batch_set(MANAGER, &[a(), b()], &[150, 50])
        .unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    fund(&mut basket, a(), BOB, 50);
    basket.bid(BOB, 1, 1, AUCTION_AT).unwrap();
    basket.set_token_paused(a(), true).unwrap();

    // settle window passes, then a new proposal retires the stale bid
    basket.propose_rebalance(ALICE, 110).unwrap();
    assert!(basket.best_bid().is_none());
    assert_eq!(basket.unclaimed_refund(BOB, a()), 50);
    assert_eq!(basket.bank().balance_of(a(), ESCROW), 50);

    basket.set_token_paused(a(), false).unwrap();
    assert_eq!(basket.claim_refund(BOB, a()), Ok(50));
}

#[test]
fn lapsed_cycle_refunds_at_next_proposal() {
    let mut basket = basket_with_units(1);
    basket.registry_set(MANAGER, 0, c(), 10).unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    basket.bid(BOB, 1, 1, AUCTION_AT).unwrap();
    assert_eq!(basket.bank().balance_of(c(), ESCROW), 10);

    // settle window passes without a rebalance
    assert_eq!(basket.status(80), Phase::Open);
    assert_eq!(basket.status(110), Phase::Open);

    basket.propose_rebalance(ALICE, 110).unwrap();
    assert_eq!(basket.bank().balance_of(c(), ESCROW), 0);
    assert_eq!(basket.bank().balance_of(c(), BOB), 10_000);
    assert!(basket.best_bid().is_none());
    assert_eq!(basket.status(145), Phase::Auction);
}

#[test]
fn next_cycle_can_rebalance_again() {
    let mut basket = basket_with_units(1);
    basket.registry_set(MANAGER, 0, c(), 10).unwrap();
    basket.propose_rebalance(ALICE, PROPOSE_AT).unwrap();
    basket.bid(BOB, 1, 1, AUCTION_AT).unwrap();
    basket.rebalance(SETTLE_AT).unwrap();

    basket.registry_set(MANAGER, 0, c(), 20).unwrap();
    basket.propose_rebalance(ALICE, 105).unwrap();
    basket.bid(CAROL, 1, 1, 145).unwrap();
    basket.rebalance(165).unwrap();
    assert_eq!(basket.creation_unit().quantity(c()), 20);
}
