//! Safety tests: input validation, extreme values, non-panicking behavior.

use nanobskt::{
    AccountId, Basket, BasketConfig, BasketError, CreationUnit, Ratio, Schedule, TokenId,
};

// ============================================================================
// TokenId::from_str_truncated
// ============================================================================

#[test]
fn token_truncated_empty() {
    let token = TokenId::from_str_truncated("");
    assert_eq!(token.as_str(), "");
}

#[test]
fn token_truncated_exact_8() {
    let token = TokenId::from_str_truncated("12345678");
    assert_eq!(token.as_str(), "12345678");
}

#[test]
fn token_truncated_9_bytes() {
    let token = TokenId::from_str_truncated("123456789");
    assert_eq!(token.as_str(), "12345678");
}

#[test]
fn token_truncated_long_string() {
    let token = TokenId::from_str_truncated("VERYLONGTICKERNAME");
    assert_eq!(token.as_str(), "VERYLONG");
}

#[test]
fn token_truncated_unicode_boundary() {
    // "Ω" is 2 bytes; cutting at 8 would split it, so back up to 7.
    let token = TokenId::from_str_truncated("1234567Ω");
    assert_eq!(token.as_str(), "1234567");
}

#[test]
fn token_try_new_rejects_long() {
    assert!(TokenId::try_new("123456789").is_none());
    assert_eq!(TokenId::try_new("WBTC"), Some(TokenId::new("WBTC")));
}

#[test]
fn token_display_pads() {
    assert_eq!(format!("{:>6}", TokenId::new("ETH")), "   ETH");
}

// ============================================================================
// Ratio
// ============================================================================

#[test]
fn ratio_extremes_compare_without_overflow() {
    let huge = Ratio::new(u128::MAX, 1).unwrap();
    let tiny = Ratio::new(1, u128::MAX).unwrap();
    assert!(tiny < Ratio::ONE);
    assert!(huge > Ratio::ONE);
    assert_eq!(
        Ratio::new(u128::MAX, u128::MAX).unwrap(),
        Ratio::ONE
    );
}

#[test]
fn ratio_floor_mul_overflow_is_none() {
    let huge = Ratio::new(u128::MAX, 1).unwrap();
    assert_eq!(huge.floor_mul(2), None);
    assert_eq!(Ratio::new(i128::MAX as u128, 1).unwrap().floor_mul(2), None);
}

// ============================================================================
// Arithmetic limits
// ============================================================================

fn config(natural_unit: u128, quantity: u128) -> BasketConfig {
    BasketConfig {
        symbol: TokenId::new("BSKT"),
        natural_unit,
        max_bid_ratio: (2, 1),
        schedule: Schedule::new(100, 0, 20, 40, 20, 20).unwrap(),
        basket_account: AccountId(1000),
        escrow_account: AccountId(1001),
        registry_account: AccountId(1002),
        data_manager: AccountId(7),
        fee_token: TokenId::new("FEE"),
        fee_amount: 0,
        creation_unit: vec![(TokenId::new("A"), quantity)],
    }
}

#[test]
fn huge_issue_overflows_cleanly() {
    let mut basket = Basket::new(config(1, u128::MAX / 2)).unwrap();
    assert_eq!(
        basket.issue(AccountId(1), 3, 0),
        Err(BasketError::Overflow)
    );
    assert_eq!(basket.total_supply(), 0);
}

#[test]
fn eighteen_decimal_quantities() {
    let unit = 10u128.pow(18);
    let mut basket = Basket::new(config(unit, 31_200 * unit)).unwrap();
    let a = TokenId::new("A");
    let alice = AccountId(1);
    basket.mint_underlying(a, alice, 31_200 * unit * 5).unwrap();
    basket
        .approve_underlying(a, alice, AccountId(1000), 31_200 * unit * 5)
        .unwrap();
    basket.issue(alice, 5 * unit, 0).unwrap();
    assert_eq!(basket.total_units(), 5);
    assert_eq!(basket.creation_size(), unit);
}

#[test]
fn mint_overflow_is_an_error() {
    let mut basket = Basket::new(config(1, 1)).unwrap();
    let a = TokenId::new("A");
    basket.mint_underlying(a, AccountId(1), u128::MAX).unwrap();
    assert_eq!(
        basket.mint_underlying(a, AccountId(2), 1),
        Err(BasketError::Overflow)
    );
}

// ============================================================================
// Config validation
// ============================================================================

#[test]
fn zero_natural_unit_rejected() {
    assert!(matches!(
        Basket::new(config(0, 1)),
        Err(BasketError::InvalidConfig(_))
    ));
}

#[test]
fn duplicate_unit_token_rejected() {
    let a = TokenId::new("A");
    assert!(CreationUnit::new(vec![(a, 1), (a, 2)]).is_err());
    let mut cfg = config(1, 1);
    cfg.creation_unit.push((a, 5));
    assert!(Basket::new(cfg).is_err());
}

#[test]
fn data_manager_cannot_be_vault() {
    let mut cfg = config(1, 1);
    cfg.data_manager = cfg.basket_account;
    assert!(Basket::new(cfg).is_err());
}

#[test]
fn errors_are_displayable() {
    let err = BasketError::Overdraw {
        token: TokenId::new("A"),
        candidate: -5,
    };
    assert_eq!(
        err.to_string(),
        "bid would overdraw A: candidate quantity -5 is negative"
    );
    let err = BasketError::InvalidRatio {
        numerator: 3,
        denominator: 1,
        reason: "exceeds the maximum bid ratio",
    };
    assert!(err.to_string().contains("3/1"));
}
