//! Basket: the entry point for issuance, the weight registry, and the
//! rebalance auction.
//!
//! The basket owns every piece of mutable state: the token bank holding
//! underlying balances, the weight registry, the basket-token ledger, and the
//! rebalance cycle with its escrow. Each entry point takes `&mut self`, runs
//! its checks, moves tokens in one atomic bank batch, and only then updates
//! internal state.

use log::{debug, info, warn};

use crate::{
    AccountId, Amount, BasketError, Phase, Ratio, Result, SignedAmount, Timestamp, TokenId,
    bank::{LedgerOp, TokenBank},
    cycle::RebalanceCycle,
    delta::{PendingDelta, compute_delta},
    escrow::{Bid, Settlement},
    event::Event,
    ledger::BasketLedger,
    registry::{WeightEntry, WeightRegistry},
    schedule::Schedule,
    snapshot::BasketSnapshot,
    unit::CreationUnit,
};

/// Static configuration of a basket.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasketConfig {
    /// Ticker of the basket token itself.
    pub symbol: TokenId,
    /// Smallest issuable amount; every issue/redeem is a multiple of it.
    pub natural_unit: Amount,
    /// Cap on bid ratios, as numerator/denominator.
    pub max_bid_ratio: (u128, u128),
    pub schedule: Schedule,
    /// Holds underlying tokens; the spender for issue and bid pulls.
    pub basket_account: AccountId,
    /// Holds the best bid's collateral.
    pub escrow_account: AccountId,
    /// The registry's own account; the spender for read fees.
    pub registry_account: AccountId,
    pub data_manager: AccountId,
    pub fee_token: TokenId,
    pub fee_amount: Amount,
    /// Initial creation unit.
    pub creation_unit: Vec<(TokenId, Amount)>,
}

impl BasketConfig {
    /// Check everything `Basket::new` relies on.
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        if self.natural_unit == 0 {
            return Err(BasketError::InvalidConfig(
                "natural_unit must be positive".into(),
            ));
        }
        let (n, d) = self.max_bid_ratio;
        if Ratio::new(n, d).is_none() {
            return Err(BasketError::InvalidConfig(format!(
                "max_bid_ratio {n}/{d} must have positive parts"
            )));
        }
        let system = [
            self.basket_account,
            self.escrow_account,
            self.registry_account,
        ];
        if system[0] == system[1] || system[0] == system[2] || system[1] == system[2] {
            return Err(BasketError::InvalidConfig(
                "basket, escrow and registry accounts must be distinct".into(),
            ));
        }
        if system.contains(&self.data_manager) {
            return Err(BasketError::InvalidConfig(
                "data manager cannot be a system account".into(),
            ));
        }
        CreationUnit::new(self.creation_unit.clone()).map(|_| ())
    }
}

/// A rebalancing basket token.
///
/// ```
/// use nanobskt::{AccountId, Basket, BasketConfig, Phase, Schedule, TokenId};
///
/// let weth = TokenId::new("WETH");
/// let config = BasketConfig {
///     symbol: TokenId::new("BSKT"),
///     natural_unit: 10,
///     max_bid_ratio: (2, 1),
///     schedule: Schedule::new(100, 0, 20, 40, 20, 20).unwrap(),
///     basket_account: AccountId(1000),
///     escrow_account: AccountId(1001),
///     registry_account: AccountId(1002),
///     data_manager: AccountId(7),
///     fee_token: TokenId::new("FEE"),
///     fee_amount: 0,
///     creation_unit: vec![(weth, 5)],
/// };
/// let mut basket = Basket::new(config).unwrap();
///
/// let alice = AccountId(1);
/// basket.mint_underlying(weth, alice, 50).unwrap();
/// basket.approve_underlying(weth, alice, AccountId(1000), 50).unwrap();
/// basket.issue(alice, 20, 0).unwrap();
///
/// assert_eq!(basket.balance_of(alice), 20);
/// assert_eq!(basket.total_units(), 2);
/// assert_eq!(basket.status(0), Phase::Open);
/// ```
#[derive(Clone, Debug)]
pub struct Basket {
    pub(crate) config: BasketConfig,
    pub(crate) bank: TokenBank,
    pub(crate) registry: WeightRegistry,
    pub(crate) ledger: BasketLedger,
    pub(crate) cycle: RebalanceCycle,
    pub(crate) max_bid_ratio: Ratio,
    /// Accepted inputs, in order (only with "event-log" feature)
    #[cfg(feature = "event-log")]
    pub(crate) events: Vec<Event>,
}

impl Basket {
    /// Create a basket with no supply and an empty registry.
    ///
    /// Every creation-unit token and the fee token get a ledger in the bank.
    pub fn new(config: BasketConfig) -> Result<Self> {
        config.validate()?;
        let unit = CreationUnit::new(config.creation_unit.clone())?;
        let (n, d) = config.max_bid_ratio;
        let max_bid_ratio = Ratio::new(n, d).ok_or_else(|| {
            BasketError::InvalidConfig(format!("max_bid_ratio {n}/{d} must have positive parts"))
        })?;

        let mut bank = TokenBank::new();
        bank.list(config.fee_token);
        for token in unit.tokens() {
            bank.list(token);
        }

        Ok(Self {
            bank,
            registry: WeightRegistry::new(
                config.registry_account,
                config.data_manager,
                config.fee_token,
                config.fee_amount,
            ),
            ledger: BasketLedger::new(
                config.symbol,
                config.basket_account,
                config.natural_unit,
                unit,
            )?,
            cycle: RebalanceCycle::new(config.schedule, config.escrow_account),
            max_bid_ratio,
            config,
            #[cfg(feature = "event-log")]
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &BasketConfig {
        &self.config
    }

    #[inline]
    fn record(&mut self, event: Event) {
        #[cfg(feature = "event-log")]
        self.events.push(event);
        #[cfg(not(feature = "event-log"))]
        let _ = event;
    }

    // === Issuance ===

    /// Issue `amount` basket tokens to `caller` against the creation unit.
    ///
    /// Accepted in Open and OptOut. `caller` must have approved the basket
    /// account for each underlying amount.
    pub fn issue(&mut self, caller: AccountId, amount: Amount, now: Timestamp) -> Result<()> {
        self.issue_internal(caller, amount, now)?;
        self.record(Event::Issue { caller, amount, at: now });
        Ok(())
    }

    /// Burn `amount` basket tokens and pay out the underlying.
    ///
    /// Skip-listed tokens are withheld unless listed in `override_skip`.
    pub fn redeem(
        &mut self,
        caller: AccountId,
        amount: Amount,
        override_skip: &[TokenId],
        now: Timestamp,
    ) -> Result<()> {
        self.redeem_internal(caller, amount, override_skip, now)?;
        self.record(Event::Redeem {
            caller,
            amount,
            override_skip: override_skip.to_vec(),
            at: now,
        });
        Ok(())
    }

    /// Sync `token`'s skip-list membership with its pause flag.
    ///
    /// Returns true if the token is now skipped.
    pub fn report_frozen_token(&mut self, caller: AccountId, token: TokenId) -> Result<bool> {
        let frozen = self.report_frozen_token_internal(caller, token)?;
        self.record(Event::ReportFrozenToken { caller, token });
        Ok(frozen)
    }

    // === Rebalance cycle ===

    /// Pin the registry's current targets as this cycle's rebalance.
    ///
    /// The registry read fee is paid from basket holdings.
    pub fn propose_rebalance(&mut self, caller: AccountId, now: Timestamp) -> Result<()> {
        self.propose_rebalance_internal(caller, now)?;
        self.record(Event::ProposeRebalance { caller, at: now });
        Ok(())
    }

    /// Offer to execute the pending rebalance at `numerator / denominator`.
    ///
    /// Replaces the escrowed bid only if the ratio is strictly greater.
    pub fn bid(
        &mut self,
        bidder: AccountId,
        numerator: u128,
        denominator: u128,
        now: Timestamp,
    ) -> Result<()> {
        self.bid_internal(bidder, numerator, denominator, now)?;
        self.record(Event::Bid {
            bidder,
            numerator,
            denominator,
            at: now,
        });
        Ok(())
    }

    /// Execute the best bid and install the new creation unit.
    pub fn rebalance(&mut self, now: Timestamp) -> Result<Settlement> {
        let settlement = self.rebalance_internal(now)?;
        self.record(Event::Rebalance { at: now });
        Ok(settlement)
    }

    /// Pay out bid collateral that was held in escrow while `token` was
    /// paused. Allowed in every phase.
    pub fn claim_refund(&mut self, caller: AccountId, token: TokenId) -> Result<Amount> {
        let amount = self.cycle.claim_refund(&mut self.bank, caller, token)?;
        info!("{caller} claimed {amount} {token} from escrow");
        self.record(Event::ClaimRefund { caller, token });
        Ok(amount)
    }

    // === Registry writes ===

    pub fn registry_set(
        &mut self,
        caller: AccountId,
        index: usize,
        token: TokenId,
        quantity: Amount,
    ) -> Result<()> {
        self.registry.set(caller, index, token, quantity)?;
        self.record(Event::RegistrySet {
            caller,
            index,
            token,
            quantity,
        });
        Ok(())
    }

    pub fn registry_batch_set(
        &mut self,
        caller: AccountId,
        tokens: &[TokenId],
        quantities: &[Amount],
    ) -> Result<()> {
        self.registry.batch_set(caller, tokens, quantities)?;
        self.record(Event::RegistryBatchSet {
            caller,
            tokens: tokens.to_vec(),
            quantities: quantities.to_vec(),
        });
        Ok(())
    }

    pub fn registry_remove(&mut self, caller: AccountId, token: TokenId) -> Result<bool> {
        let removed = self.registry.remove(caller, token)?;
        self.record(Event::RegistryRemove { caller, token });
        Ok(removed)
    }

    pub fn registry_set_frozen(&mut self, caller: AccountId, tokens: &[TokenId]) -> Result<()> {
        self.registry.set_frozen(caller, tokens)?;
        self.record(Event::RegistrySetFrozen {
            caller,
            tokens: tokens.to_vec(),
        });
        Ok(())
    }

    pub fn registry_withdraw(
        &mut self,
        caller: AccountId,
        token: TokenId,
        amount: Amount,
    ) -> Result<()> {
        self.registry
            .withdraw_tokens(&mut self.bank, caller, token, amount)?;
        self.record(Event::RegistryWithdraw {
            caller,
            token,
            amount,
        });
        Ok(())
    }

    // === Registry reads (fee-gated) ===

    pub fn registry_get(&mut self, caller: AccountId, token: TokenId) -> Result<Amount> {
        let quantity = self.registry.get(&mut self.bank, caller, token)?;
        self.record(Event::RegistryGet { caller, token });
        Ok(quantity)
    }

    pub fn registry_get_quantities(
        &mut self,
        caller: AccountId,
        tokens: &[TokenId],
    ) -> Result<Vec<Amount>> {
        let quantities = self
            .registry
            .get_quantities(&mut self.bank, caller, tokens)?;
        self.record(Event::RegistryGetQuantities {
            caller,
            tokens: tokens.to_vec(),
        });
        Ok(quantities)
    }

    pub fn registry_get_all(&mut self, caller: AccountId) -> Result<Vec<WeightEntry>> {
        let entries = self.registry.get_all_quantities(&mut self.bank, caller)?;
        self.record(Event::RegistryGetAll { caller });
        Ok(entries)
    }

    // === Underlying token setup ===

    /// Create a ledger for `token` in the bank. Returns false if it existed.
    pub fn list_token(&mut self, token: TokenId) -> bool {
        let listed = self.bank.list(token);
        self.record(Event::ListToken { token });
        listed
    }

    pub fn mint_underlying(&mut self, token: TokenId, to: AccountId, amount: Amount) -> Result<()> {
        self.bank.mint(token, to, amount)?;
        self.record(Event::MintUnderlying { token, to, amount });
        Ok(())
    }

    pub fn approve_underlying(
        &mut self,
        token: TokenId,
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.bank.execute(&[LedgerOp::Approve {
            token,
            owner,
            spender,
            amount,
        }])?;
        self.record(Event::ApproveUnderlying {
            token,
            owner,
            spender,
            amount,
        });
        Ok(())
    }

    pub fn set_token_paused(&mut self, token: TokenId, paused: bool) -> Result<()> {
        self.bank.set_paused(token, paused)?;
        self.record(Event::SetTokenPaused { token, paused });
        Ok(())
    }

    // === Views ===

    pub fn creation_unit(&self) -> &CreationUnit {
        self.ledger.creation_unit()
    }

    /// Deltas of the most recent proposal, if any.
    pub fn rebalance_deltas(&self) -> Option<&PendingDelta> {
        self.cycle.proposal().map(|p| &p.delta)
    }

    pub fn delta_tokens(&self) -> Vec<TokenId> {
        self.rebalance_deltas()
            .map(PendingDelta::tokens)
            .unwrap_or_default()
    }

    pub fn delta_quantities(&self) -> Vec<SignedAmount> {
        self.rebalance_deltas()
            .map(PendingDelta::deltas)
            .unwrap_or_default()
    }

    pub fn tokens_to_skip(&self) -> Vec<TokenId> {
        self.ledger.tokens_to_skip()
    }

    pub fn status(&self, now: Timestamp) -> Phase {
        self.cycle.status(now)
    }

    pub fn total_units(&self) -> Amount {
        self.ledger.total_units()
    }

    pub fn creation_size(&self) -> Amount {
        self.ledger.creation_size()
    }

    pub fn best_bid(&self) -> Option<&Bid> {
        self.cycle.escrow().best()
    }

    /// Collateral in `token` held in escrow for `owner`.
    pub fn unclaimed_refund(&self, owner: AccountId, token: TokenId) -> Amount {
        self.cycle.escrow().unclaimed(owner, token)
    }

    pub fn unclaimed_refunds(&self) -> Vec<(AccountId, TokenId, Amount)> {
        self.cycle.escrow().unclaimed_refunds()
    }

    /// Basket-token balance of `owner`.
    pub fn balance_of(&self, owner: AccountId) -> Amount {
        self.ledger.balance_of(owner)
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn bank(&self) -> &TokenBank {
        &self.bank
    }

    pub fn registry(&self) -> &WeightRegistry {
        &self.registry
    }

    pub fn snapshot(&self, now: Timestamp) -> BasketSnapshot {
        BasketSnapshot {
            timestamp: now,
            phase: self.status(now),
            cycle: self.cycle.schedule().cycle(now),
            total_supply: self.total_supply(),
            total_units: self.total_units(),
            creation_unit: self.creation_unit().iter().copied().collect(),
            skip_list: self.tokens_to_skip(),
            best_bid: self
                .best_bid()
                .map(|b| (b.bidder, b.ratio.numerator(), b.ratio.denominator())),
            deltas: self
                .rebalance_deltas()
                .map(|d| d.entries().to_vec())
                .unwrap_or_default(),
            unclaimed: self.unclaimed_refunds(),
        }
    }

    // === Internal ===

    fn require_issuance(&self, operation: &'static str, now: Timestamp) -> Result<()> {
        let phase = self.status(now);
        if !phase.allows_issuance() {
            return Err(BasketError::PhaseViolation { operation, phase });
        }
        Ok(())
    }

    fn issue_internal(
        &mut self,
        caller: AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        self.require_issuance("issue", now)?;
        self.ledger.issue(&mut self.bank, caller, amount)?;
        debug!("{caller} issued {amount} {}", self.ledger.symbol());
        Ok(())
    }

    fn redeem_internal(
        &mut self,
        caller: AccountId,
        amount: Amount,
        override_skip: &[TokenId],
        now: Timestamp,
    ) -> Result<()> {
        self.require_issuance("redeem", now)?;
        self.ledger
            .redeem(&mut self.bank, caller, amount, override_skip)?;
        debug!("{caller} redeemed {amount} {}", self.ledger.symbol());
        Ok(())
    }

    fn report_frozen_token_internal(
        &mut self,
        caller: AccountId,
        token: TokenId,
    ) -> Result<bool> {
        let frozen = self.ledger.report_frozen_token(&self.bank, caller, token)?;
        info!("{caller} reported {token}: skipped={frozen}");
        Ok(frozen)
    }

    fn propose_rebalance_internal(
        &mut self,
        caller: AccountId,
        now: Timestamp,
    ) -> Result<()> {
        self.cycle.ensure_can_propose(now)?;
        let delta = compute_delta(
            self.ledger.creation_unit(),
            self.registry.entries(),
            self.ledger.total_units(),
        )?;
        if delta.is_degenerate() {
            return Err(BasketError::DegenerateProposal);
        }

        let basket = self.ledger.account();
        let refund = self.cycle.stale_refund(&self.bank)?;
        let mut ops = refund.ops;
        if let Some(fee) = self.registry.fee_op(basket) {
            let (fee_token, fee_amount) = self.registry.fee();
            ops.push(LedgerOp::Approve {
                token: fee_token,
                owner: basket,
                spender: self.registry.account(),
                amount: fee_amount,
            });
            ops.push(fee);
        }
        self.bank.execute(&ops)?;

        let cycle = self.cycle.schedule().cycle(now);
        info!(
            "{caller} proposed rebalance for cycle {cycle}: {} tokens",
            delta.len()
        );
        self.cycle.install(now, delta, &refund.held);
        Ok(())
    }

    fn bid_internal(
        &mut self,
        bidder: AccountId,
        numerator: u128,
        denominator: u128,
        now: Timestamp,
    ) -> Result<()> {
        let phase = self.status(now);
        if phase != Phase::Auction {
            return Err(BasketError::PhaseViolation {
                operation: "bid",
                phase,
            });
        }
        let ratio = Ratio::new(numerator, denominator).ok_or(BasketError::InvalidRatio {
            numerator,
            denominator,
            reason: "numerator and denominator must be positive",
        })?;
        if ratio > self.max_bid_ratio {
            return Err(BasketError::InvalidRatio {
                numerator,
                denominator,
                reason: "exceeds the maximum bid ratio",
            });
        }

        self.cycle.bid(
            &mut self.bank,
            now,
            self.ledger.account(),
            bidder,
            ratio,
            self.ledger.total_units(),
            self.ledger.skip_list(),
        )?;
        info!("{bidder} is best bidder at {ratio}");
        Ok(())
    }

    fn rebalance_internal(&mut self, now: Timestamp) -> Result<Settlement> {
        let settlement = self.cycle.rebalance(
            &mut self.bank,
            now,
            self.ledger.account(),
            self.ledger.total_units(),
            self.ledger.skip_list(),
        )?;
        self.ledger
            .set_creation_unit(settlement.creation_unit.clone());
        info!(
            "rebalanced with {} at {}: {} tokens, {} skipped",
            settlement.bid.bidder,
            settlement.bid.ratio,
            settlement.creation_unit.len(),
            settlement.skipped.len()
        );
        for (token, amount) in &settlement.held {
            warn!(
                "{amount} {token} held in escrow for {}: token is paused",
                settlement.bid.bidder
            );
        }
        Ok(settlement)
    }
}
