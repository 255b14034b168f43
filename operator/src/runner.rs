//! Scenario runner: load state → apply steps → audit → persist.
//!
//! This is the main workflow that ties together all components.

use log::{info, warn};
use nanobskt::{AccountId, Basket, BasketSnapshot, Settlement, Timestamp};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scenario::{Action, Scenario, token, tokens};

/// Options for a scenario run.
pub struct RunOptions {
    /// Apply the steps in memory only; write no audit or event log.
    pub dry_run: bool,
    pub scenario_file: String,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Steps that succeeded.
    pub applied: usize,
    /// Steps that failed as the scenario expected.
    pub rejected: usize,
    pub settlements: Vec<Settlement>,
    /// Basket state at the time of the last step.
    pub snapshot: BasketSnapshot,
}

/// Rebuild the basket from the persisted event log, or start fresh.
pub fn open_basket(config: &Config) -> Result<Basket> {
    let basket_config = config.basket_config()?;
    let path = config.events_path();
    if !path.exists() {
        return Ok(Basket::new(basket_config)?);
    }
    let basket = Basket::load(basket_config, &path).map_err(|e| Error::EventLog {
        path: path.clone(),
        source: e,
    })?;
    info!(
        "Resumed basket from {} ({} events)",
        path.display(),
        basket.events().len()
    );
    Ok(basket)
}

/// Apply one scenario action to the basket.
///
/// Basket failures come back as `Error::Basket`; a rebalance returns its
/// settlement.
pub fn apply_action(
    basket: &mut Basket,
    at: Timestamp,
    action: &Action,
) -> Result<Option<Settlement>> {
    match action {
        Action::Issue { caller, amount } => basket.issue(AccountId(*caller), *amount, at)?,
        Action::Redeem {
            caller,
            amount,
            override_skip,
        } => basket.redeem(AccountId(*caller), *amount, &tokens(override_skip)?, at)?,
        Action::ReportFrozen { caller, token: t } => {
            let frozen = basket.report_frozen_token(AccountId(*caller), token(t)?)?;
            info!("{t} reported {}", if frozen { "frozen" } else { "live" });
        }
        Action::Propose { caller } => basket.propose_rebalance(AccountId(*caller), at)?,
        Action::Bid {
            bidder,
            numerator,
            denominator,
        } => basket.bid(AccountId(*bidder), *numerator, *denominator, at)?,
        Action::Rebalance => return Ok(Some(basket.rebalance(at)?)),
        Action::ClaimRefund { caller, token: t } => {
            let amount = basket.claim_refund(AccountId(*caller), token(t)?)?;
            println!("  claimed {amount} {t}");
        }
        Action::RegistrySet {
            caller,
            index,
            token: t,
            quantity,
        } => basket.registry_set(AccountId(*caller), *index, token(t)?, *quantity)?,
        Action::RegistryBatchSet {
            caller,
            tokens: ts,
            quantities,
        } => basket.registry_batch_set(AccountId(*caller), &tokens(ts)?, quantities)?,
        Action::RegistryRemove { caller, token: t } => {
            basket.registry_remove(AccountId(*caller), token(t)?)?;
        }
        Action::RegistrySetFrozen { caller, tokens: ts } => {
            basket.registry_set_frozen(AccountId(*caller), &tokens(ts)?)?
        }
        Action::RegistryWithdraw {
            caller,
            token: t,
            amount,
        } => basket.registry_withdraw(AccountId(*caller), token(t)?, *amount)?,
        Action::RegistryGet { caller, token: t } => {
            let quantity = basket.registry_get(AccountId(*caller), token(t)?)?;
            println!("  registry {t} = {quantity}");
        }
        Action::RegistryGetQuantities { caller, tokens: ts } => {
            let ts = tokens(ts)?;
            let quantities = basket.registry_get_quantities(AccountId(*caller), &ts)?;
            for (t, quantity) in ts.iter().zip(quantities) {
                println!("  registry {t} = {quantity}");
            }
        }
        Action::RegistryGetAll { caller } => {
            for entry in basket.registry_get_all(AccountId(*caller))? {
                println!("  registry {} = {}", entry.token, entry.quantity);
            }
        }
        Action::ListToken { token: t } => {
            basket.list_token(token(t)?);
        }
        Action::Mint {
            token: t,
            to,
            amount,
        } => basket.mint_underlying(token(t)?, AccountId(*to), *amount)?,
        Action::Approve {
            token: t,
            owner,
            spender,
            amount,
        } => basket.approve_underlying(token(t)?, AccountId(*owner), AccountId(*spender), *amount)?,
        Action::Pause { token: t } => basket.set_token_paused(token(t)?, true)?,
        Action::Unpause { token: t } => basket.set_token_paused(token(t)?, false)?,
    }
    Ok(None)
}

/// Execute a full scenario run.
pub fn run(config: &Config, scenario: &Scenario, opts: &RunOptions) -> Result<RunReport> {
    // 1. Load state
    let mut basket = open_basket(config)?;
    let first = scenario.steps.first().map_or(0, |s| s.at);
    if let Some(last) = basket.last_event_time() {
        if first < last {
            return Err(Error::Scenario(format!(
                "scenario starts at {first}, before the last logged event at {last}"
            )));
        }
    }

    // 2. Open audit log
    let mut audit = if opts.dry_run {
        None
    } else {
        let mut log = AuditLog::open(&config.audit_path())?;
        audit::log_run_started(&mut log, &opts.scenario_file, scenario.steps.len())?;
        Some(log)
    };

    if !scenario.description.is_empty() {
        println!("{}", scenario.description);
    }

    // 3. Apply steps
    let mut applied = 0;
    let mut rejected = 0;
    let mut settlements = Vec::new();

    for (index, step) in scenario.steps.iter().enumerate() {
        let name = step.action.name();
        let result = apply_action(&mut basket, step.at, &step.action);
        if let Some(log) = audit.as_mut() {
            let message = match &result {
                Ok(_) => None,
                Err(Error::Basket(e)) => Some(e.to_string()),
                Err(e) => Some(e.to_string()),
            };
            let outcome = match message.as_deref() {
                Some(msg) => Err(msg),
                None => Ok(()),
            };
            audit::log_step(log, index, step.at, name, outcome)?;
        }

        match (result, &step.expect_error) {
            (Ok(settlement), None) => {
                applied += 1;
                println!("[{:>6}] {name:<20} ok", step.at);
                if let Some(settlement) = settlement {
                    display_settlement(&settlement);
                    if let Some(log) = audit.as_mut() {
                        audit::log_settlement(log, &settlement)?;
                    }
                    settlements.push(settlement);
                }
            }
            (Ok(_), Some(expected)) => {
                return Err(Error::UnexpectedSuccess {
                    index,
                    expected: expected.clone(),
                });
            }
            (Err(Error::Basket(e)), Some(expected)) if e.to_string().contains(expected.as_str()) => {
                rejected += 1;
                println!("[{:>6}] {name:<20} rejected as expected: {e}", step.at);
            }
            (Err(Error::Basket(e)), _) => {
                warn!("Step {index} ({name}) failed: {e}");
                return Err(Error::StepFailed { index, source: e });
            }
            (Err(e), _) => return Err(e),
        }
    }

    // 4. Persist
    let snapshot = basket.snapshot(scenario.end());
    if let Some(log) = audit.as_mut() {
        let path = config.events_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        basket.save(&path).map_err(|e| Error::EventLog {
            path: path.clone(),
            source: e,
        })?;
        audit::log_run_completed(log, applied, rejected, &snapshot)?;
        info!("Saved {} events to {}", basket.events().len(), path.display());
    } else {
        println!("\nDry run: nothing written.");
    }

    println!();
    display_snapshot(&snapshot);

    Ok(RunReport {
        applied,
        rejected,
        settlements,
        snapshot,
    })
}

/// Show the basket's phase and state at `at`.
pub fn show_phase(config: &Config, at: Timestamp) -> Result<BasketSnapshot> {
    let basket = open_basket(config)?;
    let snapshot = basket.snapshot(at);
    display_snapshot(&snapshot);
    Ok(snapshot)
}

/// Validate the config and print the basket it describes.
pub fn check(config: &Config) -> Result<()> {
    let basket_config = config.basket_config()?;
    let s = basket_config.schedule;
    let basket = Basket::new(basket_config.clone())?;

    println!(
        "Basket {} (natural unit {})",
        basket_config.symbol, basket_config.natural_unit
    );
    println!("Creation unit:");
    for (token, quantity) in basket.creation_unit().iter() {
        println!("  {token:<8} {quantity:>24}");
    }
    println!(
        "Schedule: period {}s, offset {}s, opt-out {}s, auction [{}, {}), settle [{}, {})",
        s.period,
        s.phase_offset,
        s.opt_out_duration,
        s.auction_offset,
        s.auction_end(),
        s.auction_end(),
        s.settle_end(),
    );
    let (n, d) = basket_config.max_bid_ratio;
    println!("Max bid ratio: {n}/{d}");
    println!(
        "Registry read fee: {} {}",
        basket_config.fee_amount, basket_config.fee_token
    );

    let path = config.events_path();
    if path.exists() {
        let basket = open_basket(config)?;
        println!("Event log: {} ({} events)", path.display(), basket.events().len());
    } else {
        println!("Event log: {} (not yet created)", path.display());
    }
    Ok(())
}

// ============================================================================
// Display
// ============================================================================

fn display_settlement(settlement: &Settlement) {
    println!(
        "         settled with {} at {}",
        settlement.bid.bidder, settlement.bid.ratio
    );
    for (token, quantity) in settlement.creation_unit.iter() {
        println!("           {token:<8} {quantity:>24}");
    }
    if !settlement.skipped.is_empty() {
        let skipped: Vec<String> = settlement.skipped.iter().map(|t| t.to_string()).collect();
        println!("         skipped (frozen): {}", skipped.join(", "));
    }
    for (token, amount) in &settlement.held {
        println!("         held in escrow: {amount} {token}");
    }
}

fn display_snapshot(snapshot: &BasketSnapshot) {
    println!(
        "t={} cycle {} phase {}",
        snapshot.timestamp, snapshot.cycle, snapshot.phase
    );
    println!(
        "Supply: {} ({} units)",
        snapshot.total_supply, snapshot.total_units
    );
    println!("Creation unit:");
    for (token, quantity) in &snapshot.creation_unit {
        let delta = snapshot
            .delta(*token)
            .map(|d| format!(" ({d:+})"))
            .unwrap_or_default();
        println!("  {token:<8} {quantity:>24}{delta}");
    }
    if !snapshot.skip_list.is_empty() {
        let skipped: Vec<String> = snapshot.skip_list.iter().map(|t| t.to_string()).collect();
        println!("Skip-list: {}", skipped.join(", "));
    }
    if let Some((bidder, n, d)) = snapshot.best_bid {
        println!("Best bid: {bidder} at {n}/{d}");
    }
    for (owner, token, amount) in &snapshot.unclaimed {
        println!("Unclaimed: {amount} {token} for {owner}");
    }
}

