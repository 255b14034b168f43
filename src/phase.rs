//! Rebalance cycle phase: Open, OptOut, Auction, Settle

use std::fmt;

/// Phase of the rebalance cycle, derived from wall-clock time.
///
/// | Phase | Accepts |
/// |-------|---------|
/// | **Open** | issue, redeem, propose_rebalance |
/// | **OptOut** | issue, redeem |
/// | **Auction** | bid |
/// | **Settle** | rebalance |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    Open,
    OptOut,
    Auction,
    Settle,
}

impl Phase {
    /// Returns true if issue/redeem may run in this phase.
    #[inline]
    pub fn allows_issuance(self) -> bool {
        matches!(self, Phase::Open | Phase::OptOut)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Open => write!(f, "OPEN"),
            Phase::OptOut => write!(f, "OPT_OUT"),
            Phase::Auction => write!(f, "AUCTION"),
            Phase::Settle => write!(f, "SETTLE"),
        }
    }
}
