//! Rebalance clock: maps wall-clock time to a cycle and a window within it.

use crate::Timestamp;
use crate::error::{BasketError, Result};

/// Where a position inside a cycle falls relative to the auction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    /// Before the auction opens.
    Lead,
    Auction,
    Settle,
    /// After the settle window, until the next cycle starts.
    Closed,
}

/// Fixed periodic schedule, all values in seconds.
///
/// Cycle `k >= 1` starts at `phase_offset + (k - 1) * period`. Times before
/// `phase_offset` belong to cycle 0, treated as the tail of a cycle that
/// started `period` seconds before the offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schedule {
    pub period: u64,
    pub phase_offset: u64,
    pub opt_out_duration: u64,
    pub auction_offset: u64,
    pub auction_duration: u64,
    pub settle_duration: u64,
}

impl Schedule {
    /// Build and validate a schedule.
    pub fn new(
        period: u64,
        phase_offset: u64,
        opt_out_duration: u64,
        auction_offset: u64,
        auction_duration: u64,
        settle_duration: u64,
    ) -> Result<Self> {
        let schedule = Self {
            period,
            phase_offset,
            opt_out_duration,
            auction_offset,
            auction_duration,
            settle_duration,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(BasketError::InvalidSchedule(msg));
        if self.period == 0 {
            return fail("period must be positive".into());
        }
        if self.phase_offset >= self.period {
            return fail(format!(
                "phase_offset {} must be less than period {}",
                self.phase_offset, self.period
            ));
        }
        if self.opt_out_duration == 0 || self.auction_duration == 0 || self.settle_duration == 0 {
            return fail("opt-out, auction and settle durations must be positive".into());
        }
        if self.opt_out_duration > self.auction_offset {
            return fail(format!(
                "opt_out_duration {} exceeds auction_offset {}",
                self.opt_out_duration, self.auction_offset
            ));
        }
        let end = self
            .auction_offset
            .checked_add(self.auction_duration)
            .and_then(|t| t.checked_add(self.settle_duration));
        match end {
            Some(end) if end <= self.period => Ok(()),
            _ => fail(format!(
                "auction and settle windows end past period {}",
                self.period
            )),
        }
    }

    /// Index of the cycle containing `now`.
    pub fn cycle(&self, now: Timestamp) -> u64 {
        if now < self.phase_offset {
            0
        } else {
            1 + (now - self.phase_offset) / self.period
        }
    }

    /// Seconds since the start of the cycle containing `now`.
    pub fn position(&self, now: Timestamp) -> u64 {
        if now < self.phase_offset {
            self.period - (self.phase_offset - now)
        } else {
            (now - self.phase_offset) % self.period
        }
    }

    /// Position at which the auction closes and settlement opens.
    pub fn auction_end(&self) -> u64 {
        self.auction_offset + self.auction_duration
    }

    /// Position at which the settle window closes.
    pub fn settle_end(&self) -> u64 {
        self.auction_end() + self.settle_duration
    }

    pub fn window(&self, position: u64) -> Window {
        if position < self.auction_offset {
            Window::Lead
        } else if position < self.auction_end() {
            Window::Auction
        } else if position < self.settle_end() {
            Window::Settle
        } else {
            Window::Closed
        }
    }

    /// True if a proposal at `position` leaves a full opt-out window.
    pub fn can_propose_at(&self, position: u64) -> bool {
        position.saturating_add(self.opt_out_duration) <= self.auction_offset
    }
}
