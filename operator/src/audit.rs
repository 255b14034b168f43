//! JSONL audit trail logging.
//!
//! Each operator run appends one line per executed step to an audit.jsonl
//! file, alongside the basket's own event log.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use nanobskt::{BasketSnapshot, Settlement, Timestamp};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, scenario_file: &str, steps: usize) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "scenario_file": scenario_file,
            "steps": steps,
        }),
    )
}

/// Convenience: log one executed step and its outcome.
pub fn log_step(
    audit: &mut AuditLog,
    index: usize,
    at: Timestamp,
    action: &'static str,
    outcome: std::result::Result<(), &str>,
) -> Result<()> {
    let (event, detail) = match outcome {
        Ok(()) => ("step_applied", serde_json::Value::Null),
        Err(msg) => ("step_rejected", serde_json::Value::from(msg)),
    };
    audit.log(
        event,
        serde_json::json!({
            "index": index,
            "at": at,
            "action": action,
            "error": detail,
        }),
    )
}

/// Convenience: log a settled auction.
pub fn log_settlement(audit: &mut AuditLog, settlement: &Settlement) -> Result<()> {
    let unit: Vec<_> = settlement
        .creation_unit
        .iter()
        .map(|(token, quantity)| {
            serde_json::json!({
                "token": token.as_str(),
                "quantity": quantity.to_string(),
            })
        })
        .collect();
    let skipped: Vec<&str> = settlement.skipped.iter().map(|t| t.as_str()).collect();
    let held: Vec<_> = settlement
        .held
        .iter()
        .map(|(token, amount)| {
            serde_json::json!({
                "token": token.as_str(),
                "amount": amount.to_string(),
            })
        })
        .collect();

    audit.log(
        "rebalance_settled",
        serde_json::json!({
            "bidder": settlement.bid.bidder.0,
            "ratio": settlement.bid.ratio.to_string(),
            "creation_unit": unit,
            "skipped": skipped,
            "held": held,
        }),
    )
}

/// Convenience: log run completion with the final basket state.
pub fn log_run_completed(
    audit: &mut AuditLog,
    applied: usize,
    rejected: usize,
    snapshot: &BasketSnapshot,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "applied": applied,
            "rejected": rejected,
            "phase": snapshot.phase.to_string(),
            "total_supply": snapshot.total_supply.to_string(),
        }),
    )
}
