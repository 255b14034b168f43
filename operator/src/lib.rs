//! nanobskt-operator: scripted driver for nanobskt baskets.
//!
//! Reads the basket definition from a TOML file, replays any saved event
//! log, applies a JSON scenario of timed steps, and writes a JSONL audit
//! trail next to the updated event log.

pub mod audit;
pub mod config;
pub mod error;
pub mod runner;
pub mod scenario;
