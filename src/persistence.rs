//! File-based persistence via JSON Lines event sourcing.
//!
//! Events are stored as one JSON object per line (`.jsonl` format). The
//! config is not part of the log; loading replays the events against the
//! config the caller supplies.
//!
//! # Usage
//!
//! ```ignore
//! use std::path::Path;
//!
//! basket.save(Path::new("basket.jsonl")).unwrap();
//! let basket = Basket::load(config, Path::new("basket.jsonl")).unwrap();
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::event::Event;
use crate::{Basket, BasketConfig};

/// Save events to a file in JSON Lines format.
pub fn save_events(events: &[Event], path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);

    for event in events {
        let json = serde_json::to_string(event).map_err(io::Error::other)?;
        writeln!(writer, "{json}")?;
    }

    writer.flush()?;
    Ok(())
}

/// Load events from a JSON Lines file. Empty lines are skipped.
pub fn load_events(path: &Path) -> io::Result<Vec<Event>> {
    let file = std::fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let mut events = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", line_num + 1, e),
            )
        })?;
        events.push(event);
    }

    Ok(events)
}

impl Basket {
    /// Save the basket's event log to a file.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        save_events(self.events(), path)
    }

    /// Rebuild a basket from `config` and a saved event log.
    pub fn load(config: BasketConfig, path: &Path) -> io::Result<Self> {
        let events = load_events(path)?;
        Self::replay(config, &events)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
