//! Persistent word-map: a value ↔ id bijection.
//!
//! The map has two phases. During *build*, [`WordMap::get_or_add`] assigns
//! fresh ids and callers need exclusive access. During *lookup*, only
//! [`WordMap::get`] is used and the map can be shared read-only across
//! workers. The map is an injected handle, not a singleton: load it (or
//! start empty) at startup and flush it at teardown.
//!
//! Persistence format: one record per line, `id\tvalue`, sorted by id on
//! write. On load, malformed lines are skipped; ids need not be
//! contiguous.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::debug;

/// A value → id bijection with monotonically assigned ids.
#[derive(Debug, Clone, Default)]
pub struct WordMap {
    forward: HashMap<String, u64>,
    next_id: u64,
}

impl WordMap {
    /// Empty map; the first assigned id is 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a map from an `id\tvalue` file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read; malformed lines are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open word-map {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Read a map from any line source; malformed lines are skipped.
    ///
    /// # Errors
    ///
    /// Fails only on I/O errors from the reader.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut map = Self::new();
        for line in reader.lines() {
            let line = line.context("read word-map line")?;
            let mut parts = line.splitn(2, '\t');
            let (Some(id), Some(value)) = (parts.next(), parts.next()) else {
                debug!(line = %line, "skipping malformed word-map line");
                continue;
            };
            let Ok(id) = id.trim().parse::<u64>() else {
                debug!(line = %line, "skipping word-map line with non-numeric id");
                continue;
            };
            map.forward.insert(value.trim_end().to_string(), id);
            map.next_id = map.next_id.max(id + 1);
        }
        Ok(map)
    }

    /// Existing id of a value, if any.
    #[must_use]
    pub fn get(&self, value: &str) -> Option<u64> {
        self.forward.get(value).copied()
    }

    /// Id of a value, assigning the next free id when absent.
    pub fn get_or_add(&mut self, value: &str) -> u64 {
        if let Some(id) = self.forward.get(value) {
            return *id;
        }
        let id = self.next_id;
        self.forward.insert(value.to_string(), id);
        self.next_id += 1;
        id
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// True when the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Write the map as `id\tvalue` lines sorted by id.
    ///
    /// # Errors
    ///
    /// Fails on write errors.
    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        let mut entries: Vec<(u64, &str)> = self
            .forward
            .iter()
            .map(|(value, &id)| (id, value.as_str()))
            .collect();
        entries.sort_unstable();
        for (id, value) in entries {
            writeln!(writer, "{id}\t{value}").context("write word-map entry")?;
        }
        Ok(())
    }

    /// Flush the map to a file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("create word-map {}", path.display()))?;
        self.write_to(std::io::BufWriter::new(file))
    }
}
