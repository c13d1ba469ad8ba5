//! Vocabulary extraction from labeled DMRS streams.
//!
//! Counts `label` attributes over nodes and links (or `carg` attributes,
//! for the constant-argument vocabulary) and writes `value\tcount` lines
//! sorted by count descending. Ties are ordered by value ascending so two
//! runs over the same corpus produce byte-identical output.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;

use crate::model::Graph;

/// Frequency counter over graph label attributes.
#[derive(Debug, Default)]
pub struct Vocab {
    counts: HashMap<String, u64>,
}

impl Vocab {
    /// Empty vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the node and link labels of one graph.
    pub fn record(&mut self, graph: &Graph) {
        for node in &graph.nodes {
            if let Some(label) = &node.label {
                *self.counts.entry(label.clone()).or_insert(0) += 1;
            }
        }
        for edge in &graph.edges {
            if let Some(label) = &edge.label {
                *self.counts.entry(label.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Count the `carg` attributes of one graph.
    pub fn record_cargs(&mut self, graph: &Graph) {
        for node in &graph.nodes {
            if let Some(carg) = &node.carg {
                *self.counts.entry(carg.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Merge counts from a `value\tcount` vocabulary line, if well-formed.
    ///
    /// Used when building a word-map from concatenated vocabulary files;
    /// malformed lines are ignored.
    pub fn merge_line(&mut self, line: &str) {
        let mut parts = line.rsplitn(2, '\t');
        let (Some(count), Some(value)) = (parts.next(), parts.next()) else {
            return;
        };
        if let Ok(count) = count.trim().parse::<u64>() {
            *self.counts.entry(value.to_string()).or_insert(0) += count;
        }
    }

    /// Entries sorted by count descending, then value ascending.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(value, &count)| (value.as_str(), count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True when nothing has been counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Write `value\tcount` lines in sorted order.
    ///
    /// # Errors
    ///
    /// Fails on write errors.
    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        for (value, count) in self.sorted() {
            writeln!(writer, "{value}\t{count}").context("write vocab entry")?;
        }
        Ok(())
    }
}
