//! Breakpoint table built from `[split.queries]`.

use std::collections::BTreeMap;

/// Placeholder replaced with the source asset's base name.
pub const NAME_PLACEHOLDER: &str = "[name]";

/// A configured max-width threshold and the partition it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub threshold: u32,
    /// Partition name template, e.g. `[name]-mobile.css`.
    pub partition_name: String,
}

impl Breakpoint {
    /// Output asset name for a source base name (source name without `.css`).
    pub fn asset_name(&self, base_name: &str) -> String {
        self.partition_name.replacen(NAME_PLACEHOLDER, base_name, 1)
    }

    /// Canonical media condition for this breakpoint.
    pub fn media_query(&self, unit: &str) -> String {
        format!("(max-width: {}{})", self.threshold, unit)
    }
}

/// Breakpoints sorted by threshold, ascending.
#[derive(Debug, Clone, Default)]
pub struct Breakpoints {
    items: Vec<Breakpoint>,
}

impl Breakpoints {
    /// Build the table from validated queries.
    ///
    /// Keys that do not parse as `u32` are skipped; config validation reports them.
    pub fn from_queries(queries: &BTreeMap<String, String>) -> Self {
        let mut items: Vec<_> = queries
            .iter()
            .filter_map(|(threshold, name)| {
                Some(Breakpoint {
                    threshold: threshold.trim().parse().ok()?,
                    partition_name: name.clone(),
                })
            })
            .collect();
        items.sort_by_key(|b| b.threshold);
        Self { items }
    }

    /// Smallest breakpoint whose threshold is `>= resolution`.
    ///
    /// A max-width rule stays correct for every width below its own threshold,
    /// so it may only move up to a wider bucket, never down.
    pub fn ceiling(&self, resolution: u32) -> Option<&Breakpoint> {
        let index = self.items.partition_point(|b| b.threshold < resolution);
        self.items.get(index)
    }

    /// Breakpoint owning a partition name.
    pub fn by_partition(&self, partition_name: &str) -> Option<&Breakpoint> {
        self.items
            .iter()
            .find(|b| b.partition_name == partition_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
