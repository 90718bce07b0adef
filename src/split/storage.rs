//! Per-stylesheet partition storage.

use rustc_hash::FxHashMap;

use super::SplitError;

/// One extracted rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub css: String,
    /// Header text of the rule the fragment came from.
    pub query: String,
}

/// Named bucket of extracted rules.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub name: String,
    pub entries: Vec<MediaEntry>,
}

/// Merged view of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedMedia {
    /// Fragments joined by `\n` in the order they were added.
    pub css: String,
    /// Header of the first fragment.
    pub query: String,
}

/// Insertion-ordered partition buckets for one stylesheet.
///
/// Rule order inside a bucket is source order; the cascade depends on it.
#[derive(Debug, Default)]
pub struct MediaStorage {
    partitions: Vec<Partition>,
    index: FxHashMap<String, usize>,
}

impl MediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment to `partition`, creating it on first use.
    pub fn add_media(&mut self, partition: &str, css: impl Into<String>, query: impl Into<String>) {
        let slot = match self.index.get(partition) {
            Some(&slot) => slot,
            None => {
                self.partitions.push(Partition {
                    name: partition.to_string(),
                    entries: Vec::new(),
                });
                let slot = self.partitions.len() - 1;
                self.index.insert(partition.to_string(), slot);
                slot
            }
        };
        self.partitions[slot].entries.push(MediaEntry {
            css: css.into(),
            query: query.into(),
        });
    }

    /// Merged CSS and representative query of a partition.
    pub fn get_media(&self, partition: &str) -> Result<MergedMedia, SplitError> {
        let entries = self
            .index
            .get(partition)
            .map(|&slot| self.partitions[slot].entries.as_slice())
            .unwrap_or_default();

        let Some(first) = entries.first() else {
            return Err(SplitError::PartitionNotFound(partition.to_string()));
        };

        let css = entries
            .iter()
            .map(|entry| entry.css.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(MergedMedia {
            css,
            query: first.query.clone(),
        })
    }

    /// Partition names in first-insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partitions.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_in_insertion_order() {
        let mut storage = MediaStorage::new();
        storage.add_media("s", "@media (max-width: 300px){.a{}}", "(max-width: 300px)");
        storage.add_media("s", "@media (max-width: 500px){.b{}}", "(max-width: 500px)");
        storage.add_media("s", "@media (max-width: 100px){.c{}}", "(max-width: 100px)");

        let merged = storage.get_media("s").unwrap();
        assert_eq!(
            merged.css,
            "@media (max-width: 300px){.a{}}\n@media (max-width: 500px){.b{}}\n@media (max-width: 100px){.c{}}"
        );
        assert_eq!(merged.query, "(max-width: 300px)");
    }

    #[test]
    fn test_partitions_keep_first_insertion_order() {
        let mut storage = MediaStorage::new();
        storage.add_media("large", "l1", "q");
        storage.add_media("small", "s1", "q");
        storage.add_media("large", "l2", "q");

        let names: Vec<_> = storage.names().collect();
        assert_eq!(names, vec!["large", "small"]);
        assert_eq!(storage.get_media("large").unwrap().css, "l1\nl2");
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_missing_partition() {
        let storage = MediaStorage::new();
        assert!(storage.is_empty());
        let err = storage.get_media("nope").unwrap_err();
        assert!(matches!(err, SplitError::PartitionNotFound(name) if name == "nope"));
    }
}
