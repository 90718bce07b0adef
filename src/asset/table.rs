//! In-memory asset table for one build.

use rustc_hash::{FxHashMap, FxHashSet};

/// A named asset and its text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// `/`-separated path relative to the output directory.
    pub name: String,
    pub content: String,
}

impl AssetRecord {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn is_css(&self) -> bool {
        is_css_name(&self.name)
    }

    pub fn is_html(&self) -> bool {
        self.name.ends_with(".html") || self.name.ends_with(".htm")
    }
}

/// Whether an asset name denotes a stylesheet.
pub fn is_css_name(name: &str) -> bool {
    name.ends_with(".css")
}

/// Insertion-ordered asset table.
///
/// Loaded assets keep their scan order; assets added during the build are
/// appended. Every insert is remembered so only touched assets are written back.
#[derive(Debug, Default)]
pub struct AssetTable {
    records: Vec<AssetRecord>,
    index: FxHashMap<String, usize>,
    changed: FxHashSet<String>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset without marking it changed (initial scan).
    pub fn load(&mut self, record: AssetRecord) {
        self.put(record);
    }

    /// Create or overwrite an asset and mark it for write-back.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let record = AssetRecord::new(name, content);
        self.changed.insert(record.name.clone());
        self.put(record);
    }

    fn put(&mut self, record: AssetRecord) {
        match self.index.get(&record.name) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(record.name.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AssetRecord> {
        self.index.get(name).map(|&slot| &self.records[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Records in table order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records.iter()
    }

    /// Asset names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    /// Records created or overwritten since loading, in table order.
    pub fn changed(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records
            .iter()
            .filter(|r| self.changed.contains(&r.name))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<AssetRecord> for AssetTable {
    fn from_iter<I: IntoIterator<Item = AssetRecord>>(iter: I) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.load(record);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_and_overwrite() {
        let mut table: AssetTable = [
            AssetRecord::new("main.css", "a{}"),
            AssetRecord::new("index.html", "<html></html>"),
        ]
        .into_iter()
        .collect();

        table.insert("main-s.css", "b{}");
        table.insert("main.css", "c{}");

        let names: Vec<_> = table.names().collect();
        assert_eq!(names, vec!["main.css", "index.html", "main-s.css"]);
        assert_eq!(table.get("main.css").unwrap().content, "c{}");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_changed_tracks_inserts_only() {
        let mut table = AssetTable::new();
        table.load(AssetRecord::new("a.css", ""));
        table.load(AssetRecord::new("b.css", ""));
        assert_eq!(table.changed().count(), 0);

        table.insert("b.css", "x{}");
        let changed: Vec<_> = table.changed().map(|r| r.name.as_str()).collect();
        assert_eq!(changed, vec!["b.css"]);
    }

    #[test]
    fn test_kinds() {
        assert!(AssetRecord::new("css/site.css", "").is_css());
        assert!(!AssetRecord::new("site.css.map", "").is_css());
        assert!(AssetRecord::new("blog/index.html", "").is_html());
        assert!(!AssetRecord::new("app.js", "").is_html());
    }
}
