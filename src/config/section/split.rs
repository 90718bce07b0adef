//! `[split]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [split]
//! media_unit = "px"                       # Unit thresholds are written in
//! exclude = ['^vendor/']                  # Assets left untouched (regex)
//! inject_in_html = "all"                  # all | chunks | none
//! should_make_source_unblocking = false   # Load the residual stylesheet lazily
//!
//! [split.queries]
//! 600 = "[name]-mobile.css"
//! 1000 = "[name]-tablet.css"
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::split::breakpoint::NAME_PLACEHOLDER;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which link tags end up in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectMode {
    /// Every split stylesheet.
    #[default]
    All,
    /// Only stylesheets whose name contains one of the document's chunks.
    Chunks,
    /// No link tags are generated.
    None,
}

impl InjectMode {
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for InjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Chunks => write!(f, "chunks"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Threshold (string key parsed as `u32`) to partition name template.
    pub queries: BTreeMap<String, String>,

    /// Unit a max-width rule must use to be moved.
    pub media_unit: String,

    /// Regular expressions matched against asset names.
    pub exclude: Vec<String>,

    pub inject_in_html: InjectMode,

    /// Attach the non-blocking descriptor to rewritten source stylesheets.
    pub should_make_source_unblocking: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            queries: BTreeMap::new(),
            media_unit: "px".into(),
            exclude: Vec::new(),
            inject_in_html: InjectMode::All,
            should_make_source_unblocking: false,
        }
    }
}

pub struct SplitFields {
    pub queries: FieldPath,
    pub media_unit: FieldPath,
    pub exclude: FieldPath,
    pub inject_in_html: FieldPath,
    pub should_make_source_unblocking: FieldPath,
}

impl SplitConfig {
    pub const FIELDS: SplitFields = SplitFields {
        queries: FieldPath::new("split.queries"),
        media_unit: FieldPath::new("split.media_unit"),
        exclude: FieldPath::new("split.exclude"),
        inject_in_html: FieldPath::new("split.inject_in_html"),
        should_make_source_unblocking: FieldPath::new("split.should_make_source_unblocking"),
    };

    /// Compile the exclusion patterns.
    pub fn exclude_patterns(&self) -> Result<Vec<Regex>, regex::Error> {
        self.exclude.iter().map(|p| Regex::new(p)).collect()
    }

    /// Validate split configuration.
    ///
    /// # Checks
    /// - `queries` is present and every key is a `u32`, unique after parsing
    /// - every template contains `[name]`, is not `[name].css`, and is unique
    /// - `media_unit` is non-empty ASCII letters
    /// - every `exclude` entry compiles
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        self.validate_queries(diag);

        if self.media_unit.is_empty() || !self.media_unit.bytes().all(|b| b.is_ascii_alphabetic()) {
            diag.error_with_hint(
                Self::FIELDS.media_unit,
                format!("`{}` is not a CSS length unit", self.media_unit),
                "use letters only, e.g. \"px\" or \"em\"",
            );
        }

        for (i, pattern) in self.exclude.iter().enumerate() {
            if let Err(err) = Regex::new(pattern) {
                diag.error_at(
                    Self::FIELDS.exclude,
                    &i.to_string(),
                    format!("invalid regular expression `{pattern}`: {err}"),
                );
            }
        }
    }

    fn validate_queries(&self, diag: &mut ConfigDiagnostics) {
        if self.queries.is_empty() {
            diag.error_with_hint(
                Self::FIELDS.queries,
                "at least one breakpoint is required",
                "add e.g. `[split.queries]` with `768 = \"[name]-tablet.css\"`",
            );
            return;
        }

        let mut thresholds: FxHashMap<u32, &str> = FxHashMap::default();
        let mut templates: FxHashMap<&str, &str> = FxHashMap::default();

        for (key, template) in &self.queries {
            match key.trim().parse::<u32>() {
                Ok(threshold) => {
                    if let Some(previous) = thresholds.insert(threshold, key) {
                        diag.error_at(
                            Self::FIELDS.queries,
                            key,
                            format!("threshold {threshold} is also configured as `{previous}`"),
                        );
                    }
                }
                Err(_) => diag.error_at(
                    Self::FIELDS.queries,
                    key,
                    "threshold must be a non-negative integer",
                ),
            }

            if !template.contains(NAME_PLACEHOLDER) {
                diag.error_at(
                    Self::FIELDS.queries,
                    key,
                    format!("template `{template}` does not contain `{NAME_PLACEHOLDER}`"),
                );
            } else if template == "[name].css" {
                diag.error_at(
                    Self::FIELDS.queries,
                    key,
                    "template `[name].css` would overwrite the source stylesheet",
                );
            }

            if let Some(previous) = templates.insert(template, key) {
                diag.error_at(
                    Self::FIELDS.queries,
                    key,
                    format!("template `{template}` is already used by `{previous}`"),
                );
            }
        }
    }
}
