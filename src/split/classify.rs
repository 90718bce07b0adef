//! Media rule header classification.
//!
//! Only one header shape is recognized:
//!
//! ```text
//! (max-width: 768px)
//! ```
//!
//! Everything else is reported as a non-match and left to the caller untouched:
//!
//! | Header                                   | Why it is rejected           |
//! |------------------------------------------|------------------------------|
//! | `screen and (max-width: 768px)`          | media type / combinator      |
//! | `(max-width: 768px), print`              | query list                   |
//! | `(min-width: 320px)`                     | not a max-width condition    |
//! | `(min-width: 320px) and (max-width: 768px)` | combined conditions       |
//! | `(width <= 768px)`                       | range syntax                 |
//! | `(max-width:768px)`, `( max-width: 768px)` | unexpected spacing         |
//! | `(max-width: 47.5em)`                    | more than one numeric run    |

use regex::Regex;
use std::sync::LazyLock;

/// Exact `(max-width: <digits><letters>)` shape, anchored at both ends.
static MAX_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([a-z-]+): ([0-9]+)([a-zA-Z]+)\)$").unwrap());

/// The only condition keyword that can route a rule into a partition.
pub const MAX_WIDTH_KEYWORD: &str = "max-width";

/// Parse result for one `@media` header.
///
/// `resolution` and `unit` are both `Some` only for a pure max-width header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRuleHeader {
    /// Header text as it appeared in the stylesheet (trimmed).
    pub raw_condition: String,
    pub resolution: Option<u32>,
    pub unit: Option<String>,
    /// Text before the colon without the opening parenthesis, e.g. `max-width`.
    /// Empty for a non-match.
    pub condition_keyword: String,
}

impl ParsedRuleHeader {
    /// Classify a header string.
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        let unmatched = || Self {
            raw_condition: header.to_string(),
            resolution: None,
            unit: None,
            condition_keyword: String::new(),
        };

        let Some(caps) = MAX_WIDTH.captures(header) else {
            return unmatched();
        };
        if &caps[1] != MAX_WIDTH_KEYWORD {
            return unmatched();
        }
        // Digit runs that overflow are not guessed at.
        let Ok(resolution) = caps[2].parse::<u32>() else {
            return unmatched();
        };

        Self {
            raw_condition: header.to_string(),
            resolution: Some(resolution),
            unit: Some(caps[3].to_string()),
            condition_keyword: caps[1].to_string(),
        }
    }

    /// Whether the header has the max-width shape at all.
    pub fn is_max_width(&self) -> bool {
        self.resolution.is_some() && self.condition_keyword == MAX_WIDTH_KEYWORD
    }

    /// Resolution of a max-width header declared in `unit`.
    ///
    /// Units are compared exactly, so a `px` rule never matches an `em` table.
    pub fn resolution_in(&self, unit: &str) -> Option<u32> {
        match (&self.unit, self.resolution) {
            (Some(declared), Some(resolution)) if self.is_max_width() && declared == unit => {
                Some(resolution)
            }
            _ => None,
        }
    }
}
