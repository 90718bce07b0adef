//! `[html]` section configuration.
//!
//! Selects the HTML generator the link tags are merged into. Without this
//! table no generator is attached, which is only valid together with
//! `inject_in_html = "none"`.
//!
//! # Example
//!
//! ```toml
//! [html]
//! hook = "tag-groups"   # tag-groups | asset-tags
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document-mutation hook flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookKind {
    /// Head and body tag groups.
    #[default]
    TagGroups,
    /// Legacy flat asset-tag list.
    AssetTags,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagGroups => write!(f, "tag-groups"),
            Self::AssetTags => write!(f, "asset-tags"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    pub hook: HookKind,
}
