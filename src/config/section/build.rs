//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "dist"         # Compiled assets (relative to project root)
//! public_path = "/static/" # Prefix for generated link hrefs
//! minify = true           # Minify emitted stylesheets
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory holding the compiled assets.
    pub output: PathBuf,

    /// Prefix prepended to asset names in link hrefs.
    pub public_path: String,

    /// Minify residual and partition stylesheets.
    pub minify: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: "dist".into(),
            public_path: "/".into(),
            minify: false,
        }
    }
}

pub struct BuildFields {
    pub output: FieldPath,
    pub public_path: FieldPath,
    pub minify: FieldPath,
}

impl BuildConfig {
    pub const FIELDS: BuildFields = BuildFields {
        output: FieldPath::new("build.output"),
        public_path: FieldPath::new("build.public_path"),
        minify: FieldPath::new("build.minify"),
    };

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.output.as_os_str().is_empty() {
            diag.error(Self::FIELDS.output, "must not be empty");
        }
        if self.public_path.chars().any(char::is_whitespace) {
            diag.error_with_hint(
                Self::FIELDS.public_path,
                "must not contain whitespace",
                "percent-encode the path, e.g. `/my%20site/`",
            );
        }
    }
}
