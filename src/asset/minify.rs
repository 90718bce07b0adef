//! Stylesheet diagnostics and minification.
//!
//! Both go through lightningcss. Diagnostics parse with error recovery, so
//! browser hacks such as `*zoom: 1` are reported, never rejected.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use std::sync::{Arc, RwLock};

/// Rules and declarations lightningcss would drop from `source`.
pub fn css_warnings(source: &str) -> Vec<String> {
    let warnings = Arc::new(RwLock::new(Vec::new()));
    let options = ParserOptions {
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };
    if let Err(err) = StyleSheet::parse(source, options) {
        return vec![err.to_string()];
    }

    warnings
        .read()
        .map(|list| list.iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

/// Minify when enabled, keeping the original text if lightningcss fails.
pub fn maybe_minify(source: String, minify: bool) -> String {
    if !minify {
        return source;
    }
    minify_css(&source).unwrap_or(source)
}
