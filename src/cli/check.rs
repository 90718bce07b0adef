//! `check` command: dry run of the splitting pass.

use crate::{
    asset::load_assets,
    config::ProjectConfig,
    debug,
    html::hook_for,
    log,
    split::{MediaSplitter, SplitError, SplitOutcome},
};
use anyhow::Result;
use rayon::prelude::*;

/// What a dry run found for one stylesheet.
#[derive(Debug)]
pub struct CheckReport {
    /// Stylesheets that would be split, with the assets they would produce.
    pub would_split: Vec<(String, Vec<String>)>,
    /// Stylesheets that cannot be parsed.
    pub failed: Vec<String>,
    pub unchanged: usize,
}

/// Validate the setup and report what a build would do, without writing.
pub fn check_project(config: &ProjectConfig) -> Result<CheckReport> {
    let splitter = MediaSplitter::new(&config.split, false)?;
    let html_hook = config.html.as_ref().map(|html| hook_for(html.hook));
    splitter.attach(html_hook.as_deref())?;

    log!(
        "check";
        "config ok: {} breakpoint(s), unit `{}`, inject_in_html = {}",
        splitter.breakpoints().len(),
        config.split.media_unit,
        splitter.inject_mode()
    );

    let mut report = CheckReport {
        would_split: Vec::new(),
        failed: Vec::new(),
        unchanged: 0,
    };

    let output = &config.build.output;
    if !output.is_dir() {
        log!(
            "warning";
            "output directory '{}' does not exist, nothing to check",
            config.root_relative(output).display()
        );
        return Ok(report);
    }

    let assets = load_assets(output)?;
    let targets = splitter.targets(&assets);
    let results: Vec<_> = targets
        .par_iter()
        .map(|record| splitter.split_asset(&record.name, &record.content))
        .collect();

    let mut outcomes = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(SplitError::Transform { asset, message }) => {
                log!("error"; "{}: {}", asset, message);
                report.failed.push(asset);
            }
            Err(err) => return Err(err.into()),
        }
    }
    splitter.check_outputs(&assets, &outcomes)?;

    for outcome in outcomes {
        if !outcome.is_split() {
            debug!("check"; "{}: nothing to split", outcome.source);
            report.unchanged += 1;
            continue;
        }
        let SplitOutcome { source, assets, .. } = outcome;
        let names: Vec<String> = assets.into_iter().map(|r| r.name).collect();
        log!("check"; "{} -> {}", source, names.join(", "));
        report.would_split.push((source, names));
    }

    log!(
        "check";
        "{} stylesheet(s) would be split, {} unchanged, {} failed",
        report.would_split.len(),
        report.unchanged,
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_reports_without_writing() {
        let dir = TempDir::new().unwrap();
        let dist = dir.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        let css = ".y{} @media (max-width: 500px){.x{}}";
        fs::write(dist.join("a.css"), css).unwrap();
        fs::write(dist.join("b.css"), ".b{}").unwrap();
        fs::write(dist.join("c.css"), ".c{color:red").unwrap();

        let mut config = test_parse_config("[html]");
        config.root = dir.path().to_path_buf();
        config.build.output = dist.clone();

        let report = check_project(&config).unwrap();
        assert_eq!(
            report.would_split,
            vec![("a.css".to_string(), vec!["a-mobile.css".to_string()])]
        );
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.failed, vec!["c.css"]);

        assert_eq!(fs::read_to_string(dist.join("a.css")).unwrap(), css);
        assert!(!dist.join("a-mobile.css").exists());
    }

    #[test]
    fn test_check_skips_earlier_partitions() {
        let dir = TempDir::new().unwrap();
        let dist = dir.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("a.css"), ".y{}").unwrap();
        fs::write(dist.join("a-mobile.css"), "@media (max-width: 500px){.x{}}").unwrap();

        let mut config = test_parse_config("[html]");
        config.build.output = dist;

        let report = check_project(&config).unwrap();
        assert!(report.would_split.is_empty());
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn test_check_missing_output_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("[html]");
        config.build.output = dir.path().join("missing");
        let report = check_project(&config).unwrap();
        assert!(report.would_split.is_empty());
    }

    #[test]
    fn test_check_rejects_missing_hook() {
        let config = test_parse_config("");
        assert!(check_project(&config).is_err());
    }
}
