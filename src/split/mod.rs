//! Media query splitting.
//!
//! Moves `@media (max-width: …)` rules out of compiled stylesheets into one
//! stylesheet per configured breakpoint, and records the media condition each
//! new stylesheet should be linked with.
//!
//! ```text
//! a.css ──► partition_stylesheet ──► MediaStorage ──► build_descriptors
//!              (classify + ceiling)                        │
//!                                                          ▼
//!                              AssetTable (a.css, a-s.css, …) + MediaMap
//! ```
//!
//! Each stylesheet is transformed on the rayon pool; outcomes are applied in
//! asset order once every transform has reported back.

pub mod breakpoint;
mod classify;
mod descriptor;
mod partition;
mod storage;

pub use descriptor::SplitOutcome;

use breakpoint::Breakpoints;
use descriptor::{DescriptorOptions, base_name, build_descriptors};
use partition::partition_stylesheet;

use crate::asset::{AssetRecord, AssetTable, MediaMap, is_css_name, minify};
use crate::config::{ConfigDiagnostics, ConfigError, InjectMode, SplitConfig};
use crate::html::{AssetTags, HtmlHook, InjectFilter, generate_link_tags};
use crate::logger::{ProgressLine, is_verbose};
use crate::{debug, log};
use crossbeam::channel;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Errors raised while splitting.
#[derive(Debug, Error)]
pub enum SplitError {
    /// A partition was looked up that never received a rule.
    #[error("partition `{0}` has no media entries")]
    PartitionNotFound(String),

    /// One stylesheet could not be parsed or rewritten.
    #[error("failed to split `{asset}`: {message}")]
    Transform { asset: String, message: String },

    /// Two writers for one asset name.
    #[error("`{asset}` would be written by both `{first}` and `{second}`")]
    OutputClash {
        asset: String,
        first: String,
        second: String,
    },

    #[error(
        "splitting `{origin}` would overwrite `{asset}`\n  hint: change the template in [split.queries] or exclude `{origin}`"
    )]
    Overwrite { asset: String, origin: String },

    #[error(
        "inject_in_html is \"{0}\" but no HTML generator is configured\n  hint: add an `[html]` section or set inject_in_html = \"none\""
    )]
    MissingHtmlHook(InjectMode),
}

impl SplitError {
    /// Whether the build can continue with the asset left unsplit.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }
}

/// Counters of one splitting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// Stylesheets considered.
    pub scanned: usize,
    /// Stylesheets that produced at least one partition.
    pub split: usize,
    /// Partition assets written.
    pub partitions: usize,
    /// `@media` rules moved into partitions.
    pub rules: usize,
    /// Stylesheets left unsplit after a transform error.
    pub failed: usize,
}

/// Configured splitter for one build.
#[derive(Debug)]
pub struct MediaSplitter {
    breakpoints: Breakpoints,
    unit: String,
    exclude: Vec<Regex>,
    inject: InjectMode,
    unblocking: bool,
    minify: bool,
}

impl MediaSplitter {
    /// Validate `config` and build the splitter.
    pub fn new(config: &SplitConfig, minify: bool) -> Result<Self, ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        diag.into_result()?;

        let exclude = config
            .exclude_patterns()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;

        Ok(Self {
            breakpoints: Breakpoints::from_queries(&config.queries),
            unit: config.media_unit.clone(),
            exclude,
            inject: config.inject_in_html,
            unblocking: config.should_make_source_unblocking,
            minify,
        })
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn inject_mode(&self) -> InjectMode {
        self.inject
    }

    pub fn is_excluded(&self, asset: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(asset))
    }

    /// Stylesheets that take part in splitting and tag generation.
    pub fn is_target(&self, asset: &str) -> bool {
        is_css_name(asset) && !self.is_excluded(asset)
    }

    /// Names the configured templates give every loaded stylesheet.
    ///
    /// Assets with one of these names are partitions (from an earlier run, or
    /// about to be rewritten by this one) and never sources themselves.
    fn partition_names(&self, assets: &AssetTable) -> FxHashSet<String> {
        assets
            .iter()
            .filter(|r| self.is_target(&r.name))
            .flat_map(|r| {
                let base = base_name(&r.name);
                self.breakpoints
                    .iter()
                    .map(move |bp| bp.asset_name(base))
                    .filter(move |name| *name != r.name)
            })
            .collect()
    }

    /// Source stylesheets of this build, in table order.
    pub fn targets<'a>(&self, assets: &'a AssetTable) -> Vec<&'a AssetRecord> {
        let partitions = self.partition_names(assets);
        assets
            .iter()
            .filter(|r| self.is_target(&r.name) && !partitions.contains(&r.name))
            .collect()
    }

    /// Check that every key the outcomes write has exactly one writer.
    ///
    /// A partition may replace the same-named partition of an earlier run,
    /// never another loaded asset or a key written by a second outcome.
    pub fn check_outputs(
        &self,
        assets: &AssetTable,
        outcomes: &[SplitOutcome],
    ) -> Result<(), SplitError> {
        let mut writers: FxHashMap<&str, &str> = FxHashMap::default();
        for outcome in outcomes.iter().filter(|o| o.is_split()) {
            writers.insert(&outcome.source, &outcome.source);
        }

        for outcome in outcomes {
            for record in &outcome.assets {
                if let Some(first) = writers.insert(&record.name, &outcome.source) {
                    return Err(SplitError::OutputClash {
                        asset: record.name.clone(),
                        first: first.to_string(),
                        second: outcome.source.clone(),
                    });
                }
                if assets.contains(&record.name) {
                    if !self.is_target(&record.name) {
                        return Err(SplitError::Overwrite {
                            asset: record.name.clone(),
                            origin: outcome.source.clone(),
                        });
                    }
                    debug!("split"; "{}: replacing earlier partition", record.name);
                }
            }
        }
        Ok(())
    }

    /// Check the HTML generator against the injection mode.
    ///
    /// Returns the hook to inject through, or `None` when injection is off.
    pub fn attach<'h>(
        &self,
        hook: Option<&'h dyn HtmlHook>,
    ) -> Result<Option<&'h dyn HtmlHook>, SplitError> {
        if self.inject.is_none() {
            return Ok(None);
        }
        match hook {
            Some(hook) => Ok(Some(hook)),
            None => Err(SplitError::MissingHtmlHook(self.inject)),
        }
    }

    /// Split one stylesheet without touching any shared state.
    pub fn split_asset(&self, asset: &str, css: &str) -> Result<SplitOutcome, SplitError> {
        if is_verbose() {
            for warning in minify::css_warnings(css) {
                debug!("split"; "{}: {}", asset, warning);
            }
        }

        let partitioned =
            partition_stylesheet(css, &self.breakpoints, &self.unit).map_err(|err| {
                SplitError::Transform {
                    asset: asset.to_string(),
                    message: err.to_string(),
                }
            })?;
        build_descriptors(
            asset,
            partitioned,
            &self.breakpoints,
            DescriptorOptions {
                unit: &self.unit,
                unblocking: self.unblocking,
                minify: self.minify,
            },
        )
    }

    /// Split every target stylesheet of `assets` in parallel.
    ///
    /// Transform errors are logged and leave the stylesheet as it was. Any
    /// other error, including two writers for one asset name, aborts before a
    /// single outcome is applied.
    pub fn optimize_assets(
        &self,
        assets: &mut AssetTable,
        media: &mut MediaMap,
        progress: Option<&ProgressLine>,
    ) -> Result<SplitStats, SplitError> {
        let targets = self.targets(assets);
        let total = targets.len();
        let mut stats = SplitStats {
            scanned: total,
            ..SplitStats::default()
        };

        let (tx, rx) = channel::unbounded();
        rayon::scope(|s| {
            for (slot, record) in targets.iter().enumerate() {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let result = self.split_asset(&record.name, &record.content);
                    if let Some(progress) = progress {
                        progress.inc("split");
                    }
                    // Receiver outlives every sender
                    let _ = tx.send((slot, result));
                });
            }
        });
        drop(tx);

        // Counting join over the outstanding completions
        let mut slots: Vec<Option<Result<SplitOutcome, SplitError>>> =
            (0..total).map(|_| None).collect();
        for _ in 0..total {
            let Ok((slot, result)) = rx.recv() else {
                break;
            };
            slots[slot] = Some(result);
        }

        let mut outcomes = Vec::with_capacity(total);
        for result in slots.into_iter().flatten() {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) if err.is_recoverable() => {
                    log!("error"; "{}", err);
                    stats.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        self.check_outputs(assets, &outcomes)?;

        for outcome in outcomes {
            if outcome.is_split() {
                debug!(
                    "split";
                    "{}: {} partition(s)",
                    outcome.source,
                    outcome.assets.len()
                );
                stats.split += 1;
                stats.partitions += outcome.assets.len();
                stats.rules += outcome.moved;
            }
            outcome.apply(assets, media);
        }

        Ok(stats)
    }

    /// Merge this build's link tags into one document's tag list.
    pub fn alter_asset_tags(
        &self,
        assets: &AssetTable,
        media: &MediaMap,
        public_path: &str,
        mut tags: AssetTags,
    ) -> AssetTags {
        let filter = match self.inject {
            InjectMode::None => return tags,
            InjectMode::All => InjectFilter::All,
            InjectMode::Chunks => InjectFilter::Chunks(&tags.chunks),
        };
        let links = generate_link_tags(
            assets,
            media,
            |name| !self.is_excluded(name),
            filter,
            public_path,
        );
        links.merge_into(&mut tags);
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MediaDescriptor;
    use crate::config::HookKind;
    use crate::html::{HtmlTag, hook_for};
    use std::collections::BTreeMap;

    fn config(queries: &[(&str, &str)]) -> SplitConfig {
        SplitConfig {
            queries: queries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..SplitConfig::default()
        }
    }

    fn splitter(config: &SplitConfig) -> MediaSplitter {
        MediaSplitter::new(config, false).unwrap()
    }

    const A_CSS: &str = "@media (max-width: 500px){.x{color:red}} .y{color:blue} @media (max-width: 900px){.z{color:green}}";

    #[test]
    fn test_invalid_config_rejected() {
        let result = MediaSplitter::new(&SplitConfig::default(), false);
        assert!(matches!(result, Err(ConfigError::Diagnostics(_))));
    }

    #[test]
    fn test_px_split() {
        let splitter = splitter(&config(&[("600", "[name]-s.css"), ("1000", "[name]-l.css")]));
        let mut assets: AssetTable = [AssetRecord::new("a.css", A_CSS)].into_iter().collect();
        let mut media = MediaMap::new();

        let stats = splitter.optimize_assets(&mut assets, &mut media, None).unwrap();

        assert_eq!(assets.get("a.css").unwrap().content, ".y{color:blue}");
        assert_eq!(
            assets.get("a-s.css").unwrap().content,
            "@media (max-width: 500px){.x{color:red}}"
        );
        assert_eq!(
            assets.get("a-l.css").unwrap().content,
            "@media (max-width: 900px){.z{color:green}}"
        );
        assert_eq!(
            media.get("a-s.css"),
            Some(&MediaDescriptor::query("(max-width: 600px)"))
        );
        assert_eq!(
            media.get("a-l.css"),
            Some(&MediaDescriptor::query("(max-width: 1000px)"))
        );
        assert!(media.get("a.css").is_none());
        assert_eq!(
            stats,
            SplitStats {
                scanned: 1,
                split: 1,
                partitions: 2,
                rules: 2,
                failed: 0
            }
        );
    }

    #[test]
    fn test_unit_mismatch_is_noop() {
        let mut cfg = config(&[("600", "[name]-s.css")]);
        cfg.media_unit = "em".into();
        let splitter = splitter(&cfg);
        let css = "@media (max-width: 500px){.x{}}";
        let mut assets: AssetTable = [AssetRecord::new("a.css", css)].into_iter().collect();
        let mut media = MediaMap::new();

        let stats = splitter.optimize_assets(&mut assets, &mut media, None).unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets.get("a.css").unwrap().content, css);
        assert_eq!(assets.changed().count(), 0);
        assert!(media.is_empty());
        assert_eq!(stats.split, 0);
    }

    #[test]
    fn test_transform_error_leaves_asset_unsplit() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let broken = ".b{color:blue}} @media (max-width: 500px){.x{}}";
        let mut assets: AssetTable = [
            AssetRecord::new("bad.css", broken),
            AssetRecord::new("good.css", ".y{} @media (max-width: 500px){.x{}}"),
        ]
        .into_iter()
        .collect();
        let mut media = MediaMap::new();

        let stats = splitter.optimize_assets(&mut assets, &mut media, None).unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.split, 1);
        assert_eq!(assets.get("bad.css").unwrap().content, broken);
        assert!(!assets.contains("bad-s.css"));
        assert_eq!(assets.get("good.css").unwrap().content, ".y{}");
        assert!(assets.contains("good-s.css"));
    }

    #[test]
    fn test_split_asset_reports_transform_error() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let err = splitter.split_asset("bad.css", ".a{color:red").unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "failed to split `bad.css`: unclosed block at 1:3"
        );
    }

    #[test]
    fn test_browser_hacks_still_split() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let outcome = splitter
            .split_asset("a.css", ".a{*zoom:1} @media (max-width: 500px){.x{color:red}}")
            .unwrap();

        assert_eq!(outcome.residual.as_deref(), Some(".a{*zoom:1}"));
        assert_eq!(
            outcome.assets,
            vec![AssetRecord::new("a-s.css", "@media (max-width: 500px){.x{color:red}}")]
        );
    }

    #[test]
    fn test_second_pass_is_noop() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let mut assets: AssetTable = [AssetRecord::new("a.css", ".y{} @media (max-width: 500px){.x{}}")]
            .into_iter()
            .collect();
        splitter
            .optimize_assets(&mut assets, &mut MediaMap::new(), None)
            .unwrap();

        // Reload what the first pass wrote
        let mut reloaded: AssetTable = assets.iter().cloned().collect();
        assert_eq!(
            splitter.targets(&reloaded).iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["a.css"]
        );

        let mut media = MediaMap::new();
        let stats = splitter.optimize_assets(&mut reloaded, &mut media, None).unwrap();

        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.split, 0);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("a.css").unwrap().content, ".y{}");
        assert_eq!(
            reloaded.get("a-s.css").unwrap().content,
            "@media (max-width: 500px){.x{}}"
        );
        assert_eq!(reloaded.changed().count(), 0);
        assert!(media.is_empty());
    }

    #[test]
    fn test_fresh_source_replaces_old_partition() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let mut assets: AssetTable = [
            AssetRecord::new("a.css", ".y{} @media (max-width: 400px){.new{}}"),
            AssetRecord::new("a-s.css", "@media (max-width: 500px){.old{}}"),
        ]
        .into_iter()
        .collect();

        let stats = splitter
            .optimize_assets(&mut assets, &mut MediaMap::new(), None)
            .unwrap();

        assert_eq!(stats.scanned, 1);
        assert_eq!(
            assets.get("a-s.css").unwrap().content,
            "@media (max-width: 400px){.new{}}"
        );
        assert!(!assets.contains("a-s-s.css"));
    }

    #[test]
    fn test_two_sources_one_output_rejected() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let css = "@media (max-width: 500px){.x{}}";
        let mut assets: AssetTable = [
            AssetRecord::new("a.css", css),
            AssetRecord::new("a.css-old.css", css),
        ]
        .into_iter()
        .collect();

        let err = splitter
            .optimize_assets(&mut assets, &mut MediaMap::new(), None)
            .unwrap_err();

        assert!(matches!(
            &err,
            SplitError::OutputClash { asset, first, second }
                if asset == "a-s.css" && first == "a.css" && second == "a.css-old.css"
        ));
        assert!(!err.is_recoverable());
        assert_eq!(assets.get("a.css").unwrap().content, css);
        assert!(!assets.contains("a-s.css"));
    }

    #[test]
    fn test_overwriting_excluded_asset_rejected() {
        let mut cfg = config(&[("600", "[name]-s.css")]);
        cfg.exclude = vec!["-s\\.css$".into()];
        let splitter = splitter(&cfg);
        let mut assets: AssetTable = [
            AssetRecord::new("a.css", "@media (max-width: 500px){.x{}}"),
            AssetRecord::new("a-s.css", ".handwritten{}"),
        ]
        .into_iter()
        .collect();

        let err = splitter
            .optimize_assets(&mut assets, &mut MediaMap::new(), None)
            .unwrap_err();
        assert!(matches!(err, SplitError::Overwrite { ref asset, ref origin } if asset == "a-s.css" && origin == "a.css"));
        assert_eq!(assets.get("a-s.css").unwrap().content, ".handwritten{}");
    }

    #[test]
    fn test_exclusion_is_untouched() {
        let mut cfg = config(&[("600", "[name]-s.css")]);
        cfg.exclude = vec!["^vendor/".into()];
        let splitter = splitter(&cfg);
        let css = ".y{} @media (max-width: 500px){.x{}}";
        let mut assets: AssetTable = [
            AssetRecord::new("vendor/lib.css", css),
            AssetRecord::new("index.html", "<html></html>"),
        ]
        .into_iter()
        .collect();
        let mut media = MediaMap::new();

        for _ in 0..2 {
            splitter.optimize_assets(&mut assets, &mut media, None).unwrap();
            assert_eq!(assets.get("vendor/lib.css").unwrap().content, css);
            assert_eq!(assets.len(), 2);
            assert!(media.is_empty());
        }
        assert!(splitter.is_excluded("vendor/lib.css"));
        assert!(!splitter.is_target("index.html"));
    }

    #[test]
    fn test_results_applied_in_source_order() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let mut assets: AssetTable = (0..16)
            .map(|i| AssetRecord::new(format!("s{i:02}.css"), "@media (max-width: 1px){.x{}}"))
            .collect();
        let mut media = MediaMap::new();

        let stats = splitter.optimize_assets(&mut assets, &mut media, None).unwrap();
        assert_eq!(stats.split, 16);

        let created: Vec<_> = assets.names().skip(16).map(str::to_string).collect();
        let expected: Vec<_> = (0..16).map(|i| format!("s{i:02}-s.css")).collect();
        assert_eq!(created, expected);
    }

    #[test]
    fn test_progress_counts_completions() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let mut assets: AssetTable = [
            AssetRecord::new("a.css", ".a{}"),
            AssetRecord::new("b.css", ".b{"),
        ]
        .into_iter()
        .collect();
        let progress = ProgressLine::new("build", &[("split", 2)]);

        splitter
            .optimize_assets(&mut assets, &mut MediaMap::new(), Some(&progress))
            .unwrap();
        assert_eq!(progress.current("split"), Some(2));
    }

    #[test]
    fn test_unblocking_source() {
        let mut cfg = config(&[("600", "[name]-s.css")]);
        cfg.should_make_source_unblocking = true;
        let splitter = splitter(&cfg);
        let mut assets: AssetTable = [AssetRecord::new("a.css", ".y{} @media (max-width: 500px){.x{}}")]
            .into_iter()
            .collect();
        let mut media = MediaMap::new();
        splitter.optimize_assets(&mut assets, &mut media, None).unwrap();

        assert_eq!(media.get("a.css"), Some(&MediaDescriptor::unblocking()));

        let mut existing = HtmlTag::new("link", true);
        existing.set_attr("rel", "stylesheet");
        existing.set_attr("href", "/a.css");
        let tags = AssetTags {
            head: vec![existing],
            ..AssetTags::default()
        };
        let tags = splitter.alter_asset_tags(&assets, &media, "/", tags);

        assert_eq!(tags.head.len(), 2);
        assert_eq!(tags.head[0].get_attr("media"), Some("none"));
        assert_eq!(tags.head[0].get_attr("onload"), Some("this.media='all'"));
        assert_eq!(tags.head[1].get_attr("href"), Some("/a-s.css"));
        assert_eq!(tags.head[1].get_attr("media"), Some("(max-width: 600px)"));
    }

    #[test]
    fn test_chunks_mode_uses_document_chunks() {
        let mut cfg = config(&[("600", "[name]-s.css")]);
        cfg.inject_in_html = InjectMode::Chunks;
        let splitter = splitter(&cfg);
        let assets: AssetTable = [AssetRecord::new("main-s.css", ""), AssetRecord::new("admin-s.css", "")]
            .into_iter()
            .collect();
        let mut media = MediaMap::new();
        media.insert("main-s.css", MediaDescriptor::query("(max-width: 600px)"));
        media.insert("admin-s.css", MediaDescriptor::query("(max-width: 600px)"));

        let tags = AssetTags {
            chunks: vec!["main".into()],
            ..AssetTags::default()
        };
        let tags = splitter.alter_asset_tags(&assets, &media, "/", tags);
        assert_eq!(tags.head, vec![HtmlTag::stylesheet("/main-s.css", "(max-width: 600px)")]);
    }

    #[test]
    fn test_inject_none_leaves_tags() {
        let mut cfg = config(&[("600", "[name]-s.css")]);
        cfg.inject_in_html = InjectMode::None;
        let splitter = splitter(&cfg);
        let assets: AssetTable = [AssetRecord::new("a-s.css", "")].into_iter().collect();
        let mut media = MediaMap::new();
        media.insert("a-s.css", MediaDescriptor::query("(max-width: 600px)"));

        let tags = splitter.alter_asset_tags(&assets, &media, "/", AssetTags::default());
        assert!(tags.head.is_empty());
        assert!(splitter.attach(None).unwrap().is_none());
    }

    #[test]
    fn test_attach_requires_hook() {
        let splitter = splitter(&config(&[("600", "[name]-s.css")]));
        let Err(err) = splitter.attach(None) else {
            panic!("expected MissingHtmlHook");
        };
        assert!(matches!(err, SplitError::MissingHtmlHook(InjectMode::All)));
        assert!(err.to_string().contains("[html]"));

        let hook = hook_for(HookKind::TagGroups);
        let attached = splitter.attach(Some(hook.as_ref())).unwrap();
        assert_eq!(attached.map(|h| h.name()), Some("tag-groups"));
    }
}
