//! Turning partitions into output assets and media descriptors.

use super::SplitError;
use super::breakpoint::Breakpoints;
use super::partition::Partitioned;
use crate::asset::{AssetRecord, AssetTable, MediaDescriptor, MediaMap, minify};

/// Everything one source stylesheet contributes to the build.
///
/// Built completely before anything is applied, so a failing asset never
/// leaves the shared stores half-written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub source: String,
    /// Rewritten source content, `None` when nothing was extracted.
    pub residual: Option<String>,
    /// New partition assets in partition order.
    pub assets: Vec<AssetRecord>,
    pub media: Vec<(String, MediaDescriptor)>,
    /// `@media` rules moved out of the source.
    pub moved: usize,
}

impl SplitOutcome {
    /// Outcome that leaves the source asset as it is.
    pub fn unchanged(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            residual: None,
            assets: Vec::new(),
            media: Vec::new(),
            moved: 0,
        }
    }

    pub fn is_split(&self) -> bool {
        !self.assets.is_empty()
    }

    /// Write this outcome into the build's stores.
    ///
    /// Touches only the source asset's own key and the keys it created.
    pub fn apply(self, assets: &mut AssetTable, media: &mut MediaMap) {
        for record in self.assets {
            assets.insert(record.name, record.content);
        }
        if let Some(residual) = self.residual {
            assets.insert(self.source, residual);
        }
        for (name, descriptor) in self.media {
            media.insert(name, descriptor);
        }
    }
}

/// Options of the descriptor step.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorOptions<'a> {
    pub unit: &'a str,
    pub unblocking: bool,
    pub minify: bool,
}

/// Base name used for the `[name]` placeholder: everything before `.css`.
pub fn base_name(asset: &str) -> &str {
    asset.find(".css").map_or(asset, |pos| &asset[..pos])
}

/// Build output records and media descriptors for `source`.
pub fn build_descriptors(
    source: &str,
    partitioned: Partitioned,
    breakpoints: &Breakpoints,
    options: DescriptorOptions<'_>,
) -> Result<SplitOutcome, SplitError> {
    let Partitioned {
        residual,
        storage,
        moved,
    } = partitioned;

    if storage.is_empty() {
        return Ok(SplitOutcome::unchanged(source));
    }

    let base = base_name(source);
    let mut outcome = SplitOutcome {
        moved,
        ..SplitOutcome::unchanged(source)
    };

    for partition in storage.names() {
        let merged = storage.get_media(partition)?;
        let breakpoint = breakpoints
            .by_partition(partition)
            .ok_or_else(|| SplitError::PartitionNotFound(partition.to_string()))?;

        let name = breakpoint.asset_name(base);
        outcome.assets.push(AssetRecord::new(
            &name,
            minify::maybe_minify(merged.css, options.minify),
        ));
        outcome.media.push((
            name,
            MediaDescriptor::query(breakpoint.media_query(options.unit)),
        ));
    }

    outcome.residual = Some(minify::maybe_minify(residual, options.minify));
    if options.unblocking {
        outcome
            .media
            .push((source.to_string(), MediaDescriptor::unblocking()));
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::partition::partition_stylesheet;
    use std::collections::BTreeMap;

    fn breakpoints() -> Breakpoints {
        let queries: BTreeMap<_, _> = [("600", "[name]-s.css"), ("1000", "[name]-l.css")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Breakpoints::from_queries(&queries)
    }

    const OPTIONS: DescriptorOptions<'static> = DescriptorOptions {
        unit: "px",
        unblocking: false,
        minify: false,
    };

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a.css"), "a");
        assert_eq!(base_name("css/main.css"), "css/main");
        assert_eq!(base_name("main.min.css"), "main.min");
        assert_eq!(base_name("noext"), "noext");
    }

    #[test]
    fn test_descriptors_use_configured_threshold() {
        let bp = breakpoints();
        let css = "@media (max-width: 500px){.x{color:red}} .y{color:blue} @media (max-width: 900px){.z{color:green}}";
        let outcome =
            build_descriptors("a.css", partition_stylesheet(css, &bp, "px").unwrap(), &bp, OPTIONS).unwrap();

        assert_eq!(outcome.residual.as_deref(), Some(".y{color:blue}"));
        assert_eq!(
            outcome.assets,
            vec![
                AssetRecord::new("a-s.css", "@media (max-width: 500px){.x{color:red}}"),
                AssetRecord::new("a-l.css", "@media (max-width: 900px){.z{color:green}}"),
            ]
        );
        assert_eq!(
            outcome.media,
            vec![
                ("a-s.css".to_string(), MediaDescriptor::query("(max-width: 600px)")),
                ("a-l.css".to_string(), MediaDescriptor::query("(max-width: 1000px)")),
            ]
        );
    }

    #[test]
    fn test_unblocking_attaches_to_source() {
        let bp = breakpoints();
        let css = ".y{} @media (max-width: 500px){.x{}}";
        let options = DescriptorOptions {
            unblocking: true,
            ..OPTIONS
        };
        let outcome =
            build_descriptors("a.css", partition_stylesheet(css, &bp, "px").unwrap(), &bp, options).unwrap();

        assert_eq!(
            outcome.media.last(),
            Some(&("a.css".to_string(), MediaDescriptor::unblocking()))
        );
        assert_eq!(
            outcome.media.first(),
            Some(&("a-s.css".to_string(), MediaDescriptor::query("(max-width: 600px)")))
        );
    }

    #[test]
    fn test_no_partitions_is_unchanged() {
        let bp = breakpoints();
        let options = DescriptorOptions {
            unblocking: true,
            ..OPTIONS
        };
        let outcome = build_descriptors(
            "a.css",
            partition_stylesheet(".y{}", &bp, "px").unwrap(),
            &bp,
            options,
        )
        .unwrap();
        assert_eq!(outcome, SplitOutcome::unchanged("a.css"));
        assert!(!outcome.is_split());
    }

    #[test]
    fn test_apply_writes_own_keys() {
        let mut assets: AssetTable = [AssetRecord::new("a.css", "full"), AssetRecord::new("b.css", "b")]
            .into_iter()
            .collect();
        let mut media = MediaMap::new();

        let outcome = SplitOutcome {
            source: "a.css".into(),
            residual: Some("rest".into()),
            assets: vec![AssetRecord::new("a-s.css", "small")],
            media: vec![("a-s.css".into(), MediaDescriptor::query("(max-width: 600px)"))],
            moved: 1,
        };
        outcome.apply(&mut assets, &mut media);

        assert_eq!(assets.get("a.css").unwrap().content, "rest");
        assert_eq!(assets.get("a-s.css").unwrap().content, "small");
        assert_eq!(assets.get("b.css").unwrap().content, "b");
        assert_eq!(media.len(), 1);
        let changed: Vec<_> = assets.changed().map(|r| r.name.as_str()).collect();
        assert_eq!(changed, vec!["a.css", "a-s.css"]);
    }
}
