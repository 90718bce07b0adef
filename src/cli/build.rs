//! `build` command.
//!
//! Pipeline:
//! - **Setup** - Validate split options, attach the HTML generator
//! - **Load** - Read stylesheets and documents from the output directory
//! - **Split** - Partition stylesheets in parallel
//! - **Inject** - Merge link tags into every document
//! - **Write** - Write back created and changed files

use crate::{
    asset::{AssetRecord, AssetTable, MediaMap, load_assets, write_changed},
    config::ProjectConfig,
    html::{HtmlHook, hook_for},
    log,
    logger::ProgressLine,
    split::MediaSplitter,
};
use anyhow::{Result, bail};
use rayon::prelude::*;

/// Split stylesheets and inject link tags for the configured project.
pub fn build_project(config: &ProjectConfig) -> Result<()> {
    let output = &config.build.output;
    if !output.is_dir() {
        bail!(
            "output directory '{}' does not exist, run your bundler first",
            config.root_relative(output).display()
        );
    }

    let splitter = MediaSplitter::new(&config.split, config.build.minify)?;
    let html_hook = config.html.as_ref().map(|html| hook_for(html.hook));
    let hook = splitter.attach(html_hook.as_deref())?;

    let mut assets = load_assets(output)?;
    let mut media = MediaMap::new();

    let split_total = splitter.targets(&assets).len();
    let html_total = match hook {
        Some(_) => assets.iter().filter(|r| r.is_html()).count(),
        None => 0,
    };
    let progress = ProgressLine::new("build", &[("split", split_total), ("html", html_total)]);

    let stats = splitter.optimize_assets(&mut assets, &mut media, Some(&progress))?;
    let injected = match hook {
        Some(hook) => inject_documents(
            &splitter,
            hook,
            &mut assets,
            &media,
            &config.build.public_path,
            &progress,
        ),
        None => 0,
    };
    progress.finish();

    let written = write_changed(&assets, output)?;

    log!(
        "split";
        "{} of {} stylesheet(s) split, {} rule(s) moved into {} partition(s)",
        stats.split,
        stats.scanned,
        stats.rules,
        stats.partitions
    );
    if stats.failed > 0 {
        log!("warning"; "{} stylesheet(s) left unsplit", stats.failed);
    }
    if let Some(hook) = hook {
        log!("html"; "{} document(s) updated via {}", injected, hook.name());
    }
    log!("build"; "done, {} file(s) written", written);

    Ok(())
}

/// Run the hook over every document, returning the number rewritten.
fn inject_documents(
    splitter: &MediaSplitter,
    hook: &dyn HtmlHook,
    assets: &mut AssetTable,
    media: &MediaMap,
    public_path: &str,
    progress: &ProgressLine,
) -> usize {
    let table: &AssetTable = assets;
    let documents: Vec<&AssetRecord> = table.iter().filter(|r| r.is_html()).collect();

    let rewritten: Vec<(String, String)> = documents
        .par_iter()
        .filter_map(|record| {
            let result = hook.alter_asset_tags(&record.content, &mut |tags| {
                splitter.alter_asset_tags(table, media, public_path, tags)
            });
            progress.inc("html");

            match result {
                Ok(html) if html != record.content => Some((record.name.clone(), html)),
                Ok(_) => None,
                Err(err) => {
                    log!("error"; "{}: {:#}", record.name, err);
                    None
                }
            }
        })
        .collect();

    let count = rewritten.len();
    for (name, html) in rewritten {
        assets.insert(name, html);
    }
    count
}
