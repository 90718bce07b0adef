//! Loading the compiled output directory and writing results back.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use jwalk::WalkDir;

use super::{AssetRecord, AssetTable};

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Extensions the build reads: stylesheets and HTML documents.
const TEXT_EXTENSIONS: &[&str] = &["css", "html", "htm"];

/// Convert a path under `root` to an asset name (`/` separators).
fn asset_name(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// Load stylesheets and HTML documents under `root`, sorted by name.
pub fn load_assets(root: &Path) -> Result<AssetTable> {
    let mut paths: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TEXT_EXTENSIONS.contains(&e))
        })
        .filter_map(|p| Some((asset_name(&p, root)?, p)))
        .collect();
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    paths
        .into_iter()
        .map(|(name, path)| {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read asset {}", path.display()))?;
            Ok(AssetRecord::new(name, content))
        })
        .collect()
}

/// Write every changed record under `root`. Returns the number written.
pub fn write_changed(table: &AssetTable, root: &Path) -> Result<usize> {
    let mut count = 0;
    for record in table.changed() {
        let path = root.join(&record.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &record.content)
            .with_context(|| format!("Failed to write asset {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}
