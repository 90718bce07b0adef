//! Document-mutation hooks.
//!
//! A hook scans a document's asset tags, hands them to a caller-supplied
//! `alter` callback, and writes the callback's changes back into the
//! document. Two flavors exist:
//!
//! | Hook             | Tag list                    | New tags go                          |
//! |------------------|-----------------------------|--------------------------------------|
//! | `TagGroupsHook`  | head and body groups        | before `</head>` / `</body>`         |
//! | `AssetTagsHook`  | one flat list (legacy)      | after the last stylesheet link       |
//!
//! Only tags the callback changed or added are touched; the rest of the
//! document is copied byte for byte. Tags inside `<noscript>` are fallbacks
//! for script-less browsers and are never handed to the callback.

use super::escape::unescape;
use super::tag::HtmlTag;
use crate::config::HookKind;
use anyhow::{Result, anyhow};
use std::ops::Range;

/// Tag names collected as asset tags.
const ASSET_TAGS: [&str; 2] = ["link", "script"];

/// Asset tags of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetTags {
    /// Active chunk names, derived from the document's scripts.
    pub chunks: Vec<String>,
    pub head: Vec<HtmlTag>,
    pub body: Vec<HtmlTag>,
}

impl AssetTags {
    fn all(&self) -> impl Iterator<Item = &HtmlTag> {
        self.head.iter().chain(&self.body)
    }
}

/// Capability of an HTML generator to let others alter its asset tags.
pub trait HtmlHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run `alter` over the tags of `html` and return the rewritten document.
    fn alter_asset_tags(
        &self,
        html: &str,
        alter: &mut dyn FnMut(AssetTags) -> AssetTags,
    ) -> Result<String>;
}

/// Hook implementation for a configured flavor.
pub fn hook_for(kind: HookKind) -> Box<dyn HtmlHook> {
    match kind {
        HookKind::TagGroups => Box::new(TagGroupsHook),
        HookKind::AssetTags => Box::new(AssetTagsHook),
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Head/body tag groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagGroupsHook;

impl HtmlHook for TagGroupsHook {
    fn name(&self) -> &'static str {
        "tag-groups"
    }

    fn alter_asset_tags(
        &self,
        html: &str,
        alter: &mut dyn FnMut(AssetTags) -> AssetTags,
    ) -> Result<String> {
        let tags = scan_tags(html)?;
        let head_end = head_end(html);

        let (head, body): (Vec<_>, Vec<_>) = tags
            .into_iter()
            .partition(|tag| tag.source.as_ref().is_some_and(|s| s.start < head_end));
        let original = AssetTags {
            chunks: chunk_names(head.iter().chain(&body)),
            head,
            body,
        };

        let altered = alter(original.clone());

        let mut edits = replacements(&original, &altered);
        edits.extend(insertion(head_end, altered.head.iter()));
        let body_end = find_ascii_ci(html, "</body").unwrap_or(html.len());
        edits.extend(insertion(body_end, altered.body.iter()));

        Ok(splice(html, edits))
    }
}

/// Legacy flat asset tag list.
///
/// The whole list travels in `AssetTags::head`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetTagsHook;

impl HtmlHook for AssetTagsHook {
    fn name(&self) -> &'static str {
        "asset-tags"
    }

    fn alter_asset_tags(
        &self,
        html: &str,
        alter: &mut dyn FnMut(AssetTags) -> AssetTags,
    ) -> Result<String> {
        let tags = scan_tags(html)?;
        let original = AssetTags {
            chunks: chunk_names(tags.iter()),
            head: tags,
            body: Vec::new(),
        };

        let after_last_stylesheet = original
            .head
            .iter()
            .filter(|tag| tag.is_stylesheet_link())
            .filter_map(|tag| tag.source.as_ref().map(|s| s.end))
            .max();

        let altered = alter(original.clone());

        let mut edits = replacements(&original, &altered);
        let at = after_last_stylesheet.unwrap_or_else(|| head_end(html));
        edits.extend(insertion(at, altered.all()));

        Ok(splice(html, edits))
    }
}

// ============================================================================
// Scanning
// ============================================================================

/// Collect `<link>` and `<script>` tags with their byte ranges.
fn scan_tags(html: &str) -> Result<Vec<HtmlTag>> {
    let dom = tl::parse(html, tl::ParserOptions::default())
        .map_err(|err| anyhow!("failed to parse HTML: {err:?}"))?;
    let base = html.as_ptr() as usize;
    let hidden = noscript_ranges(html);

    let mut tags = Vec::new();
    for node in dom.nodes() {
        let tl::Node::Tag(tag) = node else {
            continue;
        };
        let name = tag.name().as_utf8_str().to_ascii_lowercase();
        if !ASSET_TAGS.contains(&name.as_str()) {
            continue;
        }

        // Byte range of the tag inside `html`; skip anything tl had to copy
        let raw = tag.raw().as_bytes();
        let Some(start) = (raw.as_ptr() as usize).checked_sub(base) else {
            continue;
        };
        let end = start + raw.len();
        if end > html.len() || hidden.iter().any(|r| r.contains(&start)) {
            continue;
        }

        let attributes = tag
            .attributes()
            .iter()
            .map(|(key, value)| {
                (
                    key.to_string(),
                    value.map(|v| unescape(&v).into_owned()),
                )
            })
            .collect();

        tags.push(HtmlTag {
            void_tag: name == "link",
            tag_name: name,
            attributes,
            source: Some(start..end),
        });
    }
    Ok(tags)
}

/// Chunk names from script file names: the text before the first `.`.
///
/// `/static/js/main.3f2a.js?v=2` → `main`
fn chunk_names<'a>(tags: impl Iterator<Item = &'a HtmlTag>) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    for tag in tags.filter(|t| t.tag_name == "script") {
        let Some(src) = tag.get_attr("src") else {
            continue;
        };
        let path = src.split(['?', '#']).next().unwrap_or(src);
        let file = path.rsplit('/').next().unwrap_or(path);
        let chunk = file.split('.').next().unwrap_or(file);
        if !chunk.is_empty() && !chunks.iter().any(|c| c == chunk) {
            chunks.push(chunk.to_string());
        }
    }
    chunks
}

/// Byte ranges of `<noscript>` elements, up to their closing tag.
fn noscript_ranges(html: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut from = 0;
    while let Some(offset) = find_ascii_ci(&html[from..], "<noscript") {
        let start = from + offset;
        let after = start + "<noscript".len();
        let end = find_ascii_ci(&html[after..], "</noscript").map_or(html.len(), |close| after + close);
        ranges.push(start..end);
        from = end;
    }
    ranges
}

/// Byte offset of `</head>`, falling back to `<body`, then the document end.
fn head_end(html: &str) -> usize {
    find_ascii_ci(html, "</head")
        .or_else(|| find_ascii_ci(html, "<body"))
        .unwrap_or(html.len())
}

/// ASCII case-insensitive substring search.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

// ============================================================================
// Splicing
// ============================================================================

struct Edit {
    range: Range<usize>,
    text: String,
}

/// Re-render scanned tags the callback modified.
fn replacements(original: &AssetTags, altered: &AssetTags) -> Vec<Edit> {
    altered
        .all()
        .filter_map(|tag| {
            let span = tag.source.as_ref()?;
            let before = original.all().find(|o| o.source.as_ref() == Some(span))?;
            (before != tag).then(|| Edit {
                range: span.clone(),
                text: tag.render(),
            })
        })
        .collect()
}

/// Insert the tags the callback created at `at`.
fn insertion<'a>(at: usize, tags: impl Iterator<Item = &'a HtmlTag>) -> Option<Edit> {
    let text: String = tags
        .filter(|tag| !tag.is_existing())
        .map(HtmlTag::render)
        .collect();
    (!text.is_empty()).then_some(Edit { range: at..at, text })
}

fn splice(html: &str, mut edits: Vec<Edit>) -> String {
    if edits.is_empty() {
        return html.to_string();
    }
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut out = String::with_capacity(html.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            continue;
        }
        out.push_str(&html[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&html[cursor..]);
    out
}
