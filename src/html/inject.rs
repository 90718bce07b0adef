//! Link tag generation for split stylesheets.

use super::hook::AssetTags;
use super::tag::HtmlTag;
use crate::asset::{AssetTable, MediaDescriptor, MediaMap};

/// Which assets a document receives tags for.
#[derive(Debug, Clone, Copy)]
pub enum InjectFilter<'a> {
    All,
    /// Asset names containing one of these chunk names.
    Chunks(&'a [String]),
}

impl InjectFilter<'_> {
    pub fn admits(&self, asset: &str) -> bool {
        match self {
            Self::All => true,
            Self::Chunks(chunks) => chunks.iter().any(|chunk| asset.contains(chunk.as_str())),
        }
    }
}

/// Tags generated for one document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LinkTags {
    /// New `<link>` tags in asset-table order.
    pub tags: Vec<HtmlTag>,
    /// Hrefs of existing links to switch to non-blocking loading, with the
    /// descriptor to apply.
    pub unblock: Vec<(String, MediaDescriptor)>,
}

impl LinkTags {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.unblock.is_empty()
    }

    /// Merge into a document's tag list.
    ///
    /// New tags are appended to the head group unless the document already
    /// links the same href. Existing stylesheet links whose href points at an
    /// unblocking asset get its `media` and `onload`; every other tag is left
    /// as it is.
    pub fn merge_into(self, tags: &mut AssetTags) {
        if !self.unblock.is_empty() {
            for tag in tags.head.iter_mut().chain(tags.body.iter_mut()) {
                if !tag.is_stylesheet_link() {
                    continue;
                }
                let Some(href) = tag.get_attr("href").map(strip_query) else {
                    continue;
                };
                let Some((_, descriptor)) = self.unblock.iter().find(|(u, _)| u == href) else {
                    continue;
                };
                tag.set_attr("media", descriptor.media());
                if let Some(onload) = descriptor.onload() {
                    tag.set_attr("onload", onload);
                }
            }
        }
        let linked: Vec<String> = tags
            .head
            .iter()
            .chain(&tags.body)
            .filter(|tag| tag.is_stylesheet_link())
            .filter_map(|tag| tag.get_attr("href").map(|href| strip_query(href).to_string()))
            .collect();
        tags.head.extend(self.tags.into_iter().filter(|tag| {
            tag.get_attr("href")
                .is_none_or(|href| !linked.iter().any(|l| l == href))
        }));
    }
}

fn strip_query(href: &str) -> &str {
    href.split(['?', '#']).next().unwrap_or(href)
}

/// Build link tags for every split stylesheet `is_target` and `filter` admit.
///
/// Assets with a media condition get a new tag with `href = public_path +
/// name`. Assets with the non-blocking descriptor get no tag; their existing
/// links are rewritten by [`LinkTags::merge_into`].
pub fn generate_link_tags(
    assets: &AssetTable,
    media: &MediaMap,
    is_target: impl Fn(&str) -> bool,
    filter: InjectFilter<'_>,
    public_path: &str,
) -> LinkTags {
    let mut out = LinkTags::default();

    for record in assets.iter() {
        if !record.is_css() || !is_target(&record.name) || !filter.admits(&record.name) {
            continue;
        }
        let Some(descriptor) = media.get(&record.name) else {
            continue;
        };

        let href = format!("{public_path}{}", record.name);
        match descriptor {
            MediaDescriptor::Query(query) => out.tags.push(HtmlTag::stylesheet(href, query)),
            MediaDescriptor::Unblocking { .. } => out.unblock.push((href, descriptor.clone())),
        }
    }

    out
}
