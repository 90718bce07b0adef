//! HTML tag descriptors passed through the asset-tag hook.

use super::escape::escape_attr;
use std::ops::Range;

/// One tag of a document's asset tag list.
///
/// Tags scanned from a document remember the byte range they came from;
/// tags created during the pass have no source and are inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub tag_name: String,
    /// Attributes in output order; `None` renders a boolean attribute.
    pub attributes: Vec<(String, Option<String>)>,
    pub void_tag: bool,
    pub(crate) source: Option<Range<usize>>,
}

impl HtmlTag {
    pub fn new(tag_name: impl Into<String>, void_tag: bool) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: Vec::new(),
            void_tag,
            source: None,
        }
    }

    /// `<link href rel="stylesheet" media [onload]>`
    pub fn stylesheet(href: impl Into<String>, media: impl Into<String>) -> Self {
        let mut tag = Self::new("link", true);
        tag.set_attr("href", href);
        tag.set_attr("rel", "stylesheet");
        tag.set_attr("media", media);
        tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn is_stylesheet_link(&self) -> bool {
        self.tag_name.eq_ignore_ascii_case("link")
            && self
                .get_attr("rel")
                .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
    }

    /// Whether the tag was scanned from the document.
    pub fn is_existing(&self) -> bool {
        self.source.is_some()
    }

    /// Render the opening tag (and closing tag for non-void elements).
    pub fn render(&self) -> String {
        let mut out = format!("<{}", self.tag_name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
        }
        out.push('>');
        if !self.void_tag {
            out.push_str("</");
            out.push_str(&self.tag_name);
            out.push('>');
        }
        out
    }
}
