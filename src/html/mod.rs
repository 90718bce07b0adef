//! HTML generator integration: asset-tag hooks and link tag generation.

mod escape;
mod hook;
mod inject;
mod tag;

pub use hook::{AssetTags, HtmlHook, hook_for};
pub use inject::{InjectFilter, generate_link_tags};

#[cfg(test)]
pub use tag::HtmlTag;
