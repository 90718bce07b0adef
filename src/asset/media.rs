//! Media descriptors recorded per asset during a build.

use rustc_hash::FxHashMap;

/// Media value an inert stylesheet link starts with.
pub const UNBLOCKING_LOAD_MEDIA: &str = "none";
/// Media value the link switches to once loaded.
pub const UNBLOCKING_ONLOAD_MEDIA: &str = "all";

/// How a stylesheet link should be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDescriptor {
    /// Plain media condition, e.g. `(max-width: 768px)`.
    Query(String),
    /// Load with inert media, then switch on `onload` so the sheet does not
    /// block first paint.
    Unblocking {
        load_media: String,
        on_load_media: String,
    },
}

impl MediaDescriptor {
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query(query.into())
    }

    /// The `none` → `all` swap.
    pub fn unblocking() -> Self {
        Self::Unblocking {
            load_media: UNBLOCKING_LOAD_MEDIA.into(),
            on_load_media: UNBLOCKING_ONLOAD_MEDIA.into(),
        }
    }

    /// Value of the link's `media` attribute.
    pub fn media(&self) -> &str {
        match self {
            Self::Query(query) => query,
            Self::Unblocking { load_media, .. } => load_media,
        }
    }

    /// Value of the link's `onload` attribute, if any.
    pub fn onload(&self) -> Option<String> {
        match self {
            Self::Query(_) => None,
            Self::Unblocking { on_load_media, .. } => {
                Some(format!("this.media='{on_load_media}'"))
            }
        }
    }
}

/// Asset name → media descriptor for one build.
#[derive(Debug, Default)]
pub struct MediaMap {
    entries: FxHashMap<String, MediaDescriptor>,
}

impl MediaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<String>, media: MediaDescriptor) {
        self.entries.insert(asset.into(), media);
    }

    pub fn get(&self, asset: &str) -> Option<&MediaDescriptor> {
        self.entries.get(asset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
