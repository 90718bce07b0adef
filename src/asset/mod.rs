//! Asset table, media map and asset IO.

mod io;
mod media;
pub mod minify;
mod table;

pub use io::{load_assets, write_changed};
pub use media::{MediaDescriptor, MediaMap};
pub use table::{AssetRecord, AssetTable, is_css_name};
