//! Configuration section definitions.
//!
//! Each module corresponds to a section in `mediasplit.toml`:
//!
//! | Module  | TOML Section | Purpose                                   |
//! |---------|--------------|-------------------------------------------|
//! | `build` | `[build]`    | Output directory, public path, minify     |
//! | `split` | `[split]`    | Breakpoints, unit, exclusion, injection   |
//! | `html`  | `[html]`     | HTML generator hook                       |

mod build;
mod html;
mod split;

pub use build::BuildConfig;
pub use html::{HookKind, HtmlConfig};
pub use split::{InjectMode, SplitConfig};
