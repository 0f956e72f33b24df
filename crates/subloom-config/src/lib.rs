#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Client-side settings for talking to a Subloom backend.
//!
//! Layout: `defaults.rs` (built-in values), `model.rs` (settings and overlays),
//! `validate.rs` (field checks), `loader.rs` (file layering), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_settings, read_overlay};
pub use model::{ClientSettings, ClientSettingsOverlay};
pub use validate::validate_settings;
