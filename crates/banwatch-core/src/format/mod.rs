//! Notification formatting
//!
//! - [`LocaleTable`] / [`Labels`]: localized label strings, loaded once at startup
//! - [`render`]: turns a ban and its enrichment data into a message

pub mod locale;
pub mod render;

pub use locale::{Labels, LocaleTable};
pub use render::render;
