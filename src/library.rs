//! Track catalog: the descriptor model, catalog loading and display helpers.
//!
//! Songs arrive as opaque data from a catalog file; nothing here validates
//! that a remote source is still reachable.

mod catalog;
mod display;
mod model;

pub use catalog::{CatalogError, fallback_catalog, load_catalog, load_or_fallback, parse_catalog};
pub use display::{ALL_CATEGORIES, category_tabs, display_from_fields};
pub use model::TrackDescriptor;
