//! Application module: the parent view that owns the catalog and decides
//! what plays.
//!
//! The `App` model lives in `app::model` and holds the catalog, the list
//! selection, filtering, favorites and the now-playing track.

mod model;

pub use model::*;
