use crate::config::TrackDisplayField;

use super::model::TrackDescriptor;

/// Name of the pseudo-category that shows every track.
pub const ALL_CATEGORIES: &str = "All";

/// Build a display string for a track according to the provided `fields` and separator.
///
/// Blank fields are skipped; when nothing is left the title (or `placeholder`)
/// is used so list rows are never empty.
pub fn display_from_fields(
    track: &TrackDescriptor,
    fields: &[TrackDisplayField],
    sep: &str,
    placeholder: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    for f in fields {
        let value = match f {
            TrackDisplayField::Title => track.title.trim(),
            TrackDisplayField::Artist => track.artist.trim(),
            TrackDisplayField::Category => track.category.trim(),
        };
        if !value.is_empty() {
            parts.push(value.to_string());
        }
    }

    if parts.is_empty() {
        track.title_or(placeholder).to_string()
    } else {
        parts.join(sep)
    }
}

/// Category tabs in first-seen catalog order, led by [`ALL_CATEGORIES`].
pub fn category_tabs(tracks: &[TrackDescriptor]) -> Vec<String> {
    let mut tabs = vec![ALL_CATEGORIES.to_string()];
    for t in tracks {
        let c = t.category.trim();
        if !c.is_empty() && !tabs.iter().any(|existing| existing == c) {
            tabs.push(c.to_string());
        }
    }
    tabs
}
