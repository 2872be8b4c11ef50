use serde::{Deserialize, Deserializer};

/// The minimal description of one playable item.
///
/// `audio_src` may be absolute (`https://...`) or relative to the configured
/// stream base; an empty `audio_src` means "nothing to play".
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackDescriptor {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub artist: String,
    pub category: String,
    #[serde(alias = "coverImage", alias = "thumbnail")]
    pub cover_image: String,
    #[serde(alias = "audioSrc", alias = "audioUrl")]
    pub audio_src: String,
}

impl TrackDescriptor {
    /// Title to show, or `placeholder` when the catalog left it blank.
    pub fn title_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        let t = self.title.trim();
        if t.is_empty() { placeholder } else { t }
    }

    /// Cover image to show, or `placeholder` when there is none.
    pub fn cover_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        let c = self.cover_image.trim();
        if c.is_empty() { placeholder } else { c }
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_src.trim().is_empty()
    }
}

// Catalog ids are numbers in some feeds and strings in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
