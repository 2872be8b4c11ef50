use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::model::TrackDescriptor;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk catalog: a list of `[[track]]` tables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    #[serde(alias = "tracks")]
    track: Vec<TrackDescriptor>,
}

/// Parse catalog TOML text. Entries without an id get a positional one.
pub fn parse_catalog(text: &str) -> Result<Vec<TrackDescriptor>, toml::de::Error> {
    let file: CatalogFile = toml::from_str(text)?;
    let tracks = file
        .track
        .into_iter()
        .enumerate()
        .map(|(i, mut t)| {
            if t.id.trim().is_empty() {
                t.id = format!("track-{}", i + 1);
            }
            t
        })
        .collect();
    Ok(tracks)
}

pub fn load_catalog(path: &Path) -> Result<Vec<TrackDescriptor>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `path` if given, otherwise (or on any failure) use [`fallback_catalog`].
pub fn load_or_fallback(path: Option<&Path>) -> Vec<TrackDescriptor> {
    let Some(path) = path else {
        tracing::info!("no catalog configured, using built-in songs");
        return fallback_catalog();
    };

    match load_catalog(path) {
        Ok(tracks) if !tracks.is_empty() => {
            tracing::info!(path = %path.display(), count = tracks.len(), "catalog loaded");
            tracks
        }
        Ok(_) => {
            tracing::warn!(path = %path.display(), "catalog is empty, using built-in songs");
            fallback_catalog()
        }
        Err(e) => {
            tracing::warn!(error = %e, "catalog unavailable, using built-in songs");
            fallback_catalog()
        }
    }
}

/// Songs shown when no catalog can be read. They carry no audio source, so
/// selecting one leaves the player idle with a hint.
pub fn fallback_catalog() -> Vec<TrackDescriptor> {
    const SONGS: [(&str, &str, &str, &str); 8] = [
        ("Oceans (Where Feet May Fail)", "Hillsong United", "Adoração", "Oceans"),
        ("What a Beautiful Name", "Hillsong Worship", "Louvor", "Beautiful+Name"),
        ("Raise a Hallelujah", "Bethel Music", "Adoração", "Hallelujah"),
        ("Reckless Love", "Cory Asbury", "Gospel", "Reckless+Love"),
        ("Lugar Secreto", "Gabriela Rocha", "Gospel", "Lugar+Secreto"),
        ("Tua Graça Me Basta", "Davi Sacer", "Louvor", "Tua+Graça"),
        (
            "Ninguém Explica Deus",
            "Preto no Branco ft. Gabriela Rocha",
            "Gospel",
            "Ninguém+Explica",
        ),
        ("Way Maker", "Sinach", "Gospel Internacional", "Way+Maker"),
    ];

    SONGS
        .iter()
        .enumerate()
        .map(|(i, (title, artist, category, cover))| TrackDescriptor {
            id: (i + 1).to_string(),
            title: (*title).to_string(),
            artist: (*artist).to_string(),
            category: (*category).to_string(),
            cover_image: format!("https://via.placeholder.com/200x200?text={cover}"),
            audio_src: String::new(),
        })
        .collect()
}
