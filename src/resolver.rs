//! Turns a track's `audio_src` into a fully-qualified, percent-encoded address.
//!
//! Absolute `http(s)://` addresses pass through untouched. Anything else is a
//! path under the configured stream base: the two are joined with exactly one
//! `/` and the result is encoded the way a browser's `encodeURI` would, so
//! spaces and non-ASCII characters become `%XX` escapes while URI delimiters
//! survive. Escapes already present are kept as written.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in addition to controls and non-ASCII bytes.
const URI_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const ABSOLUTE_SCHEMES: [&str; 2] = ["http://", "https://"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlResolver {
    base: String,
}

impl UrlResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Resolve `raw` against the base. Empty (or blank) input resolves to an
    /// empty string, meaning "no source".
    pub fn resolve(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        if is_absolute(raw) {
            return raw.to_string();
        }

        let base = self.base.trim().trim_end_matches('/');
        let path = raw.trim_start_matches('/');
        let joined = format!("{base}/{path}");

        encode_uri(&joined)
    }
}

/// Encode `input`, passing existing `%XX` escapes through. A `%` that does
/// not start an escape becomes `%25`.
fn encode_uri(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(at) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..at], URI_UNSAFE));
        let tail = &rest[at..];
        if starts_with_escape(tail) {
            out.push_str(&tail[..3]);
            rest = &tail[3..];
        } else {
            out.push_str("%25");
            rest = &tail[1..];
        }
    }
    out.extend(utf8_percent_encode(rest, URI_UNSAFE));
    out
}

fn starts_with_escape(s: &str) -> bool {
    matches!(s.as_bytes(), [b'%', hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
}

/// Whether `raw` already names a network address.
pub fn is_absolute(raw: &str) -> bool {
    ABSOLUTE_SCHEMES.iter().any(|scheme| {
        raw.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

#[cfg(test)]
mod tests;
