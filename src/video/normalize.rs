//! Turns heterogeneous vendor responses into one [`Artifact`].
//!
//! Vendors hand back clips three ways: a binary body, a JSON document with a
//! URL field, or a redirect whose final URL is the clip. They are checked in
//! that order and the first match wins.

use crate::error::Result;
use crate::video::types::Artifact;
use serde_json::Value;

/// JSON fields holding the artifact URL, highest precedence first.
pub const URL_FIELDS: [&str; 3] = ["url", "video_url", "output"];

/// JSON fields holding a thumbnail URL. Dotted names are nested paths.
pub const THUMBNAIL_FIELDS: [&str; 3] = ["thumbnail_url", "thumbnail", "assets.image"];

/// Bodies smaller than this are noise, not a clip.
pub const MIN_VIDEO_BYTES: usize = 1000;

/// Result of normalizing one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// An artifact was resolved.
    Artifact(Artifact),
    /// A binary body under the minimum viable size.
    TooSmall(usize),
    /// Nothing recognizable; carries the content type.
    Unrecognized(String),
}

impl Normalized {
    /// Returns the artifact, discarding the reason for a miss.
    pub fn into_artifact(self) -> Option<Artifact> {
        match self {
            Self::Artifact(artifact) => Some(artifact),
            _ => None,
        }
    }
}

/// True for `video/*` and `application/octet-stream`.
pub fn is_video_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("video/") || ct.contains("octet-stream")
}

/// Extracts the artifact URL from a JSON document.
///
/// Checks [`URL_FIELDS`] first, then vendor-specific `extra_fields`. A field
/// may hold a string, an array (first usable entry) or an object with its
/// own `url`. Dotted field names (`assets.video`) address nested objects.
pub fn url_from_json(value: &Value, extra_fields: &[&str]) -> Option<String> {
    URL_FIELDS
        .iter()
        .chain(extra_fields.iter())
        .find_map(|field| lookup(value, field).and_then(url_from_value))
}

fn thumbnail_from_json(value: &Value) -> Option<String> {
    THUMBNAIL_FIELDS
        .iter()
        .find_map(|field| lookup(value, field).and_then(url_from_value))
}

fn lookup<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    if field.contains('.') {
        value.pointer(&format!("/{}", field.replace('.', "/")))
    } else {
        value.get(field)
    }
}

fn url_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(url_from_value),
        Value::Object(map) => map.get("url").and_then(url_from_value),
        _ => None,
    }
}

/// Normalizes a successful response.
///
/// `requested` is the URL the request was sent to; a different final URL
/// after redirects counts as the artifact location.
pub async fn normalize_response(
    response: reqwest::Response,
    requested: &reqwest::Url,
    extra_fields: &[&str],
) -> Result<Normalized> {
    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if is_video_content_type(&content_type) {
        let data = response.bytes().await?;
        if data.len() < MIN_VIDEO_BYTES {
            return Ok(Normalized::TooSmall(data.len()));
        }
        let mime = if content_type.starts_with("video/") {
            content_type.split(';').next().unwrap_or("video/mp4").trim().to_string()
        } else {
            "video/mp4".to_string()
        };
        return Ok(Normalized::Artifact(Artifact::bytes(data.to_vec(), mime)));
    }

    if content_type.contains("json") {
        let text = response.text().await?;
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            if let Some(url) = url_from_json(&value, extra_fields) {
                let artifact = Artifact::url(url).with_thumbnail(thumbnail_from_json(&value));
                return Ok(Normalized::Artifact(artifact));
            }
        }
    }

    if final_url != *requested {
        return Ok(Normalized::Artifact(Artifact::url(final_url.to_string())));
    }

    Ok(Normalized::Unrecognized(content_type))
}
