//! Typed views over the opaque job payload.
//!
//! The claim machinery never looks inside `payload`; the API validates it at
//! enqueue time and the worker decodes it at execution time, both through
//! [`JobPayload::decode`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::job::JobKind;

fn default_poster_columns() -> u32 {
    3
}

fn default_frame_delay_ms() -> u64 {
    400
}

/// Payload for a collection poster job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PosterPayload {
    /// Cover image URLs, tiled left-to-right, top-to-bottom
    #[validate(length(min = 1, max = 100), custom(function = validate_urls))]
    pub cover_urls: Vec<String>,
    /// Optional title rendered into the poster footer
    #[validate(length(max = 120))]
    pub title: Option<String>,
    /// Grid width in covers
    #[serde(default = "default_poster_columns")]
    #[validate(range(min = 1, max = 10))]
    pub columns: u32,
}

/// Payload for an animated shelf GIF job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GifPayload {
    /// Frame image URLs in display order
    #[validate(length(min = 2, max = 200), custom(function = validate_urls))]
    pub frame_urls: Vec<String>,
    /// Delay between frames in milliseconds
    #[serde(default = "default_frame_delay_ms")]
    #[validate(range(min = 20, max = 5000))]
    pub frame_delay_ms: u64,
}

/// Payload for a seasonal artwork finishing job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ArtworkPayload {
    /// Originating artwork event, used to key the artifact
    #[validate(length(min = 1, max = 64))]
    pub event_id: String,
    /// Generated source image URL
    #[validate(url)]
    pub image_url: String,
    /// Optional caption drawn onto the artwork
    #[validate(length(max = 200))]
    pub caption: Option<String>,
}

fn validate_urls(urls: &[String]) -> Result<(), validator::ValidationError> {
    for url in urls {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(validator::ValidationError::new("url"));
        }
    }
    Ok(())
}

/// Decoded, validated payload for a specific job kind.
#[derive(Debug, Clone)]
pub enum JobPayload {
    Poster(PosterPayload),
    Gif(GifPayload),
    Artwork(ArtworkPayload),
}

/// Payload decode/validation failure.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: JobKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind} payload: {errors}")]
    Invalid {
        kind: JobKind,
        errors: validator::ValidationErrors,
    },
}

impl JobPayload {
    /// Decode and validate a raw payload against its job kind.
    pub fn decode(kind: JobKind, payload: &serde_json::Value) -> Result<Self, PayloadError> {
        let decoded = match kind {
            JobKind::Poster => Self::Poster(
                serde_json::from_value(payload.clone())
                    .map_err(|source| PayloadError::Malformed { kind, source })?,
            ),
            JobKind::Gif => Self::Gif(
                serde_json::from_value(payload.clone())
                    .map_err(|source| PayloadError::Malformed { kind, source })?,
            ),
            JobKind::Artwork => Self::Artwork(
                serde_json::from_value(payload.clone())
                    .map_err(|source| PayloadError::Malformed { kind, source })?,
            ),
        };
        decoded.validate_inner()?;
        Ok(decoded)
    }

    /// Kind this payload belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Poster(_) => JobKind::Poster,
            JobPayload::Gif(_) => JobKind::Gif,
            JobPayload::Artwork(_) => JobKind::Artwork,
        }
    }

    fn validate_inner(&self) -> Result<(), PayloadError> {
        let result = match self {
            JobPayload::Poster(p) => p.validate(),
            JobPayload::Gif(p) => p.validate(),
            JobPayload::Artwork(p) => p.validate(),
        };
        result.map_err(|errors| PayloadError::Invalid {
            kind: self.kind(),
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_poster_payload_decodes_with_defaults() {
        let value = json!({ "cover_urls": ["https://cdn.example.com/a.jpg"] });
        let payload = JobPayload::decode(JobKind::Poster, &value).unwrap();
        match payload {
            JobPayload::Poster(p) => assert_eq!(p.columns, 3),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_poster_payload_rejects_empty_covers() {
        let value = json!({ "cover_urls": [] });
        assert!(matches!(
            JobPayload::decode(JobKind::Poster, &value),
            Err(PayloadError::Invalid { .. })
        ));
    }

    #[test]
    fn test_gif_payload_rejects_non_url_frames() {
        let value = json!({ "frame_urls": ["https://cdn.example.com/1.jpg", "file:///etc/passwd"] });
        assert!(matches!(
            JobPayload::decode(JobKind::Gif, &value),
            Err(PayloadError::Invalid { .. })
        ));
    }

    #[test]
    fn test_kind_payload_mismatch_is_malformed() {
        let value = json!({ "frame_urls": ["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"] });
        assert!(matches!(
            JobPayload::decode(JobKind::Artwork, &value),
            Err(PayloadError::Malformed { .. })
        ));
    }

    #[test]
    fn test_artwork_payload_round_trip() {
        let value = json!({
            "event_id": "xmas-2025-4821",
            "image_url": "https://cdn.example.com/generated/4821.png",
            "caption": "Season's spinnings"
        });
        let payload = JobPayload::decode(JobKind::Artwork, &value).unwrap();
        assert_eq!(payload.kind(), JobKind::Artwork);
    }
}
