//! Error types and classification for playback-core

use crate::tracks::TrackType;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Playback error types
#[derive(Error, Debug)]
pub enum Error {
    // Request validation errors
    #[error("Unexpected request action: {0}")]
    UnexpectedRequestAction(String),

    #[error("Unrecognized ABR algorithm: {0}")]
    UnrecognizedAbrAlgorithm(String),

    #[error("Malformed key request headers: {count} entries cannot be paired")]
    MalformedKeyRequestHeaders { count: usize },

    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // Content resolution errors
    #[error("Unsupported content type for {uri}")]
    UnsupportedContentType { uri: String },

    // DRM errors
    #[error("No DRM engine factory configured")]
    DrmNotConfigured,

    #[error("DRM not supported on this platform: api level {actual}, {required} required")]
    DrmUnsupportedPlatform { required: u32, actual: u32 },

    #[error("Unsupported DRM scheme: {scheme}")]
    DrmUnsupportedScheme { scheme: Uuid },

    // Ad errors
    #[error("Ad extension not available")]
    AdExtensionUnavailable,

    #[error("Ad loader construction failed: {0}")]
    AdLoaderFailed(String),

    // Playback errors delivered by the player resource
    #[error("Playback is behind the live window")]
    BehindLiveWindow,

    #[error("Unknown host: {host}")]
    UnknownHost { host: String },

    #[error("Unsupported {track_type} track")]
    UnsupportedTrackType { track_type: TrackType },

    #[error("Decoder initialization failed for {mime_type}")]
    DecoderInitFailed {
        mime_type: String,
        secure_required: bool,
        decoder_name: Option<String>,
    },

    #[error("Player error: {0}")]
    Player(String),

    // State persistence errors
    #[error("State serialization failed: {0}")]
    StateSerialization(#[from] serde_json::Error),
}

/// Classification of an error into the recovery-policy taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad request shape or configuration; always fatal, never retried
    Configuration,
    /// Missing platform/runtime capability; DRM is fatal, ads degrade
    Capability,
    /// Recovered automatically once per occurrence
    Transient,
    /// Reported, non-fatal, no state change
    TrackSupportWarning,
    /// Surfaced to the caller without automatic action
    Unclassified,
}

impl Error {
    /// Classify this error for the session controller's recovery policy
    pub fn classify(&self) -> ErrorClass {
        match self {
            Error::UnexpectedRequestAction(_)
            | Error::UnrecognizedAbrAlgorithm(_)
            | Error::MalformedKeyRequestHeaders { .. }
            | Error::InvalidStateTransition { .. }
            | Error::UnsupportedContentType { .. }
            | Error::StateSerialization(_) => ErrorClass::Configuration,
            Error::DrmNotConfigured
            | Error::DrmUnsupportedPlatform { .. }
            | Error::DrmUnsupportedScheme { .. }
            | Error::AdExtensionUnavailable
            | Error::AdLoaderFailed(_) => ErrorClass::Capability,
            Error::BehindLiveWindow => ErrorClass::Transient,
            Error::UnsupportedTrackType { .. } => ErrorClass::TrackSupportWarning,
            Error::UnknownHost { .. }
            | Error::DecoderInitFailed { .. }
            | Error::Player(_) => ErrorClass::Unclassified,
        }
    }

    /// Returns true if a live-window discontinuity caused this error
    pub fn is_behind_live_window(&self) -> bool {
        matches!(self, Error::BehindLiveWindow)
    }

    /// Returns true if an unresolvable host caused this error
    pub fn is_unknown_host(&self) -> bool {
        matches!(self, Error::UnknownHost { .. })
    }

    /// Returns the error code for telemetry
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnexpectedRequestAction(_) => "UNEXPECTED_ACTION",
            Error::UnrecognizedAbrAlgorithm(_) => "UNRECOGNIZED_ABR",
            Error::MalformedKeyRequestHeaders { .. } => "MALFORMED_KEY_HEADERS",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::UnsupportedContentType { .. } => "CONTENT_UNSUPPORTED",
            Error::DrmNotConfigured => "DRM_NOT_CONFIGURED",
            Error::DrmUnsupportedPlatform { .. } => "DRM_PLATFORM",
            Error::DrmUnsupportedScheme { .. } => "DRM_SCHEME",
            Error::AdExtensionUnavailable => "AD_EXTENSION_ABSENT",
            Error::AdLoaderFailed(_) => "AD_LOADER",
            Error::BehindLiveWindow => "BEHIND_LIVE_WINDOW",
            Error::UnknownHost { .. } => "UNKNOWN_HOST",
            Error::UnsupportedTrackType { .. } => "TRACK_UNSUPPORTED",
            Error::DecoderInitFailed { .. } => "DECODER_INIT",
            Error::Player(_) => "PLAYER",
            Error::StateSerialization(_) => "STATE_SERIALIZATION",
        }
    }
}

/// Maps a classified error to a human-readable string.
///
/// A pure function owned by the UI collaborator; implementations must not
/// perform side effects.
pub trait ErrorMessagePresenter: Send + Sync {
    fn message(&self, error: &Error) -> String;
}

/// Presenter with special-cased decoder initialization messages
#[derive(Debug, Default)]
pub struct DefaultMessagePresenter;

impl ErrorMessagePresenter for DefaultMessagePresenter {
    fn message(&self, error: &Error) -> String {
        match error {
            Error::DecoderInitFailed {
                mime_type,
                secure_required,
                decoder_name,
            } => match decoder_name {
                Some(name) => format!("Unable to instantiate decoder {name}"),
                None if *secure_required => {
                    format!("This device does not provide a secure decoder for {mime_type}")
                }
                None => format!("This device does not provide a decoder for {mime_type}"),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            Error::UnrecognizedAbrAlgorithm("bogus".into()).classify(),
            ErrorClass::Configuration
        );
        assert_eq!(
            Error::MalformedKeyRequestHeaders { count: 3 }.classify(),
            ErrorClass::Configuration
        );
        assert_eq!(
            Error::DrmUnsupportedPlatform {
                required: 18,
                actual: 16
            }
            .classify(),
            ErrorClass::Capability
        );
        assert_eq!(Error::BehindLiveWindow.classify(), ErrorClass::Transient);
        assert_eq!(
            Error::UnsupportedTrackType {
                track_type: TrackType::Video
            }
            .classify(),
            ErrorClass::TrackSupportWarning
        );
        assert_eq!(
            Error::Player("decode failed".into()).classify(),
            ErrorClass::Unclassified
        );
    }

    #[test]
    fn test_live_window_helper() {
        assert!(Error::BehindLiveWindow.is_behind_live_window());
        assert!(!Error::Player("x".into()).is_behind_live_window());
        assert!(Error::UnknownHost {
            host: "cdn.example.com".into()
        }
        .is_unknown_host());
    }

    #[test]
    fn test_decoder_messages() {
        let presenter = DefaultMessagePresenter;

        let no_decoder = Error::DecoderInitFailed {
            mime_type: "video/avc".into(),
            secure_required: false,
            decoder_name: None,
        };
        assert_eq!(
            presenter.message(&no_decoder),
            "This device does not provide a decoder for video/avc"
        );

        let secure = Error::DecoderInitFailed {
            mime_type: "video/avc".into(),
            secure_required: true,
            decoder_name: None,
        };
        assert_eq!(
            presenter.message(&secure),
            "This device does not provide a secure decoder for video/avc"
        );

        let named = Error::DecoderInitFailed {
            mime_type: "video/avc".into(),
            secure_required: false,
            decoder_name: Some("OMX.test.avc".into()),
        };
        assert_eq!(
            presenter.message(&named),
            "Unable to instantiate decoder OMX.test.avc"
        );
    }
}
