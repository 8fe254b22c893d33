//! Core types for playback-core

use crate::drm::DrmParameters;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Launch action carried by a playback request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    /// Play a single item
    View,
    /// Play an ordered list of items
    ViewList,
}

impl RequestAction {
    /// Parse the logical action name from a request shape
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "VIEW" => Ok(RequestAction::View),
            "VIEW_LIST" => Ok(RequestAction::ViewList),
            other => Err(Error::UnexpectedRequestAction(other.to_string())),
        }
    }
}

/// One playable item: a URI plus an optional explicit content-type hint
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub uri: Url,
    pub type_hint: Option<String>,
}

impl MediaItem {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            type_hint: None,
        }
    }

    pub fn with_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.type_hint = Some(hint.into());
        self
    }
}

/// Immutable launch input for one session attempt
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub action: RequestAction,
    pub items: Vec<MediaItem>,
    pub drm: Option<DrmParameters>,
    pub ad_tag_uri: Option<Url>,
    pub abr_algorithm: Option<String>,
    pub tunneling: bool,
    pub prefer_extension_decoders: bool,
}

impl PlaybackRequest {
    /// Request for a single item
    pub fn view(uri: Url) -> Self {
        Self {
            action: RequestAction::View,
            items: vec![MediaItem::new(uri)],
            drm: None,
            ad_tag_uri: None,
            abr_algorithm: None,
            tunneling: false,
            prefer_extension_decoders: false,
        }
    }

    /// Request for an ordered playlist
    pub fn view_list(items: Vec<MediaItem>) -> Self {
        Self {
            action: RequestAction::ViewList,
            items,
            drm: None,
            ad_tag_uri: None,
            abr_algorithm: None,
            tunneling: false,
            prefer_extension_decoders: false,
        }
    }

    pub fn with_type_hint(mut self, hint: impl Into<String>) -> Self {
        if let Some(item) = self.items.first_mut() {
            item.type_hint = Some(hint.into());
        }
        self
    }

    pub fn with_drm(mut self, params: DrmParameters) -> Self {
        self.drm = Some(params);
        self
    }

    pub fn with_ad_tag_uri(mut self, uri: Url) -> Self {
        self.ad_tag_uri = Some(uri);
        self
    }

    pub fn with_abr_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.abr_algorithm = Some(algorithm.into());
        self
    }

    pub fn with_tunneling(mut self, tunneling: bool) -> Self {
        self.tunneling = tunneling;
        self
    }

    pub fn with_prefer_extension_decoders(mut self, prefer: bool) -> Self {
        self.prefer_extension_decoders = prefer;
        self
    }

    /// Validate the action/shape pairing before any resource is allocated
    pub fn validate(&self) -> Result<()> {
        match self.action {
            RequestAction::View if self.items.len() == 1 => Ok(()),
            RequestAction::ViewList if !self.items.is_empty() => Ok(()),
            action => Err(Error::UnexpectedRequestAction(format!(
                "{action:?} with {} items",
                self.items.len()
            ))),
        }
    }

    /// The URI set identifying this request's content. Two requests with the
    /// same identity share a resume position across teardown.
    pub fn content_identity(&self) -> Vec<&Url> {
        self.items.iter().map(|item| &item.uri).collect()
    }
}

/// Content-source variant selected for a URI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Dash,
    SmoothStreaming,
    Hls,
    Progressive,
}

impl ContentType {
    /// Infer the content type from an explicit hint if present, else from
    /// the URI's path suffix.
    pub fn infer(uri: &Url, type_hint: Option<&str>) -> ContentType {
        if let Some(hint) = type_hint {
            return match hint.to_ascii_lowercase().as_str() {
                "mpd" | "dash" => ContentType::Dash,
                "m3u8" | "hls" => ContentType::Hls,
                "ism" | "isml" | "ss" => ContentType::SmoothStreaming,
                _ => ContentType::Progressive,
            };
        }
        let path = uri.path().to_ascii_lowercase();
        if path.ends_with(".mpd") {
            ContentType::Dash
        } else if path.ends_with(".m3u8") || path.ends_with(".m3u") {
            ContentType::Hls
        } else if path.ends_with(".ism") || path.ends_with(".isml") || path.contains(".ism/") {
            ContentType::SmoothStreaming
        } else {
            ContentType::Progressive
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Dash => write!(f, "dash"),
            ContentType::SmoothStreaming => write!(f, "smooth_streaming"),
            ContentType::Hls => write!(f, "hls"),
            ContentType::Progressive => write!(f, "progressive"),
        }
    }
}

/// Position to restore when re-preparing a session after teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePosition {
    pub autoplay: bool,
    pub window_index: Option<usize>,
    pub position: Option<Duration>,
}

impl Default for ResumePosition {
    fn default() -> Self {
        Self {
            autoplay: true,
            window_index: None,
            position: None,
        }
    }
}

impl ResumePosition {
    /// Capture the live player position on teardown; negative content
    /// positions clamp to zero.
    pub fn capture(autoplay: bool, window_index: usize, position_ms: i64) -> Self {
        Self {
            autoplay,
            window_index: Some(window_index),
            position: Some(Duration::from_millis(position_ms.max(0) as u64)),
        }
    }

    /// Reset to the unset, autoplay state used for new content
    pub fn clear(&mut self) {
        *self = ResumePosition::default();
    }

    pub fn is_set(&self) -> bool {
        self.window_index.is_some()
    }
}

/// Session controller state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session constructed yet
    New,
    /// Session construction in progress
    Initializing,
    /// Player resource accepted the prepared source
    Prepared,
    /// Content is playing
    Playing,
    /// Playback paused
    Paused,
    /// Session torn down; a new initialize starts a fresh session
    Released,
}

impl SessionState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            // From New
            (New, Initializing) | (New, Released) |
            // From Initializing
            (Initializing, Prepared) | (Initializing, New) |
            // From Prepared
            (Prepared, Playing) | (Prepared, Paused) | (Prepared, Initializing) | (Prepared, Released) |
            // From Playing
            (Playing, Paused) | (Playing, Initializing) | (Playing, Released) |
            // From Paused
            (Paused, Playing) | (Paused, Initializing) | (Paused, Released) |
            // From Released
            (Released, Initializing)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::New => write!(f, "new"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Prepared => write!(f, "prepared"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Released => write!(f, "released"),
        }
    }
}

/// The record a host persists across process death.
///
/// `restore_state(save_state())` must reproduce the same observable
/// selection and resume behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSessionState {
    pub track_selector_blob: Vec<u8>,
    pub autoplay: bool,
    pub window_index: Option<u32>,
    pub position_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(RequestAction::parse("VIEW").unwrap(), RequestAction::View);
        assert_eq!(
            RequestAction::parse("VIEW_LIST").unwrap(),
            RequestAction::ViewList
        );
        assert!(matches!(
            RequestAction::parse("EDIT"),
            Err(Error::UnexpectedRequestAction(_))
        ));
    }

    #[test]
    fn test_request_shape_validation() {
        let single = PlaybackRequest::view(url("https://x/a.mpd"));
        assert!(single.validate().is_ok());

        let empty_list = PlaybackRequest::view_list(vec![]);
        assert!(matches!(
            empty_list.validate(),
            Err(Error::UnexpectedRequestAction(_))
        ));

        let mut broken = PlaybackRequest::view(url("https://x/a.mpd"));
        broken.items.push(MediaItem::new(url("https://x/b.mpd")));
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_content_type_from_hint() {
        let uri = url("https://x/stream");
        assert_eq!(ContentType::infer(&uri, Some("mpd")), ContentType::Dash);
        assert_eq!(ContentType::infer(&uri, Some("hls")), ContentType::Hls);
        assert_eq!(
            ContentType::infer(&uri, Some("ss")),
            ContentType::SmoothStreaming
        );
        assert_eq!(
            ContentType::infer(&uri, Some("mp4")),
            ContentType::Progressive
        );
    }

    #[test]
    fn test_content_type_from_suffix() {
        assert_eq!(
            ContentType::infer(&url("https://x/a.mpd"), None),
            ContentType::Dash
        );
        assert_eq!(
            ContentType::infer(&url("https://x/master.m3u8"), None),
            ContentType::Hls
        );
        assert_eq!(
            ContentType::infer(&url("https://x/stream.ism/manifest"), None),
            ContentType::SmoothStreaming
        );
        assert_eq!(
            ContentType::infer(&url("https://x/clip.mp4"), None),
            ContentType::Progressive
        );
    }

    #[test]
    fn test_hint_overrides_suffix() {
        assert_eq!(
            ContentType::infer(&url("https://x/a.mpd"), Some("hls")),
            ContentType::Hls
        );
    }

    #[test]
    fn test_resume_position_clamps_negative() {
        let resume = ResumePosition::capture(true, 2, -250);
        assert_eq!(resume.position, Some(Duration::ZERO));
        assert_eq!(resume.window_index, Some(2));
    }

    #[test]
    fn test_resume_position_clear() {
        let mut resume = ResumePosition::capture(false, 1, 5_000);
        assert!(resume.is_set());
        resume.clear();
        assert!(!resume.is_set());
        assert!(resume.autoplay);
    }

    #[test]
    fn test_session_state_transitions() {
        assert!(SessionState::New.can_transition_to(SessionState::Initializing));
        assert!(SessionState::Initializing.can_transition_to(SessionState::Prepared));
        assert!(SessionState::Prepared.can_transition_to(SessionState::Playing));
        assert!(SessionState::Playing.can_transition_to(SessionState::Paused));
        assert!(SessionState::Released.can_transition_to(SessionState::Initializing));

        assert!(!SessionState::New.can_transition_to(SessionState::Playing));
        assert!(!SessionState::Released.can_transition_to(SessionState::Playing));
    }

    #[test]
    fn test_content_identity() {
        let a = PlaybackRequest::view(url("https://x/a.mpd"));
        let b = PlaybackRequest::view(url("https://x/a.mpd")).with_tunneling(true);
        let c = PlaybackRequest::view(url("https://x/b.mpd"));
        assert_eq!(a.content_identity(), b.content_identity());
        assert_ne!(a.content_identity(), c.content_identity());
    }
}
