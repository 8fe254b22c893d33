//! Track selection state: ABR strategy plus serializable selector
//! parameters that persist across session teardown.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const ABR_ALGORITHM_DEFAULT: &str = "default";
pub const ABR_ALGORITHM_RANDOM: &str = "random";

/// Adaptive-bitrate strategy selected for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbrStrategy {
    /// Bandwidth-adaptive selection
    Adaptive,
    /// Randomized selection
    Random,
}

impl AbrStrategy {
    /// Resolve the strategy name from a request. An unset name means the
    /// default; any unrecognized value is a fatal configuration error.
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        match name {
            None => Ok(AbrStrategy::Adaptive),
            Some(ABR_ALGORITHM_DEFAULT) => Ok(AbrStrategy::Adaptive),
            Some(ABR_ALGORITHM_RANDOM) => Ok(AbrStrategy::Random),
            Some(other) => Err(Error::UnrecognizedAbrAlgorithm(other.to_string())),
        }
    }
}

/// Renderer track categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    Video,
    Audio,
    Text,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
            TrackType::Text => write!(f, "text"),
        }
    }
}

/// Serializable selector parameters; must round-trip losslessly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSelectorParameters {
    pub tunneling: bool,
    pub preferred_audio_language: Option<String>,
    pub preferred_text_language: Option<String>,
    pub max_video_bitrate: Option<u64>,
}

/// One selectable track as reported by the player after track mapping
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCandidate {
    pub id: String,
    pub track_type: TrackType,
    pub bitrate: u64,
    pub language: Option<String>,
    pub supported: bool,
}

/// Value snapshot of the mapped track groups.
///
/// Compared by value to detect "did tracks change", replacing identity
/// comparison on the live track-group objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSnapshot {
    pub tracks: Vec<TrackCandidate>,
}

impl TrackSnapshot {
    pub fn new(tracks: Vec<TrackCandidate>) -> Self {
        Self { tracks }
    }

    /// True when the mapping contains a track of this type no renderer
    /// supports
    pub fn has_unsupported(&self, track_type: TrackType) -> bool {
        self.tracks
            .iter()
            .any(|t| t.track_type == track_type && !t.supported)
    }
}

#[derive(Serialize, Deserialize)]
struct SelectorStateBlob {
    strategy: AbrStrategy,
    parameters: TrackSelectorParameters,
}

/// The controller's persistent track selection state
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSelectionState {
    strategy: AbrStrategy,
    parameters: TrackSelectorParameters,
}

impl Default for TrackSelectionState {
    fn default() -> Self {
        Self {
            strategy: AbrStrategy::Adaptive,
            parameters: TrackSelectorParameters::default(),
        }
    }
}

impl TrackSelectionState {
    /// Resolve and install the strategy for a new session
    pub fn select_strategy(&mut self, name: Option<&str>) -> Result<AbrStrategy> {
        let strategy = AbrStrategy::from_name(name)?;
        self.strategy = strategy;
        Ok(strategy)
    }

    pub fn strategy(&self) -> AbrStrategy {
        self.strategy
    }

    pub fn parameters(&self) -> &TrackSelectorParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut TrackSelectorParameters {
        &mut self.parameters
    }

    /// Serialize the selection state for host save/restore
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let blob = SelectorStateBlob {
            strategy: self.strategy,
            parameters: self.parameters.clone(),
        };
        Ok(serde_json::to_vec(&blob)?)
    }

    /// Restore a snapshot; a restored state selects the same tracks for
    /// the same candidate input as the state that produced it.
    pub fn restore(&mut self, blob: &[u8]) -> Result<()> {
        let blob: SelectorStateBlob = serde_json::from_slice(blob)?;
        self.strategy = blob.strategy;
        self.parameters = blob.parameters;
        Ok(())
    }

    /// Pick a track among the candidates of one renderer, or `None` when
    /// nothing is eligible.
    pub fn select_track_index(&self, candidates: &[TrackCandidate]) -> Option<usize> {
        let eligible: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.supported)
            .filter(|(_, c)| match self.parameters.max_video_bitrate {
                Some(cap) if c.track_type == TrackType::Video => c.bitrate <= cap,
                _ => true,
            })
            .filter(|(_, c)| match (&self.parameters.preferred_audio_language, c.track_type) {
                (Some(lang), TrackType::Audio) => c.language.as_deref() == Some(lang.as_str()),
                _ => true,
            })
            .map(|(i, _)| i)
            .collect();

        match self.strategy {
            AbrStrategy::Adaptive => eligible
                .into_iter()
                .max_by_key(|&i| candidates[i].bitrate),
            AbrStrategy::Random => {
                if eligible.is_empty() {
                    None
                } else {
                    Some(eligible[fastrand::usize(..eligible.len())])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, bitrate: u64) -> TrackCandidate {
        TrackCandidate {
            id: id.to_string(),
            track_type: TrackType::Video,
            bitrate,
            language: None,
            supported: true,
        }
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(AbrStrategy::from_name(None).unwrap(), AbrStrategy::Adaptive);
        assert_eq!(
            AbrStrategy::from_name(Some("default")).unwrap(),
            AbrStrategy::Adaptive
        );
        assert_eq!(
            AbrStrategy::from_name(Some("random")).unwrap(),
            AbrStrategy::Random
        );
        assert!(matches!(
            AbrStrategy::from_name(Some("bogus")),
            Err(Error::UnrecognizedAbrAlgorithm(_))
        ));
    }

    #[test]
    fn test_adaptive_picks_highest_eligible_bitrate() {
        let state = TrackSelectionState::default();
        let candidates = [video("lo", 500_000), video("hi", 4_000_000), video("mid", 1_500_000)];
        assert_eq!(state.select_track_index(&candidates), Some(1));
    }

    #[test]
    fn test_bitrate_cap_respected() {
        let mut state = TrackSelectionState::default();
        state.parameters_mut().max_video_bitrate = Some(2_000_000);
        let candidates = [video("lo", 500_000), video("hi", 4_000_000), video("mid", 1_500_000)];
        assert_eq!(state.select_track_index(&candidates), Some(2));
    }

    #[test]
    fn test_unsupported_tracks_skipped() {
        let state = TrackSelectionState::default();
        let mut hi = video("hi", 4_000_000);
        hi.supported = false;
        let candidates = [video("lo", 500_000), hi];
        assert_eq!(state.select_track_index(&candidates), Some(0));
    }

    #[test]
    fn test_random_selects_only_eligible() {
        let mut state = TrackSelectionState::default();
        state.select_strategy(Some("random")).unwrap();
        let mut unsupported = video("bad", 9_000_000);
        unsupported.supported = false;
        let candidates = [video("a", 1), video("b", 2), unsupported];
        for _ in 0..32 {
            let picked = state.select_track_index(&candidates).unwrap();
            assert!(picked < 2);
        }
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut state = TrackSelectionState::default();
        state.select_strategy(Some("default")).unwrap();
        state.parameters_mut().tunneling = true;
        state.parameters_mut().preferred_audio_language = Some("de".to_string());
        state.parameters_mut().max_video_bitrate = Some(2_000_000);

        let blob = state.snapshot().unwrap();
        let mut restored = TrackSelectionState::default();
        restored.restore(&blob).unwrap();

        assert_eq!(restored, state);

        // Equivalent in effect: same selection for the same input
        let candidates = [video("lo", 500_000), video("hi", 4_000_000), video("mid", 1_500_000)];
        assert_eq!(
            restored.select_track_index(&candidates),
            state.select_track_index(&candidates)
        );
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let mut state = TrackSelectionState::default();
        assert!(matches!(
            state.restore(b"not json"),
            Err(Error::StateSerialization(_))
        ));
    }

    #[test]
    fn test_snapshot_detects_track_changes_by_value() {
        let a = TrackSnapshot::new(vec![video("a", 1_000)]);
        let b = TrackSnapshot::new(vec![video("a", 1_000)]);
        let c = TrackSnapshot::new(vec![video("a", 2_000)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unsupported_detection() {
        let mut audio = TrackCandidate {
            id: "ac3".into(),
            track_type: TrackType::Audio,
            bitrate: 0,
            language: None,
            supported: false,
        };
        let snapshot = TrackSnapshot::new(vec![video("v", 1), audio.clone()]);
        assert!(snapshot.has_unsupported(TrackType::Audio));
        assert!(!snapshot.has_unsupported(TrackType::Video));

        audio.supported = true;
        let snapshot = TrackSnapshot::new(vec![video("v", 1), audio]);
        assert!(!snapshot.has_unsupported(TrackType::Audio));
    }
}
