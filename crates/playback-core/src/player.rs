//! The underlying player resource, a collaborator owned by the session
//! controller.
//!
//! All decode/network work happens behind this seam on the player's own
//! machinery; the controller only sequences prepare/seek/release and
//! receives completion or error callbacks.

use crate::drm::DrmSession;
use crate::error::Result;
use crate::source::MediaSourceTree;
use crate::tracks::{AbrStrategy, TrackSelectorParameters};
use async_trait::async_trait;
use std::time::Duration;

/// Everything a player factory needs to construct a player bound to the
/// session's strategy and optional DRM session
pub struct PlayerBuildContext<'a> {
    pub strategy: AbrStrategy,
    pub parameters: &'a TrackSelectorParameters,
    pub drm: Option<&'a DrmSession>,
    pub prefer_extension_decoders: bool,
}

/// One native player instance
#[async_trait]
pub trait PlayerResource: Send {
    /// Hand the assembled source to the player and request prepare.
    /// Returning `Ok` means the player accepted the source; readiness is
    /// signaled through the player's own callbacks.
    async fn prepare(&mut self, source: &MediaSourceTree, reset_position: bool) -> Result<()>;

    fn seek_to(&mut self, window_index: usize, position: Duration);

    fn set_play_when_ready(&mut self, play_when_ready: bool);

    fn play_when_ready(&self) -> bool;

    fn current_window_index(&self) -> usize;

    /// Content position in milliseconds; may be negative during a live
    /// window adjustment
    fn content_position_ms(&self) -> i64;

    async fn release(&mut self);
}

/// Builds player resources. Required dependency of every controller.
pub trait PlayerFactory: Send + Sync {
    fn build(&self, context: PlayerBuildContext<'_>) -> Box<dyn PlayerResource>;
}
