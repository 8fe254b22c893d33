//! Session controller, the top-level orchestrator for one playback
//! session at a time.
//!
//! Coordinates:
//! - Request validation
//! - DRM and ad brokering
//! - Content resolution
//! - Track selection state
//! - The player resource lifecycle and the recovery policy

use crate::ads::{AdLoaderFactory, AdSessionBroker};
use crate::drm::{
    DrmBrokerState, DrmEngineFactory, DrmSessionBroker, PlatformCapabilities,
};
use crate::error::{Error, ErrorClass, Result};
use crate::player::{PlayerBuildContext, PlayerFactory, PlayerResource};
use crate::source::{ContentResolver, ContentSourceFactory, MediaSourceTree};
use crate::telemetry::SessionEventLogger;
use crate::tracks::{TrackSelectionState, TrackSnapshot, TrackType};
use crate::types::{PlaybackRequest, ResumePosition, SavedSessionState, SessionState};
use crate::upstream::UpstreamFactory;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Callbacks for non-fatal outcomes and state changes. All methods have
/// empty defaults.
pub trait SessionObserver: Send + Sync {
    fn on_warning(&self, _error: &Error) {}
    fn on_error(&self, _error: &Error) {}
    fn on_state_change(&self, _from: SessionState, _to: SessionState) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Configures a session controller from its collaborators; composition
/// over subclassing.
pub struct SessionControllerBuilder {
    upstream: Arc<dyn UpstreamFactory>,
    player_factory: Arc<dyn PlayerFactory>,
    content_factory: Option<Arc<dyn ContentSourceFactory>>,
    drm_factory: Option<Arc<dyn DrmEngineFactory>>,
    ad_factory: Option<Arc<dyn AdLoaderFactory>>,
    platform: PlatformCapabilities,
    observer: Arc<dyn SessionObserver>,
}

impl SessionControllerBuilder {
    pub fn new(
        upstream: Arc<dyn UpstreamFactory>,
        player_factory: Arc<dyn PlayerFactory>,
    ) -> Self {
        Self {
            upstream,
            player_factory,
            content_factory: None,
            drm_factory: None,
            ad_factory: None,
            platform: PlatformCapabilities::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn content_source_factory(mut self, factory: Arc<dyn ContentSourceFactory>) -> Self {
        self.content_factory = Some(factory);
        self
    }

    pub fn drm_engine_factory(mut self, factory: Arc<dyn DrmEngineFactory>) -> Self {
        self.drm_factory = Some(factory);
        self
    }

    /// Result of the one-time ad capability probe
    pub fn ad_loader_factory(mut self, factory: Arc<dyn AdLoaderFactory>) -> Self {
        self.ad_factory = Some(factory);
        self
    }

    pub fn platform_capabilities(mut self, platform: PlatformCapabilities) -> Self {
        self.platform = platform;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> SessionController {
        let resolver = match self.content_factory {
            Some(factory) => ContentResolver::new(factory),
            None => ContentResolver::with_default_factory(self.upstream.clone()),
        };
        let drm_broker =
            DrmSessionBroker::new(self.platform, self.drm_factory, self.upstream.clone());
        SessionController {
            state: SessionState::New,
            request: None,
            resolver,
            drm_broker,
            ad_broker: AdSessionBroker::new(self.ad_factory),
            track_state: TrackSelectionState::default(),
            resume: ResumePosition::default(),
            player_factory: self.player_factory,
            player: None,
            source: None,
            last_seen_tracks: None,
            telemetry: SessionEventLogger::default(),
            observer: self.observer,
        }
    }
}

/// Manages exactly one playback session at a time, with explicit serial
/// replacement. All calls are expected from one sequential execution
/// context.
pub struct SessionController {
    state: SessionState,
    request: Option<PlaybackRequest>,
    resolver: ContentResolver,
    drm_broker: DrmSessionBroker,
    ad_broker: AdSessionBroker,
    track_state: TrackSelectionState,
    resume: ResumePosition,
    player_factory: Arc<dyn PlayerFactory>,
    player: Option<Box<dyn PlayerResource>>,
    source: Option<MediaSourceTree>,
    last_seen_tracks: Option<TrackSnapshot>,
    telemetry: SessionEventLogger,
    observer: Arc<dyn SessionObserver>,
}

impl SessionController {
    pub fn builder(
        upstream: Arc<dyn UpstreamFactory>,
        player_factory: Arc<dyn PlayerFactory>,
    ) -> SessionControllerBuilder {
        SessionControllerBuilder::new(upstream, player_factory)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn resume_position(&self) -> ResumePosition {
        self.resume
    }

    pub fn source(&self) -> Option<&MediaSourceTree> {
        self.source.as_ref()
    }

    pub fn drm_broker_state(&self) -> DrmBrokerState {
        self.drm_broker.state()
    }

    pub fn has_ad_loader(&self) -> bool {
        self.ad_broker.has_loader()
    }

    pub fn track_selection(&self) -> &TrackSelectionState {
        &self.track_state
    }

    pub fn track_selection_mut(&mut self) -> &mut TrackSelectionState {
        &mut self.track_state
    }

    /// Construct and prepare a session for the request.
    ///
    /// Runs the full acquisition sequence: validate, DRM, ABR strategy,
    /// player resource, content resolution, ad wrapping, resume seek,
    /// prepare. A prior session for a different request is fully released
    /// first; fatal failures leave the controller in `New` with no
    /// resources held.
    #[instrument(skip(self, request))]
    pub async fn initialize(&mut self, request: PlaybackRequest) -> Result<()> {
        // Fatal before any resource is allocated or state is touched.
        request.validate()?;

        // The prior request survives release, so a replacement after an
        // explicit release still resets for new content.
        if let Some(current) = &self.request {
            let content_changed = current.content_identity() != request.content_identity();
            if self.player.is_some() {
                self.release().await;
            }
            if content_changed {
                self.resume.clear();
                self.ad_broker.release();
            }
        }

        self.transition(SessionState::Initializing)?;
        match self.build_session(&request).await {
            Ok(()) => {
                self.request = Some(request);
                self.transition(SessionState::Prepared)?;
                Ok(())
            }
            Err(e) => {
                self.abort_initialization().await;
                Err(e)
            }
        }
    }

    async fn build_session(&mut self, request: &PlaybackRequest) -> Result<()> {
        // 1. DRM, before any player resource exists
        match &request.drm {
            Some(params) => {
                self.drm_broker.acquire(params)?;
            }
            None => self.drm_broker.release(),
        }

        // 2. ABR strategy
        let strategy = self
            .track_state
            .select_strategy(request.abr_algorithm.as_deref())?;
        self.track_state.parameters_mut().tunneling = request.tunneling;

        // 3. Player resource bound to strategy and DRM session
        let player_factory = self.player_factory.clone();
        let mut player = player_factory.build(PlayerBuildContext {
            strategy,
            parameters: self.track_state.parameters(),
            drm: self.drm_broker.session(),
            prefer_extension_decoders: request.prefer_extension_decoders,
        });
        player.set_play_when_ready(self.resume.autoplay);
        self.player = Some(player);
        self.telemetry.start();
        self.last_seen_tracks = None;

        // 4. Content source
        let mut source = self.resolver.resolve(&request.items)?;

        // 5. Ad wrapping; never aborts construction
        match &request.ad_tag_uri {
            Some(ad_tag_uri) => match self.ad_broker.attach(&source, ad_tag_uri) {
                Ok(Some(wrapped)) => source = wrapped,
                Ok(None) => {
                    let warning = Error::AdExtensionUnavailable;
                    warn!(%ad_tag_uri, "ad capability absent, playing without ads");
                    self.observer.on_warning(&warning);
                }
                Err(e) => {
                    warn!(%ad_tag_uri, error = %e, "ad attachment failed, playing without ads");
                    self.observer.on_warning(&e);
                }
            },
            None => self.ad_broker.release(),
        }

        // 6. Resume and prepare
        let have_start_position = self.resume.is_set();
        if let Some(player) = self.player.as_mut() {
            if let Some(window_index) = self.resume.window_index {
                player.seek_to(window_index, self.resume.position.unwrap_or(Duration::ZERO));
            }
            player.prepare(&source, !have_start_position).await?;
        }
        self.source = Some(source);
        Ok(())
    }

    /// Tear down anything a failed initialize built, in reverse
    /// acquisition order, and return to `New`.
    async fn abort_initialization(&mut self) {
        if let Some(mut player) = self.player.take() {
            self.telemetry.stop();
            player.release().await;
        }
        self.ad_broker.detach_player();
        self.source = None;
        self.drm_broker.release();
        self.set_state(SessionState::New);
    }

    /// Release the session: player resource first, then the DRM session.
    /// The ad broker is only detached, not released; its lifetime is tied
    /// to the ad-tag URI, which outlives a player release/initialize
    /// cycle. Idempotent.
    #[instrument(skip(self))]
    pub async fn release(&mut self) {
        if let Some(mut player) = self.player.take() {
            self.resume = ResumePosition::capture(
                player.play_when_ready(),
                player.current_window_index(),
                player.content_position_ms(),
            );
            self.telemetry.stop();
            player.release().await;
            self.source = None;
            self.last_seen_tracks = None;
        }
        self.drm_broker.release();
        self.ad_broker.detach_player();
        if self.state != SessionState::Released {
            self.set_state(SessionState::Released);
        }
    }

    /// Release the ad session. Independent of player release; the caller
    /// decides when the ad-tag URI's lifetime ends.
    pub fn release_ad_session(&mut self) {
        self.ad_broker.release();
    }

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            SessionState::Prepared | SessionState::Paused => {
                if let Some(player) = self.player.as_mut() {
                    player.set_play_when_ready(true);
                }
                self.transition(SessionState::Playing)
            }
            SessionState::Playing => Ok(()),
            other => Err(Error::InvalidStateTransition {
                from: other.to_string(),
                to: SessionState::Playing.to_string(),
            }),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            SessionState::Playing | SessionState::Prepared => {
                if let Some(player) = self.player.as_mut() {
                    player.set_play_when_ready(false);
                }
                self.transition(SessionState::Paused)
            }
            SessionState::Paused => Ok(()),
            other => Err(Error::InvalidStateTransition {
                from: other.to_string(),
                to: SessionState::Paused.to_string(),
            }),
        }
    }

    /// Entry point for asynchronous player errors.
    ///
    /// A behind-live-window error is recovered invisibly, exactly once per
    /// occurrence: clear the resume position, re-enter `Initializing`, and
    /// re-prepare. Track-support errors are reported as warnings without a
    /// state change. Everything else is surfaced unchanged.
    pub async fn handle_player_error(&mut self, error: Error) {
        self.telemetry.log_error(&error);
        match error.classify() {
            ErrorClass::Transient if self.is_recoverable_state() => {
                info!("behind live window, re-preparing");
                self.resume.clear();
                if self.transition(SessionState::Initializing).is_err() {
                    self.observer.on_error(&error);
                    return;
                }
                match self.retry_prepare().await {
                    Ok(()) => {
                        let _ = self.transition(SessionState::Prepared);
                    }
                    Err(retry_error) => {
                        self.observer.on_error(&retry_error);
                    }
                }
            }
            ErrorClass::TrackSupportWarning => self.observer.on_warning(&error),
            _ => self.observer.on_error(&error),
        }
    }

    fn is_recoverable_state(&self) -> bool {
        matches!(
            self.state,
            SessionState::Prepared | SessionState::Playing | SessionState::Paused
        )
    }

    async fn retry_prepare(&mut self) -> Result<()> {
        match (self.player.as_mut(), self.source.as_ref()) {
            (Some(player), Some(source)) => player.prepare(source, true).await,
            _ => Err(Error::Player("no prepared session to retry".to_string())),
        }
    }

    /// Callback for track mapping changes, compared by value. Unsupported
    /// video or audio track types are reported as warnings; state is
    /// unchanged.
    pub fn on_tracks_changed(&mut self, tracks: TrackSnapshot) {
        if self.last_seen_tracks.as_ref() == Some(&tracks) {
            return;
        }
        for track_type in [TrackType::Video, TrackType::Audio] {
            if tracks.has_unsupported(track_type) {
                let warning = Error::UnsupportedTrackType { track_type };
                self.telemetry.log_error(&warning);
                self.observer.on_warning(&warning);
            }
        }
        self.last_seen_tracks = Some(tracks);
    }

    /// The record a host persists across teardown. Captures the live
    /// player position when a player exists.
    pub fn save_state(&self) -> Result<SavedSessionState> {
        let resume = match &self.player {
            Some(player) => ResumePosition::capture(
                player.play_when_ready(),
                player.current_window_index(),
                player.content_position_ms(),
            ),
            None => self.resume,
        };
        Ok(SavedSessionState {
            track_selector_blob: self.track_state.snapshot()?,
            autoplay: resume.autoplay,
            window_index: resume.window_index.map(|w| w as u32),
            position_ms: resume.position.map(|p| p.as_millis() as u64),
        })
    }

    pub fn restore_state(&mut self, saved: &SavedSessionState) -> Result<()> {
        self.track_state.restore(&saved.track_selector_blob)?;
        self.resume = ResumePosition {
            autoplay: saved.autoplay,
            window_index: saved.window_index.map(|w| w as usize),
            position: saved.position_ms.map(Duration::from_millis),
        };
        Ok(())
    }

    fn transition(&mut self, to: SessionState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.set_state(to);
        Ok(())
    }

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        self.state = to;
        self.telemetry.log_transition(from, to);
        self.observer.on_state_change(from, to);
    }
}
