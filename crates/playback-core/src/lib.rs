//! Playback Core - Media Playback Session Management
//!
//! This crate provides the session layer that sits between a host
//! application and a native media player:
//! - Content resolution (DASH, SmoothStreaming, HLS, progressive)
//! - DRM session brokering with platform gating
//! - Optional ad session brokering keyed by ad-tag URI
//! - Track selection state with lossless save/restore
//! - A session controller state machine with ordered resource
//!   acquisition and release
//! - Playback error classification and recovery policy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Playback Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │   Content    │  │     DRM      │  │      Ad      │          │
//! │  │   Resolver   │  │    Broker    │  │    Broker    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Session   │                              │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │    Track     │  │   Player    │  │    Error     │           │
//! │  │  Selection   │  │  Resource   │  │  Classifier  │           │
//! │  └──────────────┘  └─────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod upstream;
pub mod source;
pub mod drm;
pub mod ads;
pub mod tracks;
pub mod player;
pub mod telemetry;
pub mod session;

pub use error::{DefaultMessagePresenter, Error, ErrorClass, ErrorMessagePresenter, Result};
pub use types::*;
pub use upstream::{
    BandwidthMeter, DataSourceHandle, DefaultHttpUpstreamFactory, HttpDataSourceHandle,
    UpstreamFactory,
};
pub use source::{
    ContentResolver, ContentSourceFactory, DefaultContentSourceFactory, LeafSource,
    MediaSourceTree,
};
pub use drm::{
    DrmBrokerState, DrmEngineFactory, DrmEngineHandle, DrmParameters, DrmSession,
    DrmSessionBroker, PlatformCapabilities, CLEARKEY_UUID, MIN_DRM_API_LEVEL, PLAYREADY_UUID,
    WIDEVINE_UUID,
};
pub use ads::{AdLoader, AdLoaderFactory, AdSessionBroker};
pub use tracks::{
    AbrStrategy, TrackCandidate, TrackSelectionState, TrackSelectorParameters, TrackSnapshot,
    TrackType,
};
pub use player::{PlayerBuildContext, PlayerFactory, PlayerResource};
pub use telemetry::SessionEventLogger;
pub use session::{NoopObserver, SessionController, SessionControllerBuilder, SessionObserver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the playback library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Playback Core initialized");
}
