//! DRM session brokering.
//!
//! The broker lazily creates, reuses, and tears down at most one active
//! decryption session per scheme UUID. The native decryption engine itself
//! is a collaborator behind [`DrmEngineFactory`].

use crate::error::{Error, Result};
use crate::upstream::{HttpDataSourceHandle, UpstreamFactory};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Minimum platform DRM capability level; older runtimes fail with
/// `DrmUnsupportedPlatform` before any other work.
pub const MIN_DRM_API_LEVEL: u32 = 18;

pub const WIDEVINE_UUID: Uuid = Uuid::from_u128(0xedef8ba9_79d6_4ace_a3c8_27dcd51d21ed);
pub const PLAYREADY_UUID: Uuid = Uuid::from_u128(0x9a04f079_9840_4286_ab92_e65be0885f95);
pub const CLEARKEY_UUID: Uuid = Uuid::from_u128(0x1077efec_c0b2_4d02_ace3_3c1e52e2fb4b);

/// DRM launch parameters carried by a playback request
#[derive(Debug, Clone)]
pub struct DrmParameters {
    /// 128-bit scheme identifier
    pub scheme: Uuid,
    pub license_url: Url,
    /// Flat alternating key/value entries; an odd length is a
    /// configuration error, never silently truncated
    pub key_request_properties: Vec<String>,
    pub multi_session: bool,
}

impl DrmParameters {
    pub fn new(scheme: Uuid, license_url: Url) -> Self {
        Self {
            scheme,
            license_url,
            key_request_properties: Vec::new(),
            multi_session: false,
        }
    }

    pub fn with_key_request_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.key_request_properties.push(key.into());
        self.key_request_properties.push(value.into());
        self
    }

    pub fn with_multi_session(mut self, multi_session: bool) -> Self {
        self.multi_session = multi_session;
        self
    }
}

/// Runtime DRM capabilities, injectable for tests
#[derive(Debug, Clone)]
pub struct PlatformCapabilities {
    pub drm_api_level: u32,
    pub supported_schemes: Vec<Uuid>,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            drm_api_level: 28,
            supported_schemes: vec![WIDEVINE_UUID, PLAYREADY_UUID, CLEARKEY_UUID],
        }
    }
}

impl PlatformCapabilities {
    pub fn supports_scheme(&self, scheme: Uuid) -> bool {
        self.supported_schemes.contains(&scheme)
    }
}

/// Opens native decryption engine handles. Optional dependency; absence
/// rejects DRM requests with `DrmNotConfigured`.
pub trait DrmEngineFactory: Send + Sync {
    fn open(&self, scheme: Uuid) -> Result<Box<dyn DrmEngineHandle>>;
}

/// One native decryption engine instance
pub trait DrmEngineHandle: Send {
    fn scheme(&self) -> Uuid;
    fn close(&mut self);
}

/// A live decryption session, keyed by scheme UUID
pub struct DrmSession {
    scheme: Uuid,
    license_url: Url,
    key_request_headers: Vec<(String, String)>,
    multi_session: bool,
    license_transport: HttpDataSourceHandle,
    engine: Box<dyn DrmEngineHandle>,
}

impl DrmSession {
    pub fn scheme(&self) -> Uuid {
        self.scheme
    }

    pub fn license_url(&self) -> &Url {
        &self.license_url
    }

    pub fn key_request_headers(&self) -> &[(String, String)] {
        &self.key_request_headers
    }

    pub fn multi_session(&self) -> bool {
        self.multi_session
    }

    pub fn license_transport(&self) -> &HttpDataSourceHandle {
        &self.license_transport
    }

    fn close(&mut self) {
        self.engine.close();
    }
}

impl std::fmt::Debug for DrmSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrmSession")
            .field("scheme", &self.scheme)
            .field("license_url", &self.license_url.as_str())
            .field("multi_session", &self.multi_session)
            .finish()
    }
}

/// Broker state: `Absent -> Acquiring -> Active -> Absent` on release,
/// `-> Failed` terminal for the failing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrmBrokerState {
    Absent,
    Acquiring,
    Active,
    Failed,
}

/// Holds at most one live decryption session per controller
pub struct DrmSessionBroker {
    platform: PlatformCapabilities,
    factory: Option<Arc<dyn DrmEngineFactory>>,
    upstream: Arc<dyn UpstreamFactory>,
    state: DrmBrokerState,
    session: Option<DrmSession>,
}

impl DrmSessionBroker {
    pub fn new(
        platform: PlatformCapabilities,
        factory: Option<Arc<dyn DrmEngineFactory>>,
        upstream: Arc<dyn UpstreamFactory>,
    ) -> Self {
        Self {
            platform,
            factory,
            upstream,
            state: DrmBrokerState::Absent,
            session: None,
        }
    }

    pub fn state(&self) -> DrmBrokerState {
        self.state
    }

    pub fn session(&self) -> Option<&DrmSession> {
        self.session.as_ref()
    }

    /// Acquire a session for the given parameters. Any currently active
    /// session is released first; two sessions never live simultaneously,
    /// even transiently.
    pub fn acquire(&mut self, params: &DrmParameters) -> Result<&DrmSession> {
        self.release();
        self.state = DrmBrokerState::Acquiring;

        if self.platform.drm_api_level < MIN_DRM_API_LEVEL {
            self.state = DrmBrokerState::Failed;
            return Err(Error::DrmUnsupportedPlatform {
                required: MIN_DRM_API_LEVEL,
                actual: self.platform.drm_api_level,
            });
        }
        let Some(factory) = self.factory.clone() else {
            self.state = DrmBrokerState::Failed;
            return Err(Error::DrmNotConfigured);
        };
        if !self.platform.supports_scheme(params.scheme) {
            self.state = DrmBrokerState::Failed;
            return Err(Error::DrmUnsupportedScheme {
                scheme: params.scheme,
            });
        }
        let key_request_headers = match pair_key_request_properties(&params.key_request_properties)
        {
            Ok(headers) => headers,
            Err(e) => {
                self.state = DrmBrokerState::Failed;
                return Err(e);
            }
        };

        // All configuration is valid; only now allocate the native engine.
        let engine = match factory.open(params.scheme) {
            Ok(engine) => engine,
            Err(e) => {
                self.state = DrmBrokerState::Failed;
                return Err(e);
            }
        };

        info!(scheme = %params.scheme, multi_session = params.multi_session, "DRM session acquired");
        self.session = Some(DrmSession {
            scheme: params.scheme,
            license_url: params.license_url.clone(),
            key_request_headers,
            multi_session: params.multi_session,
            license_transport: self.upstream.build_http_data_source(),
            engine,
        });
        self.state = DrmBrokerState::Active;
        Ok(self.session.as_ref().expect("session just stored"))
    }

    /// Idempotent teardown of the live session, if any
    pub fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!(scheme = %session.scheme(), "releasing DRM session");
            session.close();
        }
        self.state = DrmBrokerState::Absent;
    }
}

/// Pair the flat key/value property list; odd lengths are rejected rather
/// than dropping the trailing key.
fn pair_key_request_properties(properties: &[String]) -> Result<Vec<(String, String)>> {
    if properties.len() % 2 != 0 {
        return Err(Error::MalformedKeyRequestHeaders {
            count: properties.len(),
        });
    }
    Ok(properties
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}
