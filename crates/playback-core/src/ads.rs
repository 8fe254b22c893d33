//! Ad session brokering.
//!
//! The ad-serving capability is an optional plug-in, probed once at
//! startup and injected as an optional factory. One loader instance lives
//! per broker, keyed by ad-tag URI, and is reused across consecutive
//! playbacks while the URI is unchanged.

use crate::error::{Error, Result};
use crate::source::MediaSourceTree;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// One ad-loader instance bound to a single ad-tag URI
pub trait AdLoader: Send {
    fn ad_tag_uri(&self) -> &Url;

    /// Attach or detach the loader's UI overlay from the player. Detached
    /// on controller release so the loader is never left attached to a
    /// released player resource.
    fn set_player_attached(&mut self, attached: bool);

    fn release(&mut self);
}

/// Creates ad loaders. Optional dependency; absence means ad-tag URIs
/// degrade gracefully (no wrapping, no error).
pub trait AdLoaderFactory: Send + Sync {
    fn create(&self, ad_tag_uri: &Url) -> Result<Box<dyn AdLoader>>;
}

/// Holds at most one ad loader per controller, keyed by ad-tag URI
pub struct AdSessionBroker {
    factory: Option<Arc<dyn AdLoaderFactory>>,
    loader: Option<Box<dyn AdLoader>>,
    loaded_ad_tag_uri: Option<Url>,
}

impl AdSessionBroker {
    /// `factory` is the result of the one-time capability probe
    pub fn new(factory: Option<Arc<dyn AdLoaderFactory>>) -> Self {
        Self {
            factory,
            loader: None,
            loaded_ad_tag_uri: None,
        }
    }

    pub fn has_capability(&self) -> bool {
        self.factory.is_some()
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn loaded_ad_tag_uri(&self) -> Option<&Url> {
        self.loaded_ad_tag_uri.as_ref()
    }

    /// Wrap the primary source in an ad-insertion source.
    ///
    /// Returns `Ok(None)` when the ad capability is absent; the caller
    /// proceeds without ads. The existing loader is reused while
    /// `ad_tag_uri` is unchanged, otherwise it is released before a new
    /// one is constructed.
    pub fn attach(
        &mut self,
        primary: &MediaSourceTree,
        ad_tag_uri: &Url,
    ) -> Result<Option<MediaSourceTree>> {
        let Some(factory) = self.factory.clone() else {
            debug!("ad capability absent, continuing without ads");
            return Ok(None);
        };

        if self.loaded_ad_tag_uri.as_ref() != Some(ad_tag_uri) {
            self.release();
            let loader = factory
                .create(ad_tag_uri)
                .map_err(|e| Error::AdLoaderFailed(e.to_string()))?;
            info!(%ad_tag_uri, "ad loader created");
            self.loader = Some(loader);
            self.loaded_ad_tag_uri = Some(ad_tag_uri.clone());
        } else {
            debug!(%ad_tag_uri, "reusing ad loader");
        }

        if let Some(loader) = self.loader.as_mut() {
            loader.set_player_attached(true);
        }
        Ok(Some(MediaSourceTree::AdWrapped {
            content: Box::new(primary.clone()),
            ad_tag_uri: ad_tag_uri.clone(),
        }))
    }

    /// Detach the loader's overlay without tearing the loader down; the
    /// loader outlives a player release/initialize cycle.
    pub fn detach_player(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            loader.set_player_attached(false);
        }
    }

    /// Tear down the loader and forget the remembered URI. Safe to call
    /// when no loader exists.
    pub fn release(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            debug!("releasing ad loader");
            loader.set_player_attached(false);
            loader.release();
        }
        self.loaded_ad_tag_uri = None;
    }
}
