//! Content resolution: maps URIs to an in-memory media source tree.
//!
//! No network I/O happens here; leaves only carry the transport handle the
//! player's prepare phase will use.

use crate::error::Result;
use crate::types::{ContentType, MediaItem};
use crate::upstream::{DataSourceHandle, UpstreamFactory};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A source constructed directly from one URI, before any wrapping
#[derive(Debug, Clone)]
pub struct LeafSource {
    pub uri: Url,
    pub content_type: ContentType,
    data_source: DataSourceHandle,
}

impl LeafSource {
    pub fn data_source(&self) -> &DataSourceHandle {
        &self.data_source
    }
}

/// The assembled media source handed to the player resource
#[derive(Debug, Clone)]
pub enum MediaSourceTree {
    Leaf(LeafSource),
    /// Ordered playlist of sources, preserving request order
    Concatenation(Vec<MediaSourceTree>),
    /// Content wrapped by an ad-insertion source
    AdWrapped {
        content: Box<MediaSourceTree>,
        ad_tag_uri: Url,
    },
}

impl MediaSourceTree {
    /// Number of leaf sources in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            MediaSourceTree::Leaf(_) => 1,
            MediaSourceTree::Concatenation(children) => {
                children.iter().map(MediaSourceTree::leaf_count).sum()
            }
            MediaSourceTree::AdWrapped { content, .. } => content.leaf_count(),
        }
    }

    /// Leaf sources in playback order
    pub fn leaves(&self) -> Vec<&LeafSource> {
        match self {
            MediaSourceTree::Leaf(leaf) => vec![leaf],
            MediaSourceTree::Concatenation(children) => {
                children.iter().flat_map(MediaSourceTree::leaves).collect()
            }
            MediaSourceTree::AdWrapped { content, .. } => content.leaves(),
        }
    }

    pub fn first_leaf(&self) -> Option<&LeafSource> {
        self.leaves().into_iter().next()
    }

    pub fn is_ad_wrapped(&self) -> bool {
        matches!(self, MediaSourceTree::AdWrapped { .. })
    }
}

/// Builds one media source from a URI and an optional type hint.
///
/// Required dependency; the resolver's dispatch table is the default.
pub trait ContentSourceFactory: Send + Sync {
    fn build(&self, uri: &Url, type_hint: Option<&str>) -> Result<MediaSourceTree>;
}

/// Fixed, total dispatch table over the supported content types
pub struct DefaultContentSourceFactory {
    upstream: Arc<dyn UpstreamFactory>,
}

impl DefaultContentSourceFactory {
    pub fn new(upstream: Arc<dyn UpstreamFactory>) -> Self {
        Self { upstream }
    }
}

impl ContentSourceFactory for DefaultContentSourceFactory {
    fn build(&self, uri: &Url, type_hint: Option<&str>) -> Result<MediaSourceTree> {
        let content_type = ContentType::infer(uri, type_hint);
        debug!(%uri, %content_type, "building media source");
        // Total dispatch: every inferred type constructs a source. Custom
        // factories signal refusal with UnsupportedContentType instead.
        Ok(MediaSourceTree::Leaf(LeafSource {
            uri: uri.clone(),
            content_type,
            data_source: self.upstream.build_data_source(),
        }))
    }
}

/// Maps request items to a media source tree
pub struct ContentResolver {
    factory: Arc<dyn ContentSourceFactory>,
}

impl ContentResolver {
    pub fn new(factory: Arc<dyn ContentSourceFactory>) -> Self {
        Self { factory }
    }

    pub fn with_default_factory(upstream: Arc<dyn UpstreamFactory>) -> Self {
        Self::new(Arc::new(DefaultContentSourceFactory::new(upstream)))
    }

    /// Build one source per item. A single item yields a bare leaf;
    /// multiple items an order-preserving concatenation.
    pub fn resolve(&self, items: &[MediaItem]) -> Result<MediaSourceTree> {
        let mut sources = Vec::with_capacity(items.len());
        for item in items {
            sources.push(self.factory.build(&item.uri, item.type_hint.as_deref())?);
        }
        if sources.len() == 1 {
            Ok(sources.remove(0))
        } else {
            Ok(MediaSourceTree::Concatenation(sources))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::DefaultHttpUpstreamFactory;

    fn resolver() -> ContentResolver {
        ContentResolver::with_default_factory(Arc::new(DefaultHttpUpstreamFactory::new(
            "resolver-test",
        )))
    }

    fn item(s: &str) -> MediaItem {
        MediaItem::new(Url::parse(s).unwrap())
    }

    #[test]
    fn test_single_uri_yields_bare_leaf() {
        let tree = resolver().resolve(&[item("https://x/a.mpd")]).unwrap();
        match &tree {
            MediaSourceTree::Leaf(leaf) => assert_eq!(leaf.content_type, ContentType::Dash),
            other => panic!("expected leaf, got {other:?}"),
        }
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_all_variants_resolve() {
        let r = resolver();
        let cases = [
            ("https://x/a.mpd", ContentType::Dash),
            ("https://x/a.m3u8", ContentType::Hls),
            ("https://x/a.ism/manifest", ContentType::SmoothStreaming),
            ("https://x/a.mp4", ContentType::Progressive),
        ];
        for (uri, expected) in cases {
            let tree = r.resolve(&[item(uri)]).unwrap();
            assert_eq!(tree.first_leaf().unwrap().content_type, expected, "{uri}");
        }
    }

    #[test]
    fn test_hint_wins_over_suffix() {
        let tree = resolver()
            .resolve(&[item("https://x/stream").with_type_hint("m3u8")])
            .unwrap();
        assert_eq!(tree.first_leaf().unwrap().content_type, ContentType::Hls);
    }

    #[test]
    fn test_playlist_preserves_order() {
        let tree = resolver()
            .resolve(&[item("https://x/a.mpd"), item("https://x/b.m3u8")])
            .unwrap();
        assert!(matches!(tree, MediaSourceTree::Concatenation(_)));
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].uri.path(), "/a.mpd");
        assert_eq!(leaves[1].uri.path(), "/b.m3u8");
    }
}
