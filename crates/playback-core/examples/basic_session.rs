//! Basic session lifecycle example
//!
//! Demonstrates building a session controller with stub collaborators and
//! walking a request through the full lifecycle.
//!
//! Run with: cargo run -p playback-core --example basic_session

use async_trait::async_trait;
use playback_core::{
    DefaultHttpUpstreamFactory, MediaItem, MediaSourceTree, PlaybackRequest, PlayerBuildContext,
    PlayerFactory, PlayerResource, Result, SessionController, UpstreamFactory,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

struct DemoPlayer {
    play_when_ready: bool,
    window_index: usize,
    position_ms: i64,
}

#[async_trait]
impl PlayerResource for DemoPlayer {
    async fn prepare(&mut self, source: &MediaSourceTree, reset_position: bool) -> Result<()> {
        println!(
            "  player: prepare ({} leaf sources, reset_position={reset_position})",
            source.leaf_count()
        );
        Ok(())
    }

    fn seek_to(&mut self, window_index: usize, position: Duration) {
        println!("  player: seek to window {window_index} at {position:?}");
        self.window_index = window_index;
        self.position_ms = position.as_millis() as i64;
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.play_when_ready = play_when_ready;
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    fn current_window_index(&self) -> usize {
        self.window_index
    }

    fn content_position_ms(&self) -> i64 {
        self.position_ms
    }

    async fn release(&mut self) {
        println!("  player: released");
    }
}

struct DemoPlayerFactory;

impl PlayerFactory for DemoPlayerFactory {
    fn build(&self, context: PlayerBuildContext<'_>) -> Box<dyn PlayerResource> {
        println!(
            "  factory: building player (strategy {:?}, drm={})",
            context.strategy,
            context.drm.is_some()
        );
        Box::new(DemoPlayer {
            play_when_ready: true,
            window_index: 0,
            position_ms: 0,
        })
    }
}

fn uri(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[tokio::main]
async fn main() -> Result<()> {
    playback_core::init();

    println!("Playback Core - Basic Session Example");
    println!("=====================================\n");

    let upstream: Arc<dyn UpstreamFactory> =
        Arc::new(DefaultHttpUpstreamFactory::new("basic-session-example"));
    let mut controller =
        SessionController::builder(upstream, Arc::new(DemoPlayerFactory)).build();

    println!("Single item:");
    let request = PlaybackRequest::view(uri("https://cdn.example.com/live/channel.mpd"));
    controller.initialize(request).await?;
    println!("  state: {}\n", controller.state());

    controller.play()?;
    println!("Playing, then pausing:");
    controller.pause()?;
    println!("  state: {}\n", controller.state());

    println!("Replacing with a playlist:");
    let playlist = PlaybackRequest::view_list(vec![
        MediaItem::new(uri("https://cdn.example.com/preroll.mp4")),
        MediaItem::new(uri("https://cdn.example.com/feature.m3u8")),
    ]);
    controller.initialize(playlist).await?;
    println!("  state: {}\n", controller.state());

    println!("Releasing:");
    controller.release().await;
    println!("  state: {}", controller.state());

    Ok(())
}
