//! Upstream transport factories and process-wide shared collaborators.
//!
//! The cookie jar and bandwidth meter are process-wide singletons shared
//! read/write across all session controllers. The cookie policy is
//! installed exactly once, when the first default factory is built.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

static SHARED_COOKIE_JAR: Lazy<Arc<Jar>> = Lazy::new(|| {
    debug!("installing default cookie policy");
    Arc::new(Jar::default())
});

static SHARED_BANDWIDTH_METER: Lazy<BandwidthMeter> = Lazy::new(BandwidthMeter::new);

/// The process-wide bandwidth meter
pub fn shared_bandwidth_meter() -> &'static BandwidthMeter {
    &SHARED_BANDWIDTH_METER
}

/// Bandwidth estimate smoothed over transfer samples
#[derive(Debug)]
pub struct BandwidthMeter {
    estimate_bps: Mutex<u64>,
}

impl BandwidthMeter {
    fn new() -> Self {
        Self {
            estimate_bps: Mutex::new(0),
        }
    }

    /// Record a completed transfer. Updates the estimate using EWMA with
    /// alpha = 0.2.
    pub fn record(&self, bytes: usize, elapsed: Duration) {
        if elapsed.is_zero() {
            return;
        }
        let sample = ((bytes as f64 * 8.0) / elapsed.as_secs_f64()) as u64;
        let mut estimate = self.estimate_bps.lock();
        *estimate = if *estimate == 0 {
            sample
        } else {
            ((*estimate as f64 * 0.8) + (sample as f64 * 0.2)) as u64
        };
    }

    /// Current estimate in bits per second; 0 until the first sample
    pub fn estimate_bps(&self) -> u64 {
        *self.estimate_bps.lock()
    }
}

/// Opaque handle for media data transfers, cloned into each leaf source
#[derive(Debug, Clone)]
pub struct DataSourceHandle {
    client: Client,
    user_agent: String,
}

impl DataSourceHandle {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Opaque handle for HTTP-only transfers (license requests and similar)
#[derive(Debug, Clone)]
pub struct HttpDataSourceHandle {
    client: Client,
    user_agent: String,
}

impl HttpDataSourceHandle {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Builds the transport handles the player's prepare phase will use.
///
/// Required dependency of every session controller.
pub trait UpstreamFactory: Send + Sync {
    fn build_data_source(&self) -> DataSourceHandle;
    fn build_http_data_source(&self) -> HttpDataSourceHandle;
}

/// Default factory over a shared HTTP client carrying the process-wide
/// cookie jar
pub struct DefaultHttpUpstreamFactory {
    client: Client,
    user_agent: String,
}

impl DefaultHttpUpstreamFactory {
    pub fn new(application_name: &str) -> Self {
        let user_agent = format!("{}/{}", application_name, crate::VERSION);
        let client = Client::builder()
            .user_agent(user_agent.clone())
            .cookie_provider(SHARED_COOKIE_JAR.clone())
            .build()
            .expect("Failed to create HTTP client");
        Self { client, user_agent }
    }
}

impl UpstreamFactory for DefaultHttpUpstreamFactory {
    fn build_data_source(&self) -> DataSourceHandle {
        DataSourceHandle {
            client: self.client.clone(),
            user_agent: self.user_agent.clone(),
        }
    }

    fn build_http_data_source(&self) -> HttpDataSourceHandle {
        HttpDataSourceHandle {
            client: self.client.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandwidth_meter_first_sample() {
        let meter = BandwidthMeter::new();
        assert_eq!(meter.estimate_bps(), 0);

        // 1 MB over 1s = 8 Mbps
        meter.record(1_000_000, Duration::from_secs(1));
        assert_eq!(meter.estimate_bps(), 8_000_000);
    }

    #[test]
    fn test_bandwidth_meter_ewma() {
        let meter = BandwidthMeter::new();
        meter.record(1_000_000, Duration::from_secs(1));
        meter.record(2_000_000, Duration::from_secs(1));
        // 8M * 0.8 + 16M * 0.2 = 9.6M
        assert_eq!(meter.estimate_bps(), 9_600_000);
    }

    #[test]
    fn test_bandwidth_meter_ignores_zero_elapsed() {
        let meter = BandwidthMeter::new();
        meter.record(1_000_000, Duration::ZERO);
        assert_eq!(meter.estimate_bps(), 0);
    }

    #[test]
    fn test_factory_handles_carry_user_agent() {
        let factory = DefaultHttpUpstreamFactory::new("playback-test");
        let data = factory.build_data_source();
        let http = factory.build_http_data_source();
        assert!(data.user_agent().starts_with("playback-test/"));
        assert_eq!(data.user_agent(), http.user_agent());
    }
}
