//! Session event logging, the debug-helper companion of the controller.
//!
//! Started when the player resource is built and stopped first during
//! release, before the player itself is torn down.

use crate::error::Error;
use crate::types::SessionState;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct SessionEventLogger {
    running: bool,
    transitions: u64,
    errors: u64,
}

impl SessionEventLogger {
    pub fn start(&mut self) {
        self.running = true;
        debug!("session event logging started");
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(
                transitions = self.transitions,
                errors = self.errors,
                "session event logging stopped"
            );
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn log_transition(&mut self, from: SessionState, to: SessionState) {
        self.transitions += 1;
        info!(%from, %to, "state transition");
    }

    pub fn log_error(&mut self, error: &Error) {
        self.errors += 1;
        warn!(
            code = error.error_code(),
            class = ?error.classify(),
            %error,
            "playback error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let mut logger = SessionEventLogger::default();
        assert!(!logger.is_running());
        logger.start();
        assert!(logger.is_running());
        logger.log_transition(SessionState::New, SessionState::Initializing);
        logger.log_error(&Error::BehindLiveWindow);
        logger.stop();
        assert!(!logger.is_running());
        // Stopping twice is a no-op
        logger.stop();
    }
}
