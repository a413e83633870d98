//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{TestState, TestTransport};
use crate::Config;
use tempfile::TempDir;
use uuid::Uuid;

/// Test environment that sets up a fleetdesk home directory with a Config and a session file.
/// Holds TempDir to keep the directory alive for the duration of the test.
///
/// Each environment gets its own API URL, so the in-memory portal used in `Mode::Testing` is not
/// shared with other tests.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let rand = Uuid::new_v4().to_string().replace('-', "");
        Self::with_api_url(&format!("https://{rand}.portal.test/")).await
    }

    pub async fn with_api_url(api_url: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("fleetdesk");
        let config = Config::create(&root, api_url, Some("sid=test-session"))
            .await
            .unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    fn transport(&self) -> TestTransport {
        TestTransport::new(self.config.api_url().as_str())
    }

    /// Runs `f` against the in-memory portal of this environment.
    pub fn state<R>(&self, f: impl FnOnce(&mut TestState) -> R) -> R {
        self.transport().with_state(f)
    }

    /// A copy of the in-memory portal's state, including the requests it received.
    pub fn snapshot(&self) -> TestState {
        self.transport().snapshot()
    }
}
