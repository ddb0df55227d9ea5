//! Configuration handling for the onboarding wizard

use crate::gateway::{CallPolicy, DEFAULT_TIMEOUT};
use crate::state::{
    FileSessionStore, GstinGate, MemorySessionStore, Persistence, Schema, DEFAULT_STORAGE_KEY,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the session directory
pub const SESSION_DIR_ENV: &str = "VENDOR_ONBOARD_SESSION_DIR";

const DEFAULT_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_DEMO_LATENCY_MS: u64 = 1500;

/// User configuration for the wizard
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OnboardConfig {
    /// Key the saved session is stored under
    pub storage_key: Option<String>,
    /// Directory holding saved sessions
    pub session_dir: Option<PathBuf>,
    /// What must hold about the GSTIN to leave step 2
    pub gstin_gate: Option<GstinGate>,
    /// Time limit for each gateway call, in seconds
    pub gateway_timeout_secs: Option<u64>,
    /// Extra submission attempts after a transport failure
    pub submission_retries: Option<usize>,
    /// First retry delay, in milliseconds
    pub retry_delay_ms: Option<u64>,
    /// Simulated latency of the demo backend, in milliseconds
    pub demo_latency_ms: Option<u64>,
}

impl OnboardConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("in", "vendorhub", "vendor-onboard")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from the platform config directory
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key.as_deref().unwrap_or(DEFAULT_STORAGE_KEY)
    }

    pub fn gstin_gate(&self) -> GstinGate {
        self.gstin_gate.unwrap_or_default()
    }

    pub fn demo_latency(&self) -> Duration {
        Duration::from_millis(self.demo_latency_ms.unwrap_or(DEFAULT_DEMO_LATENCY_MS))
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self
                .gateway_timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            retries: self.submission_retries.unwrap_or(0),
            retry_delay: Duration::from_millis(
                self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::vendor_onboarding(self.gstin_gate())
    }

    /// Session directory: `env_override`, then the config file, then the platform default
    pub fn session_dir(&self, env_override: Option<PathBuf>) -> Option<PathBuf> {
        env_override
            .or_else(|| self.session_dir.clone())
            .or_else(|| FileSessionStore::default_location().map(|s| s.dir().to_path_buf()))
    }

    /// Persistence backed by the session directory, or in memory if none resolves
    pub fn persistence(&self) -> Persistence {
        let env_override = std::env::var_os(SESSION_DIR_ENV).map(PathBuf::from);
        match self.session_dir(env_override) {
            Some(dir) => {
                tracing::debug!("Saving sessions under {}", dir.display());
                Persistence::new(Arc::new(FileSessionStore::new(dir)), self.storage_key())
            }
            None => {
                tracing::warn!("No data directory available, progress will not survive restarts");
                Persistence::new(Arc::new(MemorySessionStore::new()), self.storage_key())
            }
        }
    }
}
