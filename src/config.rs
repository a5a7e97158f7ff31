/// Configuration for the tunefeed core
///
/// Loads configuration from environment variables. The video provider API
/// key is process-wide and mutable at runtime through [`ApiKeyHandle`];
/// persistence of the key is owned by an external key-value store.
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Main core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Video provider settings
    pub provider: ProviderConfig,
    /// Social store settings
    pub store: StoreConfig,
    /// Default region code for trending content
    pub default_region: String,
}

/// Video provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Page size for search/trending requests
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Social store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the REST row store
    pub base_url: String,
    /// Service API key sent with every store request
    pub api_key: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Default values
fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    10
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> CoreResult<Self> {
        let provider = ProviderConfig {
            base_url: std::env::var("VIDEO_API_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".to_string()),
            timeout_secs: std::env::var("VIDEO_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout_secs),
            page_size: std::env::var("VIDEO_API_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_page_size),
        };

        let store = StoreConfig {
            base_url: std::env::var("SOCIAL_STORE_URL")
                .map_err(|_| CoreError::Config("SOCIAL_STORE_URL not set".to_string()))?,
            api_key: std::env::var("SOCIAL_STORE_KEY")
                .map_err(|_| CoreError::Config("SOCIAL_STORE_KEY not set".to_string()))?,
            timeout_secs: std::env::var("SOCIAL_STORE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout_secs),
        };

        let default_region = std::env::var("DEFAULT_REGION").unwrap_or_else(|_| "US".to_string());

        Ok(Settings {
            provider,
            store,
            default_region,
        })
    }
}

#[derive(Debug)]
struct KeyState {
    key: String,
    epoch: u64,
}

/// Process-wide video provider credential.
///
/// Reads happen at call time; a key change bumps the epoch, which callers
/// treat exactly like a filter change (all in-flight caches invalidated).
#[derive(Debug, Clone)]
pub struct ApiKeyHandle {
    inner: Arc<RwLock<KeyState>>,
}

impl ApiKeyHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(KeyState {
                key: key.into(),
                epoch: 0,
            })),
        }
    }

    /// Handle with no key configured yet.
    pub fn unset() -> Self {
        Self::new("")
    }

    pub fn key(&self) -> String {
        self.inner.read().expect("key lock poisoned").key.clone()
    }

    pub fn is_set(&self) -> bool {
        !self.inner.read().expect("key lock poisoned").key.is_empty()
    }

    /// Current invalidation epoch. Bumped on every key change.
    pub fn epoch(&self) -> u64 {
        self.inner.read().expect("key lock poisoned").epoch
    }

    /// Replace the key and invalidate anything keyed to the old epoch.
    pub fn set_key(&self, key: impl Into<String>) {
        let mut state = self.inner.write().expect("key lock poisoned");
        state.key = key.into();
        state.epoch += 1;
    }

    /// Returns the key or rejects when none is configured.
    pub fn require_key(&self) -> CoreResult<String> {
        let state = self.inner.read().expect("key lock poisoned");
        if state.key.is_empty() {
            Err(CoreError::Config("Video API key not configured".to_string()))
        } else {
            Ok(state.key.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        std::env::set_var("SOCIAL_STORE_URL", "https://store.test/rest/v1");
        std::env::set_var("SOCIAL_STORE_KEY", "service-key");
        std::env::remove_var("VIDEO_API_TIMEOUT_SECS");
        std::env::remove_var("DEFAULT_REGION");

        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.provider.timeout_secs, 30);
        assert_eq!(settings.provider.page_size, 10);
        assert_eq!(settings.default_region, "US");
        assert_eq!(settings.store.base_url, "https://store.test/rest/v1");
    }

    #[test]
    fn test_key_change_bumps_epoch() {
        let handle = ApiKeyHandle::unset();
        assert!(!handle.is_set());
        assert!(handle.require_key().is_err());

        let before = handle.epoch();
        handle.set_key("abc123");
        assert_eq!(handle.epoch(), before + 1);
        assert_eq!(handle.key(), "abc123");
        assert!(handle.require_key().is_ok());
    }
}
