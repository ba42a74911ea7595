use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::platform::environment::pwa_defaults;
use crate::pwa::constants::{DEFAULT_SW_PATH, DEFAULT_UPDATE_INTERVAL_MS};
use crate::pwa::error::{invalid_config, PwaResult};

/// Where the service worker lives and how often it is checked for updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceWorkerOptions {
    pub script_url: String,
    pub scope: Option<String>,
    pub update_interval: Duration,
}

impl Default for ServiceWorkerOptions {
    fn default() -> Self {
        Self {
            script_url: DEFAULT_SW_PATH.to_string(),
            scope: None,
            update_interval: Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PwaConfig {
    pub service_worker: ServiceWorkerOptions,
    /// Base URL of the application API; the push token endpoint is resolved against it.
    pub api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultsDocument {
    sw_file: Option<String>,
    sw_scope: Option<String>,
    update_interval_ms: Option<u64>,
    api_base_url: Option<String>,
}

impl PwaConfig {
    /// Default configuration overlaid with `__PWA_DEFAULTS__` when present.
    pub fn from_env() -> PwaResult<Self> {
        match pwa_defaults() {
            Some(value) => Self::from_defaults_value(&value),
            None => Ok(Self::default()),
        }
    }

    /// Builds a configuration from a defaults object such as
    /// `{"swFile": "/sw.js", "updateIntervalMs": 60000, "apiBaseUrl": "https://api/"}`.
    pub fn from_defaults_value(value: &Value) -> PwaResult<Self> {
        let document: DefaultsDocument = serde_json::from_value(value.clone())
            .map_err(|err| invalid_config(format!("Invalid PWA defaults: {err}")))?;

        let mut config = Self::default();
        if let Some(file) = document.sw_file {
            config.service_worker.script_url = file;
        }
        config.service_worker.scope = document.sw_scope;
        if let Some(interval) = document.update_interval_ms {
            config.service_worker.update_interval = Duration::from_millis(interval);
        }
        if let Some(base) = document.api_base_url {
            config = config.with_api_base_url(base)?;
        }
        Ok(config)
    }

    pub fn with_service_worker(mut self, options: ServiceWorkerOptions) -> Self {
        self.service_worker = options;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.service_worker.update_interval = interval;
        self
    }

    /// Sets the API base URL after checking it parses as an absolute URL.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> PwaResult<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|err| invalid_config(format!("Invalid API base URL '{base_url}': {err}")))?;
        self.api_base_url = Some(base_url);
        Ok(self)
    }
}
