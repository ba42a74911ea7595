pub const PWA_LOGGER_NAME: &str = "@pwa/lifecycle";

pub const DEFAULT_SW_PATH: &str = "/sw.js";
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 60 * 1000;

pub const PUSH_NOTIFICATION_PATH: &str = "character/push-notification";

pub const CLIENTS_CLAIM_MESSAGE: &str = "CLIENTS_CLAIM";
pub const SKIP_WAITING_MESSAGE: &str = "SKIP_WAITING";

/// Workers found after this window past `register()` are treated as coming from another tab.
#[cfg_attr(not(all(feature = "wasm-web", target_arch = "wasm32")), allow(dead_code))]
pub const EXTERNAL_UPDATE_WINDOW_MS: f64 = 60_000.0;

pub const DEFAULTS_ENV: &str = "__PWA_DEFAULTS__";
pub const DEFAULTS_PATH_ENV: &str = "__PWA_DEFAULTS_PATH";
