//! Helpers used by documentation examples to compile in isolation.

use crate::pwa::{PwaConfig, PwaLifecycle};

pub const DOCTEST_API_BASE_URL: &str = "https://api.doctest.invalid/";
pub const DOCTEST_VAPID_KEY: &str =
    "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";

/// Lifecycle wired to the browser bindings; off the browser every capability reports unsupported.
pub fn offline_lifecycle() -> PwaLifecycle {
    let config = PwaConfig::default()
        .with_api_base_url(DOCTEST_API_BASE_URL)
        .expect("doctest API base URL is valid");
    PwaLifecycle::for_browser(config, DOCTEST_VAPID_KEY).expect("doctest VAPID key is valid")
}
