//! Web Push subscription through the browser `PushManager`.

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::pwa::error::{invalid_config, PwaResult};
use crate::pwa::host::{PushMessagingHandler, ServiceWorkerRegistration};
use crate::pwa::logger::LOGGER;
use crate::pwa::signal::{Observable, Signal};

/// Push handler backed by the registration's `PushManager`.
///
/// The token handed to the backend is the JSON form of the push subscription
/// (endpoint plus `p256dh`/`auth` keys).
pub struct WebPushHandler {
    application_server_key: Vec<u8>,
    token: Mutex<Option<String>>,
    can_show_notifications: Signal<bool>,
}

impl WebPushHandler {
    /// Creates a handler for the given URL-safe base64 VAPID public key.
    pub fn new(vapid_key: impl AsRef<str>) -> PwaResult<Self> {
        Ok(Self {
            application_server_key: decode_vapid_key(vapid_key.as_ref())?,
            token: Mutex::new(None),
            can_show_notifications: Signal::new(false),
        })
    }

    /// Decoded VAPID public key passed to `PushManager.subscribe`.
    pub fn application_server_key(&self) -> &[u8] {
        &self.application_server_key
    }

    fn refresh_can_show(&self) {
        self.can_show_notifications.set(notifications_allowed());
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl PushMessagingHandler for WebPushHandler {
    fn init(&self) {
        self.refresh_can_show();
    }

    async fn register(&self, registration: Arc<dyn ServiceWorkerRegistration>) -> PwaResult<()> {
        let token = subscribe_impl(registration.as_ref(), &self.application_server_key).await?;
        LOGGER.debug("push subscription ready");
        *self.token.lock().unwrap() = Some(token);
        self.refresh_can_show();
        Ok(())
    }

    fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn can_show_notifications(&self) -> Observable<bool> {
        self.can_show_notifications.observable()
    }
}

fn decode_vapid_key(vapid_key: &str) -> PwaResult<Vec<u8>> {
    let trimmed = vapid_key.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(invalid_config("VAPID key must not be empty"));
    }
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|err| invalid_config(format!("Invalid VAPID key: {err}")))
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn notifications_allowed() -> bool {
    crate::pwa::support::push_supported()
        && web_sys::Notification::permission() == web_sys::NotificationPermission::Granted
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
async fn subscribe_impl(
    registration: &dyn ServiceWorkerRegistration,
    application_server_key: &[u8],
) -> PwaResult<String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    use crate::platform::browser::format_js_error;
    use crate::pwa::error::{push_subscribe_failed, unsupported_browser};

    let registration = registration
        .as_web_sys()
        .ok_or_else(|| push_subscribe_failed("Registration is not backed by the browser"))?;
    let push_manager = registration
        .push_manager()
        .map_err(|err| unsupported_browser(format_js_error("pushManager", err)))?;

    let existing = JsFuture::from(
        push_manager
            .get_subscription()
            .map_err(|err| push_subscribe_failed(format_js_error("getSubscription", err)))?,
    )
    .await
    .map_err(|err| push_subscribe_failed(format_js_error("getSubscription", err)))?;

    let subscription: web_sys::PushSubscription = if existing.is_undefined() || existing.is_null() {
        let key = wasm_bindgen::JsValue::from(js_sys::Uint8Array::from(application_server_key));
        let options = web_sys::PushSubscriptionOptionsInit::new();
        options.set_user_visible_only(true);
        options.set_application_server_key(Some(&key));

        let promise = push_manager
            .subscribe_with_options(&options)
            .map_err(|err| push_subscribe_failed(format_js_error("subscribe", err)))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| push_subscribe_failed(format_js_error("subscribe", err)))?
            .dyn_into()
            .map_err(|_| push_subscribe_failed("PushManager.subscribe returned unexpected value"))?
    } else {
        existing
            .dyn_into()
            .map_err(|_| push_subscribe_failed("getSubscription returned unexpected value"))?
    };

    let json = js_sys::JSON::stringify(&subscription)
        .map_err(|err| push_subscribe_failed(format_js_error("JSON.stringify", err)))?;
    Ok(String::from(json))
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
fn notifications_allowed() -> bool {
    false
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
async fn subscribe_impl(
    _registration: &dyn ServiceWorkerRegistration,
    _application_server_key: &[u8],
) -> PwaResult<String> {
    Err(crate::pwa::error::unsupported_browser(
        "Push subscriptions are only available when the `wasm-web` feature is enabled.",
    ))
}

#[cfg(all(test, not(all(feature = "wasm-web", target_arch = "wasm32"))))]
mod tests {
    use super::*;
    use crate::test_support::fakes::FakeRegistration;

    const VAPID_KEY: &str =
        "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";

    #[test]
    fn vapid_key_is_decoded() {
        let handler = WebPushHandler::new(VAPID_KEY).unwrap();
        assert_eq!(handler.application_server_key().len(), 65);
        assert_eq!(handler.application_server_key()[0], 0x04);
    }

    #[test]
    fn invalid_vapid_keys_are_rejected() {
        let err = WebPushHandler::new("  ").err().unwrap();
        assert_eq!(err.code_str(), "pwa/invalid-config");
        let err = WebPushHandler::new("not base64!").err().unwrap();
        assert_eq!(err.code_str(), "pwa/invalid-config");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn native_register_is_unsupported() {
        let handler = WebPushHandler::new(VAPID_KEY).unwrap();
        handler.init();
        let err = handler
            .register(Arc::new(FakeRegistration::default()))
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "pwa/unsupported-browser");
        assert_eq!(handler.token(), None);
        assert!(!handler.can_show_notifications().value());
    }
}
