//! Notification permission prompt.

use crate::pwa::error::PwaResult;
use crate::pwa::host::PermissionRequester;
use crate::pwa::signal::{Observable, Signal};
use crate::pwa::types::PermissionState;

/// Asks for `Notification` permission and publishes the current state.
///
/// Unlike push token retrieval, a denied prompt is not an error: the caller
/// receives [`PermissionState::Denied`] and the status observable updates.
#[derive(Clone, Debug)]
pub struct WebPermissionRequester {
    status: Signal<PermissionState>,
}

impl WebPermissionRequester {
    pub fn new() -> Self {
        Self {
            status: Signal::new(current_permission()),
        }
    }
}

impl Default for WebPermissionRequester {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl PermissionRequester for WebPermissionRequester {
    async fn request(&self) -> PwaResult<PermissionState> {
        let state = request_permission_impl().await?;
        self.status.set(state);
        Ok(state)
    }

    fn status(&self) -> Observable<PermissionState> {
        self.status.observable()
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn current_permission() -> PermissionState {
    if !crate::pwa::support::push_supported() {
        return PermissionState::Default;
    }
    permission_state_from_enum(web_sys::Notification::permission())
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
async fn request_permission_impl() -> PwaResult<PermissionState> {
    use crate::platform::browser::format_js_error;
    use crate::pwa::error::{permission_failed, unsupported_browser};
    use wasm_bindgen_futures::JsFuture;

    if web_sys::window().is_none() {
        return Err(unsupported_browser(
            "Notification permission must be requested from a Window context",
        ));
    }
    if !crate::pwa::support::push_supported() {
        return Err(unsupported_browser(
            "This browser does not support notifications.",
        ));
    }

    let current = permission_state_from_enum(web_sys::Notification::permission());
    if current != PermissionState::Default {
        return Ok(current);
    }

    let promise = web_sys::Notification::request_permission()
        .map_err(|err| permission_failed(format_js_error("requestPermission", err)))?;
    let result = JsFuture::from(promise)
        .await
        .map_err(|err| permission_failed(format_js_error("requestPermission", err)))?;

    Ok(result
        .as_string()
        .as_deref()
        .map(PermissionState::from_str_lossy)
        .unwrap_or_else(|| permission_state_from_enum(web_sys::Notification::permission())))
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn permission_state_from_enum(value: web_sys::NotificationPermission) -> PermissionState {
    match value {
        web_sys::NotificationPermission::Granted => PermissionState::Granted,
        web_sys::NotificationPermission::Denied => PermissionState::Denied,
        _ => PermissionState::Default,
    }
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
fn current_permission() -> PermissionState {
    PermissionState::Default
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
async fn request_permission_impl() -> PwaResult<PermissionState> {
    Err(crate::pwa::error::unsupported_browser(
        "Notification permission is only available when the `wasm-web` feature is enabled.",
    ))
}

#[cfg(all(test, not(all(feature = "wasm-web", target_arch = "wasm32"))))]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn native_request_is_unsupported_and_keeps_status() {
        let requester = WebPermissionRequester::new();
        let err = requester.request().await.unwrap_err();
        assert_eq!(err.code_str(), "pwa/unsupported-browser");
        assert_eq!(requester.status().value(), PermissionState::Default);
    }
}
