//! Browser capability checks.
//!
//! Native builds report every capability as missing, which lets the facade
//! run in server renders and tests without a service worker.

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
use js_sys::Reflect;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
use wasm_bindgen::{JsCast, JsValue};

/// Returns `true` when `navigator.serviceWorker` is available.
///
/// # Examples
///
/// ```
/// if !pwa_lifecycle::pwa::is_supported() {
///     // The application keeps working, just without offline support.
/// }
/// ```
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub fn is_supported() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    let navigator_js = JsValue::from(window.navigator());
    Reflect::get(&navigator_js, &JsValue::from_str("serviceWorker"))
        .ok()
        .map(|value| !value.is_undefined() && !value.is_null())
        .unwrap_or(false)
}

/// Returns `true` when the page can subscribe to push and show notifications.
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub fn push_supported() -> bool {
    if !is_supported() {
        return false;
    }
    let Some(window) = web_sys::window() else {
        return false;
    };
    let window_js = JsValue::from(window);
    property_in(&window_js, "PushManager")
        && property_in(&window_js, "Notification")
        && prototype_has_property(&window_js, "ServiceWorkerRegistration", "showNotification")
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn property_in(target: &JsValue, property: &str) -> bool {
    Reflect::has(target, &JsValue::from_str(property)).unwrap_or(false)
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn prototype_has_property(target: &JsValue, constructor: &str, property: &str) -> bool {
    let Ok(ctor) = Reflect::get(target, &JsValue::from_str(constructor)) else {
        return false;
    };
    let Ok(prototype) = Reflect::get(&ctor, &JsValue::from_str("prototype")) else {
        return false;
    };
    prototype
        .dyn_ref::<js_sys::Object>()
        .map(|obj| obj.has_own_property(&JsValue::from_str(property)))
        .unwrap_or(false)
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
pub fn is_supported() -> bool {
    false
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
pub fn push_supported() -> bool {
    false
}
