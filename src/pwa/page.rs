//! Page-level browser hooks: display mode, visibility, reload, install prompt and connectivity.

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
mod wasm {
    use std::sync::Arc;

    use async_trait::async_trait;
    use js_sys::{Function, Promise, Reflect};
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    use crate::platform::browser::{format_js_error, listen, EventListenerHandle};
    use crate::platform::environment;
    use crate::pwa::error::{install_prompt_failed, unsupported_browser, PwaResult};
    use crate::pwa::host::{InstallPromptCallback, InstallPromptEvent, OnlineStatus, PageHost, VisibilityCallback};
    use crate::pwa::logger::LOGGER;
    use crate::pwa::signal::{Observable, Signal};
    use crate::pwa::types::{InstallOutcome, VisibilityState};
    use crate::util::subscribe::Unsubscribe;

    const STANDALONE_QUERY: &str = "(display-mode: standalone)";

    #[derive(Clone, Debug, Default)]
    pub struct WebPageHost;

    impl WebPageHost {
        pub fn new() -> Self {
            Self
        }
    }

    impl PageHost for WebPageHost {
        fn is_browser(&self) -> bool {
            environment::is_browser()
        }

        fn is_standalone(&self) -> bool {
            let Some(window) = web_sys::window() else {
                return false;
            };
            let display_mode = window
                .match_media(STANDALONE_QUERY)
                .ok()
                .flatten()
                .map(|query| query.matches())
                .unwrap_or(false);
            // iOS Safari exposes the home-screen mode through a navigator flag instead.
            let ios_standalone = Reflect::get(&window.navigator(), &JsValue::from_str("standalone"))
                .ok()
                .and_then(|value| value.as_bool())
                .unwrap_or(false);
            display_mode || ios_standalone
        }

        fn visibility(&self) -> VisibilityState {
            match web_sys::window().and_then(|window| window.document()) {
                Some(document) if document.visibility_state() == web_sys::VisibilityState::Hidden => {
                    VisibilityState::Hidden
                }
                _ => VisibilityState::Visible,
            }
        }

        fn reload(&self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            if let Err(err) = window.location().reload() {
                LOGGER.warn(format_js_error("location.reload", err));
            }
        }

        fn on_before_install_prompt(&self, callback: InstallPromptCallback) -> PwaResult<Unsubscribe> {
            let window = web_sys::window()
                .ok_or_else(|| unsupported_browser("Install prompts require a Window context"))?;
            let handle = listen(window.as_ref(), "beforeinstallprompt", move |event| {
                // Keep the mini-infobar from appearing; the app shows its own prompt.
                event.prevent_default();
                callback(Arc::new(WebInstallPromptEvent { event: event.into() }));
            })
            .map_err(|err| {
                install_prompt_failed(format_js_error("addEventListener(beforeinstallprompt)", err))
            })?;
            Ok(detach(handle))
        }

        fn on_visibility_change(&self, callback: VisibilityCallback) -> PwaResult<Unsubscribe> {
            let document = web_sys::window()
                .and_then(|window| window.document())
                .ok_or_else(|| unsupported_browser("Visibility tracking requires a Document"))?;
            let host = self.clone();
            let handle = listen(document.as_ref(), "visibilitychange", move |_| {
                callback(host.visibility());
            })
            .map_err(|err| unsupported_browser(format_js_error("addEventListener(visibilitychange)", err)))?;
            Ok(detach(handle))
        }
    }

    fn detach(handle: EventListenerHandle) -> Unsubscribe {
        Box::new(move || drop(handle))
    }

    /// A deferred `beforeinstallprompt` event.
    pub struct WebInstallPromptEvent {
        event: JsValue,
    }

    unsafe impl Send for WebInstallPromptEvent {}
    unsafe impl Sync for WebInstallPromptEvent {}

    #[async_trait(?Send)]
    impl InstallPromptEvent for WebInstallPromptEvent {
        async fn prompt(&self) -> PwaResult<InstallOutcome> {
            let prompt: Function = Reflect::get(&self.event, &JsValue::from_str("prompt"))
                .ok()
                .and_then(|value| value.dyn_into().ok())
                .ok_or_else(|| install_prompt_failed("beforeinstallprompt event has no prompt()"))?;
            let shown = prompt
                .call0(&self.event)
                .map_err(|err| install_prompt_failed(format_js_error("prompt", err)))?;
            if let Ok(promise) = shown.dyn_into::<Promise>() {
                JsFuture::from(promise)
                    .await
                    .map_err(|err| install_prompt_failed(format_js_error("prompt", err)))?;
            }

            let choice = Reflect::get(&self.event, &JsValue::from_str("userChoice"))
                .map_err(|err| install_prompt_failed(format_js_error("userChoice", err)))?;
            let choice = match choice.dyn_into::<Promise>() {
                Ok(promise) => JsFuture::from(promise)
                    .await
                    .map_err(|err| install_prompt_failed(format_js_error("userChoice", err)))?,
                Err(value) => value,
            };
            let outcome = Reflect::get(&choice, &JsValue::from_str("outcome"))
                .ok()
                .and_then(|value| value.as_string());
            match outcome.as_deref() {
                Some("accepted") => Ok(InstallOutcome::Accepted),
                _ => Ok(InstallOutcome::Dismissed),
            }
        }
    }

    /// `navigator.onLine`, kept current by the window's `online`/`offline` events.
    pub struct WebOnlineStatus {
        online: Signal<bool>,
        _listeners: Vec<EventListenerHandle>,
    }

    impl WebOnlineStatus {
        pub fn new() -> Self {
            let online = Signal::new(
                web_sys::window()
                    .map(|window| window.navigator().on_line())
                    .unwrap_or(true),
            );
            let mut listeners = Vec::new();
            if let Some(window) = web_sys::window() {
                for (event, value) in [("online", true), ("offline", false)] {
                    let signal = online.clone();
                    match listen(window.as_ref(), event, move |_| signal.set(value)) {
                        Ok(handle) => listeners.push(handle),
                        Err(err) => LOGGER.warn(format_js_error("addEventListener(online)", err)),
                    }
                }
            }
            Self {
                online,
                _listeners: listeners,
            }
        }
    }

    impl Default for WebOnlineStatus {
        fn default() -> Self {
            Self::new()
        }
    }

    impl OnlineStatus for WebOnlineStatus {
        fn online(&self) -> Observable<bool> {
            self.online.observable()
        }
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use wasm::{WebInstallPromptEvent, WebOnlineStatus, WebPageHost};

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
mod native {
    use crate::platform::environment;
    use crate::pwa::error::{unsupported_browser, PwaResult};
    use crate::pwa::host::{InstallPromptCallback, OnlineStatus, PageHost, VisibilityCallback};
    use crate::pwa::signal::{Observable, Signal};
    use crate::pwa::types::VisibilityState;
    use crate::util::subscribe::Unsubscribe;

    /// Server-side stand-in: always visible, never installable, never reloads.
    #[derive(Clone, Debug, Default)]
    pub struct WebPageHost;

    impl WebPageHost {
        pub fn new() -> Self {
            Self
        }
    }

    impl PageHost for WebPageHost {
        fn is_browser(&self) -> bool {
            environment::is_browser()
        }

        fn is_standalone(&self) -> bool {
            false
        }

        fn visibility(&self) -> VisibilityState {
            VisibilityState::Visible
        }

        fn reload(&self) {}

        fn on_before_install_prompt(&self, _callback: InstallPromptCallback) -> PwaResult<Unsubscribe> {
            Err(unsupported_browser(
                "Install prompts are only available when the `wasm-web` feature is enabled.",
            ))
        }

        fn on_visibility_change(&self, _callback: VisibilityCallback) -> PwaResult<Unsubscribe> {
            Err(unsupported_browser(
                "Visibility tracking is only available when the `wasm-web` feature is enabled.",
            ))
        }
    }

    /// Reports the application as online.
    #[derive(Debug)]
    pub struct WebOnlineStatus {
        online: Signal<bool>,
    }

    impl WebOnlineStatus {
        pub fn new() -> Self {
            Self {
                online: Signal::new(true),
            }
        }
    }

    impl Default for WebOnlineStatus {
        fn default() -> Self {
            Self::new()
        }
    }

    impl OnlineStatus for WebOnlineStatus {
        fn online(&self) -> Observable<bool> {
            self.online.observable()
        }
    }
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
pub use native::{WebOnlineStatus, WebPageHost};
