//! Seams between the lifecycle facade and the environment it runs in.
//!
//! Browser implementations live in the `sw_manager`, `page`, `permission` and
//! `subscription` modules; tests drive the facade through in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pwa::config::ServiceWorkerOptions;
use crate::pwa::error::PwaResult;
use crate::pwa::signal::Observable;
use crate::pwa::types::{
    InstallOutcome, LifecycleSink, PermissionState, ServiceWorkerMessage, TokenSendResponse,
    VisibilityState,
};
use crate::util::subscribe::Unsubscribe;

/// Entry point for registering the application service worker.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ServiceWorkerContainer: Send + Sync {
    /// Whether the environment exposes `navigator.serviceWorker`.
    fn is_supported(&self) -> bool;

    /// Registers the worker script.
    async fn register(
        &self,
        options: &ServiceWorkerOptions,
    ) -> PwaResult<Arc<dyn ServiceWorkerRegistration>>;

    /// Whether a service worker currently controls the page.
    fn has_controller(&self) -> bool;

    /// Whether the controlling worker has reached the `activated` state.
    fn controller_activated(&self) -> bool;
}

/// A registration returned by [`ServiceWorkerContainer::register`].
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ServiceWorkerRegistration: Send + Sync {
    /// Asks the browser to re-fetch the worker script.
    async fn update(&self) -> PwaResult<()>;

    /// Posts `message` to the worker tracked by this registration.
    fn post_message(&self, message: ServiceWorkerMessage) -> PwaResult<()>;

    /// Starts reporting lifecycle events to `sink` until the returned closure runs.
    ///
    /// A worker already waiting at this point is reported as
    /// [`LifecycleEvent::Waiting`](crate::pwa::LifecycleEvent::Waiting) with
    /// `was_waiting_before_register` set.
    fn watch(&self, sink: LifecycleSink) -> PwaResult<Unsubscribe>;

    #[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
    fn as_web_sys(&self) -> Option<&web_sys::ServiceWorkerRegistration> {
        None
    }
}

/// A worker reference carried by an `externalwaiting` event.
pub trait ServiceWorkerPort: Send + Sync {
    fn post_message(&self, message: ServiceWorkerMessage) -> PwaResult<()>;
}

/// The deferred `beforeinstallprompt` event.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait InstallPromptEvent: Send + Sync {
    /// Shows the native install prompt and resolves with the user's choice.
    async fn prompt(&self) -> PwaResult<InstallOutcome>;
}

pub type InstallPromptCallback = Arc<dyn Fn(Arc<dyn InstallPromptEvent>) + Send + Sync + 'static>;
pub type VisibilityCallback = Arc<dyn Fn(VisibilityState) + Send + Sync + 'static>;

/// The page hosting the application.
pub trait PageHost: Send + Sync {
    /// Whether the code runs in a browser window (as opposed to a server render).
    fn is_browser(&self) -> bool;

    /// Whether the application runs as an installed, standalone app.
    fn is_standalone(&self) -> bool;

    fn visibility(&self) -> VisibilityState;

    fn reload(&self);

    /// Captures `beforeinstallprompt`, suppressing the browser's own mini-infobar.
    fn on_before_install_prompt(&self, callback: InstallPromptCallback) -> PwaResult<Unsubscribe>;

    fn on_visibility_change(&self, callback: VisibilityCallback) -> PwaResult<Unsubscribe>;
}

/// Push provider that turns a service worker registration into a push token.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PushMessagingHandler: Send + Sync {
    fn init(&self);

    /// Subscribes for push using the given registration and stores the resulting token.
    async fn register(&self, registration: Arc<dyn ServiceWorkerRegistration>) -> PwaResult<()>;

    /// Current token, if registration succeeded.
    fn token(&self) -> Option<String>;

    fn can_show_notifications(&self) -> Observable<bool>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PermissionRequester: Send + Sync {
    async fn request(&self) -> PwaResult<PermissionState>;

    fn status(&self) -> Observable<PermissionState>;
}

pub trait OnlineStatus: Send + Sync {
    fn online(&self) -> Observable<bool>;
}

/// Uploads push tokens to the application backend.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PushTokenSender: Send + Sync {
    async fn send(&self, token: &str) -> PwaResult<TokenSendResponse>;
}
