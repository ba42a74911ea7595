//! Progressive web app lifecycle: service worker registration, update
//! hand-off, install prompt and push token plumbing.
//!
//! [`PwaLifecycle`] is the entry point. It talks to the browser through the
//! traits in [`host`], which lets the whole lifecycle run against in-memory
//! collaborators on native targets.

mod api;
pub(crate) mod constants;
pub mod config;
pub mod error;
pub mod host;
pub(crate) mod logger;
pub mod page;
pub mod permission;
pub mod signal;
pub mod subscription;
pub mod support;
pub mod sw_manager;
pub mod token_sender;
pub mod types;

pub use api::{PwaCollaborators, PwaLifecycle, RegistrationPhase};
pub use config::{PwaConfig, ServiceWorkerOptions};
pub use error::{PwaError, PwaErrorCode, PwaResult};
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use page::WebInstallPromptEvent;
pub use page::{WebOnlineStatus, WebPageHost};
pub use permission::WebPermissionRequester;
pub use signal::{Observable, Signal, Subscription};
pub use subscription::WebPushHandler;
pub use support::{is_supported, push_supported};
pub use sw_manager::WebServiceWorkerContainer;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use sw_manager::WebServiceWorkerRegistration;
pub use token_sender::NotificationTokenSender;
pub use types::{
    InstallOutcome, LifecycleEvent, LifecycleSink, PermissionState, ServiceWorkerMessage,
    TokenSendResponse, VisibilityState,
};
