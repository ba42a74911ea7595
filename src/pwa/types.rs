use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pwa::constants::{CLIENTS_CLAIM_MESSAGE, SKIP_WAITING_MESSAGE};
use crate::pwa::host::ServiceWorkerPort;

/// Messages the page posts to a service worker.
///
/// Serialized as `{"type": "CLIENTS_CLAIM"}` / `{"type": "SKIP_WAITING"}`, the
/// shape the service worker's `message` listener expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceWorkerMessage {
    ClientsClaim,
    SkipWaiting,
}

impl ServiceWorkerMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceWorkerMessage::ClientsClaim => CLIENTS_CLAIM_MESSAGE,
            ServiceWorkerMessage::SkipWaiting => SKIP_WAITING_MESSAGE,
        }
    }
}

/// Lifecycle notifications emitted for the registered service worker.
#[derive(Clone)]
pub enum LifecycleEvent {
    /// The worker registered by this page activated.
    Activated { is_update: bool },
    /// The worker registered by this page started controlling the page.
    Controlling { is_update: bool },
    /// The worker registered by this page installed but is waiting behind an active one.
    Waiting { was_waiting_before_register: bool },
    /// A worker installed by another tab or a later update check is waiting.
    ExternalWaiting { worker: Arc<dyn ServiceWorkerPort> },
    /// A worker installed by another tab or a later update check activated.
    ExternalActivated,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Activated { .. } => "activated",
            LifecycleEvent::Controlling { .. } => "controlling",
            LifecycleEvent::Waiting { .. } => "waiting",
            LifecycleEvent::ExternalWaiting { .. } => "externalwaiting",
            LifecycleEvent::ExternalActivated => "externalactivated",
        }
    }
}

impl fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Activated { is_update } => f
                .debug_struct("Activated")
                .field("is_update", is_update)
                .finish(),
            LifecycleEvent::Controlling { is_update } => f
                .debug_struct("Controlling")
                .field("is_update", is_update)
                .finish(),
            LifecycleEvent::Waiting {
                was_waiting_before_register,
            } => f
                .debug_struct("Waiting")
                .field("was_waiting_before_register", was_waiting_before_register)
                .finish(),
            LifecycleEvent::ExternalWaiting { .. } => f.write_str("ExternalWaiting"),
            LifecycleEvent::ExternalActivated => f.write_str("ExternalActivated"),
        }
    }
}

/// Callback the service worker container uses to report lifecycle events.
pub type LifecycleSink = Arc<dyn Fn(LifecycleEvent) + Send + Sync + 'static>;

/// Result of showing the browser install prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Notification permission states as exposed by the Web Notifications API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    /// The user has not decided whether to allow notifications.
    Default,
    /// The user granted notification permissions.
    Granted,
    /// The user denied notification permissions.
    Denied,
}

impl PermissionState {
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "granted" => PermissionState::Granted,
            "denied" => PermissionState::Denied,
            _ => PermissionState::Default,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibilityState {
    Visible,
    Hidden,
}

/// Raw backend answer to a push token upload. Not interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSendResponse {
    pub status: u16,
    pub body: String,
}

impl TokenSendResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
