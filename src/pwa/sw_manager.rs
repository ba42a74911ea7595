//! Service worker registration and lifecycle tracking for browsers.
//!
//! The registration derives Workbox-style lifecycle events from the raw
//! `updatefound`, `statechange` and `controllerchange` DOM events. A worker is
//! considered external when it is not the first one found after registering,
//! when its script differs from the registered one, or when it shows up more
//! than a minute after registration (another tab, or a periodic update check).

/// DOM-free decisions behind the derived lifecycle events.
#[cfg_attr(not(all(feature = "wasm-web", target_arch = "wasm32")), allow(dead_code))]
mod transitions {
    use crate::pwa::constants::EXTERNAL_UPDATE_WINDOW_MS;
    use crate::pwa::types::LifecycleEvent;

    /// Mirror of `ServiceWorker.state`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum WorkerPhase {
        Parsed,
        Installing,
        Installed,
        Activating,
        Activated,
        Redundant,
    }

    /// What an `updatefound` event knows about the installing worker.
    #[derive(Clone, Copy, Debug)]
    pub(crate) struct FoundWorker {
        pub(crate) previous_updates: u32,
        pub(crate) same_script: bool,
        pub(crate) found_at_ms: f64,
        pub(crate) registered_at_ms: f64,
    }

    impl FoundWorker {
        /// Anything but the first matching worker found shortly after `register()`.
        pub(crate) fn is_external(&self) -> bool {
            self.previous_updates > 0
                || !self.same_script
                || self.found_at_ms > self.registered_at_ms + EXTERNAL_UPDATE_WINDOW_MS
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum StateChange {
        /// Re-check after the settle delay whether the worker is stuck waiting.
        CheckWaiting,
        Activated { is_update: bool },
        ExternalActivated,
    }

    pub(crate) fn on_state_change(
        phase: WorkerPhase,
        is_external: bool,
        is_update: bool,
    ) -> Option<StateChange> {
        match phase {
            WorkerPhase::Installed => Some(StateChange::CheckWaiting),
            WorkerPhase::Activated if is_external => Some(StateChange::ExternalActivated),
            WorkerPhase::Activated => Some(StateChange::Activated { is_update }),
            _ => None,
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum WaitingKind {
        Own,
        External,
    }

    /// Outcome of the settle-delay check for a worker that reached `installed`.
    pub(crate) fn waiting_kind(
        phase: WorkerPhase,
        is_registration_waiting: bool,
        is_external: bool,
    ) -> Option<WaitingKind> {
        if phase != WorkerPhase::Installed || !is_registration_waiting {
            return None;
        }
        Some(if is_external {
            WaitingKind::External
        } else {
            WaitingKind::Own
        })
    }

    /// `controllerchange` only counts when the new controller is our own worker.
    pub(crate) fn controlling_event(controller_is_own: bool, is_update: bool) -> Option<LifecycleEvent> {
        controller_is_own.then_some(LifecycleEvent::Controlling { is_update })
    }

    /// Whether `worker_script` is `registered` resolved against the page URL.
    pub(crate) fn script_matches(page_href: Option<&str>, registered: &str, worker_script: &str) -> bool {
        let expected = page_href
            .and_then(|href| url::Url::parse(href).ok())
            .and_then(|base| base.join(registered).ok());
        match expected {
            Some(expected) => expected.as_str() == worker_script,
            None => worker_script.ends_with(registered),
        }
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{ServiceWorker, ServiceWorkerState};

    use super::transitions::{self, FoundWorker, StateChange, WaitingKind, WorkerPhase};
    use crate::platform::browser::{format_js_error, listen, EventListenerHandle};
    use crate::platform::runtime;
    use crate::pwa::config::ServiceWorkerOptions;
    use crate::pwa::error::{
        internal_error, message_failed, registration_failed, unsupported_browser, update_failed,
        PwaResult,
    };
    use crate::pwa::host::{ServiceWorkerContainer, ServiceWorkerPort, ServiceWorkerRegistration};
    use crate::pwa::logger::LOGGER;
    use crate::pwa::support;
    use crate::pwa::types::{LifecycleEvent, LifecycleSink, ServiceWorkerMessage};
    use crate::util::subscribe::Unsubscribe;

    /// Grace period before an `installed` worker is reported as waiting.
    const WAITING_SETTLE_DELAY: Duration = Duration::from_millis(200);

    /// `navigator.serviceWorker`.
    #[derive(Clone, Debug, Default)]
    pub struct WebServiceWorkerContainer;

    impl WebServiceWorkerContainer {
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait(?Send)]
    impl ServiceWorkerContainer for WebServiceWorkerContainer {
        fn is_supported(&self) -> bool {
            support::is_supported()
        }

        async fn register(
            &self,
            options: &ServiceWorkerOptions,
        ) -> PwaResult<Arc<dyn ServiceWorkerRegistration>> {
            let container = navigator_container()?;
            let is_update = container.controller().is_some();

            let init = web_sys::RegistrationOptions::new();
            if let Some(scope) = &options.scope {
                init.set_scope(scope);
            }

            let promise = container.register_with_options(&options.script_url, &init);
            let registration_js = JsFuture::from(promise).await.map_err(|err| {
                registration_failed(format_js_error("serviceWorker.register", err))
            })?;
            let registration: web_sys::ServiceWorkerRegistration =
                registration_js.dyn_into().map_err(|_| {
                    registration_failed("Unexpected return value from serviceWorker.register")
                })?;

            Ok(Arc::new(WebServiceWorkerRegistration {
                inner: registration,
                container,
                script_url: options.script_url.clone(),
                registered_at: now_ms(),
                is_update,
            }))
        }

        fn has_controller(&self) -> bool {
            navigator_container()
                .map(|container| container.controller().is_some())
                .unwrap_or(false)
        }

        fn controller_activated(&self) -> bool {
            navigator_container()
                .ok()
                .and_then(|container| container.controller())
                .map(|worker| worker.state() == ServiceWorkerState::Activated)
                .unwrap_or(false)
        }
    }

    /// A `ServiceWorkerRegistration` obtained from [`WebServiceWorkerContainer`].
    pub struct WebServiceWorkerRegistration {
        inner: web_sys::ServiceWorkerRegistration,
        container: web_sys::ServiceWorkerContainer,
        script_url: String,
        registered_at: f64,
        is_update: bool,
    }

    unsafe impl Send for WebServiceWorkerRegistration {}
    unsafe impl Sync for WebServiceWorkerRegistration {}

    #[async_trait(?Send)]
    impl ServiceWorkerRegistration for WebServiceWorkerRegistration {
        async fn update(&self) -> PwaResult<()> {
            let promise = self
                .inner
                .update()
                .map_err(|err| update_failed(format_js_error("registration.update", err)))?;
            JsFuture::from(promise)
                .await
                .map_err(|err| update_failed(format_js_error("registration.update", err)))?;
            Ok(())
        }

        fn post_message(&self, message: ServiceWorkerMessage) -> PwaResult<()> {
            let worker = match message {
                ServiceWorkerMessage::SkipWaiting => self.inner.waiting(),
                ServiceWorkerMessage::ClientsClaim => self.inner.active(),
            };
            let worker = worker.ok_or_else(|| {
                message_failed(format!(
                    "No service worker available to receive {}",
                    message.as_str()
                ))
            })?;
            post_to(&worker, message)
        }

        fn watch(&self, sink: LifecycleSink) -> PwaResult<Unsubscribe> {
            let watcher = LifecycleWatcher::attach(self, sink)?;
            Ok(Box::new(move || drop(watcher)))
        }

        fn as_web_sys(&self) -> Option<&web_sys::ServiceWorkerRegistration> {
            Some(&self.inner)
        }
    }

    /// Worker handed out with `externalwaiting` events.
    struct WebServiceWorkerPort {
        worker: ServiceWorker,
    }

    unsafe impl Send for WebServiceWorkerPort {}
    unsafe impl Sync for WebServiceWorkerPort {}

    impl ServiceWorkerPort for WebServiceWorkerPort {
        fn post_message(&self, message: ServiceWorkerMessage) -> PwaResult<()> {
            post_to(&self.worker, message)
        }
    }

    struct WatchState {
        sink: LifecycleSink,
        registration: web_sys::ServiceWorkerRegistration,
        script_url: String,
        registered_at: f64,
        is_update: bool,
        update_found_count: u32,
        own_worker: Option<ServiceWorker>,
        external_worker: Option<ServiceWorker>,
        saw_external: bool,
        worker_listeners: Vec<EventListenerHandle>,
    }

    type SharedWatchState = Rc<RefCell<WatchState>>;

    /// Owns every DOM listener installed by [`ServiceWorkerRegistration::watch`].
    struct LifecycleWatcher {
        _state: SharedWatchState,
        _update_found: EventListenerHandle,
        _controller_change: EventListenerHandle,
    }

    unsafe impl Send for LifecycleWatcher {}

    impl LifecycleWatcher {
        fn attach(registration: &WebServiceWorkerRegistration, sink: LifecycleSink) -> PwaResult<Self> {
            let inner = &registration.inner;
            let own_worker = [inner.installing(), inner.waiting(), inner.active()]
                .into_iter()
                .flatten()
                .find(|worker| same_script(worker, &registration.script_url));
            let state = Rc::new(RefCell::new(WatchState {
                sink,
                registration: registration.inner.clone(),
                script_url: registration.script_url.clone(),
                registered_at: registration.registered_at,
                is_update: registration.is_update,
                update_found_count: 0,
                own_worker,
                external_worker: None,
                saw_external: false,
                worker_listeners: Vec::new(),
            }));

            let weak = Rc::downgrade(&state);
            let update_found = listen(registration.inner.as_ref(), "updatefound", move |_| {
                if let Some(state) = weak.upgrade() {
                    on_update_found(&state);
                }
            })
            .map_err(|err| internal_error(format_js_error("addEventListener(updatefound)", err)))?;

            let weak = Rc::downgrade(&state);
            let container = registration.container.clone();
            let controller_change =
                listen(registration.container.as_ref(), "controllerchange", move |_| {
                    let Some(state) = weak.upgrade() else {
                        return;
                    };
                    let controller = container.controller();
                    let (is_own, is_update) = {
                        let guard = state.borrow();
                        (
                            controller.is_some() && controller == guard.own_worker,
                            guard.is_update,
                        )
                    };
                    if let Some(event) = transitions::controlling_event(is_own, is_update) {
                        emit(&state, event);
                    }
                })
                .map_err(|err| {
                    internal_error(format_js_error("addEventListener(controllerchange)", err))
                })?;

            if let Some(waiting) = registration.inner.waiting() {
                if same_script(&waiting, &registration.script_url) {
                    emit(
                        &state,
                        LifecycleEvent::Waiting {
                            was_waiting_before_register: true,
                        },
                    );
                }
            }

            Ok(Self {
                _state: state,
                _update_found: update_found,
                _controller_change: controller_change,
            })
        }
    }

    fn on_update_found(state: &SharedWatchState) {
        let mut guard = state.borrow_mut();
        if guard.saw_external {
            return;
        }
        let Some(installing) = guard.registration.installing() else {
            return;
        };

        let found = FoundWorker {
            previous_updates: guard.update_found_count,
            same_script: same_script(&installing, &guard.script_url),
            found_at_ms: now_ms(),
            registered_at_ms: guard.registered_at,
        };
        if found.is_external() {
            guard.external_worker = Some(installing.clone());
            guard.saw_external = true;
        } else {
            guard.own_worker = Some(installing.clone());
        }
        guard.update_found_count += 1;

        let weak = Rc::downgrade(state);
        let worker = installing.clone();
        match listen(installing.as_ref(), "statechange", move |_| {
            if let Some(state) = weak.upgrade() {
                on_state_change(&state, &worker);
            }
        }) {
            Ok(handle) => guard.worker_listeners.push(handle),
            Err(err) => LOGGER.warn(format_js_error("addEventListener(statechange)", err)),
        }
    }

    fn on_state_change(state: &SharedWatchState, worker: &ServiceWorker) {
        let (is_external, is_update) = {
            let guard = state.borrow();
            (guard.external_worker.as_ref() == Some(worker), guard.is_update)
        };

        match transitions::on_state_change(worker_phase(worker), is_external, is_update) {
            Some(StateChange::CheckWaiting) => {
                schedule_waiting_check(state, worker.clone(), is_external);
            }
            Some(StateChange::Activated { is_update }) => {
                emit(state, LifecycleEvent::Activated { is_update });
            }
            Some(StateChange::ExternalActivated) => emit(state, LifecycleEvent::ExternalActivated),
            None => {}
        }
    }

    /// An `installed` worker that is still the registration's waiting worker
    /// after a short delay is stuck behind the active one.
    fn schedule_waiting_check(state: &SharedWatchState, worker: ServiceWorker, is_external: bool) {
        let weak = Rc::downgrade(state);
        runtime::spawn_detached(async move {
            runtime::sleep(WAITING_SETTLE_DELAY).await;
            let Some(state) = weak.upgrade() else {
                return;
            };
            let waiting = state.borrow().registration.waiting();
            let kind = transitions::waiting_kind(
                worker_phase(&worker),
                waiting.as_ref() == Some(&worker),
                is_external,
            );

            let event = match kind {
                Some(WaitingKind::External) => LifecycleEvent::ExternalWaiting {
                    worker: Arc::new(WebServiceWorkerPort { worker }),
                },
                Some(WaitingKind::Own) => LifecycleEvent::Waiting {
                    was_waiting_before_register: false,
                },
                None => return,
            };
            emit(&state, event);
        });
    }

    fn emit(state: &SharedWatchState, event: LifecycleEvent) {
        let sink = state.borrow().sink.clone();
        sink(event);
    }

    fn post_to(worker: &ServiceWorker, message: ServiceWorkerMessage) -> PwaResult<()> {
        let payload = serde_wasm_bindgen::to_value(&message).map_err(|err| {
            internal_error(format!("Failed to encode {}: {err}", message.as_str()))
        })?;
        worker
            .post_message(&payload)
            .map_err(|err| message_failed(format_js_error("postMessage", err)))
    }

    fn navigator_container() -> PwaResult<web_sys::ServiceWorkerContainer> {
        if !support::is_supported() {
            return Err(unsupported_browser(
                "Service workers are not available in this browser environment.",
            ));
        }
        let window = web_sys::window()
            .ok_or_else(|| unsupported_browser("Service workers require a Window context"))?;
        Ok(window.navigator().service_worker())
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|window| window.performance())
            .map(|performance| performance.now())
            .unwrap_or(0.0)
    }

    fn same_script(worker: &ServiceWorker, script_url: &str) -> bool {
        let href = web_sys::window().and_then(|window| window.location().href().ok());
        transitions::script_matches(href.as_deref(), script_url, &worker.script_url())
    }

    fn worker_phase(worker: &ServiceWorker) -> WorkerPhase {
        match worker.state() {
            ServiceWorkerState::Parsed => WorkerPhase::Parsed,
            ServiceWorkerState::Installing => WorkerPhase::Installing,
            ServiceWorkerState::Installed => WorkerPhase::Installed,
            ServiceWorkerState::Activating => WorkerPhase::Activating,
            ServiceWorkerState::Activated => WorkerPhase::Activated,
            _ => WorkerPhase::Redundant,
        }
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use wasm::{WebServiceWorkerContainer, WebServiceWorkerRegistration};

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
mod native {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::pwa::config::ServiceWorkerOptions;
    use crate::pwa::error::{unsupported_browser, PwaResult};
    use crate::pwa::host::{ServiceWorkerContainer, ServiceWorkerRegistration};

    /// Stand-in used outside the browser; reports service workers as unavailable.
    #[derive(Clone, Debug, Default)]
    pub struct WebServiceWorkerContainer;

    impl WebServiceWorkerContainer {
        pub fn new() -> Self {
            Self
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), async_trait)]
    #[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
    impl ServiceWorkerContainer for WebServiceWorkerContainer {
        fn is_supported(&self) -> bool {
            false
        }

        async fn register(
            &self,
            _options: &ServiceWorkerOptions,
        ) -> PwaResult<Arc<dyn ServiceWorkerRegistration>> {
            Err(unsupported_browser(
                "Service worker registration is only available when the `wasm-web` feature is enabled.",
            ))
        }

        fn has_controller(&self) -> bool {
            false
        }

        fn controller_activated(&self) -> bool {
            false
        }
    }
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
pub use native::WebServiceWorkerContainer;

#[cfg(all(test, not(all(feature = "wasm-web", target_arch = "wasm32"))))]
mod tests {
    use super::transitions::{
        controlling_event, on_state_change, script_matches, waiting_kind, FoundWorker,
        StateChange, WaitingKind, WorkerPhase,
    };
    use super::*;
    use crate::pwa::config::ServiceWorkerOptions;
    use crate::pwa::host::ServiceWorkerContainer;
    use crate::pwa::types::LifecycleEvent;

    const REGISTERED_AT: f64 = 1_000.0;

    fn found(previous_updates: u32, same_script: bool, found_at_ms: f64) -> FoundWorker {
        FoundWorker {
            previous_updates,
            same_script,
            found_at_ms,
            registered_at_ms: REGISTERED_AT,
        }
    }

    #[test]
    fn first_matching_worker_inside_window_is_own() {
        assert!(!found(0, true, REGISTERED_AT + 50.0).is_external());
        assert!(!found(0, true, REGISTERED_AT + 60_000.0).is_external());
    }

    #[test]
    fn second_update_is_external() {
        assert!(found(1, true, REGISTERED_AT + 50.0).is_external());
    }

    #[test]
    fn script_mismatch_is_external() {
        assert!(found(0, false, REGISTERED_AT + 50.0).is_external());
    }

    #[test]
    fn late_update_is_external() {
        assert!(found(0, true, REGISTERED_AT + 60_001.0).is_external());
    }

    #[test]
    fn installed_worker_schedules_waiting_check() {
        assert_eq!(
            on_state_change(WorkerPhase::Installed, false, false),
            Some(StateChange::CheckWaiting)
        );
        assert_eq!(
            on_state_change(WorkerPhase::Installed, true, true),
            Some(StateChange::CheckWaiting)
        );
    }

    #[test]
    fn activation_maps_by_origin() {
        assert_eq!(
            on_state_change(WorkerPhase::Activated, false, true),
            Some(StateChange::Activated { is_update: true })
        );
        assert_eq!(
            on_state_change(WorkerPhase::Activated, true, false),
            Some(StateChange::ExternalActivated)
        );
        assert_eq!(on_state_change(WorkerPhase::Activating, false, false), None);
        assert_eq!(on_state_change(WorkerPhase::Redundant, true, false), None);
    }

    #[test]
    fn waiting_requires_installed_registration_waiting_worker() {
        assert_eq!(
            waiting_kind(WorkerPhase::Installed, true, false),
            Some(WaitingKind::Own)
        );
        assert_eq!(
            waiting_kind(WorkerPhase::Installed, true, true),
            Some(WaitingKind::External)
        );
        // Activated during the settle delay.
        assert_eq!(waiting_kind(WorkerPhase::Activated, true, false), None);
        // Replaced by a newer waiting worker.
        assert_eq!(waiting_kind(WorkerPhase::Installed, false, false), None);
    }

    #[test]
    fn controlling_only_for_own_controller() {
        assert!(matches!(
            controlling_event(true, true),
            Some(LifecycleEvent::Controlling { is_update: true })
        ));
        assert!(controlling_event(false, true).is_none());
    }

    #[test]
    fn script_url_resolves_against_page() {
        let page = Some("https://app.example.com/character/42");
        assert!(script_matches(page, "/sw.js", "https://app.example.com/sw.js"));
        assert!(script_matches(page, "sw.js", "https://app.example.com/character/sw.js"));
        assert!(!script_matches(page, "/sw.js", "https://app.example.com/other-sw.js"));
        assert!(script_matches(None, "/sw.js", "https://app.example.com/sw.js"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn native_container_reports_unsupported() {
        let container = WebServiceWorkerContainer::new();
        assert!(!container.is_supported());
        assert!(!container.has_controller());
        assert!(!container.controller_activated());
        let err = container
            .register(&ServiceWorkerOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code_str(), "pwa/unsupported-browser");
    }
}
