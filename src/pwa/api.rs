use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::platform::runtime::{self, IntervalHandle};
use crate::pwa::config::PwaConfig;
use crate::pwa::error::PwaResult;
use crate::pwa::host::{
    InstallPromptCallback, InstallPromptEvent, OnlineStatus, PageHost, PermissionRequester,
    PushMessagingHandler, PushTokenSender, ServiceWorkerContainer, ServiceWorkerPort,
    ServiceWorkerRegistration, VisibilityCallback,
};
use crate::pwa::logger::LOGGER;
use crate::pwa::page::{WebOnlineStatus, WebPageHost};
use crate::pwa::permission::WebPermissionRequester;
use crate::pwa::signal::{Observable, Signal, Subscription};
use crate::pwa::subscription::WebPushHandler;
use crate::pwa::sw_manager::WebServiceWorkerContainer;
use crate::pwa::token_sender::NotificationTokenSender;
use crate::pwa::types::{
    InstallOutcome, LifecycleEvent, LifecycleSink, PermissionState, ServiceWorkerMessage,
    TokenSendResponse, VisibilityState,
};
use crate::util::subscribe::Unsubscribe;

/// Where the facade is in bringing up the service worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationPhase {
    #[default]
    Unregistered,
    Registering,
    /// No service worker support; the application runs without one.
    Unsupported,
    Registered,
    Failed,
}

/// The environment pieces the facade coordinates.
#[derive(Clone)]
pub struct PwaCollaborators {
    pub container: Arc<dyn ServiceWorkerContainer>,
    pub page: Arc<dyn PageHost>,
    pub push: Arc<dyn PushMessagingHandler>,
    pub permission: Arc<dyn PermissionRequester>,
    pub online: Arc<dyn OnlineStatus>,
    pub token_sender: Arc<dyn PushTokenSender>,
}

/// Coordinates installability, update notification and push registration.
///
/// Cloning is cheap and every clone drives the same state. Call
/// [`PwaLifecycle::initialize`] once per page session and
/// [`PwaLifecycle::shutdown`] on teardown.
///
/// # Examples
///
/// ```
/// # use pwa_lifecycle::doctest_support::offline_lifecycle;
/// let pwa = offline_lifecycle();
/// pwa.initialize();
///
/// let _banner = pwa.new_version_available().subscribe_fn(|available| {
///     if *available {
///         println!("a new version is ready");
///     }
/// });
/// // Once the user accepts the update:
/// pwa.request_update();
/// ```
#[derive(Clone)]
pub struct PwaLifecycle {
    inner: Arc<PwaLifecycleInner>,
}

struct PwaLifecycleInner {
    config: PwaConfig,
    collaborators: PwaCollaborators,
    new_version_available: Signal<bool>,
    update_requested: Signal<bool>,
    service_worker_ready: Signal<bool>,
    installable: Signal<bool>,
    initialized: AtomicBool,
    running_standalone: AtomicBool,
    service_worker_available: AtomicBool,
    reload_on_control: AtomicBool,
    state: Mutex<LifecycleState>,
}

#[derive(Default)]
struct LifecycleState {
    phase: RegistrationPhase,
    /// Set by `shutdown()`; later registrations detach immediately.
    shut_down: bool,
    registration: Option<Arc<dyn ServiceWorkerRegistration>>,
    prompt_event: Option<Arc<dyn InstallPromptEvent>>,
    pending_update: Option<Subscription>,
    listeners: Vec<Unsubscribe>,
    update_timer: Option<IntervalHandle>,
}

#[derive(Clone)]
enum UpdateTarget {
    /// The worker tracked by our own registration; reload once it takes control.
    Registration,
    /// A worker handed over by an `externalwaiting` event.
    Worker(Arc<dyn ServiceWorkerPort>),
}

impl PwaLifecycle {
    pub fn new(config: PwaConfig, collaborators: PwaCollaborators) -> Self {
        let inner = PwaLifecycleInner {
            config,
            collaborators,
            new_version_available: Signal::new(false),
            update_requested: Signal::new(false),
            service_worker_ready: Signal::new(false),
            installable: Signal::new(false),
            initialized: AtomicBool::new(false),
            running_standalone: AtomicBool::new(false),
            service_worker_available: AtomicBool::new(false),
            reload_on_control: AtomicBool::new(false),
            state: Mutex::new(LifecycleState::default()),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Wires the browser implementations of every collaborator.
    ///
    /// Requires `config.api_base_url` for push token uploads and a valid VAPID
    /// public key. Outside a `wasm-web` build every browser capability reports
    /// itself unsupported.
    pub fn for_browser(config: PwaConfig, vapid_key: impl AsRef<str>) -> PwaResult<Self> {
        let token_sender = NotificationTokenSender::from_config(&config)?;
        let collaborators = PwaCollaborators {
            container: Arc::new(WebServiceWorkerContainer::new()),
            page: Arc::new(WebPageHost::new()),
            push: Arc::new(WebPushHandler::new(vapid_key)?),
            permission: Arc::new(WebPermissionRequester::new()),
            online: Arc::new(WebOnlineStatus::new()),
            token_sender: Arc::new(token_sender),
        };
        Ok(Self::new(config, collaborators))
    }

    pub fn config(&self) -> &PwaConfig {
        &self.inner.config
    }

    /// Starts push, install prompt, standalone detection, service worker and visibility handling.
    ///
    /// Returns without waiting for the service worker registration. When service
    /// workers are unavailable the ready flag is set before this returns.
    /// Subsequent calls are ignored.
    pub fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            LOGGER.debug("initialize() already ran for this session; ignoring");
            return;
        }

        self.inner.collaborators.push.init();
        self.listen_for_install_prompt();
        let standalone = self.inner.collaborators.page.is_standalone();
        self.inner
            .running_standalone
            .store(standalone, Ordering::SeqCst);
        self.start_service_worker();
        self.listen_for_visibility_changes();
    }

    /// Marks that the user wants to switch to the waiting version.
    pub fn request_update(&self) {
        self.inner.update_requested.set(true);
    }

    pub async fn request_notification_permission(&self) -> PwaResult<PermissionState> {
        self.inner.collaborators.permission.request().await
    }

    /// Asks the browser to re-check the service worker script.
    ///
    /// Does nothing when no worker is registered. Failures are logged, never returned.
    pub async fn check_for_update(&self) {
        if !self.inner.service_worker_available.load(Ordering::SeqCst) {
            LOGGER.debug("service worker functionality currently not available");
            return;
        }
        let Some(registration) = self.registration() else {
            LOGGER.debug("service worker not registered yet; skipping update check");
            return;
        };

        LOGGER.debug("checking service worker for updates");
        if let Err(err) = registration.update().await {
            LOGGER.warn(format!(
                "{} could not be updated: {err}",
                self.inner.config.service_worker.script_url
            ));
        }
    }

    /// Uploads the push handler's current token, or an empty string when there is none.
    pub async fn send_push_token(&self) -> PwaResult<TokenSendResponse> {
        let token = self.inner.collaborators.push.token().unwrap_or_default();
        self.inner.collaborators.token_sender.send(&token).await
    }

    /// Shows the captured install prompt.
    ///
    /// Resolves to `None` when no `beforeinstallprompt` event was captured. A
    /// captured event is used at most once; the installable flag is cleared only
    /// when the user accepts.
    pub async fn prompt_install(&self) -> PwaResult<Option<InstallOutcome>> {
        let event = self.inner.state.lock().unwrap().prompt_event.take();
        let Some(event) = event else {
            return Ok(None);
        };

        let outcome = event.prompt().await?;
        if outcome == InstallOutcome::Accepted {
            self.inner.installable.set(false);
        }
        Ok(Some(outcome))
    }

    pub fn new_version_available(&self) -> Observable<bool> {
        self.inner.new_version_available.observable()
    }

    pub fn application_installable(&self) -> Observable<bool> {
        self.inner.installable.observable()
    }

    pub fn service_worker_ready(&self) -> Observable<bool> {
        self.inner.service_worker_ready.observable()
    }

    pub fn update_requested(&self) -> Observable<bool> {
        self.inner.update_requested.observable()
    }

    pub fn application_online(&self) -> Observable<bool> {
        self.inner.collaborators.online.online()
    }

    pub fn notification_permission(&self) -> Observable<PermissionState> {
        self.inner.collaborators.permission.status()
    }

    pub fn can_show_notifications(&self) -> Observable<bool> {
        self.inner.collaborators.push.can_show_notifications()
    }

    pub fn running_standalone(&self) -> bool {
        self.inner.running_standalone.load(Ordering::SeqCst)
    }

    pub fn registration_phase(&self) -> RegistrationPhase {
        self.inner.state.lock().unwrap().phase
    }

    /// Stops the update timer, detaches every listener and completes the flags.
    pub fn shutdown(&self) {
        let (timer, pending, listeners) = {
            let mut state = self.inner.state.lock().unwrap();
            state.shut_down = true;
            state.prompt_event = None;
            (
                state.update_timer.take(),
                state.pending_update.take(),
                std::mem::take(&mut state.listeners),
            )
        };

        if let Some(timer) = timer {
            timer.stop();
        }
        if let Some(pending) = pending {
            pending.unsubscribe();
        }
        for unsubscribe in listeners {
            unsubscribe();
        }

        self.inner.new_version_available.complete();
        self.inner.update_requested.complete();
        self.inner.service_worker_ready.complete();
        self.inner.installable.complete();
    }

    fn registration(&self) -> Option<Arc<dyn ServiceWorkerRegistration>> {
        self.inner.state.lock().unwrap().registration.clone()
    }

    fn set_phase(&self, phase: RegistrationPhase) {
        self.inner.state.lock().unwrap().phase = phase;
    }

    fn is_shut_down(&self) -> bool {
        self.inner.state.lock().unwrap().shut_down
    }

    fn keep_listener(&self, unsubscribe: Unsubscribe) {
        let mut state = self.inner.state.lock().unwrap();
        if state.shut_down {
            drop(state);
            unsubscribe();
            return;
        }
        state.listeners.push(unsubscribe);
    }

    fn mark_ready(&self) {
        self.inner
            .service_worker_ready
            .set_if(true, |ready| !*ready);
    }

    fn listen_for_install_prompt(&self) {
        let weak = Arc::downgrade(&self.inner);
        let callback: InstallPromptCallback = Arc::new(move |event| {
            if let Some(pwa) = upgrade(&weak) {
                pwa.inner.state.lock().unwrap().prompt_event = Some(event);
                pwa.inner.installable.set(true);
            }
        });

        match self
            .inner
            .collaborators
            .page
            .on_before_install_prompt(callback)
        {
            Ok(unsubscribe) => self.keep_listener(unsubscribe),
            Err(err) => LOGGER.debug(format!("install prompt unavailable: {err}")),
        }
    }

    fn listen_for_visibility_changes(&self) {
        let page = &self.inner.collaborators.page;
        if !page.is_browser() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let callback: VisibilityCallback = Arc::new(move |visibility| {
            if visibility != VisibilityState::Visible {
                return;
            }
            if let Some(pwa) = upgrade(&weak) {
                runtime::spawn_detached(async move {
                    pwa.check_for_update().await;
                });
            }
        });

        match page.on_visibility_change(callback) {
            Ok(unsubscribe) => self.keep_listener(unsubscribe),
            Err(err) => LOGGER.debug(format!("visibility changes unavailable: {err}")),
        }
    }

    fn start_service_worker(&self) {
        let available = self.inner.collaborators.page.is_browser()
            && self.inner.collaborators.container.is_supported();
        self.inner
            .service_worker_available
            .store(available, Ordering::SeqCst);

        if !available {
            LOGGER.info("service workers are not available; continuing without one");
            self.set_phase(RegistrationPhase::Unsupported);
            self.mark_ready();
            return;
        }

        self.set_phase(RegistrationPhase::Registering);
        let pwa = self.clone();
        runtime::spawn_detached(async move {
            pwa.register_service_worker().await;
        });
    }

    async fn register_service_worker(self) {
        let options = self.inner.config.service_worker.clone();
        LOGGER.debug(format!("registering service worker {}", options.script_url));

        let registration = match self.inner.collaborators.container.register(&options).await {
            Ok(registration) => registration,
            Err(err) => {
                LOGGER.warn(format!("error registering service worker: {err}"));
                self.set_phase(RegistrationPhase::Failed);
                return;
            }
        };

        let shut_down = {
            let mut state = self.inner.state.lock().unwrap();
            state.registration = Some(registration.clone());
            state.phase = RegistrationPhase::Registered;
            state.shut_down
        };
        if shut_down {
            LOGGER.debug("service worker registered after shutdown; not observing it");
            return;
        }

        match registration.watch(self.lifecycle_sink()) {
            Ok(unsubscribe) => self.keep_listener(unsubscribe),
            Err(err) => LOGGER.warn(format!("cannot observe service worker lifecycle: {err}")),
        }

        if self.inner.collaborators.container.controller_activated() {
            self.register_push(registration);
        }
        self.start_update_timer();

        if self.inner.collaborators.container.has_controller() {
            self.mark_ready();
        }
    }

    fn lifecycle_sink(&self) -> LifecycleSink {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |event| {
            if let Some(pwa) = upgrade(&weak) {
                pwa.handle_lifecycle_event(event);
            }
        })
    }

    fn handle_lifecycle_event(&self, event: LifecycleEvent) {
        LOGGER.debug(format!("service worker event: {}", event.name()));
        match event {
            LifecycleEvent::Activated { is_update: false } => {
                if let Some(registration) = self.registration() {
                    self.register_push(registration.clone());
                    post_or_log(
                        registration.post_message(ServiceWorkerMessage::ClientsClaim),
                        ServiceWorkerMessage::ClientsClaim,
                    );
                }
                self.mark_ready();
            }
            LifecycleEvent::Activated { is_update: true } => {}
            LifecycleEvent::Controlling { .. } => {
                self.mark_ready();
                if self.inner.reload_on_control.swap(false, Ordering::SeqCst) {
                    self.inner.collaborators.page.reload();
                }
            }
            LifecycleEvent::Waiting { .. } => {
                self.inner.new_version_available.set(true);
                self.arm_update_consumer(UpdateTarget::Registration);
            }
            LifecycleEvent::ExternalWaiting { worker } => {
                self.inner.new_version_available.set(true);
                self.arm_update_consumer(UpdateTarget::Worker(worker));
            }
            LifecycleEvent::ExternalActivated => {
                self.inner.collaborators.page.reload();
            }
        }
    }

    /// Replaces any pending consumer with one that applies the update on the next request.
    fn arm_update_consumer(&self, target: UpdateTarget) {
        if self.is_shut_down() {
            return;
        }
        let previous = self.inner.state.lock().unwrap().pending_update.take();
        if let Some(previous) = previous {
            previous.unsubscribe();
        }

        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.update_requested.once_when(
            |requested| *requested,
            move |_| {
                if let Some(pwa) = upgrade(&weak) {
                    pwa.apply_update(target);
                }
            },
        );
        self.inner.state.lock().unwrap().pending_update = Some(subscription);
    }

    fn apply_update(&self, target: UpdateTarget) {
        self.inner.update_requested.set(false);
        match target {
            UpdateTarget::Registration => {
                let Some(registration) = self.registration() else {
                    LOGGER.warn("update requested before the service worker registered");
                    return;
                };
                let posted = post_or_log(
                    registration.post_message(ServiceWorkerMessage::SkipWaiting),
                    ServiceWorkerMessage::SkipWaiting,
                );
                if posted {
                    self.inner.reload_on_control.store(true, Ordering::SeqCst);
                }
            }
            UpdateTarget::Worker(worker) => {
                post_or_log(
                    worker.post_message(ServiceWorkerMessage::SkipWaiting),
                    ServiceWorkerMessage::SkipWaiting,
                );
            }
        }
    }

    fn register_push(&self, registration: Arc<dyn ServiceWorkerRegistration>) {
        let push = self.inner.collaborators.push.clone();
        runtime::spawn_detached(async move {
            if let Err(err) = push.register(registration).await {
                LOGGER.warn(format!("push registration failed: {err}"));
            }
        });
    }

    fn start_update_timer(&self) {
        let interval = self.inner.config.service_worker.update_interval;
        let weak = Arc::downgrade(&self.inner);
        let timer = runtime::spawn_interval(interval, move || {
            let pwa = upgrade(&weak);
            async move {
                if let Some(pwa) = pwa {
                    pwa.check_for_update().await;
                }
            }
        });

        let previous = {
            let mut state = self.inner.state.lock().unwrap();
            if state.shut_down {
                Some(timer)
            } else {
                state.update_timer.replace(timer)
            }
        };
        if let Some(previous) = previous {
            previous.stop();
        }
    }
}

fn upgrade(weak: &Weak<PwaLifecycleInner>) -> Option<PwaLifecycle> {
    weak.upgrade().map(|inner| PwaLifecycle { inner })
}

/// Logs a failed post; returns whether the message was delivered.
fn post_or_log(result: PwaResult<()>, message: ServiceWorkerMessage) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            LOGGER.warn(format!("failed to post {} to service worker: {err}", message.as_str()));
            false
        }
    }
}
