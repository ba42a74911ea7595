//! In-memory stand-ins for the browser seams driven by the lifecycle facade.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::pwa::config::{PwaConfig, ServiceWorkerOptions};
use crate::pwa::error::{
    message_failed, registration_failed, token_send_failed, update_failed, PwaResult,
};
use crate::pwa::host::{
    InstallPromptCallback, InstallPromptEvent, OnlineStatus, PageHost, PermissionRequester,
    PushMessagingHandler, PushTokenSender, ServiceWorkerContainer, ServiceWorkerPort,
    ServiceWorkerRegistration, VisibilityCallback,
};
use crate::pwa::signal::{Observable, Signal};
use crate::pwa::types::{
    InstallOutcome, LifecycleEvent, LifecycleSink, PermissionState, ServiceWorkerMessage,
    TokenSendResponse, VisibilityState,
};
use crate::pwa::{PwaCollaborators, PwaLifecycle};
use crate::util::subscribe::Unsubscribe;

/// One fake per collaborator, wired together the way a browser would be.
pub struct FakeEnvironment {
    pub container: Arc<FakeContainer>,
    pub registration: Arc<FakeRegistration>,
    pub page: Arc<FakePage>,
    pub push: Arc<FakePush>,
    pub permission: Arc<FakePermission>,
    pub online: Arc<FakeOnline>,
    pub sender: Arc<FakeSender>,
}

impl FakeEnvironment {
    pub fn new() -> Self {
        let registration = Arc::new(FakeRegistration::default());
        Self {
            container: Arc::new(FakeContainer::new(registration.clone())),
            registration,
            page: Arc::new(FakePage::default()),
            push: Arc::new(FakePush::default()),
            permission: Arc::new(FakePermission::default()),
            online: Arc::new(FakeOnline::default()),
            sender: Arc::new(FakeSender::default()),
        }
    }

    pub fn without_service_worker() -> Self {
        let env = Self::new();
        env.container.supported.store(false, Ordering::SeqCst);
        env
    }

    pub fn lifecycle(&self) -> PwaLifecycle {
        let collaborators = PwaCollaborators {
            container: self.container.clone(),
            page: self.page.clone(),
            push: self.push.clone(),
            permission: self.permission.clone(),
            online: self.online.clone(),
            token_sender: self.sender.clone(),
        };
        PwaLifecycle::new(PwaConfig::default(), collaborators)
    }
}

pub struct FakeContainer {
    registration: Arc<FakeRegistration>,
    supported: AtomicBool,
    fail: AtomicBool,
    has_controller: AtomicBool,
    controller_activated: AtomicBool,
    register_calls: AtomicUsize,
    last_options: Mutex<Option<ServiceWorkerOptions>>,
}

impl FakeContainer {
    fn new(registration: Arc<FakeRegistration>) -> Self {
        Self {
            registration,
            supported: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            has_controller: AtomicBool::new(false),
            controller_activated: AtomicBool::new(false),
            register_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn fail_registration(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn set_controller(&self, present: bool, activated: bool) {
        self.has_controller.store(present, Ordering::SeqCst);
        self.controller_activated.store(activated, Ordering::SeqCst);
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<ServiceWorkerOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceWorkerContainer for FakeContainer {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    async fn register(
        &self,
        options: &ServiceWorkerOptions,
    ) -> PwaResult<Arc<dyn ServiceWorkerRegistration>> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(registration_failed("script evaluation failed"));
        }
        Ok(self.registration.clone())
    }

    fn has_controller(&self) -> bool {
        self.has_controller.load(Ordering::SeqCst)
    }

    fn controller_activated(&self) -> bool {
        self.controller_activated.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeRegistration {
    sink: Arc<Mutex<Option<LifecycleSink>>>,
    messages: Mutex<Vec<ServiceWorkerMessage>>,
    update_calls: AtomicUsize,
    fail_updates: AtomicBool,
    fail_posts: AtomicBool,
}

impl FakeRegistration {
    /// Delivers `event` to the watching facade, if any.
    pub fn emit(&self, event: LifecycleEvent) {
        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }

    pub fn messages(&self) -> Vec<ServiceWorkerMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// Makes `post_message` fail, as when no worker is waiting.
    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn is_watched(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

#[async_trait]
impl ServiceWorkerRegistration for FakeRegistration {
    async fn update(&self) -> PwaResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(update_failed("network unreachable"));
        }
        Ok(())
    }

    fn post_message(&self, message: ServiceWorkerMessage) -> PwaResult<()> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(message_failed("no waiting service worker"));
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }

    fn watch(&self, sink: LifecycleSink) -> PwaResult<Unsubscribe> {
        *self.sink.lock().unwrap() = Some(sink);
        let slot = self.sink.clone();
        Ok(Box::new(move || {
            slot.lock().unwrap().take();
        }))
    }
}

#[derive(Default)]
pub struct FakeWorker {
    messages: Mutex<Vec<ServiceWorkerMessage>>,
}

impl FakeWorker {
    pub fn messages(&self) -> Vec<ServiceWorkerMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl ServiceWorkerPort for FakeWorker {
    fn post_message(&self, message: ServiceWorkerMessage) -> PwaResult<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct FakePage {
    browser: AtomicBool,
    standalone: AtomicBool,
    reloads: AtomicUsize,
    install_prompt: Arc<Mutex<Option<InstallPromptCallback>>>,
    visibility: Arc<Mutex<Option<VisibilityCallback>>>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            browser: AtomicBool::new(true),
            standalone: AtomicBool::new(false),
            reloads: AtomicUsize::new(0),
            install_prompt: Arc::new(Mutex::new(None)),
            visibility: Arc::new(Mutex::new(None)),
        }
    }
}

impl FakePage {
    pub fn set_browser(&self, browser: bool) {
        self.browser.store(browser, Ordering::SeqCst);
    }

    pub fn set_standalone(&self, standalone: bool) {
        self.standalone.store(standalone, Ordering::SeqCst);
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn emit_install_prompt(&self, event: Arc<FakeInstallPrompt>) {
        let callback = self.install_prompt.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(event as Arc<dyn InstallPromptEvent>);
        }
    }

    pub fn emit_visibility(&self, state: VisibilityState) {
        let callback = self.visibility.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(state);
        }
    }

    pub fn has_install_prompt_listener(&self) -> bool {
        self.install_prompt.lock().unwrap().is_some()
    }

    pub fn has_visibility_listener(&self) -> bool {
        self.visibility.lock().unwrap().is_some()
    }
}

impl PageHost for FakePage {
    fn is_browser(&self) -> bool {
        self.browser.load(Ordering::SeqCst)
    }

    fn is_standalone(&self) -> bool {
        self.standalone.load(Ordering::SeqCst)
    }

    fn visibility(&self) -> VisibilityState {
        VisibilityState::Visible
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn on_before_install_prompt(&self, callback: InstallPromptCallback) -> PwaResult<Unsubscribe> {
        *self.install_prompt.lock().unwrap() = Some(callback);
        let slot = self.install_prompt.clone();
        Ok(Box::new(move || {
            slot.lock().unwrap().take();
        }))
    }

    fn on_visibility_change(&self, callback: VisibilityCallback) -> PwaResult<Unsubscribe> {
        *self.visibility.lock().unwrap() = Some(callback);
        let slot = self.visibility.clone();
        Ok(Box::new(move || {
            slot.lock().unwrap().take();
        }))
    }
}

pub struct FakeInstallPrompt {
    outcome: InstallOutcome,
    prompt_calls: AtomicUsize,
}

impl FakeInstallPrompt {
    pub fn new(outcome: InstallOutcome) -> Self {
        Self {
            outcome,
            prompt_calls: AtomicUsize::new(0),
        }
    }

    pub fn prompt_calls(&self) -> usize {
        self.prompt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstallPromptEvent for FakeInstallPrompt {
    async fn prompt(&self) -> PwaResult<InstallOutcome> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome)
    }
}

pub struct FakePush {
    init_calls: AtomicUsize,
    register_calls: AtomicUsize,
    token: Mutex<Option<String>>,
    can_show: Signal<bool>,
}

impl Default for FakePush {
    fn default() -> Self {
        Self {
            init_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            token: Mutex::new(None),
            can_show: Signal::new(false),
        }
    }
}

impl FakePush {
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn set_token(&self, token: &str) {
        *self.token.lock().unwrap() = Some(token.to_string());
    }
}

#[async_trait]
impl PushMessagingHandler for FakePush {
    fn init(&self) {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn register(&self, _registration: Arc<dyn ServiceWorkerRegistration>) -> PwaResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn can_show_notifications(&self) -> Observable<bool> {
        self.can_show.observable()
    }
}

pub struct FakePermission {
    status: Signal<PermissionState>,
    request_calls: AtomicUsize,
}

impl Default for FakePermission {
    fn default() -> Self {
        Self {
            status: Signal::new(PermissionState::Default),
            request_calls: AtomicUsize::new(0),
        }
    }
}

impl FakePermission {
    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionRequester for FakePermission {
    async fn request(&self) -> PwaResult<PermissionState> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        self.status.set(PermissionState::Granted);
        Ok(PermissionState::Granted)
    }

    fn status(&self) -> Observable<PermissionState> {
        self.status.observable()
    }
}

pub struct FakeOnline {
    online: Signal<bool>,
}

impl Default for FakeOnline {
    fn default() -> Self {
        Self {
            online: Signal::new(true),
        }
    }
}

impl FakeOnline {
    pub fn set(&self, online: bool) {
        self.online.set(online);
    }
}

impl OnlineStatus for FakeOnline {
    fn online(&self) -> Observable<bool> {
        self.online.observable()
    }
}

#[derive(Default)]
pub struct FakeSender {
    sent: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl FakeSender {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PushTokenSender for FakeSender {
    async fn send(&self, token: &str) -> PwaResult<TokenSendResponse> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(token_send_failed("connection refused"));
        }
        self.sent.lock().unwrap().push(token.to_string());
        Ok(TokenSendResponse {
            status: 200,
            body: String::new(),
        })
    }
}
