#![cfg(all(target_arch = "wasm32", feature = "wasm-web"))]

use pwa_lifecycle::pwa::host::{PageHost, ServiceWorkerContainer};
use pwa_lifecycle::pwa::{
    PwaConfig, PwaLifecycle, ServiceWorkerMessage, WebPageHost, WebServiceWorkerContainer,
};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const VAPID_KEY: &str =
    "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";

fn lifecycle() -> PwaLifecycle {
    let config = PwaConfig::default()
        .with_api_base_url("https://api.example.com/")
        .expect("valid base url");
    PwaLifecycle::for_browser(config, VAPID_KEY).expect("browser lifecycle")
}

#[wasm_bindgen_test]
fn page_host_runs_in_a_browser_window() {
    let page = WebPageHost::new();
    assert!(page.is_browser());
    // Test runners open the page in a regular tab.
    assert!(!page.is_standalone());
}

#[wasm_bindgen_test]
fn service_worker_capability_matches_navigator() {
    let container = WebServiceWorkerContainer::new();
    assert_eq!(container.is_supported(), pwa_lifecycle::pwa::is_supported());
}

#[wasm_bindgen_test]
fn skip_waiting_message_matches_worker_protocol() {
    let payload = serde_wasm_bindgen::to_value(&ServiceWorkerMessage::SkipWaiting).unwrap();
    let kind = js_sys::Reflect::get(&payload, &"type".into()).unwrap();
    assert_eq!(kind.as_string().as_deref(), Some("SKIP_WAITING"));
}

#[wasm_bindgen_test(async)]
async fn check_for_update_before_registration_is_a_no_op() {
    let pwa = lifecycle();
    pwa.check_for_update().await;
    assert!(!pwa.service_worker_ready().value());
}

#[wasm_bindgen_test(async)]
async fn prompt_install_without_event_resolves_none() {
    let pwa = lifecycle();
    pwa.initialize();
    assert!(!pwa.application_installable().value());
    assert_eq!(pwa.prompt_install().await.unwrap(), None);
    pwa.shutdown();
}
