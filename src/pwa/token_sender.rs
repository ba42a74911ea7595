//! Uploads push registration tokens to the application backend.

use reqwest::{Client, Url};
use serde::Serialize;

use crate::pwa::config::PwaConfig;
use crate::pwa::constants::PUSH_NOTIFICATION_PATH;
use crate::pwa::error::{internal_error, invalid_config, token_send_failed, PwaResult};
use crate::pwa::host::PushTokenSender;
use crate::pwa::types::TokenSendResponse;

#[derive(Serialize)]
struct PushTokenBody<'a> {
    token: &'a str,
}

/// Posts `{"token": ...}` to `<base>/character/push-notification`.
///
/// The token is forwarded as given, including an empty string. Responses are
/// passed through untouched whatever their status; only transport failures
/// surface as errors and nothing is retried.
#[derive(Clone, Debug)]
pub struct NotificationTokenSender {
    http: Client,
    endpoint: Url,
}

impl NotificationTokenSender {
    pub fn new(base_url: &str) -> PwaResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|err| invalid_config(format!("Invalid API endpoint '{base_url}': {err}")))?;
        let endpoint = push_endpoint(base)?;
        Ok(Self {
            http: build_client()?,
            endpoint,
        })
    }

    pub fn from_config(config: &PwaConfig) -> PwaResult<Self> {
        let base = config
            .api_base_url
            .as_deref()
            .ok_or_else(|| invalid_config("An API base URL is required to send push tokens"))?;
        Self::new(base)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn send(&self, token: &str) -> PwaResult<TokenSendResponse> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&PushTokenBody { token })
            .send()
            .await
            .map_err(|err| token_send_failed(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| token_send_failed(format!("Failed to read response body: {err}")))?;
        Ok(TokenSendResponse { status, body })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl PushTokenSender for NotificationTokenSender {
    async fn send(&self, token: &str) -> PwaResult<TokenSendResponse> {
        NotificationTokenSender::send(self, token).await
    }
}

fn push_endpoint(mut url: Url) -> PwaResult<Url> {
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| invalid_config("API endpoint cannot be a base URL"))?;
        segments.pop_if_empty();
        segments.extend(PUSH_NOTIFICATION_PATH.split('/'));
    }
    Ok(url)
}

#[cfg(not(target_arch = "wasm32"))]
fn build_client() -> PwaResult<Client> {
    Client::builder()
        .user_agent(format!("pwa-lifecycle/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))
}

#[cfg(target_arch = "wasm32")]
fn build_client() -> PwaResult<Client> {
    Client::builder()
        .build()
        .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::test_support::{mock_push_endpoint, start_mock_server};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn endpoint_is_resolved_under_base_path() {
        let with_slash = NotificationTokenSender::new("https://api.example.com/v1/").unwrap();
        let without_slash = NotificationTokenSender::new("https://api.example.com/v1").unwrap();
        assert_eq!(
            with_slash.endpoint().as_str(),
            "https://api.example.com/v1/character/push-notification"
        );
        assert_eq!(with_slash.endpoint(), without_slash.endpoint());
    }

    #[test]
    fn from_config_requires_base_url() {
        let err = NotificationTokenSender::from_config(&PwaConfig::default()).unwrap_err();
        assert_eq!(err.code_str(), "pwa/invalid-config");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn posts_token_as_json() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/character/push-notification")
                .json_body(json!({"token": "push-token"}));
            then.status(201).body("created");
        });

        let sender = NotificationTokenSender::new(&server.url("/api")).unwrap();
        let response = sender.send("push-token").await.unwrap();
        mock.assert();
        assert_eq!(response.status, 201);
        assert_eq!(response.body, "created");
        assert!(response.is_success());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_token_is_sent_unchanged() {
        let server = start_mock_server();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/character/push-notification")
                .json_body(json!({"token": ""}));
            then.status(200);
        });

        let sender = NotificationTokenSender::new(&server.base_url()).unwrap();
        sender.send("").await.unwrap();
        mock.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn error_status_is_passed_through() {
        let server = start_mock_server();
        let mock = mock_push_endpoint(&server, "", 500, "boom");

        let sender = NotificationTokenSender::new(&server.base_url()).unwrap();
        let response = sender.send("token").await.unwrap();
        mock.assert_hits(1);
        assert_eq!(response.status, 500);
        assert!(!response.is_success());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn transport_failure_propagates() {
        let sender = NotificationTokenSender::new("http://127.0.0.1:1/").unwrap();
        let err = sender.send("token").await.unwrap_err();
        assert_eq!(err.code_str(), "pwa/token-send-failed");
    }
}
