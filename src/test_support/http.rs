use httpmock::prelude::*;
use httpmock::Mock;

use crate::pwa::constants::PUSH_NOTIFICATION_PATH;

/// Start a fresh `httpmock::MockServer` instance for use in unit tests.
pub fn start_mock_server() -> MockServer {
    MockServer::start()
}

/// Mocks the push token endpoint below `base_path`, answering every JSON POST with `status`.
pub fn mock_push_endpoint<'a>(
    server: &'a MockServer,
    base_path: &str,
    status: u16,
    body: &str,
) -> Mock<'a> {
    let path = format!(
        "{}/{}",
        base_path.trim_end_matches('/'),
        PUSH_NOTIFICATION_PATH
    );
    let body = body.to_string();
    server.mock(move |when, then| {
        when.method(POST)
            .path(path)
            .header("content-type", "application/json");
        then.status(status).body(body);
    })
}
