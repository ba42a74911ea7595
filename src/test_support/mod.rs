//! Test utilities shared across crate-level unit tests.

pub mod fakes;
pub mod http;

pub use http::{mock_push_endpoint, start_mock_server};

/// Yields to the current-thread runtime until spawned background work has run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
