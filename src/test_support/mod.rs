//! Test utilities shared across crate-level unit tests.

pub mod firebase;
pub mod http;

pub use firebase::{test_firebase_app, test_options, TEST_API_KEY, TEST_PROJECT_ID};
pub use http::start_mock_server;
