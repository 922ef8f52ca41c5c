//! `test-utils` is used for testing in both `hookrelay-lib` and `hookrelay`.
//! This crate does not depend on `hookrelay-lib` or `hookrelay`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock webhook server, which responds to every `POST` with a
/// predefined status
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("POST")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Set up a mock webhook server which rejects the first `POST` with a
/// `429 Too Many Requests` carrying the given `Retry-After` seconds, and
/// accepts every following `POST` with `204 No Content`.
#[macro_export]
macro_rules! rate_limited_mock_server {
    ($retry_after:expr) => {{
        let mock_server = wiremock::MockServer::start().await;

        let rejected = wiremock::ResponseTemplate::new(http::StatusCode::TOO_MANY_REQUESTS)
            .insert_header("Retry-After", $retry_after)
            .insert_header("X-RateLimit-Remaining", "0");
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(rejected)
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        let accepted = wiremock::ResponseTemplate::new(http::StatusCode::NO_CONTENT)
            .insert_header("X-RateLimit-Remaining", "4");
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(accepted)
            .mount(&mock_server)
            .await;

        mock_server
    }};
}

/// Get the root path of the project.
#[macro_export]
macro_rules! root_path {
    () => {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .to_path_buf()
    };
}

/// Get the path to the `fixtures` directory.
#[macro_export]
macro_rules! fixtures_path {
    () => {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .join("fixtures")
    };
}
