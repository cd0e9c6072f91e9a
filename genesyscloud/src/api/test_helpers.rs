//! Test helpers for the Genesys Cloud API

pub fn create_test_client(url: &str) -> super::Client {
    super::Client::with_config(
        url,
        super::Credentials::AccessToken("test-token".to_string()),
        super::RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}
