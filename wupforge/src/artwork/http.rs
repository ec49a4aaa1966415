//! HTTP client abstraction for testability

use std::time::Duration;

use super::ArtworkError;

/// Default timeout for artwork requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for the HTTP GET operations artwork resolution needs.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Perform an HTTP GET request.
    ///
    /// # Returns
    ///
    /// `Ok(Some(bytes))` for a 200 response, `Ok(None)` for any other
    /// status (the caller moves on to the next candidate), or an error when
    /// the request could not be performed at all.
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, ArtworkError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, ArtworkError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ArtworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArtworkError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, ArtworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ArtworkError::Http(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        response
            .bytes()
            .map(|b| Some(b.to_vec()))
            .map_err(|e| ArtworkError::Http(format!("failed to read response from {}: {}", url, e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock HTTP client serving a fixed url -> body map and recording every
    /// requested url in order.
    pub(crate) struct MockHttpClient {
        pub responses: HashMap<String, Vec<u8>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub(crate) fn new(responses: HashMap<String, Vec<u8>>) -> Self {
            Self {
                responses,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requests.lock().expect("mock lock poisoned").clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Option<Vec<u8>>, ArtworkError> {
            self.requests
                .lock()
                .expect("mock lock poisoned")
                .push(url.to_string());
            Ok(self.responses.get(url).cloned())
        }
    }

    #[test]
    fn test_mock_client_records_requests() {
        let mock = MockHttpClient::new(HashMap::new());
        let result = mock.get("http://example.com/missing.png").unwrap();
        assert!(result.is_none());
        assert_eq!(mock.requested(), vec!["http://example.com/missing.png"]);
    }
}
