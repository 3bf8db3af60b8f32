//! Blocking HTTP seam shared by the receiver bootstrap, the enrichment
//! providers and the notification dispatcher.

use thiserror::Error;

const USER_AGENT: &str = concat!("overhead-flights/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Minimal HTTP operations the application needs.
///
/// Implementations must apply their own timeout to every call; a timeout is
/// reported as [`HttpError::Request`].
pub trait HttpClient: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, HttpError>;

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<(), HttpError>;
}

#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(ReqwestClient { client })
    }

    fn check_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, HttpError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

impl HttpClient for ReqwestClient {
    fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let request_error = |e: reqwest::Error| HttpError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };

        log::trace!("GET {url}");
        let response = self.client.get(url).send().map_err(request_error)?;
        Self::check_status(url, response)?
            .text()
            .map_err(request_error)
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<(), HttpError> {
        log::trace!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| HttpError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Self::check_status(url, response).map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{HttpClient, HttpError};

    /// Answers GETs from canned bodies keyed by URL and records every call.
    #[derive(Default)]
    pub struct ScriptedHttpClient {
        responses: std::sync::Mutex<std::collections::HashMap<String, Result<String, u16>>>,
        pub gets: std::sync::Mutex<Vec<String>>,
        pub posts: std::sync::Mutex<Vec<(String, serde_json::Value)>>,
        pub fail_posts: bool,
    }

    impl ScriptedHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_posts() -> Self {
            ScriptedHttpClient {
                fail_posts: true,
                ..Self::default()
            }
        }

        pub fn respond(self, url: &str, body: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn respond_status(self, url: &str, status: u16) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Err(status));
            self
        }

        pub fn get_count(&self) -> usize {
            self.gets.lock().unwrap().len()
        }

        pub fn posted(&self) -> Vec<(String, serde_json::Value)> {
            self.posts.lock().unwrap().clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn get_text(&self, url: &str) -> Result<String, HttpError> {
            self.gets.lock().unwrap().push(url.to_string());
            match self.responses.lock().unwrap().get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(HttpError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Err(HttpError::Request {
                    url: url.to_string(),
                    reason: String::from("connection refused"),
                }),
            }
        }

        fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<(), HttpError> {
            self.posts
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            if self.fail_posts {
                return Err(HttpError::Request {
                    url: url.to_string(),
                    reason: String::from("connection reset"),
                });
            }
            Ok(())
        }
    }
}
