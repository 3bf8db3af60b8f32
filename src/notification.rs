pub mod template;

use crate::aircraft::AircraftState;
use crate::http::{HttpClient, HttpError};
use crate::notification::template::NotificationTemplate;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to post notification: {0}")]
    Post(#[from] HttpError),
}

/// Delivers an alert for an aircraft.
///
/// `Ok(false)` means nothing was sent and nothing external was contacted.
pub trait Notifier: Send {
    fn notify(&self, aircraft: &AircraftState) -> Result<bool, DispatchError>;
}

/// Where and how notifications are posted.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSettings {
    pub api_url: String,
    pub urls: String,
    pub title: String,
}

/// Renders the aircraft through the template and posts it to a webhook aggregator.
pub struct NotificationDispatcher {
    http: std::sync::Arc<dyn HttpClient>,
    template: NotificationTemplate,
    sink: SinkSettings,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(
        http: std::sync::Arc<dyn HttpClient>,
        template: NotificationTemplate,
        sink: SinkSettings,
    ) -> Self {
        NotificationDispatcher {
            http,
            template,
            sink,
        }
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, aircraft: &AircraftState) -> Result<bool, DispatchError> {
        let context = serde_json::json!({ "flight": aircraft.to_json(true) });
        let body = match self.template.render(&context) {
            Ok(body) => body,
            Err(e) => {
                log::error!(
                    "Issue rendering notification for {}: {e}",
                    aircraft.identity()
                );
                return Ok(false);
            }
        };

        let payload = serde_json::json!({
            "urls": self.sink.urls,
            "title": self.sink.title,
            "body": body.trim(),
            "type": "info",
        });
        self.http.post_json(&self.sink.api_url, &payload)?;
        Ok(true)
    }
}
