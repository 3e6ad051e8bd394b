use std::time::Duration;

use labourlex_core::error::TransportError;
use labourlex_core::{Collaborator, CollaboratorRequest};
use serde_json::Value;
use url::Url;

use crate::util::{client, parse_body};

/// The workflow engine, reached by POSTing JSON to its webhook.
pub struct WebhookCollaborator {
    url: Url,
    http: reqwest::Client,
}

impl WebhookCollaborator {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, String> {
        let url = Url::parse(url).map_err(|e| format!("Invalid webhook URL '{url}': {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("Webhook URL must be http(s), got '{}'", url.scheme()));
        }
        Ok(Self {
            url,
            http: client(timeout),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Collaborator for WebhookCollaborator {
    async fn send(&self, request: &CollaboratorRequest) -> Result<Value, TransportError> {
        tracing::debug!(
            url = %self.url,
            mode = ?request.mode,
            "posting query to workflow"
        );

        let resp = self
            .http
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(parse_body(&body))
    }
}
