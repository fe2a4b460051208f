use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::auth::ApiAuth;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(StatusCode),
}

/// Topic-metadata lookup against the HTTP data service. Backs the
/// `topic-list` utility and the bridge's pre-flight topic check.
pub struct TopicFinder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TopicFinder {
    pub fn new(auth: &ApiAuth) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: auth.endpoint.clone(),
            api_key: auth.api_key.clone(),
        }
    }

    /// Fetch the metadata document for a topic. `Ok(None)` means the service
    /// does not know the topic.
    pub async fn find(&self, topic: &str) -> Result<Option<Value>, LookupError> {
        let url = topic_url(&self.endpoint, topic);
        debug!("lookup: {url}");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("ApiKey {}", self.api_key))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(LookupError::Status(status)),
        }
    }
}

fn topic_url(endpoint: &str, topic: &str) -> String {
    format!(
        "https://{}/v1/topics/{}",
        endpoint.trim_end_matches('/'),
        topic.trim_start_matches('/')
    )
}

// --------------------------------------------------------------------------
