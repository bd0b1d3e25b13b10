// Host API client: snapshot fetches and container actions over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::error::CommandError;
use crate::models::{ContainerAction, ContainerSnapshot, NetworkMap, SystemStats};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body returned by a successful container action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub container_id: String,
}

#[async_trait]
pub trait HostApi: Send + Sync {
    async fn system_stats(&self) -> Result<SystemStats, CommandError>;
    async fn containers(&self) -> Result<Vec<ContainerSnapshot>, CommandError>;
    async fn networks(&self) -> Result<NetworkMap, CommandError>;
    async fn container_action(
        &self,
        id: &str,
        action: ContainerAction,
    ) -> Result<ActionResponse, CommandError>;
}

pub struct HttpHostApi {
    client: Client,
    base_url: Url,
}

impl HttpHostApi {
    pub fn new(base_url: Url) -> Result<Self, CommandError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CommandError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, CommandError> {
        let url = self.url(segments)?;
        tracing::debug!(url = %url, "GET");
        let response = self.client.get(url).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Non-2xx responses become [`CommandError::Status`] carrying the body text.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, CommandError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CommandError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl HostApi for HttpHostApi {
    async fn system_stats(&self) -> Result<SystemStats, CommandError> {
        self.get(&["api", "system-stats"]).await
    }

    async fn containers(&self) -> Result<Vec<ContainerSnapshot>, CommandError> {
        self.get(&["api", "containers"]).await
    }

    async fn networks(&self) -> Result<NetworkMap, CommandError> {
        self.get(&["api", "networks"]).await
    }

    async fn container_action(
        &self,
        id: &str,
        action: ContainerAction,
    ) -> Result<ActionResponse, CommandError> {
        let url = self.url(&["container", id, action.as_str()])?;
        tracing::info!(container_id = id, action = %action, "container action");
        let response = self.client.post(url).send().await?;
        let response = check(response).await?;
        let text = response.text().await.unwrap_or_default();
        Ok(action_response(&text))
    }
}

/// Any 2xx is a success; the body is informational only.
fn action_response(body: &str) -> ActionResponse {
    if body.trim().is_empty() {
        return ActionResponse::default();
    }
    serde_json::from_str(body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "action response body not understood");
        ActionResponse::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_paths_below_base() {
        let api = HttpHostApi::new(Url::parse("http://host:8000/dash/").unwrap()).unwrap();
        assert_eq!(
            api.url(&["container", "abc", "stop"]).unwrap().as_str(),
            "http://host:8000/dash/container/abc/stop"
        );
        let api = HttpHostApi::new(Url::parse("http://host:8000").unwrap()).unwrap();
        assert_eq!(
            api.url(&["api", "system-stats"]).unwrap().as_str(),
            "http://host:8000/api/system-stats"
        );
    }

    #[test]
    fn action_body_is_best_effort() {
        assert_eq!(action_response(""), ActionResponse::default());
        assert_eq!(action_response("Container stopped"), ActionResponse::default());
        assert_eq!(
            action_response(r#"{"status": "stopped", "container_id": "abc"}"#),
            ActionResponse {
                status: "stopped".into(),
                container_id: "abc".into(),
            }
        );
    }
}
