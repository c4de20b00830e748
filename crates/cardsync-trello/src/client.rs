use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use cardsync_core::client::{Position, TrackingClient};
use cardsync_core::config::BridgeConfig;
use cardsync_core::errors::RemoteError;
use cardsync_core::events::CheckItem;

const API_BASE: &str = "https://api.trello.com/1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trello REST client. Key/token auth goes in the query string, per
/// Trello's API convention.
pub struct TrelloClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    api_token: SecretString,
}

impl TrelloClient {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_base_url(config, API_BASE)
    }

    /// Point the client at a different base URL. Test hook.
    pub fn with_base_url(config: &BridgeConfig, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
            api_key: config.api_key.clone(),
            api_token: config.api_token.clone(),
        }
    }

    fn auth_query(&self) -> [(&'static str, String); 2] {
        [
            ("key", self.api_key.expose_secret().to_string()),
            ("token", self.api_token.expose_secret().to_string()),
        ]
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check_ok(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(RemoteError::from_status(status, body))
    }
}

#[async_trait]
impl TrackingClient for TrelloClient {
    async fn create_check_item(
        &self,
        checklist_id: &str,
        name: &str,
        checked: bool,
        position: Position,
    ) -> Result<CheckItem, RemoteError> {
        tracing::debug!(checklist_id, name, checked, "creating check item");
        let resp = self
            .http
            .post(self.url(&format!("/checklists/{checklist_id}/checkItems")))
            .query(&self.auth_query())
            .query(&[
                ("name", name),
                ("checked", if checked { "true" } else { "false" }),
                ("pos", position.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let resp = Self::check_ok(resp).await?;
        resp.json::<CheckItem>()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))
    }

    async fn list_check_items(&self, checklist_id: &str) -> Result<Vec<CheckItem>, RemoteError> {
        let resp = self
            .http
            .get(self.url(&format!("/checklists/{checklist_id}/checkItems")))
            .query(&self.auth_query())
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let resp = Self::check_ok(resp).await?;
        resp.json::<Vec<CheckItem>>()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))
    }

    async fn update_check_item_state(
        &self,
        card_id: &str,
        item_id: &str,
        checked: bool,
    ) -> Result<(), RemoteError> {
        let resp = self
            .http
            .put(self.url(&format!("/cards/{card_id}/checkItem/{item_id}")))
            .query(&self.auth_query())
            .query(&[("state", if checked { "complete" } else { "incomplete" })])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_ok(resp).await?;
        Ok(())
    }

    async fn delete_check_item(
        &self,
        checklist_id: &str,
        item_id: &str,
    ) -> Result<(), RemoteError> {
        tracing::debug!(checklist_id, item_id, "deleting check item");
        let resp = self
            .http
            .delete(self.url(&format!("/checklists/{checklist_id}/checkItems/{item_id}")))
            .query(&self.auth_query())
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Self::check_ok(resp).await?;
        Ok(())
    }
}
