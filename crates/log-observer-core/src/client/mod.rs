//! HTTP client for the observer backend
//!
//! The viewer talks to the backend only through the [`Backend`] trait so the
//! controllers can be driven by an in-process fake in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::models::{ConfigureRequest, ConfigureResponse, ConnectionStatus, QueryRequest};

/// Path of the connection status endpoint
pub const STATUS_PATH: &str = "/api/connection/status";
/// Path of the connection configure endpoint
pub const CONFIGURE_PATH: &str = "/api/connection/configure";

/// The remote service the viewer reads from
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST` a record query to `endpoint` and return the raw JSON body
    async fn post_records(&self, endpoint: &str, request: &QueryRequest) -> Result<Value>;

    /// `GET /api/connection/status`
    async fn connection_status(&self) -> Result<ConnectionStatus>;

    /// `POST /api/connection/configure`
    async fn configure_connection(&self, dsn: &str) -> Result<ConfigureResponse>;
}

/// reqwest implementation of [`Backend`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("log-observer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-2xx responses to [`Error::Status`], then decode the body
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown Status");
            return Err(Error::status(status.as_u16(), reason));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn post_records(&self, endpoint: &str, request: &QueryRequest) -> Result<Value> {
        debug!(endpoint, page = request.page, "Posting record query");
        let response = self
            .client
            .post(self.url(endpoint))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn connection_status(&self) -> Result<ConnectionStatus> {
        let response = self.client.get(self.url(STATUS_PATH)).send().await?;
        Self::decode(response).await
    }

    async fn configure_connection(&self, dsn: &str) -> Result<ConfigureResponse> {
        info!(dsn = %crate::models::mask_dsn(dsn), "Configuring backend connection");
        let response = self
            .client
            .post(self.url(CONFIGURE_PATH))
            .json(&ConfigureRequest {
                dsn: dsn.to_string(),
            })
            .send()
            .await?;

        // A rejected configure still carries a useful body
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        match serde_json::from_value::<ConfigureResponse>(body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(Error::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Connection status shared by every controller and the status bar
#[derive(Debug, Clone, Default)]
pub struct ConnectionHandle(Arc<RwLock<ConnectionStatus>>);

impl ConnectionHandle {
    pub fn new(status: ConnectionStatus) -> Self {
        Self(Arc::new(RwLock::new(status)))
    }

    pub fn is_connected(&self) -> bool {
        self.0.read().connected
    }

    pub fn get(&self) -> ConnectionStatus {
        self.0.read().clone()
    }

    pub fn set(&self, status: ConnectionStatus) {
        debug!(connected = status.connected, "Connection status updated");
        *self.0.write() = status;
    }

    /// Fetch the status from the backend; a failed check marks the connection down
    pub async fn refresh(&self, backend: &dyn Backend) -> ConnectionStatus {
        let status = match backend.connection_status().await {
            Ok(status) => status,
            Err(e) => ConnectionStatus::failed(e.to_string()),
        };
        self.set(status.clone());
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:5002/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5002");
        assert_eq!(client.url("/api/logs"), "http://localhost:5002/api/logs");
    }

    #[test]
    fn test_connection_handle_is_shared() {
        let handle = ConnectionHandle::default();
        let other = handle.clone();
        assert!(!other.is_connected());

        handle.set(ConnectionStatus {
            connected: true,
            ..Default::default()
        });
        assert!(other.is_connected());
    }
}
