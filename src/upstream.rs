use bytes::Bytes;
use log::debug;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::app_config::Config;

const SESSION_PATH: &str = "/v3/session/";
const API_KEY_HEADER: &str = "x-api-key";

/// Body sent to the verification API. An absent workflow id is omitted
/// entirely so the upstream sees `{}` rather than an explicit null.
#[derive(Serialize, Debug, PartialEq)]
pub struct SessionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

/// Shared client for the verification API. The secret key lives here and
/// is only ever written into the outbound `x-api-key` header.
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: Client,
    session_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn build(config: &Config) -> Result<UpstreamClient, reqwest::Error> {
        let http_client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .redirect(Policy::limited(5))
            .build()?;

        Ok(UpstreamClient {
            http_client,
            session_url: session_url(&config.upstream_base_url),
            api_key: config.api_key.clone(),
        })
    }

    pub fn session_url(&self) -> &str {
        &self.session_url
    }

    /// POST the payload upstream and buffer the complete response.
    /// Non-2xx statuses are not an error here; the caller relays them.
    pub async fn create_session(
        &self,
        payload: &SessionPayload,
    ) -> Result<(StatusCode, Bytes), reqwest::Error> {
        let response = self
            .http_client
            .post(&self.session_url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        debug!("Upstream session response: {status}");

        let body = response.bytes().await?;
        Ok((status, body))
    }
}

fn session_url(base_url: &str) -> String {
    // Bare hostnames get the https scheme the verification API requires;
    // an explicit scheme is kept as-is.
    if base_url.contains("://") {
        format!("{}{SESSION_PATH}", base_url.trim_end_matches('/'))
    } else {
        format!("https://{}{SESSION_PATH}", base_url.trim_end_matches('/'))
    }
}
