//! Short-lived streaming credential fetch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Mints a temporary token the client uses to open its own streaming
/// speech-to-text connection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
}

/// [`TokenProvider`] against an AssemblyAI-style token endpoint:
/// authenticated GET with an `expires_in_seconds` query parameter, `{token}`
/// JSON body back.
pub struct StreamingTokenClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    ttl_seconds: u32,
}

impl StreamingTokenClient {
    pub fn new(url: String, api_key: String, ttl_seconds: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build token HTTP client")?;
        Ok(Self {
            http,
            url,
            api_key,
            ttl_seconds,
        })
    }
}

#[async_trait]
impl TokenProvider for StreamingTokenClient {
    async fn fetch_token(&self) -> Result<String> {
        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[("expires_in_seconds", self.ttl_seconds)])
            .send()
            .await
            .context("Token request failed")?
            .error_for_status()
            .context("Token endpoint returned an error status")?;

        let body: TokenBody = response
            .json()
            .await
            .context("Token response was not the expected JSON shape")?;
        Ok(body.token)
    }
}
