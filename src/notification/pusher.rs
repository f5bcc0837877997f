//! Pusher Channels HTTP transport.
//!
//! Events are published with `POST /apps/{app_id}/events`. Every request is
//! authenticated with query parameters: `auth_key`, `auth_timestamp`,
//! `auth_version`, `body_md5` and an `auth_signature` which is the
//! HMAC-SHA256 (hex) of `POST\n{path}\n{sorted query string}` keyed with the
//! app secret.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use serde::Serialize;
use sha2::Sha256;

use super::fanout::{FanoutPayload, FanoutTransport};

const AUTH_VERSION: &str = "1.0";

/// Credentials and endpoint of a Pusher app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PusherConfig {
    pub app_id: String,
    pub key: String,
    pub secret: String,
    pub cluster: String,
    /// Base URL override (scheme + host), e.g. for a local test server.
    pub host: Option<String>,
}

impl PusherConfig {
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://api-{}.pusher.com", self.cluster),
        }
    }
}

#[derive(Serialize)]
struct TriggerBody<'a> {
    name: &'a str,
    channels: [&'a str; 1],
    /// Pusher expects the event data as a JSON-encoded string.
    data: String,
}

// ── HMAC Signing ─────────────────────────────────────────────

/// Compute HMAC-SHA256 of `payload` using `secret`, as lowercase hex.
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn md5_hex(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

// ── Client ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PusherClient {
    client: reqwest::Client,
    config: PusherConfig,
}

impl PusherClient {
    pub fn new(config: PusherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("notification-worker/0.1")
            .build()
            .context("failed to build Pusher HTTP client")?;
        Ok(Self { client, config })
    }

    fn events_path(&self) -> String {
        format!("/apps/{}/events", self.config.app_id)
    }

    /// Signed query string for a request with this body at `timestamp`.
    fn signed_query(&self, path: &str, body: &[u8], timestamp: i64) -> String {
        // keys must stay in lexical order, they are signed as-is
        let query = format!(
            "auth_key={}&auth_timestamp={}&auth_version={}&body_md5={}",
            self.config.key,
            timestamp,
            AUTH_VERSION,
            md5_hex(body),
        );
        let to_sign = format!("POST\n{}\n{}", path, query);
        let signature = hmac_sha256_hex(&self.config.secret, to_sign.as_bytes());
        format!("{}&auth_signature={}", query, signature)
    }
}

#[async_trait]
impl FanoutTransport for PusherClient {
    async fn publish(&self, channel: &str, event: &str, payload: &FanoutPayload) -> Result<()> {
        let body = serde_json::to_vec(&TriggerBody {
            name: event,
            channels: [channel],
            data: serde_json::to_string(payload).context("pusher payload serialize error")?,
        })
        .context("pusher body serialize error")?;

        let path = self.events_path();
        let query = self.signed_query(&path, &body, chrono::Utc::now().timestamp());
        let url = format!("{}{}?{}", self.config.base_url(), path, query);

        let resp = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .context("failed to reach Pusher")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("pusher returned error: status={}, body={}", status, body);
        }

        tracing::debug!(channel, event, "pusher event triggered");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────
