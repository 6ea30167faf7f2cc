use crate::message::OutgoingMessage;
use crate::traits::{Channel, ChannelResolution, ChatPlatform};
use crate::types::{AnnouncerError, ChannelId, FetchConfig, MessageId, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitPayload {
    retry_after: f64,
}

/// Retries 429 and 5xx responses; any other status is left to the caller.
pub struct DiscordClient {
    client: Client,
    base_url: String,
    token: String,
    max_retries: u32,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>, fetch_config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&fetch_config.user_agent)
            .timeout(Duration::from_secs(fetch_config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: DISCORD_API_BASE.to_string(),
            token: token.into(),
            max_retries: fetch_config.max_retries,
        })
    }

    /// Point the client at another API root (a proxy or a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut backoff = ExponentialBackoff::default();
        let mut attempt = 0;

        loop {
            let response = build()
                .header("Authorization", format!("Bot {}", self.token))
                .send()
                .await?;
            let status = response.status();

            if attempt >= self.max_retries
                || !(status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
            {
                return Ok(response);
            }
            attempt += 1;

            let delay = if status == StatusCode::TOO_MANY_REQUESTS {
                match response.json::<RateLimitPayload>().await {
                    Ok(limit) => Some(Duration::from_secs_f64(limit.retry_after.max(0.0))),
                    Err(_) => backoff.next_backoff(),
                }
            } else {
                backoff.next_backoff()
            };

            let Some(delay) = delay else {
                return Err(AnnouncerError::Platform {
                    status: status.as_u16(),
                    message: "retries exhausted".to_string(),
                });
            };
            warn!("Discord answered {}, retrying in {:?} (attempt {})", status, delay, attempt);
            tokio::time::sleep(delay).await;
        }
    }

    async fn expect_success(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(AnnouncerError::Platform {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn resolve_channel(&self, channel: ChannelId) -> ChannelResolution {
        let url = self.endpoint(&format!("channels/{}", channel));
        let response = match self.execute(|| self.client.get(&url)).await {
            Ok(response) => response,
            Err(e) => return ChannelResolution::Transient(e.to_string()),
        };

        match response.status() {
            StatusCode::NOT_FOUND => ChannelResolution::NotFound,
            StatusCode::FORBIDDEN => ChannelResolution::Forbidden,
            status if status.is_success() => match response.json::<ChannelPayload>().await {
                Ok(payload) => {
                    debug!("Resolved channel {} ({:?})", payload.id, payload.name);
                    ChannelResolution::Resolved(Channel {
                        id: payload.id.parse().unwrap_or(channel),
                        name: payload.name,
                    })
                }
                Err(e) => ChannelResolution::Transient(format!("invalid channel payload: {}", e)),
            },
            status => ChannelResolution::Transient(format!("HTTP {}", status)),
        }
    }

    async fn send_message(&self, channel: ChannelId, message: &OutgoingMessage) -> Result<()> {
        let url = self.endpoint(&format!("channels/{}/messages", channel));
        let response = self.execute(|| self.client.post(&url).json(message)).await?;
        Self::expect_success(response).await
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        let url = self.endpoint(&format!("channels/{}/messages/{}", channel, message));
        let response = self.execute(|| self.client.delete(&url)).await?;
        Self::expect_success(response).await
    }
}
