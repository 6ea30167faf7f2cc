use crate::types::{AnnouncerError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// HTTP transport for feed documents.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `url` and return the body, retrying transient failures with
    /// exponential backoff.
    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let url = Url::parse(url)?;
        let start_time = Instant::now();

        debug!("Fetching feed: {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(content) => {
                        info!(
                            "Fetched feed {} ({} bytes in {}ms)",
                            url,
                            content.len(),
                            start_time.elapsed().as_millis()
                        );
                        return Ok(content);
                    }
                    Err(e) => last_error = Some(AnnouncerError::Http(e)),
                },
                Ok(response) => {
                    let status = response.status();
                    last_error = Some(AnnouncerError::General(format!(
                        "HTTP {}: {}",
                        status,
                        status.canonical_reason().unwrap_or("Unknown")
                    )));
                }
                Err(e) => last_error = Some(AnnouncerError::Http(e)),
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        error!("Failed to fetch feed after {} attempts: {}", self.config.max_retries + 1, url);
        Err(last_error.unwrap_or_else(|| AnnouncerError::General("Unknown error".to_string())))
    }
}
