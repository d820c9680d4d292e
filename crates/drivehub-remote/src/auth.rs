//! Client-credentials token acquisition with cached, transparently
//! refreshed access tokens.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use drivehub_core::config::remote::RemoteConfig;
use drivehub_core::error::AppError;
use drivehub_core::result::AppResult;

use crate::graph::types::TokenResponse;

/// Tokens are refreshed this long before their actual expiry so an
/// in-flight request never crosses the boundary.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

/// Caches an OAuth2 client-credentials token for the Graph API.
#[derive(Debug, Default)]
pub struct TokenCache {
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create an empty token cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a valid access token, exchanging credentials when the
    /// cached one is missing or close to expiry.
    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        config: &RemoteConfig,
    ) -> AppResult<String> {
        if let Some(token) = self.cached.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let token = fetch_token(http, config).await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

async fn fetch_token(http: &reqwest::Client, config: &RemoteConfig) -> AppResult<CachedToken> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        config.login_base_url, config.tenant_id
    );

    debug!(tenant = %config.tenant_id, "Requesting Graph access token");

    let response = http
        .post(&url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("scope", "https://graph.microsoft.com/.default"),
        ])
        .send()
        .await
        .map_err(|e| {
            AppError::remote_transient(format!("Token request failed: {e}"))
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(if status.is_server_error() {
            AppError::remote_transient(format!("Token endpoint returned {status}: {body}"))
        } else {
            AppError::remote_permanent(format!("Token endpoint returned {status}: {body}"))
        });
    }

    let parsed: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::remote_transient(format!("Malformed token response: {e}")))?;

    Ok(CachedToken {
        access_token: parsed.access_token,
        expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_honors_margin() {
        let fresh = CachedToken {
            access_token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(fresh.is_fresh());

        // Inside the refresh margin counts as expired.
        let stale = CachedToken {
            access_token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!stale.is_fresh());
    }
}
