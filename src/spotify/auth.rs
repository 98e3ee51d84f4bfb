//! Client-credentials token management for the Spotify Web API.
//!
//! This system only reads public catalog metadata, so the app-level
//! client-credentials grant is sufficient; no user authorization flow.

use std::time::{Duration, Instant};

use crate::spotify::types::SpotifyTokenResponse;

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Refresh this long before the reported expiry to avoid using a token that
/// dies mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to send token request: {0}")]
    FailedToSendRequest(reqwest::Error),

    #[error("token endpoint rejected credentials: {status}")]
    Rejected { status: reqwest::StatusCode },

    #[error("failed to parse token response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct TokenManager {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(client_id: String, client_secret: String, http: reqwest::Client) -> Self {
        Self {
            client_id,
            client_secret,
            http,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Return a valid access token, fetching a fresh one when the cached
    /// token is missing or near expiry.
    pub async fn access_token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Requesting new Spotify access token");
        let response = self
            .http
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(TokenError::FailedToSendRequest)?;

        if !response.status().is_success() {
            return Err(TokenError::Rejected {
                status: response.status(),
            });
        }

        let token: SpotifyTokenResponse = response
            .json()
            .await
            .map_err(TokenError::FailedToParseResponse)?;

        let expires_at = Instant::now()
            + Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }
}
