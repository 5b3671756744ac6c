//! Google OAuth for the YouTube scope.
//!
//! Uses the device authorization grant: the user opens a URL on any device,
//! types the short code, and we poll the token endpoint until they approve.
//! The token is kept in the local database and refreshed when it expires.

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use sqlx::{Pool, Sqlite};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::error::YouTubeError;
use super::models::{DeviceCodeResponse, OAuthErrorResponse, TokenResponse};

pub const DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Treat tokens as expired this long before Google does.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Extra wait added on every `slow_down` answer, per RFC 8628.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Build from a token endpoint answer. Refresh responses usually omit the
    /// refresh token, so the previous one is carried over.
    pub fn from_response(
        resp: TokenResponse,
        now: DateTime<Utc>,
        previous_refresh: Option<String>,
    ) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh),
            scope: resp.scope,
            expires_at: now + TimeDelta::seconds(resp.expires_in),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }
}

/// What a pending device login shows the user.
#[derive(Debug, Clone)]
pub struct DeviceLogin {
    pub user_code: String,
    pub verification_url: String,
    device_code: String,
    interval: Duration,
    deadline: Instant,
}

#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Pending,
    SlowDown,
    Failed(String),
}

fn classify_poll_error(err: &OAuthErrorResponse) -> PollOutcome {
    match err.error.as_str() {
        "authorization_pending" => PollOutcome::Pending,
        "slow_down" => PollOutcome::SlowDown,
        "access_denied" => PollOutcome::Failed("access was denied".to_string()),
        "expired_token" => PollOutcome::Failed("the login code expired".to_string()),
        other => PollOutcome::Failed(
            err.error_description
                .clone()
                .unwrap_or_else(|| other.to_string()),
        ),
    }
}

/// Persists the single OAuth token row.
#[derive(Debug, Clone)]
pub struct TokenStore {
    pool: Pool<Sqlite>,
}

impl TokenStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<Option<StoredToken>, YouTubeError> {
        let row: Option<(String, Option<String>, Option<String>, i64)> = sqlx::query_as(
            "SELECT access_token, refresh_token, scope, expires_at FROM oauth_token WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(access_token, refresh_token, scope, expires_at)| StoredToken {
            access_token,
            refresh_token,
            scope,
            expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or_else(Utc::now),
        }))
    }

    pub async fn save(&self, token: &StoredToken) -> Result<(), YouTubeError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_token (id, access_token, refresh_token, scope, expires_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                scope = excluded.scope,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.scope)
        .bind(token.expires_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), YouTubeError> {
        sqlx::query("DELETE FROM oauth_token")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct YouTubeAuth {
    client: Client,
    credentials: Option<(String, String)>,
    store: TokenStore,
    token: Mutex<Option<StoredToken>>,
}

impl YouTubeAuth {
    /// Restores a previously saved token, if any. A stored token that can no
    /// longer be read is dropped and the user simply logs in again.
    pub async fn new(
        client: Client,
        credentials: Option<(String, String)>,
        pool: Pool<Sqlite>,
    ) -> Self {
        let store = TokenStore::new(pool);
        let token = match store.load().await {
            Ok(Some(token)) => {
                log::info!("Restored YouTube session (expires {})", token.expires_at);
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to restore saved token, clearing it: {}", e);
                if let Err(e) = store.clear().await {
                    log::error!("Failed to clear unreadable token: {}", e);
                }
                None
            }
        };

        Self {
            client,
            credentials,
            store,
            token: Mutex::new(token),
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.token.lock().await.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str), YouTubeError> {
        self.credentials
            .as_ref()
            .map(|(id, secret)| (id.as_str(), secret.as_str()))
            .ok_or_else(|| {
                YouTubeError::NotConfigured(
                    "add GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET to your environment".to_string(),
                )
            })
    }

    pub async fn start_login(&self) -> Result<DeviceLogin, YouTubeError> {
        let (client_id, _) = self.credentials()?;

        let response = self
            .client
            .post(DEVICE_CODE_URL)
            .form(&[("client_id", client_id), ("scope", YOUTUBE_SCOPE)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(oauth_failure(status.as_u16(), &text));
        }

        let device: DeviceCodeResponse = serde_json::from_str(&text)?;
        log::debug!("Device login started, polling every {}s", device.interval);

        Ok(DeviceLogin {
            user_code: device.user_code,
            verification_url: device.verification_url,
            device_code: device.device_code,
            interval: Duration::from_secs(device.interval.max(1)),
            deadline: Instant::now() + Duration::from_secs(device.expires_in),
        })
    }

    /// Poll until the user approves (or denies) the device login.
    pub async fn complete_login(&self, login: &DeviceLogin) -> Result<(), YouTubeError> {
        let (client_id, client_secret) = self.credentials()?;
        let mut interval = login.interval;

        loop {
            if Instant::now() >= login.deadline {
                return Err(YouTubeError::AuthDenied(
                    "the login code expired".to_string(),
                ));
            }
            tokio::time::sleep(interval).await;

            let response = self
                .client
                .post(TOKEN_URL)
                .form(&[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("device_code", login.device_code.as_str()),
                    ("grant_type", DEVICE_GRANT_TYPE),
                ])
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                let resp: TokenResponse = serde_json::from_str(&text)?;
                let token = StoredToken::from_response(resp, Utc::now(), None);
                self.store.save(&token).await?;
                *self.token.lock().await = Some(token);
                log::info!("YouTube login complete");
                return Ok(());
            }

            let err: OAuthErrorResponse = serde_json::from_str(&text)
                .map_err(|_| oauth_failure(status.as_u16(), &text))?;

            match classify_poll_error(&err) {
                PollOutcome::Pending => continue,
                PollOutcome::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    log::debug!("Token endpoint asked to slow down, now {:?}", interval);
                }
                PollOutcome::Failed(reason) => return Err(YouTubeError::AuthDenied(reason)),
            }
        }
    }

    /// A valid bearer token, refreshing it first when it has expired.
    /// `None` when logged out.
    pub async fn access_token(&self) -> Result<Option<String>, YouTubeError> {
        let mut guard = self.token.lock().await;
        let Some(token) = guard.as_ref() else {
            return Ok(None);
        };

        if !token.is_expired(Utc::now()) {
            return Ok(Some(token.access_token.clone()));
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            log::warn!("Access token expired and no refresh token is stored");
            *guard = None;
            self.store.clear().await?;
            return Err(YouTubeError::NotAuthenticated);
        };

        let refreshed = self.refresh(&refresh_token).await?;
        self.store.save(&refreshed).await?;
        let access = refreshed.access_token.clone();
        *guard = Some(refreshed);
        log::debug!("Refreshed YouTube access token");
        Ok(Some(access))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, YouTubeError> {
        let (client_id, client_secret) = self.credentials()?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(oauth_failure(status.as_u16(), &text));
        }

        let resp: TokenResponse = serde_json::from_str(&text)?;
        Ok(StoredToken::from_response(
            resp,
            Utc::now(),
            Some(refresh_token.to_string()),
        ))
    }

    pub async fn logout(&self) -> Result<(), YouTubeError> {
        *self.token.lock().await = None;
        self.store.clear().await?;
        log::info!("Logged out of YouTube");
        Ok(())
    }
}

fn oauth_failure(status: u16, body: &str) -> YouTubeError {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(err) => YouTubeError::Api {
            status,
            message: err.error_description.unwrap_or(err.error),
        },
        Err(_) => YouTubeError::Api {
            status,
            message: body.to_string(),
        },
    }
}
