//! Strava API client for connecting accounts and uploading workouts.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::config::StravaConfig;
use crate::error::{AppError, Result};
use crate::models::integration::STRAVA_PROVIDER;

use super::sync::{ActivityExporter, ExportActivity, TokenGrant};

const AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
const TOKEN_URL: &str = "https://www.strava.com/oauth/token";
const API_BASE_URL: &str = "https://www.strava.com/api/v3";
const SCOPE: &str = "activity:write,read";
const SPORT_TYPE: &str = "WeightTraining";

#[derive(Clone)]
pub struct StravaExporter {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    config: StravaConfig,
}

impl StravaExporter {
    pub fn new(config: StravaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: API_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            config,
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Strava token request failed: {}", e)))?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_grant())
    }
}

#[async_trait]
impl ActivityExporter for StravaExporter {
    fn provider(&self) -> &'static str {
        STRAVA_PROVIDER
    }

    fn authorize_url(&self, state: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("approval_prompt", "auto"),
                ("scope", SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid authorize URL: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        self.token_request(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        self.token_request(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn upload(&self, access_token: &str, activity: &ExportActivity) -> Result<String> {
        let url = format!("{}/activities", self.base_url);
        let start_date = activity.start_date.to_rfc3339();
        let elapsed = activity.elapsed_seconds.to_string();

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .form(&[
                ("name", activity.name.as_str()),
                ("sport_type", SPORT_TYPE),
                ("start_date_local", start_date.as_str()),
                ("elapsed_time", elapsed.as_str()),
                ("description", activity.description.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Strava upload failed: {}", e)))?;

        let created: CreatedActivity = check_response_json(response).await?;
        tracing::info!(activity_id = created.id, "Uploaded activity to Strava");
        Ok(created.id.to_string())
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
            return Err(AppError::Upstream("Strava rate limit exceeded".to_string()));
        }
        if status.as_u16() == 401 {
            return Err(AppError::Upstream(
                "Strava rejected the access token".to_string(),
            ));
        }
        return Err(AppError::Upstream(format!("Strava HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Strava JSON parse error: {}", e)))
}

/// Token response from Strava, for both code exchange and refresh.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    athlete: Option<Athlete>,
}

#[derive(Debug, Deserialize)]
struct Athlete {
    id: u64,
}

impl TokenResponse {
    fn into_grant(self) -> TokenGrant {
        let expires_at: DateTime<Utc> = Utc
            .timestamp_opt(self.expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now);
        TokenGrant {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            athlete_id: self.athlete.map(|a| a.id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedActivity {
    id: u64,
}
