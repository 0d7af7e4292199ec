//! Exporting finished workouts to a third-party fitness platform.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::integration::STRAVA_PROVIDER;
use crate::models::{HistoryEntry, HistorySummary, Integration, IntegrationStatus};
use crate::repositories::{HistoryRepository, IntegrationRepository};

/// Tokens are refreshed when they expire within this margin.
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// OAuth tokens issued by a platform.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub athlete_id: Option<String>,
}

/// A finished workout in the shape platforms accept.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportActivity {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub description: String,
}

impl ExportActivity {
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        let mut description = String::new();
        if let Some(notes) = entry.summary.notes.as_deref().filter(|n| !n.is_empty()) {
            let _ = writeln!(description, "{}\n", notes);
        }
        for exercise in &entry.exercises {
            let _ = writeln!(description, "{}", exercise.exercise_name);
            for set in &exercise.sets {
                let _ = write!(description, "  {} x {}", format_weight(set.weight), set.reps);
                if let Some(rpe) = set.rpe {
                    let _ = write!(description, " @ RPE {}", rpe);
                }
                if set.is_warmup {
                    description.push_str(" (warm-up)");
                } else if set.is_dropset {
                    description.push_str(" (drop set)");
                }
                description.push('\n');
            }
        }
        let _ = write!(
            description,
            "Total volume: {}",
            format_weight(entry.summary.total_volume)
        );

        Self {
            name: entry.summary.name.clone(),
            start_date: entry.summary.started_at,
            elapsed_seconds: entry.summary.duration_seconds,
            description,
        }
    }
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        format!("{}", weight)
    }
}

#[async_trait]
pub trait ActivityExporter: Send + Sync {
    fn provider(&self) -> &'static str;

    fn authorize_url(&self, state: &str) -> Result<String>;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;

    /// Uploads an activity and returns the id the platform assigned to it.
    async fn upload(&self, access_token: &str, activity: &ExportActivity) -> Result<String>;
}

/// Connects accounts and exports history entries through an [`ActivityExporter`].
#[derive(Clone)]
pub struct SyncService {
    exporter: Option<Arc<dyn ActivityExporter>>,
    integrations: IntegrationRepository,
    history: HistoryRepository,
    // OAuth state issued per user, checked on callback
    pending_states: Arc<DashMap<String, String>>,
}

impl SyncService {
    pub fn new(
        exporter: Option<Arc<dyn ActivityExporter>>,
        integrations: IntegrationRepository,
        history: HistoryRepository,
    ) -> Self {
        Self {
            exporter,
            integrations,
            history,
            pending_states: Arc::new(DashMap::new()),
        }
    }

    fn exporter(&self) -> Result<&Arc<dyn ActivityExporter>> {
        self.exporter
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Sync is not configured".to_string()))
    }

    fn provider(&self) -> &'static str {
        self.exporter
            .as_ref()
            .map(|e| e.provider())
            .unwrap_or(STRAVA_PROVIDER)
    }

    pub async fn status(&self, user_id: &str) -> Result<IntegrationStatus> {
        let provider = self.provider();
        let integration = self.integrations.find(user_id, provider).await?;
        Ok(IntegrationStatus {
            provider,
            configured: self.exporter.is_some(),
            connected: integration.is_some(),
            athlete_id: integration.as_ref().and_then(|i| i.athlete_id.clone()),
            connected_at: integration.map(|i| i.connected_at),
        })
    }

    pub fn authorize_url(&self, user_id: &str) -> Result<String> {
        let exporter = self.exporter()?;
        let state = Uuid::new_v4().simple().to_string();
        let url = exporter.authorize_url(&state)?;
        self.pending_states.insert(user_id.to_string(), state);
        Ok(url)
    }

    /// Completes the OAuth flow started by [`SyncService::authorize_url`].
    pub async fn connect(&self, user_id: &str, code: &str, state: &str) -> Result<IntegrationStatus> {
        let exporter = self.exporter()?;
        match self.pending_states.remove(user_id) {
            Some((_, expected)) if expected == state => {}
            _ => return Err(AppError::BadRequest("Invalid OAuth state".to_string())),
        }

        let grant = exporter.exchange_code(code).await?;
        self.integrations
            .upsert(&Integration {
                user_id: user_id.to_string(),
                provider: exporter.provider().to_string(),
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
                expires_at: grant.expires_at,
                athlete_id: grant.athlete_id,
                connected_at: Utc::now(),
            })
            .await?;
        tracing::info!(user_id = %user_id, provider = exporter.provider(), "Connected integration");

        self.status(user_id).await
    }

    pub async fn disconnect(&self, user_id: &str) -> Result<bool> {
        let removed = self.integrations.delete(user_id, self.provider()).await?;
        if removed {
            tracing::info!(user_id = %user_id, "Disconnected integration");
        }
        Ok(removed)
    }

    /// Uploads a history entry once. Returns the updated entry summary.
    pub async fn export(&self, user_id: &str, history_id: &str) -> Result<HistorySummary> {
        let entry = self
            .history
            .find_entry(history_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Workout history"))?;
        if entry.summary.external_id.is_some() {
            return Err(AppError::Conflict("Workout was already exported".to_string()));
        }

        let exporter = self.exporter()?;
        let access_token = self.access_token(exporter.as_ref(), user_id).await?;
        let external_id = exporter
            .upload(&access_token, &ExportActivity::from_entry(&entry))
            .await?;
        self.history.mark_exported(history_id, &external_id).await?;
        tracing::info!(history_id = %history_id, external_id = %external_id, "Exported workout");

        self.history
            .find_entry(history_id, user_id)
            .await?
            .map(|e| e.summary)
            .ok_or_else(|| AppError::not_found("Workout history"))
    }

    async fn access_token(&self, exporter: &dyn ActivityExporter, user_id: &str) -> Result<String> {
        let integration = self
            .integrations
            .find(user_id, exporter.provider())
            .await?
            .ok_or_else(|| AppError::BadRequest("Account is not connected".to_string()))?;

        if !integration.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECONDS)) {
            return Ok(integration.access_token);
        }

        tracing::debug!(user_id = %user_id, "Refreshing access token");
        let grant = exporter.refresh(&integration.refresh_token).await?;
        let access_token = grant.access_token.clone();
        self.integrations
            .upsert(&Integration {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
                expires_at: grant.expires_at,
                athlete_id: grant.athlete_id,
                ..integration
            })
            .await?;
        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryExercise, HistorySet};
    use chrono::TimeZone;

    fn entry() -> HistoryEntry {
        let started_at = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        let set = |weight: f64, reps: i32, is_warmup: bool, rpe: Option<f64>| HistorySet {
            id: Uuid::new_v4().to_string(),
            position: 0,
            reps,
            weight,
            is_warmup,
            is_dropset: false,
            rpe,
            partial_reps: None,
            bar_type: None,
        };
        HistoryEntry {
            summary: HistorySummary {
                id: "h1".to_string(),
                user_id: "user1".to_string(),
                workout_id: None,
                name: "Push".to_string(),
                notes: Some("Good session".to_string()),
                started_at,
                finished_at: started_at + Duration::minutes(50),
                duration_seconds: 3000,
                total_volume: 512.5,
                external_id: None,
                exported_at: None,
            },
            exercises: vec![HistoryExercise {
                id: "he1".to_string(),
                exercise_id: Some("builtin-bench-press".to_string()),
                exercise_name: "Bench Press".to_string(),
                position: 0,
                superset_group: None,
                sets: vec![
                    set(60.0, 10, true, None),
                    set(102.5, 5, false, Some(8.5)),
                ],
            }],
        }
    }

    #[test]
    fn test_export_activity_from_entry() {
        let activity = ExportActivity::from_entry(&entry());

        assert_eq!(activity.name, "Push");
        assert_eq!(activity.elapsed_seconds, 3000);
        assert_eq!(
            activity.description,
            "Good session\n\nBench Press\n  60 x 10 (warm-up)\n  102.5 x 5 @ RPE 8.5\nTotal volume: 512.5"
        );
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(100.0), "100");
        assert_eq!(format_weight(22.5), "22.5");
    }
}
