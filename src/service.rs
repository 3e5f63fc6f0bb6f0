use crate::access::{AccessPolicy, Credentials};
use crate::calendar::ymd_to_us;
use crate::clickup::{
    dedupe_by_sf_id, display_text, normalize_task, ymd_to_clickup_ms, ClickUpClient, NormalizedTask, TaskSource,
    NEXT_STEPS_KEY,
};
use crate::config::AppConfig;
use crate::dashboard::{build_dashboard, DashboardInput, DashboardOptions};
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ClientDashboardView, ClientStatusRow, EditSource, Portfolio, SignedLink, UpdateDateRequest, WebhookOutcome,
};
use crate::portfolio::build_portfolio;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

const OVERRIDE_PREFIX: &str = "override:";
const OVERRIDE_SUFFIX: &str = ".ecd";

pub struct DashboardService {
    config: AppConfig,
    db: Arc<Database>,
    clickup: Arc<dyn TaskSource>,
    access: AccessPolicy,
    options: DashboardOptions,
}

impl DashboardService {
    pub fn new(config: AppConfig, db: Arc<Database>, clickup: Arc<dyn TaskSource>) -> Self {
        let access = AccessPolicy::from_config(&config);
        let options = DashboardOptions {
            can_edit: false,
            writable_keys: config.writable_keys(),
            fallback: config.fallback(),
        };
        Self {
            config,
            db,
            clickup,
            access,
            options,
        }
    }

    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let db = Arc::new(Database::new(&config.database_path)?);
        tracing::info!(path = %db.path().display(), "opened client status database");
        let clickup = Arc::new(ClickUpClient::new(&config.clickup_api_token)?);
        Ok(Self::new(config, db, clickup))
    }

    pub fn access(&self) -> &AccessPolicy {
        &self.access
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Normalizes a task and attaches its latest comment as the next steps.
    async fn normalize_with_comment(&self, task: &Value) -> AppResult<Option<NormalizedTask>> {
        let Some(mut normalized) = normalize_task(task, &self.config.sf_id_field_id, &self.config.field_map) else {
            return Ok(None);
        };
        let comment = self.clickup.fetch_latest_comment(&normalized.row.task_id).await?;
        normalized.row.metrics.insert(NEXT_STEPS_KEY, comment);
        Ok(Some(normalized))
    }

    async fn refresh_task(&self, task_id: &str) -> AppResult<Option<ClientStatusRow>> {
        let task = self.clickup.fetch_task(task_id).await?;
        let Some(normalized) = self.normalize_with_comment(&task).await? else {
            return Ok(None);
        };
        self.db.upsert_client_status(&normalized.row)?;
        Ok(Some(normalized.row))
    }

    /// Re-pulls one stored client from ClickUp. `false` when the client is
    /// unknown or its task no longer carries a Salesforce ID.
    pub async fn refresh_client(&self, sf_id: &str) -> AppResult<bool> {
        let Some(stored) = self.db.get_client_status(sf_id)? else {
            return Ok(false);
        };
        if stored.task_id.trim().is_empty() {
            return Ok(false);
        }
        Ok(self.refresh_task(&stored.task_id).await?.is_some())
    }

    pub async fn refresh_all(&self) -> AppResult<usize> {
        let tasks = self.clickup.fetch_tasks_for_list(&self.config.clickup_list_id).await?;
        let mut normalized = Vec::with_capacity(tasks.len());
        for task in &tasks {
            if let Some(row) = self.normalize_with_comment(task).await? {
                normalized.push(row);
            }
        }
        let rows = dedupe_by_sf_id(normalized)
            .into_iter()
            .map(|task| task.row)
            .collect::<Vec<_>>();
        let written = self.db.upsert_client_statuses(&rows)?;
        tracing::info!(tasks = tasks.len(), clients = written, "synced clickup list");
        Ok(written)
    }

    pub async fn manual_sync(&self, admin_key: &str) -> AppResult<usize> {
        self.access.require_admin(admin_key)?;
        self.refresh_all().await
    }

    pub async fn handle_webhook(&self, token: &str, payload: &Value) -> AppResult<WebhookOutcome> {
        self.access.require_webhook_token(token)?;
        let Some(task_id) = webhook_task_id(payload) else {
            return Ok(WebhookOutcome::Ignored {
                reason: "missing_task_id".to_string(),
            });
        };

        match self.refresh_task(&task_id).await? {
            Some(row) => {
                tracing::info!(task_id = %task_id, sf_id = %row.sf_id, "webhook refreshed client");
                Ok(WebhookOutcome::Updated { sf_id: row.sf_id })
            }
            None => Ok(WebhookOutcome::Ignored {
                reason: "missing_sf_id".to_string(),
            }),
        }
    }

    pub fn signed_link(&self, admin_key: &str, sf_id: &str) -> AppResult<SignedLink> {
        self.access.require_admin(admin_key)?;
        self.access.signed_link(sf_id)
    }

    pub async fn client_dashboard(
        &self,
        sf_id: &str,
        credentials: &Credentials,
        today: NaiveDate,
    ) -> AppResult<ClientDashboardView> {
        self.access.require_signature(sf_id, &credentials.signature)?;

        if let Err(error) = self.refresh_client(sf_id).await {
            tracing::warn!(sf_id = %sf_id, error = %error, "clickup refresh failed; serving cached status");
        }

        let status = self
            .db
            .get_client_status(sf_id)?
            .ok_or_else(|| AppError::NotFound(format!("no client status for {sf_id}")))?;
        let overrides = self.db.get_ecd_overrides(sf_id)?;
        let can_edit = self.access.has_edit_access(credentials);
        let options = DashboardOptions {
            can_edit,
            ..self.options.clone()
        };
        let dashboard = build_dashboard(&DashboardInput::from_row(&status, &overrides, today), &options);

        Ok(ClientDashboardView {
            can_admin_nav: self.access.has_admin_access(&credentials.admin_key),
            can_edit,
            dashboard,
            status,
        })
    }

    /// Applies an admin date edit. Field-mapped metric keys are written to
    /// ClickUp; `override:<slug>.ecd` keys are stored locally. Returns the edit
    /// log id.
    pub async fn update_date(
        &self,
        sf_id: &str,
        credentials: &Credentials,
        request: &UpdateDateRequest,
    ) -> AppResult<i64> {
        self.access.require_signature(sf_id, &credentials.signature)?;
        if !self.access.has_edit_access(credentials) {
            return Err(AppError::Forbidden("admin edit access required".to_string()));
        }

        let metric_key = request.metric_key.trim().to_lowercase();
        let override_key = request.override_key.trim();
        if metric_key.is_empty() && override_key.is_empty() {
            return Err(AppError::Invalid("metric_key or override_key is required".to_string()));
        }

        let value_ymd = request.value.trim();
        let new_value = if value_ymd.is_empty() {
            String::new()
        } else {
            ymd_to_us(value_ymd)
                .ok_or_else(|| AppError::Invalid(format!("expected YYYY-MM-DD, got {value_ymd:?}")))?
        };

        let status = self
            .db
            .get_client_status(sf_id)?
            .ok_or_else(|| AppError::NotFound(format!("no client status for {sf_id}")))?;
        let task_id = Some(status.task_id.as_str()).filter(|id| !id.is_empty());

        if let Some(field_id) = self.config.field_map.get(&metric_key) {
            let old_value = status.metrics.text(&metric_key).to_string();
            let clickup_value = if value_ymd.is_empty() {
                None
            } else {
                ymd_to_clickup_ms(value_ymd)
            };
            self.clickup
                .set_custom_field_value(&status.task_id, field_id, clickup_value)
                .await?;
            self.refresh_task(&status.task_id).await?;
            tracing::info!(sf_id = %sf_id, field_key = %metric_key, "updated clickup date field");
            return self.db.log_edit(
                sf_id,
                task_id,
                &metric_key,
                Some(&old_value),
                Some(&new_value),
                EditSource::ClickUp,
            );
        }

        let Some(step_slug) = override_slug(override_key) else {
            return Err(AppError::Invalid(format!(
                "unsupported date key {:?}",
                if metric_key.is_empty() { override_key } else { metric_key.as_str() }
            )));
        };
        let old_value = self
            .db
            .get_ecd_overrides(sf_id)?
            .remove(step_slug)
            .unwrap_or_default();
        self.db.upsert_ecd_override(sf_id, step_slug, &new_value)?;
        tracing::info!(sf_id = %sf_id, step = %step_slug, cleared = new_value.is_empty(), "updated ecd override");
        self.db.log_edit(
            sf_id,
            task_id,
            override_key,
            Some(&old_value),
            Some(&new_value),
            EditSource::Override,
        )
    }

    pub async fn portfolio(&self, admin_key: &str, refresh: bool) -> AppResult<Portfolio> {
        self.access.require_admin(admin_key)?;
        if refresh {
            if let Err(error) = self.refresh_all().await {
                tracing::warn!(error = %error, "clickup sync failed; serving cached portfolio");
            }
        }
        let rows = self.db.list_client_statuses()?;
        build_portfolio(&rows, &self.access, admin_key)
    }
}

/// ClickUp webhooks carry the task id at the top level or under `task.id`.
pub fn webhook_task_id(payload: &Value) -> Option<String> {
    [payload.get("task_id"), payload.pointer("/task/id")]
        .into_iter()
        .flatten()
        .map(|value| display_text(value).trim().to_string())
        .find(|id| !id.is_empty())
}

fn override_slug(key: &str) -> Option<&str> {
    key.strip_prefix(OVERRIDE_PREFIX)?
        .strip_suffix(OVERRIDE_SUFFIX)
        .filter(|slug| !slug.trim().is_empty())
}
