//! ClickUp REST client and task normalization.
//!
//! Tasks are pulled as raw JSON and flattened into [`ClientStatusRow`]s: the
//! Salesforce ID comes from a configured custom field and every entry of the
//! field map becomes one metric rendered as display text.

use crate::calendar::parse_rfc3339;
use crate::errors::{AppError, AppResult};
use crate::models::{ClientStatusRow, MetricsMap};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const CLICKUP_API_URL: &str = "https://api.clickup.com/api/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);
pub const NEXT_STEPS_KEY: &str = "project.next_steps";

/// A normalized task plus whether ClickUp considers it closed.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTask {
    pub row: ClientStatusRow,
    pub closed: bool,
}

/// The subset of the ClickUp API the dashboard relies on.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_tasks_for_list(&self, list_id: &str) -> AppResult<Vec<Value>>;
    async fn fetch_task(&self, task_id: &str) -> AppResult<Value>;
    async fn fetch_latest_comment(&self, task_id: &str) -> AppResult<String>;
    async fn set_custom_field_value(&self, task_id: &str, field_id: &str, value: Option<i64>) -> AppResult<()>;
}

pub struct ClickUpClient {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl ClickUpClient {
    pub fn new(api_token: &str) -> AppResult<Self> {
        Self::with_base_url(api_token, CLICKUP_API_URL)
    }

    pub fn with_base_url(api_token: &str, base_url: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_token: api_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> AppResult<Value> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", self.api_token.clone())
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("ClickUp GET {path} returned {status}: {text}")));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl TaskSource for ClickUpClient {
    async fn fetch_tasks_for_list(&self, list_id: &str) -> AppResult<Vec<Value>> {
        let path = format!("/list/{list_id}/task");
        let mut tasks = Vec::new();
        let mut page = 0_u32;

        loop {
            let data = self
                .get_json(
                    &path,
                    &[
                        ("page", page.to_string()),
                        ("subtasks", "true".to_string()),
                        ("include_closed", "true".to_string()),
                    ],
                )
                .await?;
            let current = data
                .get("tasks")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let last_page = data.get("last_page").and_then(Value::as_bool).unwrap_or(false);
            let exhausted = current.is_empty();
            tasks.extend(current);
            if last_page || exhausted {
                break;
            }
            page += 1;
        }

        tracing::debug!(list_id = %list_id, pages = page + 1, tasks = tasks.len(), "fetched clickup list");
        Ok(tasks)
    }

    async fn fetch_task(&self, task_id: &str) -> AppResult<Value> {
        self.get_json(&format!("/task/{task_id}"), &[]).await
    }

    async fn fetch_latest_comment(&self, task_id: &str) -> AppResult<String> {
        let data = self.get_json(&format!("/task/{task_id}/comment"), &[]).await?;
        Ok(latest_comment_text(&data))
    }

    async fn set_custom_field_value(&self, task_id: &str, field_id: &str, value: Option<i64>) -> AppResult<()> {
        let path = format!("/task/{task_id}/field/{field_id}");
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", self.api_token.clone())
            .header("Content-Type", "application/json")
            .json(&json!({ "value": value }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("ClickUp POST {path} returned {status}: {text}")));
        }
        Ok(())
    }
}

/// Text of the most recent comment in a `/task/{id}/comment` payload.
pub fn latest_comment_text(payload: &Value) -> String {
    payload
        .get("comments")
        .and_then(Value::as_array)
        .and_then(|comments| comments.iter().max_by_key(|comment| int_value(comment.get("date")).unwrap_or(0)))
        .and_then(|comment| comment.get("comment_text"))
        .map(|text| display_text(text).trim().to_string())
        .unwrap_or_default()
}

fn custom_field<'a>(task: &'a Value, field_id: &str) -> Option<&'a Value> {
    task.get("custom_fields")?
        .as_array()?
        .iter()
        .find(|field| field.get("id").and_then(Value::as_str) == Some(field_id))
}

fn int_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|float| float as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn datetime_from_ms(value: Option<&Value>) -> Option<DateTime<Utc>> {
    int_value(value).and_then(DateTime::from_timestamp_millis)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        _ => false,
    }
}

pub(crate) fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.iter().map(display_text).collect::<Vec<_>>().join(", "),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, value)| format!("{key}: {}", display_text(value)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn format_dropdown(field: &Value) -> String {
    let value = field.get("value");
    if is_blank(value) {
        return String::new();
    }
    let wanted = value.map(display_text).unwrap_or_default();
    let options = field
        .pointer("/type_config/options")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    options
        .iter()
        .find(|option| {
            ["id", "orderindex"]
                .iter()
                .any(|key| option.get(*key).map(display_text).as_deref() == Some(wanted.as_str()))
        })
        .map(|option| option.get("name").map(display_text).unwrap_or_default())
        .unwrap_or(wanted)
}

/// Renders one custom field the way it is shown on the dashboard.
pub fn format_custom_field(field: Option<&Value>) -> String {
    let Some(field) = field else {
        return String::new();
    };
    match field.get("type").and_then(Value::as_str) {
        Some("date") => datetime_from_ms(field.get("value"))
            .map(|at| at.format("%m/%d/%Y").to_string())
            .unwrap_or_default(),
        Some("drop_down") => format_dropdown(field),
        _ => field.get("value").map(display_text).unwrap_or_default(),
    }
}

fn ms_to_rfc3339(value: Option<&Value>) -> String {
    datetime_from_ms(value).map(|at| at.to_rfc3339()).unwrap_or_default()
}

pub fn normalize_task(task: &Value, sf_id_field_id: &str, field_map: &BTreeMap<String, String>) -> Option<NormalizedTask> {
    let sf_id = custom_field(task, sf_id_field_id)
        .and_then(|field| field.get("value"))
        .map(display_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())?;

    let metrics = field_map
        .iter()
        .map(|(label, field_id)| (label.as_str(), format_custom_field(custom_field(task, field_id))))
        .collect::<MetricsMap>();

    let text = |pointer: &str| task.pointer(pointer).map(display_text).unwrap_or_default();
    let closed_at = if is_blank(task.get("date_closed")) {
        task.get("date_done")
    } else {
        task.get("date_closed")
    };

    Some(NormalizedTask {
        closed: text("/status/type") == "closed",
        row: ClientStatusRow {
            sf_id,
            task_id: text("/id"),
            task_name: text("/name"),
            task_status: text("/status/status"),
            task_url: text("/url"),
            task_created_at: ms_to_rfc3339(task.get("date_created")),
            task_closed_at: ms_to_rfc3339(closed_at),
            metrics,
            source_updated_at: ms_to_rfc3339(task.get("date_updated")),
            synced_at: String::new(),
        },
    })
}

/// Open tasks win over closed ones, then the most recently updated.
pub fn is_better_row(candidate: &NormalizedTask, current: &NormalizedTask) -> bool {
    if candidate.closed != current.closed {
        return !candidate.closed;
    }
    let updated = |task: &NormalizedTask| parse_rfc3339(&task.row.source_updated_at);
    updated(candidate) >= updated(current)
}

/// Keeps one task per Salesforce ID.
pub fn dedupe_by_sf_id(tasks: Vec<NormalizedTask>) -> Vec<NormalizedTask> {
    let mut by_sf_id: BTreeMap<String, NormalizedTask> = BTreeMap::new();
    for task in tasks {
        match by_sf_id.get(&task.row.sf_id) {
            Some(current) if !is_better_row(&task, current) => {}
            _ => {
                by_sf_id.insert(task.row.sf_id.clone(), task);
            }
        }
    }
    by_sf_id.into_values().collect()
}

/// `YYYY-MM-DD` to the epoch milliseconds ClickUp stores for date fields,
/// pinned to noon UTC so the day survives formatting.
pub fn ymd_to_clickup_ms(value: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(12, 0, 0)?.and_utc().timestamp_millis())
}
