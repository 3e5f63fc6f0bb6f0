use crate::errors::{AppError, AppResult};
use crate::projection::FallbackOffsets;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const DEFAULT_DATABASE_PATH: &str = "client_status.db";
const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub clickup_api_token: String,
    pub clickup_list_id: String,
    pub sf_id_field_id: String,
    pub client_link_secret: String,
    pub admin_api_key: Option<String>,
    pub webhook_token: Option<String>,
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
    /// Lowercased metric key -> ClickUp custom field id.
    pub field_map: BTreeMap<String, String>,
    pub fallback_offsets: BTreeMap<String, i64>,
}

impl AppConfig {
    /// Process environment first, then the dotenv file at `path`.
    pub fn from_env_file(path: &Path) -> AppResult<Self> {
        let dotenv = load_dotenv(path)?;
        Self::from_lookup(|name| std::env::var(name).ok().or_else(|| dotenv.get(name).cloned()))
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| {
            optional(name).ok_or_else(|| AppError::Config(format!("missing required environment variable {name}")))
        };

        Ok(Self {
            clickup_api_token: required("CLICKUP_API_TOKEN")?,
            clickup_list_id: required("CLICKUP_LIST_ID")?,
            sf_id_field_id: required("CLICKUP_SF_ID_FIELD_ID")?,
            client_link_secret: required("CLIENT_LINK_SECRET")?,
            admin_api_key: optional("ADMIN_API_KEY"),
            webhook_token: optional("WEBHOOK_TOKEN"),
            database_path: PathBuf::from(
                optional("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            ),
            log_dir: PathBuf::from(optional("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())),
            field_map: parse_field_map(&optional("CLICKUP_FIELD_MAP_JSON").unwrap_or_default())?,
            fallback_offsets: parse_fallback_offsets(&optional("STEP_FALLBACK_OFFSETS_JSON").unwrap_or_default())?,
        })
    }

    pub fn writable_keys(&self) -> BTreeSet<String> {
        self.field_map.keys().cloned().collect()
    }

    pub fn fallback(&self) -> FallbackOffsets {
        FallbackOffsets::default().with_custom(&self.fallback_offsets)
    }
}

/// `KEY=VALUE` lines; blank lines, comments and lines without `=` are
/// skipped, surrounding quotes are stripped. A missing file is empty.
pub fn load_dotenv(path: &Path) -> AppResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(parse_dotenv(&text))
}

fn parse_dotenv(text: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"').trim_matches('\'');
        values.entry(key.to_string()).or_insert_with(|| value.to_string());
    }
    values
}

pub fn parse_field_map(raw: &str) -> AppResult<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let loaded: serde_json::Value = serde_json::from_str(raw)
        .map_err(|error| AppError::Config(format!("CLICKUP_FIELD_MAP_JSON must be valid JSON: {error}")))?;
    let object = loaded
        .as_object()
        .ok_or_else(|| AppError::Config("CLICKUP_FIELD_MAP_JSON must be a JSON object".to_string()))?;

    Ok(object
        .iter()
        .filter_map(|(label, field_id)| {
            let label = label.trim().to_lowercase();
            let field_id = match field_id {
                serde_json::Value::String(text) => text.trim().to_string(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (!label.is_empty() && !field_id.is_empty()).then_some((label, field_id))
        })
        .collect())
}

pub fn parse_fallback_offsets(raw: &str) -> AppResult<BTreeMap<String, i64>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let loaded: BTreeMap<String, i64> = serde_json::from_str(raw).map_err(|error| {
        AppError::Config(format!(
            "STEP_FALLBACK_OFFSETS_JSON must be an object of step slug to day count: {error}"
        ))
    })?;
    Ok(loaded
        .into_iter()
        .map(|(slug, days)| (slug.trim().to_lowercase(), days))
        .filter(|(slug, _)| !slug.is_empty())
        .collect())
}
