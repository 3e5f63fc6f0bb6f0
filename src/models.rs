use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dotted metric keys (`sra.sra_kickoff.date`) to raw string values. Keys are
/// lowercased on the way in so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct MetricsMap(BTreeMap<String, String>);

impl MetricsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.trim().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.trim().to_lowercase()).map(String::as_str)
    }

    /// Trimmed value, empty when absent.
    pub fn text(&self, key: &str) -> &str {
        self.get(key).map(str::trim).unwrap_or("")
    }

    /// First non-blank value among `keys`.
    pub fn first_text(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|key| self.text(key))
            .find(|value| !value.is_empty())
            .unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&key.trim().to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for MetricsMap {
    fn from(value: BTreeMap<String, String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<MetricsMap> for BTreeMap<String, String> {
    fn from(value: MetricsMap) -> Self {
        value.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MetricsMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key.as_ref(), value);
        }
        map
    }
}

/// Manual ECD overrides keyed by step slug, values in `MM/DD/YYYY`.
pub type EcdOverrides = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Sra,
    Nva,
}

impl Track {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sra => "sra",
            Self::Nva => "nva",
        }
    }

    pub fn from_prefix(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sra" => Some(Self::Sra),
            "nva" => Some(Self::Nva),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "Potential Roadblock")]
    PotentialRoadblock,
    #[serde(rename = "Roadblock/Overage")]
    RoadblockOverage,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Not Started")]
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
    Neutral,
}

impl StatusColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Neutral => "neutral",
        }
    }

    pub fn css_class(self) -> String {
        format!("status-pill-{}", self.as_str())
    }
}

/// One synced ClickUp task, keyed by Salesforce ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientStatusRow {
    pub sf_id: String,
    pub task_id: String,
    pub task_name: String,
    pub task_status: String,
    pub task_url: String,
    pub task_created_at: String,
    pub task_closed_at: String,
    pub metrics: MetricsMap,
    pub source_updated_at: String,
    #[serde(default)]
    pub synced_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditSource {
    #[serde(rename = "admin_update_clickup")]
    ClickUp,
    #[serde(rename = "admin_update_override")]
    Override,
}

impl EditSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClickUp => "admin_update_clickup",
            Self::Override => "admin_update_override",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EditLogEntry {
    pub id: i64,
    pub logged_at: String,
    pub sf_id: String,
    pub task_id: Option<String>,
    pub field_key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectDetails {
    pub status: String,
    pub project_lead: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub next_steps: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_support: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DateFieldView {
    pub value: String,
    /// `YYYY-MM-DD` for date inputs.
    pub input_value: String,
    pub editable: bool,
    pub metric_key: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub override_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtraField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StepView {
    pub slug: String,
    pub name: String,
    pub track: Track,
    pub is_kickoff: bool,
    pub owner: String,
    pub status: StepStatus,
    pub status_class: String,
    pub ecd: DateFieldView,
    pub acd: DateFieldView,
    pub extras: Vec<ExtraField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Dashboard {
    pub project_details: ProjectDetails,
    pub show_sra: bool,
    pub show_nva: bool,
    pub sra_steps: Vec<StepView>,
    pub nva_steps: Vec<StepView>,
    pub extra_metrics: BTreeMap<String, String>,
}

impl Dashboard {
    pub fn steps(&self, track: Track) -> &[StepView] {
        match track {
            Track::Sra => &self.sra_steps,
            Track::Nva => &self.nva_steps,
        }
    }

    pub fn step(&self, track: Track, slug: &str) -> Option<&StepView> {
        self.steps(track).iter().find(|step| step.slug == slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SignedLink {
    pub sf_id: String,
    pub signature: String,
    pub url_path: String,
}

/// Date edit submitted from the admin view. `value` is `YYYY-MM-DD` or blank
/// to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpdateDateRequest {
    #[serde(default)]
    pub metric_key: String,
    #[serde(default)]
    pub override_key: String,
    #[serde(default)]
    pub value: String,
}

/// Everything the client status page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientDashboardView {
    pub status: ClientStatusRow,
    pub dashboard: Dashboard,
    pub can_edit: bool,
    pub can_admin_nav: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Ignored { reason: String },
    Updated { sf_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PortfolioProject {
    pub task_name: String,
    pub sf_id: String,
    pub task_status: String,
    pub status_url: String,
    pub start_date_label: String,
    pub completed_date_label: String,
    pub period_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PortfolioGroup {
    pub period_label: String,
    pub projects: Vec<PortfolioProject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Portfolio {
    pub count: usize,
    pub completed_count: usize,
    pub active_count: usize,
    pub completed_groups: Vec<PortfolioGroup>,
    pub active_groups: Vec<PortfolioGroup>,
    pub completed_status_counts: Vec<(String, usize)>,
    pub active_status_counts: Vec<(String, usize)>,
}
