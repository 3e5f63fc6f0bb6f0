use crate::calendar::parse_us_date;
use crate::models::{ExtraField, MetricsMap, Track};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const SRA_KICKOFF: &str = "sra_kickoff";
pub const NVA_KICKOFF: &str = "nva_kickoff";

pub const SRA_STEPS: [&str; 9] = [
    SRA_KICKOFF,
    "receive_policies_and_procedures_baa",
    "review_policies_and_procedures_baa",
    "schedule_onsite_remote_interview",
    "go_onsite_have_interview",
    "recieve_requested_follow_up_documentation",
    "review_sra",
    "schedule_final_sra_report",
    "present_final_sra_report",
];

pub const NVA_STEPS: [&str; 8] = [
    NVA_KICKOFF,
    "receive_credentials",
    "verify_access",
    "scans_complete",
    "access_removed",
    "compile_report",
    "schedule_final_nva_report",
    "present_final_nva_report",
];

const MEDCURITY: &str = "Medcurity";
const UNASSIGNED: &str = "Not assigned";

const MEDCURITY_OWNED: [&str; 5] = [
    SRA_KICKOFF,
    "review_policies_and_procedures_baa",
    "go_onsite_have_interview",
    "review_sra",
    "present_final_sra_report",
];

const SHARED_OWNED: [&str; 2] = ["schedule_onsite_remote_interview", "schedule_final_sra_report"];

const ACRONYMS: [(&str, &str); 5] = [
    ("Sra", "SRA"),
    ("Nva", "NVA"),
    ("Baa", "BAA"),
    ("Ecd", "ECD"),
    ("Acd", "ACD"),
];

pub fn canonical_order(track: Track) -> &'static [&'static str] {
    match track {
        Track::Sra => &SRA_STEPS,
        Track::Nva => &NVA_STEPS,
    }
}

pub fn kickoff_slug(track: Track) -> &'static str {
    match track {
        Track::Sra => SRA_KICKOFF,
        Track::Nva => NVA_KICKOFF,
    }
}

pub fn is_kickoff(slug: &str) -> bool {
    slug.contains("kickoff")
}

/// `"present_final-sra"` -> `"Present Final Sra"`.
pub fn title_case(raw: &str) -> String {
    raw.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn apply_acronyms(text: &str) -> String {
    ACRONYMS
        .iter()
        .fold(text.to_string(), |value, (source, target)| value.replace(source, target))
}

pub fn humanize(raw: &str) -> String {
    apply_acronyms(&title_case(raw))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMode {
    Onsite,
    Remote,
    Mixed,
}

impl LocationMode {
    pub fn from_text(location: &str) -> Self {
        let normalized = location.to_lowercase().replace(['-', ' '], "");
        let onsite = normalized.contains("onsite");
        let remote = normalized.contains("remote");
        match (onsite, remote) {
            (true, false) => Self::Onsite,
            (false, true) => Self::Remote,
            _ => Self::Mixed,
        }
    }
}

pub fn display_name(slug: &str, location: LocationMode) -> String {
    let fixed = match slug {
        "schedule_onsite_remote_interview" => match location {
            LocationMode::Onsite => "Schedule Onsite Visit",
            LocationMode::Remote => "Schedule Interview Sessions",
            LocationMode::Mixed => "Schedule Onsite/Remote Interview",
        },
        "go_onsite_have_interview" => match location {
            LocationMode::Remote => "Conduct Interview Sessions",
            LocationMode::Onsite | LocationMode::Mixed => "Go Onsite/Have Interviews",
        },
        SRA_KICKOFF => "SRA Kickoff",
        "receive_policies_and_procedures_baa" => "Receive Policies and Procedures / BAA",
        "review_policies_and_procedures_baa" => "Review Policies and Procedures / BAA",
        "recieve_requested_follow_up_documentation" => "Receive Requested Follow Up Documentation",
        "review_sra" => "Review SRA",
        "schedule_final_sra_report" => "Schedule Final SRA Report",
        "present_final_sra_report" => "Present Final SRA Report",
        NVA_KICKOFF => "NVA Kickoff",
        "receive_credentials" => "Receive Credentials",
        "verify_access" => "Verify Access",
        "scans_complete" => "Scans Complete",
        "access_removed" => "Access Removed",
        "compile_report" => "Compile Report",
        "schedule_final_nva_report" => "Schedule Final NVA Report",
        "present_final_nva_report" => "Present Final NVA Report",
        other => return humanize(other),
    };
    fixed.to_string()
}

pub fn owner_label(slug: &str, client_name: &str) -> String {
    let client = match client_name.trim() {
        "" => UNASSIGNED,
        name => name,
    };
    if MEDCURITY_OWNED.contains(&slug) {
        MEDCURITY.to_string()
    } else if SHARED_OWNED.contains(&slug) {
        format!("{} & {}", MEDCURITY, client)
    } else {
        client.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepField {
    Acd,
    Ecd,
    Extra(String),
}

impl StepField {
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix.trim().to_lowercase().as_str() {
            "date" | "acd" => Self::Acd,
            "ecd" => Self::Ecd,
            other => Self::Extra(humanize(other)),
        }
    }
}

/// Raw per-step fields gathered from the metrics map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRecord {
    pub slug: String,
    pub acd: String,
    pub ecd: String,
    pub acd_key: String,
    pub ecd_key: String,
    pub extras: Vec<ExtraField>,
}

impl StepRecord {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            ..Self::default()
        }
    }

    pub fn acd_date(&self) -> Option<NaiveDate> {
        parse_us_date(&self.acd)
    }

    pub fn ecd_date(&self) -> Option<NaiveDate> {
        parse_us_date(&self.ecd)
    }

    /// ACD when known, otherwise ECD.
    pub fn anchor_date(&self) -> Option<NaiveDate> {
        self.acd_date().or_else(|| self.ecd_date())
    }

    pub fn is_kickoff(&self) -> bool {
        is_kickoff(&self.slug)
    }
}

/// Steps of one track keyed by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSteps {
    pub track: Track,
    steps: BTreeMap<String, StepRecord>,
    /// Slugs that arrived through the metrics map, as opposed to canonical
    /// steps filled in with no data.
    reported: usize,
}

impl TrackSteps {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            steps: BTreeMap::new(),
            reported: 0,
        }
    }

    pub fn get(&self, slug: &str) -> Option<&StepRecord> {
        self.steps.get(slug)
    }

    pub fn get_mut(&mut self, slug: &str) -> Option<&mut StepRecord> {
        self.steps.get_mut(slug)
    }

    pub fn entry(&mut self, slug: &str) -> &mut StepRecord {
        self.steps
            .entry(slug.to_string())
            .or_insert_with(|| StepRecord::new(slug))
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.steps.contains_key(slug)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether any step of this track was present in the source metrics.
    pub fn has_reported_steps(&self) -> bool {
        self.reported > 0
    }

    pub fn acd(&self, slug: &str) -> Option<NaiveDate> {
        self.get(slug).and_then(StepRecord::acd_date)
    }

    pub fn ecd(&self, slug: &str) -> Option<NaiveDate> {
        self.get(slug).and_then(StepRecord::ecd_date)
    }

    pub fn anchor(&self, slug: &str) -> Option<NaiveDate> {
        self.get(slug).and_then(StepRecord::anchor_date)
    }

    /// Adds every canonical step that the metrics did not mention.
    pub fn fill_canonical(&mut self) {
        for slug in canonical_order(self.track) {
            self.entry(slug);
        }
    }

    /// Steps in canonical order; unknown slugs follow, sorted by display name.
    pub fn ordered(&self, location: LocationMode) -> Vec<&StepRecord> {
        let canonical = canonical_order(self.track);
        let mut known = canonical
            .iter()
            .filter_map(|slug| self.steps.get(*slug))
            .collect::<Vec<_>>();
        let mut unknown = self
            .steps
            .values()
            .filter(|step| !canonical.contains(&step.slug.as_str()))
            .map(|step| (display_name(&step.slug, location), step))
            .collect::<Vec<_>>();
        unknown.sort_by(|(left_name, left), (right_name, right)| {
            left_name.cmp(right_name).then_with(|| left.slug.cmp(&right.slug))
        });
        known.extend(unknown.into_iter().map(|(_, step)| step));
        known
    }
}

/// Metrics split by destination: per-track steps, `project.*` fields and
/// whatever else is left over.
#[derive(Debug, Clone)]
pub struct MetricBuckets {
    pub sra: TrackSteps,
    pub nva: TrackSteps,
    pub project: BTreeMap<String, String>,
    pub extra: BTreeMap<String, String>,
}

impl MetricBuckets {
    pub fn track(&self, track: Track) -> &TrackSteps {
        match track {
            Track::Sra => &self.sra,
            Track::Nva => &self.nva,
        }
    }

    pub fn track_mut(&mut self, track: Track) -> &mut TrackSteps {
        match track {
            Track::Sra => &mut self.sra,
            Track::Nva => &mut self.nva,
        }
    }
}

const TOGGLE_KEYS: [&str; 6] = [
    "project.sra_enabled",
    "project.nva_enabled",
    "sra.enabled",
    "nva.enabled",
    "sra_enabled",
    "nva_enabled",
];

pub fn bucket_metrics(metrics: &MetricsMap) -> MetricBuckets {
    let mut buckets = MetricBuckets {
        sra: TrackSteps::new(Track::Sra),
        nva: TrackSteps::new(Track::Nva),
        project: BTreeMap::new(),
        extra: BTreeMap::new(),
    };

    for (key, value) in metrics.iter() {
        if TOGGLE_KEYS.contains(&key) {
            continue;
        }
        let parts = key.split('.').map(str::trim).collect::<Vec<_>>();
        if parts.len() >= 2 && parts[0] == "project" {
            buckets.project.insert(parts[1].to_string(), value.to_string());
            continue;
        }

        let track = parts.first().and_then(|prefix| Track::from_prefix(prefix));
        let (Some(track), true) = (track, parts.len() >= 3) else {
            buckets.extra.insert(key.to_string(), value.to_string());
            continue;
        };
        if parts[1].is_empty() {
            buckets.extra.insert(key.to_string(), value.to_string());
            continue;
        }

        let steps = buckets.track_mut(track);
        let is_new = !steps.contains(parts[1]);
        let record = steps.entry(parts[1]);
        match StepField::from_suffix(parts[2]) {
            StepField::Acd => {
                record.acd = value.trim().to_string();
                record.acd_key = key.to_string();
            }
            StepField::Ecd => {
                record.ecd = value.trim().to_string();
                record.ecd_key = key.to_string();
            }
            StepField::Extra(label) => record.extras.push(ExtraField {
                label,
                value: value.to_string(),
            }),
        }
        if is_new {
            steps.reported += 1;
        }
    }

    buckets
}
