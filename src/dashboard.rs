use crate::calendar::us_to_ymd;
use crate::models::{
    ClientStatusRow, Dashboard, DateFieldView, EcdOverrides, MetricsMap, ProjectDetails, StepView, Track,
};
use crate::projection::{align_final_presentations, project, share_kickoff, FallbackOffsets};
use crate::status::{classify, color};
use crate::steps::{bucket_metrics, display_name, humanize, owner_label, LocationMode, StepRecord, TrackSteps};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

const LOCATION_KEYS: [&str; 2] = ["project.remote_onsite", "project.location"];
const SRA_TOGGLE_KEYS: [&str; 3] = ["project.sra_enabled", "sra.enabled", "sra_enabled"];
const NVA_TOGGLE_KEYS: [&str; 3] = ["project.nva_enabled", "nva.enabled", "nva_enabled"];
const NOT_ASSIGNED: &str = "Not assigned";
const NOT_SET: &str = "Not set";

/// Everything the dashboard depends on for one client at one moment.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInput<'a> {
    pub metrics: &'a MetricsMap,
    pub task_name: &'a str,
    pub task_status: &'a str,
    pub overrides: &'a EcdOverrides,
    pub today: NaiveDate,
}

impl<'a> DashboardInput<'a> {
    pub fn from_row(row: &'a ClientStatusRow, overrides: &'a EcdOverrides, today: NaiveDate) -> Self {
        Self {
            metrics: &row.metrics,
            task_name: &row.task_name,
            task_status: &row.task_status,
            overrides,
            today,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardOptions {
    pub can_edit: bool,
    /// Metric keys that map to a ClickUp custom field and can be written back.
    pub writable_keys: BTreeSet<String>,
    pub fallback: FallbackOffsets,
}

/// `true`/`false` style toggles as they come out of ClickUp checkboxes and
/// dropdowns. Blank or unknown text yields `None`.
pub fn parse_toggle(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "checked" => Some(true),
        "false" | "0" | "no" | "n" | "unchecked" => Some(false),
        _ => None,
    }
}

fn track_visible(metrics: &MetricsMap, keys: &[&str], steps: &TrackSteps) -> bool {
    // An unset checkbox arrives as a blank value and counts as no toggle.
    parse_toggle(metrics.first_text(keys)).unwrap_or_else(|| steps.has_reported_steps())
}

pub fn build_dashboard(input: &DashboardInput<'_>, options: &DashboardOptions) -> Dashboard {
    let location = input.metrics.first_text(&LOCATION_KEYS);
    let location_mode = LocationMode::from_text(location);

    let mut buckets = bucket_metrics(input.metrics);
    let show_sra = track_visible(input.metrics, &SRA_TOGGLE_KEYS, &buckets.sra);
    let show_nva = track_visible(input.metrics, &NVA_TOGGLE_KEYS, &buckets.nva);

    buckets.sra.fill_canonical();
    buckets.nva.fill_canonical();

    let coupled = show_sra && show_nva;
    if coupled && share_kickoff(&buckets.sra, &mut buckets.nva) {
        tracing::debug!("nva kickoff inherited sra kickoff date");
    }

    let sra = project(&buckets.sra, input.overrides, &options.fallback);
    let mut nva = project(&buckets.nva, input.overrides, &options.fallback);
    if coupled {
        align_final_presentations(&sra.steps, &mut nva.steps);
    }
    tracing::debug!(
        sra_estimates = sra.deltas.len(),
        nva_estimates = nva.deltas.len(),
        "projected estimated completion dates"
    );

    let view = |steps: &TrackSteps| {
        steps
            .ordered(location_mode)
            .into_iter()
            .map(|step| step_view(steps.track, step, location_mode, input, options))
            .collect::<Vec<_>>()
    };

    Dashboard {
        project_details: project_details(&buckets.project, location, input.task_status),
        show_sra,
        show_nva,
        sra_steps: view(&sra.steps),
        nva_steps: view(&nva.steps),
        extra_metrics: buckets.extra,
    }
}

fn step_view(
    track: Track,
    step: &StepRecord,
    location: LocationMode,
    input: &DashboardInput<'_>,
    options: &DashboardOptions,
) -> StepView {
    let is_kickoff = step.is_kickoff();
    let status = classify(is_kickoff, step.acd_date(), step.ecd_date(), input.today);

    let acd_key = if step.acd_key.is_empty() {
        format!("{}.{}.date", track.as_str(), step.slug)
    } else {
        step.acd_key.clone()
    };
    let acd = DateFieldView {
        value: step.acd.clone(),
        input_value: us_to_ymd(&step.acd),
        editable: options.can_edit && options.writable_keys.contains(&acd_key),
        metric_key: acd_key,
        override_key: String::new(),
    };

    let ecd = if is_kickoff {
        DateFieldView {
            value: step.ecd.clone(),
            input_value: us_to_ymd(&step.ecd),
            editable: false,
            metric_key: String::new(),
            override_key: String::new(),
        }
    } else {
        let metric_key = if options.writable_keys.contains(&step.ecd_key) {
            step.ecd_key.clone()
        } else {
            String::new()
        };
        DateFieldView {
            value: step.ecd.clone(),
            input_value: us_to_ymd(&step.ecd),
            editable: options.can_edit,
            metric_key,
            override_key: format!("override:{}.ecd", step.slug),
        }
    };

    StepView {
        slug: step.slug.clone(),
        name: display_name(&step.slug, location),
        track,
        is_kickoff,
        owner: owner_label(&step.slug, input.task_name),
        status,
        status_class: color(status).css_class(),
        ecd,
        acd,
        extras: step.extras.clone(),
    }
}

fn project_details(project: &BTreeMap<String, String>, location: &str, task_status: &str) -> ProjectDetails {
    let field = |name: &str| {
        project
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    ProjectDetails {
        status: humanize(task_status),
        project_lead: field("project_lead").unwrap_or_else(|| NOT_ASSIGNED.to_string()),
        location: Some(location.to_string()).filter(|value| !value.is_empty()),
        next_steps: field("next_steps").unwrap_or_else(|| NOT_SET.to_string()),
        project_support: field("project_support"),
    }
}
