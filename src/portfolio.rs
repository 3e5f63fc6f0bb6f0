use crate::access::AccessPolicy;
use crate::calendar::{format_us_date, parse_rfc3339, parse_us_date_lenient, quarter_label};
use crate::errors::AppResult;
use crate::models::{ClientStatusRow, Portfolio, PortfolioGroup, PortfolioProject};
use crate::steps::humanize;
use chrono::NaiveDate;
use std::collections::BTreeMap;

const UNKNOWN: &str = "Unknown";
const NOT_APPLICABLE: &str = "-";
const FINAL_MILESTONE_KEYS: [&str; 2] = ["sra.present_final_sra_report.date", "nva.present_final_nva_report.date"];

fn timestamp_date(text: &str) -> Option<NaiveDate> {
    parse_rfc3339(text).map(|at| at.date_naive())
}

/// Completed work is placed by its final presentation, then by when the task
/// closed. Active work is placed by when it was created.
fn anchor_date(row: &ClientStatusRow, completed: bool) -> Option<NaiveDate> {
    let updated = || timestamp_date(&row.source_updated_at);
    if completed {
        FINAL_MILESTONE_KEYS
            .iter()
            .filter_map(|key| parse_us_date_lenient(row.metrics.text(key)))
            .max()
            .or_else(|| timestamp_date(&row.task_closed_at))
            .or_else(updated)
    } else {
        timestamp_date(&row.task_created_at).or_else(updated)
    }
}

fn date_label(date: Option<NaiveDate>) -> String {
    date.map(format_us_date).unwrap_or_else(|| UNKNOWN.to_string())
}

fn period_sort_key(label: &str) -> Option<(i32, u32)> {
    let (year, quarter) = label.split_once(' ')?;
    Some((year.parse().ok()?, quarter.strip_prefix('Q')?.parse().ok()?))
}

/// Groups by period label, newest first, with `Unknown` last.
fn group_by_period(projects: Vec<PortfolioProject>) -> Vec<PortfolioGroup> {
    let mut grouped: BTreeMap<String, Vec<PortfolioProject>> = BTreeMap::new();
    for project in projects {
        grouped.entry(project.period_label.clone()).or_default().push(project);
    }
    let mut groups = grouped
        .into_iter()
        .map(|(period_label, projects)| PortfolioGroup { period_label, projects })
        .collect::<Vec<_>>();
    groups.sort_by(|left, right| period_sort_key(&right.period_label).cmp(&period_sort_key(&left.period_label)));
    groups
}

fn status_counts(projects: &[PortfolioProject]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for project in projects {
        let key = if project.task_status.is_empty() {
            UNKNOWN.to_string()
        } else {
            project.task_status.clone()
        };
        *counts.entry(key).or_default() += 1;
    }
    let mut counts = counts.into_iter().collect::<Vec<_>>();
    counts.sort_by_key(|(status, _)| status.to_lowercase());
    counts
}

pub fn build_portfolio(rows: &[ClientStatusRow], access: &AccessPolicy, admin_key: &str) -> AppResult<Portfolio> {
    let mut completed = Vec::new();
    let mut active = Vec::new();

    for row in rows {
        let task_status = humanize(&row.task_status);
        let is_completed = task_status.eq_ignore_ascii_case("completed");
        let anchor = anchor_date(row, is_completed);
        let signature = access.sign(&row.sf_id)?;

        let project = PortfolioProject {
            task_name: row.task_name.clone(),
            sf_id: row.sf_id.clone(),
            status_url: format!(
                "/status/{}?sig={}&mode=admin&key={}",
                row.sf_id, signature, admin_key
            ),
            start_date_label: if is_completed {
                NOT_APPLICABLE.to_string()
            } else {
                date_label(timestamp_date(&row.task_created_at))
            },
            completed_date_label: if is_completed {
                date_label(anchor)
            } else {
                NOT_APPLICABLE.to_string()
            },
            period_label: anchor.map(quarter_label).unwrap_or_else(|| UNKNOWN.to_string()),
            task_status,
        };

        if is_completed {
            completed.push(project);
        } else {
            active.push(project);
        }
    }

    tracing::debug!(completed = completed.len(), active = active.len(), "built project portfolio");
    Ok(Portfolio {
        count: completed.len() + active.len(),
        completed_count: completed.len(),
        active_count: active.len(),
        completed_status_counts: status_counts(&completed),
        active_status_counts: status_counts(&active),
        completed_groups: group_by_period(completed),
        active_groups: group_by_period(active),
    })
}
