//! Estimated completion date projection.
//!
//! Each track has an ordered rule table. A rule reads the current working
//! snapshot and proposes a date for one target step; the proposal is merged
//! only when the target has no usable ECD yet. ACDs are never touched. Later
//! rules see the dates merged by earlier ones, so table order is load-bearing.

use crate::calendar::{
    add_days, format_us_date, next_business_day, parse_us_date, shift_to_friday_if_weekend,
    shift_to_monday_if_weekend,
};
use crate::models::{EcdOverrides, Track};
use crate::steps::{is_kickoff, kickoff_slug, TrackSteps};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Acd,
    Ecd,
    /// ACD when set, otherwise ECD.
    Anchor,
}

#[derive(Debug, Clone, Copy)]
struct DateRef {
    slug: &'static str,
    field: Field,
}

const fn acd(slug: &'static str) -> DateRef {
    DateRef { slug, field: Field::Acd }
}

const fn ecd(slug: &'static str) -> DateRef {
    DateRef { slug, field: Field::Ecd }
}

const fn anchor(slug: &'static str) -> DateRef {
    DateRef { slug, field: Field::Anchor }
}

impl DateRef {
    fn resolve(self, steps: &TrackSteps) -> Option<NaiveDate> {
        match self.field {
            Field::Acd => steps.acd(self.slug),
            Field::Ecd => steps.ecd(self.slug),
            Field::Anchor => steps.anchor(self.slug),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    One(DateRef),
    /// Latest of whichever references resolve.
    Latest(&'static [DateRef]),
    /// Latest of the references, only when every one of them resolves.
    LatestOfAll(&'static [DateRef]),
}

impl Source {
    fn resolve(self, steps: &TrackSteps) -> Option<NaiveDate> {
        match self {
            Self::One(date_ref) => date_ref.resolve(steps),
            Self::Latest(refs) => latest(refs, steps),
            Self::LatestOfAll(refs) => refs
                .iter()
                .map(|date_ref| date_ref.resolve(steps))
                .collect::<Option<Vec<_>>>()
                .and_then(|dates| dates.into_iter().max()),
        }
    }
}

fn latest(refs: &[DateRef], steps: &TrackSteps) -> Option<NaiveDate> {
    refs.iter().filter_map(|date_ref| date_ref.resolve(steps)).max()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Exact,
    /// Weekend results move to the following Monday.
    Forward,
    /// Weekend results move to the preceding Friday.
    Backward,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    source: Source,
    offset_days: i64,
    shift: Shift,
    /// The result must land after every resolvable date here; otherwise it is
    /// pushed to the next business day after the latest of them.
    after: &'static [DateRef],
}

impl Candidate {
    const fn new(source: Source, offset_days: i64, shift: Shift) -> Self {
        Self {
            source,
            offset_days,
            shift,
            after: &[],
        }
    }

    const fn after(self, after: &'static [DateRef]) -> Self {
        Self { after, ..self }
    }

    fn evaluate(&self, steps: &TrackSteps) -> Option<NaiveDate> {
        let base = self.source.resolve(steps)?;
        let raw = add_days(base, self.offset_days)?;
        let mut date = match self.shift {
            Shift::Exact => raw,
            Shift::Forward => shift_to_monday_if_weekend(raw),
            Shift::Backward => shift_to_friday_if_weekend(raw),
        };
        if let Some(floor) = latest(self.after, steps) {
            if date <= floor {
                date = next_business_day(floor);
            }
        }
        Some(date)
    }
}

const fn forward(source: DateRef, days: i64) -> Candidate {
    Candidate::new(Source::One(source), days, Shift::Forward)
}

const fn backward(source: DateRef, days: i64) -> Candidate {
    Candidate::new(Source::One(source), -days, Shift::Backward)
}

const fn mirror(source: DateRef) -> Candidate {
    Candidate::new(Source::One(source), 0, Shift::Exact)
}

/// Fills one step's ECD from the first candidate whose source resolves.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub target: &'static str,
    candidates: &'static [Candidate],
}

impl Rule {
    const fn new(target: &'static str, candidates: &'static [Candidate]) -> Self {
        Self { target, candidates }
    }

    fn evaluate(&self, steps: &TrackSteps) -> Option<NaiveDate> {
        self.candidates.iter().find_map(|candidate| candidate.evaluate(steps))
    }
}

const SRA_RULES: &[Rule] = &[
    Rule::new(
        "receive_policies_and_procedures_baa",
        &[forward(anchor("sra_kickoff"), 7)],
    ),
    Rule::new(
        "review_policies_and_procedures_baa",
        &[forward(anchor("receive_policies_and_procedures_baa"), 12)],
    ),
    Rule::new(
        "schedule_onsite_remote_interview",
        &[forward(anchor("sra_kickoff"), 14)],
    ),
    Rule::new(
        "go_onsite_have_interview",
        &[
            mirror(acd("go_onsite_have_interview")),
            forward(anchor("review_policies_and_procedures_baa"), 7),
        ],
    ),
    Rule::new(
        "recieve_requested_follow_up_documentation",
        &[forward(anchor("go_onsite_have_interview"), 14)],
    ),
    Rule::new(
        "schedule_final_sra_report",
        &[forward(anchor("go_onsite_have_interview"), 14)],
    ),
    Rule::new(
        "review_sra",
        &[
            backward(acd("present_final_sra_report"), 1),
            forward(anchor("go_onsite_have_interview"), 15).after(&[
                ecd("recieve_requested_follow_up_documentation"),
                ecd("schedule_final_sra_report"),
            ]),
        ],
    ),
    Rule::new(
        "present_final_sra_report",
        &[
            mirror(acd("present_final_sra_report")),
            Candidate::new(
                Source::Latest(&[ecd("review_sra"), acd("review_sra")]),
                7,
                Shift::Forward,
            )
            .after(&[
                anchor("recieve_requested_follow_up_documentation"),
                anchor("schedule_final_sra_report"),
                anchor("review_sra"),
            ]),
        ],
    ),
];

const NVA_RULES: &[Rule] = &[
    Rule::new("receive_credentials", &[forward(anchor("nva_kickoff"), 7)]),
    Rule::new("verify_access", &[forward(anchor("receive_credentials"), 7)]),
    Rule::new(
        "scans_complete",
        &[
            Candidate::new(
                Source::LatestOfAll(&[acd("receive_credentials"), acd("verify_access")]),
                21,
                Shift::Forward,
            ),
            forward(anchor("nva_kickoff"), 28),
        ],
    ),
    Rule::new(
        "compile_report",
        &[
            backward(acd("present_final_nva_report"), 1),
            forward(ecd("scans_complete"), 7),
        ],
    ),
    Rule::new(
        "access_removed",
        &[
            backward(acd("present_final_nva_report"), 1),
            forward(ecd("scans_complete"), 5),
        ],
    ),
    Rule::new(
        "schedule_final_nva_report",
        &[
            forward(acd("scans_complete"), 21),
            forward(ecd("scans_complete"), 12),
        ],
    ),
    Rule::new(
        "present_final_nva_report",
        &[
            mirror(acd("present_final_nva_report")),
            forward(ecd("scans_complete"), 19),
        ],
    ),
];

pub fn rules(track: Track) -> &'static [Rule] {
    match track {
        Track::Sra => SRA_RULES,
        Track::Nva => NVA_RULES,
    }
}

fn has_explicit_rule(track: Track, slug: &str) -> bool {
    rules(track).iter().any(|rule| rule.target == slug)
}

/// Kickoff-relative offsets for steps without an explicit rule. Every
/// canonical step has one, so only configured custom steps land here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackOffsets {
    offsets: BTreeMap<String, i64>,
}

impl FallbackOffsets {
    /// Adds offsets for custom steps; these apply to either track.
    pub fn with_custom(mut self, custom: &BTreeMap<String, i64>) -> Self {
        for (slug, days) in custom {
            self.offsets.insert(slug.trim().to_lowercase(), *days);
        }
        self
    }

    pub fn offset(&self, slug: &str) -> Option<i64> {
        self.offsets.get(slug).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSource {
    Rule,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdDelta {
    pub slug: String,
    pub ecd: NaiveDate,
    pub source: DeltaSource,
}

#[derive(Debug, Clone)]
pub struct Projection {
    pub steps: TrackSteps,
    pub deltas: Vec<EcdDelta>,
}

fn needs_estimate(steps: &TrackSteps, slug: &str) -> bool {
    steps
        .get(slug)
        .is_some_and(|step| !step.is_kickoff() && step.ecd_date().is_none())
}

fn merge(steps: &mut TrackSteps, delta: &EcdDelta) {
    if let Some(step) = steps.get_mut(&delta.slug) {
        step.ecd = format_us_date(delta.ecd);
    }
}

/// Manual overrides land before any rule runs so downstream steps chain off
/// them. Kickoff estimates are not editable and unparseable values are dropped.
fn apply_overrides(steps: &mut TrackSteps, overrides: &EcdOverrides) {
    for (slug, value) in overrides {
        if is_kickoff(slug) {
            continue;
        }
        let (Some(step), Some(date)) = (steps.get_mut(slug), parse_us_date(value)) else {
            continue;
        };
        step.ecd = format_us_date(date);
    }
}

fn force_kickoff_estimates(steps: &mut TrackSteps) {
    let kickoffs = steps
        .slugs()
        .filter(|slug| is_kickoff(slug))
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    for slug in kickoffs {
        if let Some(step) = steps.get_mut(&slug) {
            step.ecd = step.acd_date().map(format_us_date).unwrap_or_default();
        }
    }
}

pub fn project(input: &TrackSteps, overrides: &EcdOverrides, fallback: &FallbackOffsets) -> Projection {
    let track = input.track;
    let mut working = input.clone();
    apply_overrides(&mut working, overrides);
    force_kickoff_estimates(&mut working);

    let mut deltas = Vec::new();
    for rule in rules(track) {
        if !needs_estimate(&working, rule.target) {
            continue;
        }
        let Some(ecd) = rule.evaluate(&working) else {
            continue;
        };
        let delta = EcdDelta {
            slug: rule.target.to_string(),
            ecd,
            source: DeltaSource::Rule,
        };
        merge(&mut working, &delta);
        deltas.push(delta);
    }

    let kickoff_anchor = working.anchor(kickoff_slug(track));
    let fallback_deltas = working
        .slugs()
        .filter(|slug| !has_explicit_rule(track, slug) && needs_estimate(&working, slug))
        .filter_map(|slug| {
            let days = fallback.offset(slug)?;
            let date = add_days(kickoff_anchor?, days).map(shift_to_monday_if_weekend)?;
            Some(EcdDelta {
                slug: slug.to_string(),
                ecd: date,
                source: DeltaSource::Fallback,
            })
        })
        .collect::<Vec<_>>();
    for delta in fallback_deltas {
        merge(&mut working, &delta);
        deltas.push(delta);
    }

    Projection { steps: working, deltas }
}

const SRA_FINAL_PRESENTATION: &str = "present_final_sra_report";
const NVA_FINAL_PRESENTATION: &str = "present_final_nva_report";

/// Copies the SRA kickoff ACD onto an NVA kickoff that has none. Returns
/// whether anything changed.
pub fn share_kickoff(sra: &TrackSteps, nva: &mut TrackSteps) -> bool {
    let Some(sra_kickoff) = sra.get(kickoff_slug(Track::Sra)) else {
        return false;
    };
    if sra_kickoff.acd_date().is_none() {
        return false;
    }
    let nva_kickoff = nva.entry(kickoff_slug(Track::Nva));
    if !nva_kickoff.acd.trim().is_empty() {
        return false;
    }
    nva_kickoff.acd = sra_kickoff.acd.clone();
    true
}

/// Both final presentations happen in the same meeting, so the NVA estimate
/// follows the SRA one whenever the SRA side has a date.
pub fn align_final_presentations(sra: &TrackSteps, nva: &mut TrackSteps) -> bool {
    let Some(sra_ecd) = sra.ecd(SRA_FINAL_PRESENTATION) else {
        return false;
    };
    let presentation = nva.entry(NVA_FINAL_PRESENTATION);
    let value = format_us_date(sra_ecd);
    if presentation.ecd == value {
        return false;
    }
    presentation.ecd = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn track(track: Track, entries: &[(&str, &str, &str)]) -> TrackSteps {
        let mut steps = TrackSteps::new(track);
        steps.fill_canonical();
        for (slug, acd, ecd) in entries {
            let step = steps.entry(slug);
            step.acd = acd.to_string();
            step.ecd = ecd.to_string();
        }
        steps
    }

    fn run(steps: &TrackSteps) -> TrackSteps {
        project(steps, &EcdOverrides::new(), &FallbackOffsets::default()).steps
    }

    fn ecd_of(steps: &TrackSteps, slug: &str) -> String {
        steps.get(slug).map(|step| step.ecd.clone()).unwrap_or_default()
    }

    #[test]
    fn sra_chain_from_kickoff_only() {
        let projected = run(&track(Track::Sra, &[("sra_kickoff", "01/06/2025", "")]));

        assert_eq!(ecd_of(&projected, "sra_kickoff"), "01/06/2025");
        assert_eq!(ecd_of(&projected, "receive_policies_and_procedures_baa"), "01/13/2025");
        // 01/25 is a Saturday.
        assert_eq!(ecd_of(&projected, "review_policies_and_procedures_baa"), "01/27/2025");
        assert_eq!(ecd_of(&projected, "schedule_onsite_remote_interview"), "01/20/2025");
        assert_eq!(ecd_of(&projected, "go_onsite_have_interview"), "02/03/2025");
        assert_eq!(ecd_of(&projected, "recieve_requested_follow_up_documentation"), "02/17/2025");
        assert_eq!(ecd_of(&projected, "schedule_final_sra_report"), "02/17/2025");
        assert_eq!(ecd_of(&projected, "review_sra"), "02/18/2025");
        assert_eq!(ecd_of(&projected, "present_final_sra_report"), "02/25/2025");
    }

    #[test]
    fn missing_anchor_leaves_estimates_blank() {
        let projected = project(
            &track(Track::Sra, &[]),
            &EcdOverrides::new(),
            &FallbackOffsets::default(),
        );
        assert!(projected.deltas.is_empty());
        assert!(projected.steps.slugs().all(|slug| ecd_of(&projected.steps, slug).is_empty()));
    }

    #[test]
    fn manual_estimates_and_actuals_are_preserved() {
        let input = track(
            Track::Sra,
            &[
                ("sra_kickoff", "01/06/2025", ""),
                ("receive_policies_and_procedures_baa", "1/14/2025", "01/20/2025"),
            ],
        );
        let projected = run(&input);
        let receive = projected
            .get("receive_policies_and_procedures_baa")
            .expect("receive step");
        assert_eq!(receive.ecd, "01/20/2025");
        assert_eq!(receive.acd, "1/14/2025");
        // Review chains off the ACD, not the manual ECD.
        assert_eq!(ecd_of(&projected, "review_policies_and_procedures_baa"), "01/27/2025");
    }

    #[test]
    fn unparseable_estimate_is_replaced() {
        let input = track(
            Track::Sra,
            &[
                ("sra_kickoff", "01/06/2025", ""),
                ("receive_policies_and_procedures_baa", "", "next week"),
            ],
        );
        assert_eq!(ecd_of(&run(&input), "receive_policies_and_procedures_baa"), "01/13/2025");
    }

    #[test]
    fn kickoff_estimate_mirrors_actual() {
        let started = run(&track(Track::Sra, &[("sra_kickoff", "1/6/2025", "02/01/2025")]));
        assert_eq!(ecd_of(&started, "sra_kickoff"), "01/06/2025");
        assert_eq!(started.get("sra_kickoff").expect("kickoff").acd, "1/6/2025");

        let pending = run(&track(Track::Sra, &[("sra_kickoff", "", "02/01/2025")]));
        assert_eq!(ecd_of(&pending, "sra_kickoff"), "");
        assert_eq!(ecd_of(&pending, "receive_policies_and_procedures_baa"), "");
    }

    #[test]
    fn onsite_estimate_mirrors_its_actual() {
        let projected = run(&track(
            Track::Sra,
            &[("sra_kickoff", "01/06/2025", ""), ("go_onsite_have_interview", "02/05/2025", "")],
        ));
        assert_eq!(ecd_of(&projected, "go_onsite_have_interview"), "02/05/2025");
        assert_eq!(ecd_of(&projected, "schedule_final_sra_report"), "02/19/2025");
    }

    #[test]
    fn review_sra_backs_off_from_presentation_actual() {
        let projected = run(&track(
            Track::Sra,
            &[("sra_kickoff", "01/06/2025", ""), ("present_final_sra_report", "03/03/2025", "")],
        ));
        // 03/02 is a Sunday, so the day before rolls back to Friday.
        assert_eq!(ecd_of(&projected, "review_sra"), "02/28/2025");
        assert_eq!(ecd_of(&projected, "present_final_sra_report"), "03/03/2025");
    }

    #[test]
    fn review_sra_lands_after_later_siblings() {
        let projected = run(&track(
            Track::Sra,
            &[
                ("go_onsite_have_interview", "02/03/2025", ""),
                ("recieve_requested_follow_up_documentation", "", "02/20/2025"),
            ],
        ));
        assert_eq!(ecd_of(&projected, "review_sra"), "02/21/2025");
        assert_eq!(ecd_of(&projected, "present_final_sra_report"), "02/28/2025");
    }

    #[test]
    fn presentation_uses_later_review_date() {
        let projected = run(&track(
            Track::Sra,
            &[
                ("go_onsite_have_interview", "02/03/2025", ""),
                ("review_sra", "02/24/2025", "02/18/2025"),
            ],
        ));
        assert_eq!(ecd_of(&projected, "present_final_sra_report"), "03/03/2025");
    }

    #[test]
    fn presentation_is_bumped_past_prerequisites() {
        let projected = run(&track(
            Track::Sra,
            &[
                ("review_sra", "", "02/18/2025"),
                ("schedule_final_sra_report", "02/27/2025", ""),
            ],
        ));
        // 02/25 would precede the scheduling ACD; next business day after 02/27.
        assert_eq!(ecd_of(&projected, "present_final_sra_report"), "02/28/2025");
    }

    #[test]
    fn nva_chain_from_kickoff_only() {
        let projected = run(&track(Track::Nva, &[("nva_kickoff", "03/03/2025", "")]));
        assert_eq!(ecd_of(&projected, "receive_credentials"), "03/10/2025");
        assert_eq!(ecd_of(&projected, "verify_access"), "03/17/2025");
        assert_eq!(ecd_of(&projected, "scans_complete"), "03/31/2025");
        assert_eq!(ecd_of(&projected, "compile_report"), "04/07/2025");
        assert_eq!(ecd_of(&projected, "access_removed"), "04/07/2025");
        assert_eq!(ecd_of(&projected, "schedule_final_nva_report"), "04/14/2025");
        assert_eq!(ecd_of(&projected, "present_final_nva_report"), "04/21/2025");
    }

    #[test]
    fn nva_scans_follow_access_actuals() {
        let projected = run(&track(
            Track::Nva,
            &[
                ("nva_kickoff", "03/03/2025", ""),
                ("receive_credentials", "03/10/2025", ""),
                ("verify_access", "03/14/2025", ""),
            ],
        ));
        assert_eq!(ecd_of(&projected, "scans_complete"), "04/04/2025");
    }

    #[test]
    fn nva_report_steps_back_off_from_presentation_actual() {
        let projected = run(&track(
            Track::Nva,
            &[
                ("nva_kickoff", "03/03/2025", ""),
                ("scans_complete", "03/28/2025", ""),
                ("present_final_nva_report", "04/21/2025", ""),
            ],
        ));
        assert_eq!(ecd_of(&projected, "compile_report"), "04/18/2025");
        assert_eq!(ecd_of(&projected, "access_removed"), "04/18/2025");
        assert_eq!(ecd_of(&projected, "schedule_final_nva_report"), "04/18/2025");
        assert_eq!(ecd_of(&projected, "present_final_nva_report"), "04/21/2025");
    }

    #[test]
    fn overrides_apply_before_rules() {
        let mut overrides = EcdOverrides::new();
        overrides.insert("receive_policies_and_procedures_baa".to_string(), "01/20/2025".to_string());
        overrides.insert("sra_kickoff".to_string(), "01/01/2025".to_string());
        overrides.insert("review_sra".to_string(), "garbage".to_string());

        let projected = project(
            &track(Track::Sra, &[("sra_kickoff", "01/06/2025", "")]),
            &overrides,
            &FallbackOffsets::default(),
        );
        assert_eq!(ecd_of(&projected.steps, "sra_kickoff"), "01/06/2025");
        assert_eq!(ecd_of(&projected.steps, "receive_policies_and_procedures_baa"), "01/20/2025");
        // 02/01 is a Saturday.
        assert_eq!(ecd_of(&projected.steps, "review_policies_and_procedures_baa"), "02/03/2025");
        assert!(projected
            .deltas
            .iter()
            .all(|delta| delta.slug != "receive_policies_and_procedures_baa"));
    }

    #[test]
    fn fallback_offsets_only_cover_custom_steps() {
        let input = track(
            Track::Sra,
            &[("sra_kickoff", "01/06/2025", ""), ("custom_review", "", ""), ("other_step", "", "")],
        );
        let mut custom = BTreeMap::new();
        custom.insert("custom_review".to_string(), 10);
        custom.insert("review_sra".to_string(), 1);
        assert_eq!(FallbackOffsets::default().offset("receive_policies_and_procedures_baa"), None);
        let fallback = FallbackOffsets::default().with_custom(&custom);

        let projected = project(&input, &EcdOverrides::new(), &fallback);
        assert_eq!(ecd_of(&projected.steps, "custom_review"), "01/16/2025");
        assert_eq!(ecd_of(&projected.steps, "other_step"), "");
        // Explicit rules take precedence over any fallback entry.
        assert_eq!(ecd_of(&projected.steps, "review_sra"), "02/18/2025");
        let custom_delta = projected
            .deltas
            .iter()
            .find(|delta| delta.slug == "custom_review")
            .expect("custom delta");
        assert_eq!(custom_delta.source, DeltaSource::Fallback);
        assert_eq!(custom_delta.ecd, ymd(2025, 1, 16));
    }

    #[test]
    fn projection_does_not_touch_its_input() {
        let input = track(Track::Sra, &[("sra_kickoff", "01/06/2025", "")]);
        let before = input.clone();
        let first = run(&input);
        let second = run(&input);
        assert_eq!(input, before);
        assert_eq!(first, second);
    }

    #[test]
    fn kickoff_is_shared_across_tracks() {
        let sra = track(Track::Sra, &[("sra_kickoff", "03/03/2025", "")]);
        let mut nva = track(Track::Nva, &[]);
        assert!(share_kickoff(&sra, &mut nva));
        assert_eq!(nva.get("nva_kickoff").expect("kickoff").acd, "03/03/2025");

        let mut own = track(Track::Nva, &[("nva_kickoff", "03/05/2025", "")]);
        assert!(!share_kickoff(&sra, &mut own));
        assert_eq!(own.get("nva_kickoff").expect("kickoff").acd, "03/05/2025");
    }

    #[test]
    fn final_presentations_are_aligned() {
        let sra = run(&track(Track::Sra, &[("sra_kickoff", "01/06/2025", "")]));
        let mut nva = run(&track(Track::Nva, &[("nva_kickoff", "01/06/2025", "")]));
        assert!(align_final_presentations(&sra, &mut nva));
        assert_eq!(ecd_of(&nva, "present_final_nva_report"), "02/25/2025");
        assert!(!align_final_presentations(&sra, &mut nva));

        let empty_sra = run(&track(Track::Sra, &[]));
        let mut untouched = run(&track(Track::Nva, &[("nva_kickoff", "03/03/2025", "")]));
        assert!(!align_final_presentations(&empty_sra, &mut untouched));
        assert_eq!(ecd_of(&untouched, "present_final_nva_report"), "04/21/2025");
    }
}
