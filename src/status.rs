use crate::models::{StatusColor, StepStatus};
use chrono::NaiveDate;

const POTENTIAL_ROADBLOCK_WINDOW_DAYS: i64 = 3;

pub fn classify(is_kickoff: bool, acd: Option<NaiveDate>, ecd: Option<NaiveDate>, today: NaiveDate) -> StepStatus {
    if acd.is_some() {
        return if is_kickoff {
            StepStatus::Completed
        } else {
            StepStatus::OnTrack
        };
    }
    if is_kickoff {
        return StepStatus::NotStarted;
    }
    let Some(ecd) = ecd else {
        return StepStatus::NotStarted;
    };

    let diff_days = (ecd - today).num_days();
    if diff_days < 0 {
        StepStatus::RoadblockOverage
    } else if diff_days <= POTENTIAL_ROADBLOCK_WINDOW_DAYS {
        StepStatus::PotentialRoadblock
    } else {
        StepStatus::OnTrack
    }
}

pub fn color(status: StepStatus) -> StatusColor {
    match status {
        StepStatus::OnTrack | StepStatus::Completed => StatusColor::Green,
        StepStatus::PotentialRoadblock => StatusColor::Yellow,
        StepStatus::RoadblockOverage => StatusColor::Red,
        StepStatus::NotStarted => StatusColor::Neutral,
    }
}
