use itertools::Itertools;
use log::{debug, info, warn};

use super::aggregator::GroupLabels;
use super::{
    ExclusionFilter, FilterParameters, GroupingMode, NOT_AVAILABLE, PaceAggregator,
    ReferenceFilter, ReferenceOutcome, ResultRow,
};
use crate::errors::PaceError;
use crate::timing::{LapRecord, Session, compare_car_numbers};

const ALL_DRIVERS: &str = "All";
const MULTIPLE: &str = "Multiple";

/// Laps of one car, manufacturer or driver.
#[derive(Clone, Debug)]
pub struct LapGroup {
    pub key: String,
    /// Laps that survived the exclusion filter, in file order
    pub laps: Vec<LapRecord>,
}

/// Runs the whole pace pipeline over a session and returns one row per group.
///
/// Rows come in car number order when grouping by car and in first-seen order
/// otherwise.
pub fn analyze(session: &Session, params: &FilterParameters) -> Result<Vec<ResultRow>, PaceError> {
    params.validate()?;
    session.resolve_class(&params.target_class)?;

    let exclusion = ExclusionFilter::new(params);
    let candidates = exclusion.candidates(session.laps());
    let eligible = exclusion.apply(&candidates);
    info!(
        "Class {}: {} laps from {} cars, {} eligible after exclusions",
        params.target_class,
        candidates.len(),
        params.selected_cars.len(),
        eligible.len()
    );

    let reference = ReferenceFilter::new(params.deviation, params.grouping_mode, &eligible);
    let aggregator = PaceAggregator::new(params.target_fraction);
    let limit = params.deviation.describe_limit(params.grouping_mode);

    let rows = group_laps(&candidates, &eligible, params.grouping_mode)
        .into_iter()
        .map(|group| {
            let labels = labels_for(&group, params.grouping_mode);
            let outcome = reference.apply(&group.laps);
            if outcome == ReferenceOutcome::Kept(vec![]) {
                warn!(
                    "Every lap of {} {} is outside {}",
                    params.grouping_mode, group.key, limit
                );
            }
            aggregator.summarize(labels, outcome, &limit)
        })
        .collect_vec();
    debug!("Produced {} result rows", rows.len());
    Ok(rows)
}

/// Splits eligible laps into groups. The group keys come from `candidates`,
/// so an entity left without eligible laps still yields an empty group.
pub fn group_laps(
    candidates: &[LapRecord],
    eligible: &[LapRecord],
    mode: GroupingMode,
) -> Vec<LapGroup> {
    let mut keys = candidates
        .iter()
        .map(|lap| group_key(lap, mode))
        .filter(|key| !key.is_empty())
        .unique()
        .map(str::to_string)
        .collect_vec();
    if mode == GroupingMode::ByCar {
        keys.sort_by(|a, b| compare_car_numbers(a, b));
    }

    let mut laps_by_key = eligible
        .iter()
        .map(|lap| (group_key(lap, mode), lap.clone()))
        .into_group_map();
    keys.into_iter()
        .map(|key| {
            let laps = laps_by_key.remove(key.as_str()).unwrap_or_default();
            LapGroup { key, laps }
        })
        .collect()
}

fn group_key(lap: &LapRecord, mode: GroupingMode) -> &str {
    match mode {
        GroupingMode::ByCar => &lap.car_number,
        GroupingMode::ByManufacturer => &lap.manufacturer,
        GroupingMode::ByDriver => &lap.driver_name,
    }
}

/// Row labels for a group. Values read from a lap come from the group's first
/// eligible lap and are `N/A` when there is none.
fn labels_for(group: &LapGroup, mode: GroupingMode) -> GroupLabels {
    let first = group.laps.first();

    match mode {
        GroupingMode::ByCar => GroupLabels {
            entity: ALL_DRIVERS.to_string(),
            car: group.key.clone(),
            team: first_or_missing(first, |lap| lap.team.as_str()),
            manufacturer: first_or_missing(first, |lap| lap.manufacturer.as_str()),
        },
        GroupingMode::ByManufacturer => {
            let pooled = if first.is_some() { MULTIPLE } else { NOT_AVAILABLE };
            GroupLabels {
                entity: ALL_DRIVERS.to_string(),
                car: pooled.to_string(),
                team: pooled.to_string(),
                manufacturer: group.key.clone(),
            }
        }
        GroupingMode::ByDriver => GroupLabels {
            entity: group.key.clone(),
            car: first_or_missing(first, |lap| lap.car_number.as_str()),
            team: first_or_missing(first, |lap| lap.team.as_str()),
            manufacturer: first_or_missing(first, |lap| lap.manufacturer.as_str()),
        },
    }
}

fn first_or_missing(first: Option<&LapRecord>, field: impl Fn(&LapRecord) -> &str) -> String {
    first
        .map(|lap| field(lap).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
