use super::{NOT_AVAILABLE, ReferenceOutcome, ResultRow};
use crate::timing::LapRecord;
use crate::timing::parsers::{format_lap_time, format_speed};

/// Labels of the entity a result row describes.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupLabels {
    pub entity: String,
    pub car: String,
    pub team: String,
    pub manufacturer: String,
}

/// Averages the fastest share of a group's laps.
#[derive(Clone, Copy, Debug)]
pub struct PaceAggregator {
    target_fraction: f64,
}

impl PaceAggregator {
    pub fn new(target_fraction: f64) -> Self {
        Self { target_fraction }
    }

    /// Builds the row for one group. `limit` describes the deviation rule and
    /// is shown when the rule removed every lap of the group.
    pub fn summarize(
        &self,
        labels: GroupLabels,
        outcome: ReferenceOutcome,
        limit: &str,
    ) -> ResultRow {
        let laps = match outcome {
            ReferenceOutcome::NoData => return empty_row(labels, NOT_AVAILABLE.to_string()),
            ReferenceOutcome::Kept(laps) if laps.is_empty() => {
                return empty_row(labels, format!("{} (> {})", NOT_AVAILABLE, limit));
            }
            ReferenceOutcome::Kept(laps) => laps,
        };

        let fastest = select_fastest(&laps, self.target_fraction);
        let average = mean(fastest.iter().filter_map(|lap| lap.lap_seconds))
            .map(format_lap_time)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let average_top_speed = mean(fastest.iter().filter_map(|lap| lap.top_speed))
            .map(format_speed)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        ResultRow {
            car: labels.car,
            team: labels.team,
            manufacturer: labels.manufacturer,
            entity: labels.entity,
            average,
            laps_used: fastest.len(),
            average_top_speed,
        }
    }
}

fn empty_row(labels: GroupLabels, average: String) -> ResultRow {
    ResultRow {
        car: labels.car,
        team: labels.team,
        manufacturer: labels.manufacturer,
        entity: labels.entity,
        average,
        laps_used: 0,
        average_top_speed: NOT_AVAILABLE.to_string(),
    }
}

/// Number of laps averaged out of `count`: the fraction rounded down, at least
/// one lap for a non empty group and never more than `count`.
pub fn top_lap_count(count: usize, fraction: f64) -> usize {
    if count == 0 {
        return 0;
    }
    ((count as f64 * fraction).floor() as usize).clamp(1, count)
}

/// Fastest laps first; equal times keep their input order. Laps without a
/// time are never selected.
pub fn select_fastest(laps: &[LapRecord], fraction: f64) -> Vec<LapRecord> {
    let mut timed: Vec<&LapRecord> = laps.iter().filter(|lap| lap.lap_seconds.is_some()).collect();
    timed.sort_by(|a, b| {
        a.lap_seconds
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.lap_seconds.unwrap_or(f64::INFINITY))
    });
    let count = top_lap_count(timed.len(), fraction);
    timed.into_iter().take(count).cloned().collect()
}

pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::timing::test_support::raw_lap;

    fn labels() -> GroupLabels {
        GroupLabels {
            entity: "All".to_string(),
            car: "7".to_string(),
            team: "Toyota Gazoo Racing".to_string(),
            manufacturer: "Toyota".to_string(),
        }
    }

    fn laps(times: &[(&str, &str)]) -> Vec<LapRecord> {
        times
            .iter()
            .enumerate()
            .map(|(row, (time, speed))| {
                let mut raw = raw_lap("7", time, "1:00:00.000");
                raw.top_speed = speed.to_string();
                LapRecord::from_raw(row, raw)
            })
            .collect()
    }

    #[test]
    fn test_three_laps_at_sixty_percent_uses_the_fastest() {
        let group = laps(&[("1:40.000", "300"), ("1:41.000", "310"), ("1:45.000", "320")]);
        let row = PaceAggregator::new(0.6).summarize(labels(), ReferenceOutcome::Kept(group), "0s");
        assert_eq!(row.average, "1:40.000");
        assert_eq!(row.laps_used, 1);
        assert_eq!(row.average_top_speed, "300.0");
        assert_eq!(row.entity, "All");
        assert_eq!(row.car, "7");
    }

    #[test]
    fn test_average_over_selected_laps() {
        let group = laps(&[
            ("1:45.000", "300"),
            ("1:40.000", "310"),
            ("1:41.000", ""),
            ("1:50.000", "320"),
        ]);
        let row = PaceAggregator::new(0.5).summarize(labels(), ReferenceOutcome::Kept(group), "0s");
        assert_eq!(row.average, "1:40.500");
        assert_eq!(row.laps_used, 2);
        // missing speed of the 1:41 lap is ignored
        assert_eq!(row.average_top_speed, "310.0");
    }

    #[test]
    fn test_all_speeds_missing() {
        let group = laps(&[("1:40.000", ""), ("1:41.000", "x")]);
        let row = PaceAggregator::new(1.0).summarize(labels(), ReferenceOutcome::Kept(group), "0s");
        assert_eq!(row.average, "1:40.500");
        assert_eq!(row.average_top_speed, NOT_AVAILABLE);
    }

    #[test]
    fn test_sentinel_rows() {
        let aggregator = PaceAggregator::new(0.6);
        let no_data = aggregator.summarize(labels(), ReferenceOutcome::NoData, "2s");
        assert_eq!(no_data.average, "N/A");
        assert_eq!(no_data.laps_used, 0);
        assert_eq!(no_data.average_top_speed, "N/A");

        let off_pace = aggregator.summarize(labels(), ReferenceOutcome::Kept(vec![]), "107%");
        assert_eq!(off_pace.average, "N/A (> 107%)");
        assert_eq!(off_pace.laps_used, 0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let group = laps(&[("1:41.000", "301"), ("1:40.000", "302"), ("1:40.000", "303")]);
        let fastest = select_fastest(&group, 0.34);
        assert_eq!(fastest.len(), 1);
        assert_eq!(fastest[0].row, 1);
    }

    #[test]
    fn test_top_lap_count() {
        assert_eq!(top_lap_count(0, 0.6), 0);
        assert_eq!(top_lap_count(3, 0.6), 1);
        assert_eq!(top_lap_count(1, 0.1), 1);
        assert_eq!(top_lap_count(10, 0.6), 6);
        assert_eq!(top_lap_count(10, 1.0), 10);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean([1.0, 2.0, 3.0].into_iter()), Some(2.0));
        assert_eq!(mean(std::iter::empty()), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_selection_is_bounded(count in 0usize..500, fraction in 0.001f64..=1.0) {
            let selected = top_lap_count(count, fraction);
            prop_assert!(selected <= count);
            if count > 0 {
                prop_assert!(selected >= 1);
            }
        }

        #[test]
        fn prop_selected_laps_are_the_fastest(
            millis in prop::collection::vec(90_000u32..120_000, 1..50),
            fraction in 0.05f64..=1.0,
        ) {
            let group: Vec<LapRecord> = millis
                .iter()
                .enumerate()
                .map(|(row, ms)| {
                    let time = format_lap_time(*ms as f64 / 1000.0);
                    LapRecord::from_raw(row, raw_lap("7", &time, ""))
                })
                .collect();
            let fastest = select_fastest(&group, fraction);
            let slowest_selected = fastest.iter().filter_map(|l| l.lap_seconds).fold(f64::MIN, f64::max);
            let unselected_faster = group
                .iter()
                .filter(|lap| !fastest.iter().any(|f| f.row == lap.row))
                .any(|lap| lap.lap_seconds.unwrap() < slowest_selected);
            prop_assert!(!unselected_faster);
        }
    }
}
