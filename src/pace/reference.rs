use log::debug;

use super::{DeviationRule, GroupingMode};
use crate::timing::LapRecord;

/// Result of measuring a group of laps against its reference best lap.
#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceOutcome {
    /// The group had no lap to take a reference from
    NoData,
    /// Laps within the allowed deviation, in input order. Can be empty when
    /// the reference comes from outside the group.
    Kept(Vec<LapRecord>),
}

/// Fastest lap time among the laps, if any lap has a time.
pub fn reference_best(laps: &[LapRecord]) -> Option<f64> {
    laps.iter()
        .filter_map(|lap| lap.lap_seconds)
        .min_by(f64::total_cmp)
}

/// Discards off-pace laps relative to a reference best lap.
///
/// With an absolute delta the reference is always the evaluated group's own
/// best. With percentages, drivers are compared to their own best while cars
/// and manufacturers are compared to the best lap of the whole class.
#[derive(Clone, Debug)]
pub struct ReferenceFilter {
    rule: DeviationRule,
    mode: GroupingMode,
    class_best: Option<f64>,
}

impl ReferenceFilter {
    /// `class_laps` is the full post-exclusion subset of the class; its best
    /// lap is computed here once.
    pub fn new(rule: DeviationRule, mode: GroupingMode, class_laps: &[LapRecord]) -> Self {
        let class_best = match (rule, mode) {
            (DeviationRule::Percentage { .. }, GroupingMode::ByDriver) => None,
            (DeviationRule::Percentage { .. }, _) => reference_best(class_laps),
            (DeviationRule::AbsoluteDelta { .. }, _) => None,
        };
        Self {
            rule,
            mode,
            class_best,
        }
    }

    pub fn rule(&self) -> DeviationRule {
        self.rule
    }

    pub fn uses_class_reference(&self) -> bool {
        matches!(self.rule, DeviationRule::Percentage { .. }) && self.mode != GroupingMode::ByDriver
    }

    pub fn apply(&self, group: &[LapRecord]) -> ReferenceOutcome {
        if group.is_empty() {
            return ReferenceOutcome::NoData;
        }
        let best = if self.uses_class_reference() {
            self.class_best
        } else {
            reference_best(group)
        };
        let Some(best) = best else {
            return ReferenceOutcome::NoData;
        };

        let Some(limit) = self.limit(best) else {
            return ReferenceOutcome::Kept(group.to_vec());
        };
        let kept: Vec<LapRecord> = group
            .iter()
            .filter(|lap| matches!(lap.lap_seconds, Some(seconds) if seconds <= limit))
            .cloned()
            .collect();
        debug!(
            "Reference {:.3}s, limit {:.3}s: kept {} of {} laps",
            best,
            limit,
            kept.len(),
            group.len()
        );
        ReferenceOutcome::Kept(kept)
    }

    /// Slowest lap time that still counts, `None` when the rule is disabled.
    fn limit(&self, best: f64) -> Option<f64> {
        match self.rule {
            DeviationRule::AbsoluteDelta { max_delta_seconds } => {
                (max_delta_seconds > 0.0).then(|| best + max_delta_seconds)
            }
            DeviationRule::Percentage { .. } => self
                .rule
                .percentage_for(self.mode)
                .filter(|pct| pct.is_finite())
                .map(|pct| best * (pct / 100.0)),
        }
    }
}
