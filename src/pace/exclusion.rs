use log::debug;

use super::FilterParameters;
use crate::timing::LapRecord;

/// Drops laps that never count toward pace. The checks run in a fixed order
/// and a lap must pass all of them:
///
/// 1. class matches the target class (trimmed, case-insensitive)
/// 2. car is one of the selected cars
/// 3. the lap did not cross the line in the pit lane
/// 4. the lap is not the first lap, when the lap number is known
/// 5. the lap time parsed and is positive
/// 6. the elapsed time, when known, lies inside the session window
pub struct ExclusionFilter<'p> {
    params: &'p FilterParameters,
    target_class: String,
    pit_marker: String,
}

impl<'p> ExclusionFilter<'p> {
    pub fn new(params: &'p FilterParameters) -> Self {
        Self {
            params,
            target_class: normalize_label(&params.target_class),
            pit_marker: normalize_label(&params.pit_marker),
        }
    }

    /// Laps passing every check, in input order.
    pub fn apply(&self, laps: &[LapRecord]) -> Vec<LapRecord> {
        let kept: Vec<LapRecord> = laps.iter().filter(|lap| self.accepts(lap)).cloned().collect();
        debug!(
            "Exclusion filter kept {} of {} laps for class {}",
            kept.len(),
            laps.len(),
            self.params.target_class
        );
        kept
    }

    /// Laps of the selected cars in the target class, before any lap level
    /// exclusion. Groups are enumerated from these so that an entity whose laps
    /// were all excluded still gets a row.
    pub fn candidates(&self, laps: &[LapRecord]) -> Vec<LapRecord> {
        laps.iter()
            .filter(|lap| self.class_matches(lap) && self.car_selected(lap))
            .cloned()
            .collect()
    }

    pub fn accepts(&self, lap: &LapRecord) -> bool {
        self.class_matches(lap)
            && self.car_selected(lap)
            && !self.is_pit_lap(lap)
            && !is_first_lap(lap)
            && has_valid_time(lap)
            && self.within_window(lap)
    }

    fn class_matches(&self, lap: &LapRecord) -> bool {
        normalize_label(&lap.class) == self.target_class
    }

    fn car_selected(&self, lap: &LapRecord) -> bool {
        self.params.selected_cars.contains(lap.car_number.trim())
    }

    fn is_pit_lap(&self, lap: &LapRecord) -> bool {
        let flag = normalize_label(&lap.pit_flag);
        !flag.is_empty() && flag == self.pit_marker
    }

    fn within_window(&self, lap: &LapRecord) -> bool {
        match (self.params.session_window, lap.elapsed_hours) {
            (Some(window), Some(hours)) => window.contains(hours),
            _ => true,
        }
    }
}

/// Unknown lap numbers are not treated as a first lap.
fn is_first_lap(lap: &LapRecord) -> bool {
    matches!(lap.lap_number, Some(n) if n <= 1)
}

fn has_valid_time(lap: &LapRecord) -> bool {
    matches!(lap.lap_seconds, Some(seconds) if seconds > 0.0)
}

fn normalize_label(label: &str) -> String {
    label.trim().to_uppercase()
}
