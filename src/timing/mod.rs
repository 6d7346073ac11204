// Timing data model: lap records as read from an endurance timing export
// and the session that owns them.

pub mod loader;
pub mod normalizer;
pub mod parsers;

use std::cmp::Ordering;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use loader::{RawLap, load_session, read_session};

use crate::errors::PaceError;

/// Where the lap numbers of a session come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LapNumberSource {
    /// The export carried a `LAP_NUMBER` column
    Explicit,
    /// Lap numbers were derived from elapsed time ordering, best effort
    Derived,
}

/// One timing line of the export.
///
/// Raw text fields are kept as read. The parsed fields are filled once when the
/// session is built and are `None` whenever the source text did not parse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    /// Position of the line in the source file, used as tie-breaker
    pub row: usize,
    pub car_number: String,
    pub class: String,
    pub manufacturer: String,
    pub driver_name: String,
    pub team: String,
    pub lap_time_text: String,
    pub elapsed_text: String,
    pub top_speed_text: String,
    /// Empty for a normal lap, a marker (usually `B`) when crossing the line in the pit lane
    pub pit_flag: String,
    pub lap_number_text: Option<String>,

    /// Lap time in seconds
    pub lap_seconds: Option<f64>,
    /// Session time at the end of the lap, in hours
    pub elapsed_hours: Option<f64>,
    pub top_speed: Option<f64>,
    pub lap_number: Option<u32>,
}

impl LapRecord {
    pub fn from_raw(row: usize, raw: RawLap) -> Self {
        let lap_seconds = parsers::parse_lap_time(&raw.lap_time);
        let elapsed_hours = parsers::parse_elapsed(&raw.elapsed);
        let top_speed = parsers::parse_speed(&raw.top_speed);
        Self {
            row,
            car_number: raw.car_number.trim().to_string(),
            class: raw.class.trim().to_string(),
            manufacturer: raw.manufacturer.trim().to_string(),
            driver_name: raw.driver_name.trim().to_string(),
            team: raw.team.trim().to_string(),
            lap_time_text: raw.lap_time,
            elapsed_text: raw.elapsed,
            top_speed_text: raw.top_speed,
            pit_flag: raw.pit_flag,
            lap_number_text: raw.lap_number,
            lap_seconds,
            elapsed_hours,
            top_speed,
            lap_number: None,
        }
    }

    /// Returns a copy of this record carrying the given lap number.
    pub fn with_lap_number(self, lap_number: Option<u32>) -> Self {
        Self { lap_number, ..self }
    }
}

/// All laps loaded from one timing export, in file order.
#[derive(Clone, Debug)]
pub struct Session {
    laps: Vec<LapRecord>,
    lap_numbers: LapNumberSource,
}

impl Session {
    pub fn new(raw_laps: Vec<RawLap>, lap_numbers: LapNumberSource) -> Self {
        let records = raw_laps
            .into_iter()
            .enumerate()
            .map(|(row, raw)| LapRecord::from_raw(row, raw))
            .collect_vec();
        Self {
            laps: normalizer::number_laps(records, lap_numbers),
            lap_numbers,
        }
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn lap_number_source(&self) -> LapNumberSource {
        self.lap_numbers
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Distinct classes in first-seen order. Spelling variants that only differ
    /// by case collapse onto the first one seen.
    pub fn classes(&self) -> Vec<String> {
        self.laps
            .iter()
            .map(|lap| lap.class.as_str())
            .filter(|class| !class.is_empty())
            .unique_by(|class| class.to_uppercase())
            .map(str::to_string)
            .collect()
    }

    /// Resolves a user supplied class name against the observed classes.
    pub fn resolve_class(&self, class: &str) -> Result<String, PaceError> {
        let wanted = class.trim().to_uppercase();
        let classes = self.classes();
        classes
            .iter()
            .find(|c| c.to_uppercase() == wanted)
            .cloned()
            .ok_or_else(|| PaceError::UnknownClass {
                class: class.to_string(),
                available: classes.join(", "),
            })
    }

    /// Car numbers seen in the class, sorted by their numeric value.
    pub fn cars_in_class(&self, class: &str) -> Vec<String> {
        let wanted = class.trim().to_uppercase();
        self.laps
            .iter()
            .filter(|lap| lap.class.to_uppercase() == wanted && !lap.car_number.is_empty())
            .map(|lap| lap.car_number.clone())
            .unique()
            .sorted_by(|a, b| compare_car_numbers(a, b))
            .collect()
    }

    /// Smallest and largest elapsed time, in hours, over the given cars.
    pub fn elapsed_range<'a>(
        &self,
        cars: impl IntoIterator<Item = &'a String>,
    ) -> Option<(f64, f64)> {
        let cars = cars.into_iter().collect_vec();
        self.laps
            .iter()
            .filter(|lap| cars.contains(&&lap.car_number))
            .filter_map(|lap| lap.elapsed_hours)
            .fold(None, |range, hours| match range {
                None => Some((hours, hours)),
                Some((lo, hi)) => Some((f64::min(lo, hours), f64::max(hi, hours))),
            })
    }
}

/// Orders car numbers by the value of their digits ("7" < "12" < "#51"), numbers
/// without digits last, ties broken lexicographically.
pub fn compare_car_numbers(a: &str, b: &str) -> Ordering {
    fn numeric_part(car: &str) -> Option<u64> {
        let digits: String = car.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    match (numeric_part(a), numeric_part(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
