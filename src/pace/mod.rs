// Pace analysis: filtering timing laps down to representative ones and
// aggregating them per car, manufacturer or driver.

pub mod aggregator;
pub mod exclusion;
pub mod pipeline;
pub mod reference;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use aggregator::PaceAggregator;
pub use exclusion::ExclusionFilter;
pub use pipeline::analyze;
pub use reference::{ReferenceFilter, ReferenceOutcome};

use crate::config::AnalyzerConfig;
use crate::errors::PaceError;
use crate::timing::Session;

/// Placeholder shown when no average can be computed.
pub const NOT_AVAILABLE: &str = "N/A";

pub const MIN_PERCENTAGE: f64 = 101.0;
pub const MAX_PERCENTAGE: f64 = 120.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingMode {
    /// One row per car, in car number order
    #[default]
    ByCar,
    /// One row per manufacturer, all of its cars pooled
    ByManufacturer,
    /// One row per driver
    ByDriver,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::ByCar => write!(f, "car"),
            GroupingMode::ByManufacturer => write!(f, "manufacturer"),
            GroupingMode::ByDriver => write!(f, "driver"),
        }
    }
}

/// How far from the reference best lap a lap may be and still count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeviationRule {
    /// Laps slower than the group's best plus this many seconds are dropped.
    /// Zero disables the rule.
    AbsoluteDelta { max_delta_seconds: f64 },
    /// Laps slower than a percentage of the reference are dropped. Drivers are
    /// measured against their own best, cars and manufacturers against the
    /// class best.
    Percentage {
        manufacturer_pct: f64,
        driver_pct: f64,
    },
}

impl Default for DeviationRule {
    fn default() -> Self {
        DeviationRule::AbsoluteDelta {
            max_delta_seconds: 0.0,
        }
    }
}

impl DeviationRule {
    /// The limit in effect for the given grouping, as shown next to an empty result.
    pub fn describe_limit(&self, mode: GroupingMode) -> String {
        match self {
            DeviationRule::AbsoluteDelta { max_delta_seconds } => {
                format!("{}s", max_delta_seconds)
            }
            DeviationRule::Percentage { .. } => {
                format!("{}%", self.percentage_for(mode).unwrap_or(f64::INFINITY))
            }
        }
    }

    pub(crate) fn percentage_for(&self, mode: GroupingMode) -> Option<f64> {
        match *self {
            DeviationRule::Percentage { driver_pct, .. } if mode == GroupingMode::ByDriver => {
                Some(driver_pct)
            }
            DeviationRule::Percentage {
                manufacturer_pct, ..
            } => Some(manufacturer_pct),
            DeviationRule::AbsoluteDelta { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), PaceError> {
        match *self {
            DeviationRule::AbsoluteDelta { max_delta_seconds } => {
                if !(max_delta_seconds.is_finite() && max_delta_seconds >= 0.0) {
                    return Err(PaceError::invalid_parameter(
                        "max_delta_seconds",
                        format!(
                            "must be zero or a positive number of seconds, got {}",
                            max_delta_seconds
                        ),
                    ));
                }
            }
            DeviationRule::Percentage {
                manufacturer_pct,
                driver_pct,
            } => {
                let limits = [
                    ("manufacturer_pct", manufacturer_pct),
                    ("driver_pct", driver_pct),
                ];
                for (field, pct) in limits {
                    if !(MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&pct) {
                        return Err(PaceError::invalid_parameter(
                            field,
                            format!(
                                "must be within {}..={}, got {}",
                                MIN_PERCENTAGE, MAX_PERCENTAGE, pct
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Inclusive range of session time, in hours.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub min_hours: f64,
    pub max_hours: f64,
}

impl SessionWindow {
    pub fn new(min_hours: f64, max_hours: f64) -> Self {
        Self {
            min_hours,
            max_hours,
        }
    }

    pub fn contains(&self, hours: f64) -> bool {
        self.min_hours <= hours && hours <= self.max_hours
    }
}

/// Everything the user chooses before a pace run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterParameters {
    pub target_class: String,
    pub selected_cars: BTreeSet<String>,
    /// Share of the fastest laps averaged, in (0, 1]
    pub target_fraction: f64,
    /// `None` keeps laps regardless of session time
    pub session_window: Option<SessionWindow>,
    pub deviation: DeviationRule,
    pub grouping_mode: GroupingMode,
    /// Pit crossing flag value that marks a pit lap
    pub pit_marker: String,
}

impl FilterParameters {
    /// Defaults for a class of the session: every car of the class, the whole
    /// observed session time and the configured fraction, rule and grouping.
    pub fn for_class(
        session: &Session,
        class: &str,
        config: &AnalyzerConfig,
    ) -> Result<Self, PaceError> {
        let target_class = session.resolve_class(class)?;
        let selected_cars: BTreeSet<String> =
            session.cars_in_class(&target_class).into_iter().collect();
        let session_window = session
            .elapsed_range(&selected_cars)
            .map(|(min_hours, max_hours)| SessionWindow::new(min_hours, max_hours));
        Ok(Self {
            target_class,
            selected_cars,
            target_fraction: config.target_fraction,
            session_window,
            deviation: config.deviation,
            grouping_mode: config.grouping_mode,
            pit_marker: config.pit_marker.clone(),
        })
    }

    pub fn validate(&self) -> Result<(), PaceError> {
        if !(self.target_fraction > 0.0 && self.target_fraction <= 1.0) {
            return Err(PaceError::invalid_parameter(
                "target_fraction",
                format!("must be within (0, 1], got {}", self.target_fraction),
            ));
        }
        if let Some(window) = self.session_window
            && !(window.min_hours <= window.max_hours)
        {
            return Err(PaceError::invalid_parameter(
                "session_window",
                format!("{} is after {}", window.min_hours, window.max_hours),
            ));
        }
        self.deviation.validate()
    }
}

/// One line of the pace table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub car: String,
    pub team: String,
    pub manufacturer: String,
    /// Driver name, or `All` when every driver of the entity is pooled
    pub entity: String,
    pub average: String,
    pub laps_used: usize,
    pub average_top_speed: String,
}
