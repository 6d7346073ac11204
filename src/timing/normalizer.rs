// Lap numbering for timing exports, explicit or derived from elapsed time

use std::cmp::Ordering;

use itertools::Itertools;
use log::{debug, warn};

use super::{LapNumberSource, LapRecord, parsers::parse_lap_number};

/// Assigns lap numbers to every record.
///
/// With an explicit column the text is coerced, unparsable values staying
/// unknown. Otherwise each car's laps are ordered by elapsed time (missing
/// elapsed first, file order on ties) and numbered from 1. A car with no
/// elapsed time at all cannot be ordered and keeps unknown lap numbers.
pub fn number_laps(records: Vec<LapRecord>, source: LapNumberSource) -> Vec<LapRecord> {
    match source {
        LapNumberSource::Explicit => records
            .into_iter()
            .map(|record| {
                let lap_number = record.lap_number_text.as_deref().and_then(parse_lap_number);
                record.with_lap_number(lap_number)
            })
            .collect(),
        LapNumberSource::Derived => derive_lap_numbers(records),
    }
}

fn derive_lap_numbers(records: Vec<LapRecord>) -> Vec<LapRecord> {
    let mut lap_numbers: Vec<Option<u32>> = vec![None; records.len()];

    let laps_by_car = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (record.car_number.as_str(), idx))
        .into_group_map();

    for (car, mut indices) in laps_by_car {
        if indices.iter().all(|&idx| records[idx].elapsed_hours.is_none()) {
            warn!(
                "Car {} has no elapsed times, lap numbers left unknown for {} laps",
                car,
                indices.len()
            );
            continue;
        }
        // stable: laps with equal or missing elapsed keep file order
        indices.sort_by(|&a, &b| {
            compare_elapsed(records[a].elapsed_hours, records[b].elapsed_hours)
        });
        for (lap_idx, record_idx) in indices.into_iter().enumerate() {
            lap_numbers[record_idx] = Some(lap_idx as u32 + 1);
        }
    }

    debug!("Derived lap numbers for {} records", records.len());
    records
        .into_iter()
        .zip(lap_numbers)
        .map(|(record, lap_number)| record.with_lap_number(lap_number))
        .collect()
}

/// Missing elapsed time sorts before any known value.
fn compare_elapsed(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
