use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use itertools::Itertools;
use log::info;

use super::{LapNumberSource, Session};
use crate::errors::PaceError;

/// Columns every timing export must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "NUMBER",
    "LAP_TIME",
    "CLASS",
    "CROSSING_FINISH_LINE_IN_PIT",
    "MANUFACTURER",
    "ELAPSED",
    "DRIVER_NAME",
    "TEAM",
    "TOP_SPEED",
];

/// Optional lap counter column; lap numbers are derived when absent.
pub const LAP_NUMBER_COLUMN: &str = "LAP_NUMBER";

const FIELD_DELIMITER: u8 = b';';

/// One line of the export, all values as text. Fields missing from a short
/// line are empty.
#[derive(Debug, Default, Clone)]
pub struct RawLap {
    pub car_number: String,
    pub lap_time: String,
    pub class: String,
    pub pit_flag: String,
    pub manufacturer: String,
    pub elapsed: String,
    pub driver_name: String,
    pub team: String,
    pub top_speed: String,
    /// `None` when the export has no lap number column or the cell is empty
    pub lap_number: Option<String>,
}

/// Position of each known column in the header.
struct ColumnIndex {
    car_number: Option<usize>,
    lap_time: Option<usize>,
    class: Option<usize>,
    pit_flag: Option<usize>,
    manufacturer: Option<usize>,
    elapsed: Option<usize>,
    driver_name: Option<usize>,
    team: Option<usize>,
    top_speed: Option<usize>,
    lap_number: Option<usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);
        Self {
            car_number: position("NUMBER"),
            lap_time: position("LAP_TIME"),
            class: position("CLASS"),
            pit_flag: position("CROSSING_FINISH_LINE_IN_PIT"),
            manufacturer: position("MANUFACTURER"),
            elapsed: position("ELAPSED"),
            driver_name: position("DRIVER_NAME"),
            team: position("TEAM"),
            top_speed: position("TOP_SPEED"),
            lap_number: position(LAP_NUMBER_COLUMN),
        }
    }

    fn lap_numbers(&self) -> LapNumberSource {
        if self.lap_number.is_some() {
            LapNumberSource::Explicit
        } else {
            LapNumberSource::Derived
        }
    }

    /// Builds a raw lap from one line. Bytes that are not valid UTF-8 are
    /// replaced rather than failing the line.
    fn raw_lap(&self, record: &ByteRecord) -> RawLap {
        let field = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        };
        RawLap {
            car_number: field(self.car_number),
            lap_time: field(self.lap_time),
            class: field(self.class),
            pit_flag: field(self.pit_flag),
            manufacturer: field(self.manufacturer),
            elapsed: field(self.elapsed),
            driver_name: field(self.driver_name),
            team: field(self.team),
            top_speed: field(self.top_speed),
            lap_number: self
                .lap_number
                .map(|i| field(Some(i)))
                .filter(|text| !text.trim().is_empty()),
        }
    }
}

pub fn load_session(source_file: &Path) -> Result<Session, PaceError> {
    let file = File::open(source_file).map_err(|e| PaceError::InputFileError {
        path: source_file.display().to_string(),
        source: e,
    })?;
    let session = read_session(file)?;
    info!(
        "Loaded {:?}, found {} laps in {} classes",
        source_file,
        session.laps().len(),
        session.classes().len()
    );
    Ok(session)
}

/// Reads a semicolon separated timing export. The header is checked before any
/// line is parsed. Short lines and undecodable bytes only affect their own
/// fields.
pub fn read_session<R: Read>(source: R) -> Result<Session, PaceError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| PaceError::CsvReadError { source: e })?
        .clone();
    check_columns(&headers)?;

    let columns = ColumnIndex::new(&headers);

    let mut raw_laps = Vec::new();
    let mut record = ByteRecord::new();
    while reader
        .read_byte_record(&mut record)
        .map_err(|e| PaceError::CsvReadError { source: e })?
    {
        raw_laps.push(columns.raw_lap(&record));
    }

    Ok(Session::new(raw_laps, columns.lap_numbers()))
}

/// Fails with every missing required column listed at once.
pub fn check_columns(headers: &StringRecord) -> Result<(), PaceError> {
    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .join(", ");
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PaceError::MissingColumns { columns: missing })
    }
}
