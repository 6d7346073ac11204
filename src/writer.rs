use std::path::Path;

use itertools::Itertools;

use crate::{errors::PaceError, pace::ResultRow};

const COLUMNS: [&str; 7] = [
    "Car",
    "Team",
    "Manufacturer",
    "Driver(s)",
    "Average",
    "Laps Used",
    "Average Top Speed",
];

/// Renders result rows as a fixed width text table.
pub fn render_table(rows: &[ResultRow]) -> String {
    let cells = rows
        .iter()
        .map(|row| {
            [
                row.car.clone(),
                row.team.clone(),
                row.manufacturer.clone(),
                row.entity.clone(),
                row.average.clone(),
                row.laps_used.to_string(),
                row.average_top_speed.clone(),
            ]
        })
        .collect_vec();

    let widths = (0..COLUMNS.len())
        .map(|col| {
            cells
                .iter()
                .map(|line| line[col].chars().count())
                .chain(std::iter::once(COLUMNS[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect_vec();

    let format_line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let separator = widths.iter().map(|w| "-".repeat(*w)).join("-+-");
    std::iter::once(format_line(COLUMNS.to_vec()))
        .chain(std::iter::once(separator))
        .chain(
            cells
                .iter()
                .map(|line| format_line(line.iter().map(String::as_str).collect())),
        )
        .join("\n")
}

/// Writes result rows to `file` as JSON lines.
pub fn write_results(file: &Path, rows: &[ResultRow]) -> Result<(), PaceError> {
    serde_jsonlines::write_json_lines(file, rows).map_err(|e| PaceError::WriterError { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(car: &str, average: &str) -> ResultRow {
        ResultRow {
            car: car.to_string(),
            team: "Ferrari AF Corse".to_string(),
            manufacturer: "Ferrari".to_string(),
            entity: "All".to_string(),
            average: average.to_string(),
            laps_used: 12,
            average_top_speed: "331.2".to_string(),
        }
    }

    #[test]
    fn test_table_layout() {
        let table = render_table(&[row("50", "1:41.203"), row("51", "N/A (> 2s)")]);
        let lines = table.lines().collect_vec();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Car | Team"));
        assert!(lines[1].starts_with("----+-"));
        assert!(lines[2].starts_with("50  | Ferrari AF Corse | Ferrari      | All       | 1:41.203"));
        assert!(lines[3].contains("N/A (> 2s)"));
    }

    #[test]
    fn test_empty_table_has_header() {
        let table = render_table(&[]);
        assert_eq!(table.lines().count(), 2);
    }

    #[test]
    fn test_write_results_as_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.jsonl");
        let rows = vec![row("50", "1:41.203"), row("51", "1:41.900")];
        write_results(&path, &rows).unwrap();

        let loaded: Vec<ResultRow> = serde_jsonlines::json_lines(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(loaded, rows);
    }
}
