//! CSV input and output
//!
//! Training data is read with serde straight into [`RawRecord`]s; the header
//! must use the record field names. Engineered datasets are written back as
//! wide CSV with one column per derived feature.

use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::domain::RawRecord;
use crate::error::ForecastError;
use crate::features::EngineeredRow;

pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Read every row of a training CSV
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, ForecastError> {
    let file = File::open(path).map_err(|e| ForecastError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let records = reader
        .deserialize()
        .collect::<Result<Vec<RawRecord>, csv::Error>>()?;
    debug!(path = %path.display(), rows = records.len(), "read records");
    Ok(records)
}

/// Write engineered rows.
///
/// Columns are `Timestamp` followed by every feature name in first-seen
/// order; a row without a value for a column leaves the cell empty.
pub fn write_engineered(path: &Path, rows: &[EngineeredRow]) -> Result<(), ForecastError> {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for name in row.features.names() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }

    let file = File::create(path).map_err(|e| ForecastError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(std::iter::once(TIMESTAMP_COLUMN).chain(columns.iter().copied()))?;
    for row in rows {
        let mut cells = Vec::with_capacity(columns.len() + 1);
        cells.push(row.timestamp.clone().unwrap_or_default());
        for column in &columns {
            cells.push(
                row.features
                    .get(column)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&cells)?;
    }

    writer.flush().map_err(|e| ForecastError::io(path, e))?;
    debug!(path = %path.display(), rows = rows.len(), columns = columns.len(), "wrote engineered dataset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engineer_dataset;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
Timestamp,Temperature,Humidity,SquareFootage,Occupancy,HVACUsage,LightingUsage,RenewableEnergy,DayOfWeek,Holiday,EnergyConsumption
01-01-2022 00:00,25.1,43.4,1565,5,On,Off,2.77,Saturday,No,75.36
01-01-2022 01:00,27.7,54.2,1412,1,On,On,21.83,Saturday,No,83.40
01-01-2022 02:00,28.7,58.9,1755,2,Off,Off,6.76,Saturday,No,78.27
";

    #[test]
    fn test_load_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("energy.csv");
        fs::write(&path, SAMPLE).unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].timestamp.as_deref(), Some("01-01-2022 00:00"));
        assert_eq!(records[0].hvac_usage, "On");
        assert_eq!(records[1].square_footage, 1412);
        assert_eq!(records[2].energy_consumption, Some(78.27));
    }

    #[test]
    fn test_load_records_without_timestamp_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("energy.csv");
        fs::write(
            &path,
            "Temperature,Humidity,SquareFootage,Occupancy,HVACUsage,LightingUsage,RenewableEnergy,DayOfWeek,Holiday\n\
             20.0,45.0,1000,2,Off,On,0.0,Monday,Yes\n",
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records[0].timestamp, None);
        assert_eq!(records[0].energy_consumption, None);
    }

    #[test]
    fn test_load_records_reports_bad_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("energy.csv");
        fs::write(&path, SAMPLE.replace("1412", "lots")).unwrap();

        assert!(matches!(load_records(&path), Err(ForecastError::Csv(_))));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_records(Path::new("/nonexistent/energy.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/energy.csv"));
    }

    #[test]
    fn test_write_engineered() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("energy.csv");
        let output = dir.path().join("engineered.csv");
        fs::write(&input, SAMPLE).unwrap();

        let rows = engineer_dataset(&load_records(&input).unwrap(), &[1], &[2]).unwrap();
        write_engineered(&output, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Timestamp");
        assert!(headers.iter().any(|h| h == "EnergyConsumption_lag_1"));
        assert!(headers.iter().any(|h| h == "EnergyConsumption_ma_2"));
        assert!(headers.iter().any(|h| h == "Energy_per_sqft"));

        let written: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(written.len(), 3);
        assert_eq!(&written[0][0], "01-01-2022 00:00");
        assert!(written.iter().all(|r| r.len() == headers.len()));
    }
}
