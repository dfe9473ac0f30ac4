//! Record loading from CSV and JSON files.

use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use docmerge::{FieldValue, Record};

/// Load records from a `.csv` or `.json` file, chosen by extension.
pub fn load_records(path: &Path) -> Result<Vec<Record>, Box<dyn Error>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let records = match extension.as_str() {
        "csv" => read_csv(File::open(path)?)?,
        "json" => Record::from_json_str(&std::fs::read_to_string(path)?)?,
        other => {
            return Err(format!(
                "unsupported record file '{}' (expected .csv or .json, got '{}')",
                path.display(),
                other
            )
            .into())
        }
    };

    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read records from CSV. The header row names the fields; empty cells are
/// absent values.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Record>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_data = result.map_err(|e| format!("CSV row {}: {}", row + 1, e))?;
        let mut record = Record::new();
        for (name, cell) in headers.iter().zip(row_data.iter()) {
            if name.is_empty() {
                continue;
            }
            if cell.is_empty() {
                record.insert(name.as_str(), FieldValue::Absent);
            } else {
                record.insert(name.as_str(), cell);
            }
        }
        records.push(record);
    }
    Ok(records)
}
