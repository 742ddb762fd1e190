use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;

use crate::error::ComplianceError;
use crate::models::{ComplianceDataset, VoyageRecord};

pub fn load_records(csv_path: &Path) -> anyhow::Result<Vec<VoyageRecord>> {
    let file = File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let records = read_records(file)
        .with_context(|| format!("failed to load voyages from {}", csv_path.display()))?;
    tracing::info!(path = %csv_path.display(), records = records.len(), "loaded voyage records");
    Ok(records)
}

/// Reads and validates voyage rows. Row numbers in errors are 1-based data rows.
pub fn read_records<R: Read>(reader: R) -> anyhow::Result<Vec<VoyageRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<VoyageRecord>().enumerate() {
        let row = index + 1;
        let record = result.with_context(|| format!("malformed voyage at row {row}"))?;
        validate_record(row, &record)?;
        records.push(record);
    }

    Ok(records)
}

fn validate_record(row: usize, record: &VoyageRecord) -> Result<(), ComplianceError> {
    let invalid = |reason: String| ComplianceError::InvalidRecord {
        row,
        vessel_id: record.vessel_id.clone(),
        reason,
    };

    if record.ship_type.is_empty() {
        return Err(invalid("ship type is empty".to_string()));
    }
    for (field, value) in [
        ("distance", record.distance),
        ("fuel_consumption", record.fuel_consumption),
        ("co2_emission", record.co2_emission),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}

pub fn write_dataset(dataset: &ComplianceDataset, out: &Path) -> anyhow::Result<()> {
    let file =
        File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, dataset)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_dataset(path: &Path) -> anyhow::Result<ComplianceDataset> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} is not a compliance dataset", path.display()))
}
