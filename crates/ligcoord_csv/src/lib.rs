//! CSV codec for ligand tables.
//!
//! Two schemas are in play: the *train* file (tested ligands) is
//! `smiles,standard_value`; the *test* file (untested ligands, submitted for
//! prediction) is SMILES-only. Predictions read back from the executor are
//! `smiles,predicted_value`.

use ligcoord_protocol::{CoordinatorError, Ligand};
use std::io::Write;
use std::path::Path;

fn io_err(context: &str, err: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Persistence(format!("{context}: {err}"))
}

/// Write tested ligands as `smiles,standard_value`, one row per ligand.
pub fn write_train_csv(path: &Path, ligands: &[Ligand]) -> Result<(), CoordinatorError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| io_err("failed to create train csv", err))?;

    writer
        .write_record(["smiles", "standard_value"])
        .map_err(|err| io_err("failed to write train csv header", err))?;

    for ligand in ligands {
        let value = ligand
            .std_value
            .ok_or_else(|| io_err("ligand missing std_value for train csv", &ligand.smiles))?;
        writer
            .write_record([ligand.smiles.as_str(), &value.to_string()])
            .map_err(|err| io_err("failed to write train csv row", err))?;
    }

    writer
        .flush()
        .map_err(|err| io_err("failed to flush train csv", err))
}

/// Write untested ligands as a single `smiles` column.
pub fn write_test_csv(path: &Path, ligands: &[Ligand]) -> Result<(), CoordinatorError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| io_err("failed to create test csv", err))?;

    writer
        .write_record(["smiles"])
        .map_err(|err| io_err("failed to write test csv header", err))?;

    for ligand in ligands {
        writer
            .write_record([ligand.smiles.as_str()])
            .map_err(|err| io_err("failed to write test csv row", err))?;
    }

    writer
        .flush()
        .map_err(|err| io_err("failed to flush test csv", err))
}

/// Read back a `smiles,predicted_value` CSV produced by the executor.
pub fn read_predictions(path: &Path) -> Result<Vec<(String, f64)>, CoordinatorError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| io_err("failed to open predictions csv", err))?;

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| io_err("failed to read predictions row", err))?;
        let smiles = record
            .get(0)
            .ok_or_else(|| io_err("predictions row missing smiles column", ""))?
            .to_string();
        let value: f64 = record
            .get(1)
            .ok_or_else(|| io_err("predictions row missing value column", ""))?
            .parse()
            .map_err(|err| io_err("failed to parse predicted value", err))?;
        out.push((smiles, value));
    }

    Ok(out)
}

/// Write an arbitrary `smiles,predicted_value` file. Used by tests and by fakes
/// that stand in for the executor's CSV output.
pub fn write_predictions(path: &Path, rows: &[(String, f64)]) -> Result<(), CoordinatorError> {
    let mut file = std::fs::File::create(path).map_err(|err| io_err("failed to create predictions csv", err))?;
    writeln!(file, "smiles,predicted_value").map_err(|err| io_err("failed to write header", err))?;
    for (smiles, value) in rows {
        writeln!(file, "{smiles},{value}").map_err(|err| io_err("failed to write row", err))?;
    }
    Ok(())
}
