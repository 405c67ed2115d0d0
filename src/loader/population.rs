//! County population estimates (Census `co-est2019-alldata` layout).

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::fips::CountyId;

const TABLE: &str = "population table";

#[derive(Debug, Deserialize)]
struct PopulationRow {
    #[serde(rename = "STATE")]
    state: String,
    #[serde(rename = "COUNTY")]
    county: String,
    #[serde(rename = "POPESTIMATE2019")]
    population: u64,
}

/// One county's 2019 population estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationRecord {
    pub id: CountyId,
    pub population: u64,
}

/// Opens and reads the population CSV at `path`.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_population(path: &Path) -> Result<Vec<PopulationRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open population table {}", path.display()))?;
    let records = read_population(file)
        .with_context(|| format!("failed to read population table {}", path.display()))?;
    info!(rows = records.len(), "Population table loaded");
    Ok(records)
}

/// Reads `STATE`, `COUNTY` and `POPESTIMATE2019`; every other column is ignored.
///
/// Rows are read as raw bytes because the Census file is Latin-1 encoded;
/// only the three columns used here must be valid text.
pub fn read_population<R: Read>(reader: R) -> Result<Vec<PopulationRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.byte_headers()?.clone();

    for column in ["STATE", "COUNTY", "POPESTIMATE2019"] {
        if !headers.iter().any(|h| h == column.as_bytes()) {
            return Err(PipelineError::MissingColumn {
                column,
                table: TABLE,
            }
            .into());
        }
    }

    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (row, result) in rdr.byte_records().enumerate() {
        let record = result?;
        let parsed: PopulationRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("row {}", row + 1))?;
        let id = CountyId::from_code_strs(&parsed.state, &parsed.county)
            .with_context(|| format!("row {}", row + 1))?;

        if !seen.insert(id) {
            return Err(PipelineError::DuplicateCounty { id, table: TABLE }.into());
        }

        records.push(PopulationRecord {
            id,
            population: parsed.population,
        });
    }

    debug!(rows = records.len(), "Parsed population rows");
    Ok(records)
}
