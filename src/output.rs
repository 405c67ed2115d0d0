//! Output formatting and persistence for the merged dataset.
//!
//! Supports pretty-printing and JSON logging of build statistics, and writing
//! the weekly rate table as CSV.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::stats::DatasetStats;

/// Logs build statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &DatasetStats) {
    debug!("{:#?}", stats);
}

/// Logs build statistics as pretty-printed JSON.
pub fn print_json(stats: &DatasetStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Writes one row per county: id, name, population, land area, then one
/// rate column per week labelled `YYYY-MM-DD`.
pub fn write_rate_table<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut header = vec![
        "fips".to_string(),
        "name".to_string(),
        "population".to_string(),
        "land_area_sq_mi".to_string(),
    ];
    header.extend((0..dataset.weeks.len()).map(|i| dataset.week_label(i)));
    writer.write_record(&header)?;

    for county in &dataset.counties {
        let mut row = vec![
            county.id.to_string(),
            county.name.clone(),
            county.population.to_string(),
            county
                .land_area_sq_mi
                .map(|a| a.to_string())
                .unwrap_or_default(),
        ];
        row.extend(county.weekly_rates.iter().map(|r| r.to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the rate table to `path`, creating parent directories and
/// replacing any existing file.
pub fn save_rate_table(path: &Path, dataset: &Dataset) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_rate_table(file, dataset)?;
    info!(path = %path.display(), counties = dataset.counties.len(), "Rate table written");
    Ok(())
}
