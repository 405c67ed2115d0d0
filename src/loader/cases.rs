//! Cumulative confirmed-case time series (JHU CSSE `confirmed_US` layout).
//!
//! The header row decides what each column is: `FIPS` is the county key,
//! `Combined_Key` the display name, and every header that parses as a date
//! is one day of cumulative counts. Remaining metadata columns are dropped.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::fips::CountyId;
use crate::series::DailyCaseSeries;

const TABLE: &str = "case table";
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%Y-%m-%d"];

/// All county case series, sharing one chronologically sorted date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseTable {
    /// Strictly increasing.
    pub dates: Vec<NaiveDate>,
    pub series: Vec<DailyCaseSeries>,
    /// Rows skipped because their `FIPS` cell was empty.
    pub rows_without_fips: usize,
}

/// Opens and reads the case CSV at `path`.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_cases(path: &Path) -> Result<CaseTable> {
    let file =
        File::open(path).with_context(|| format!("failed to open case table {}", path.display()))?;
    let table =
        read_cases(file).with_context(|| format!("failed to read case table {}", path.display()))?;
    info!(
        rows = table.series.len(),
        days = table.dates.len(),
        skipped = table.rows_without_fips,
        "Case table loaded"
    );
    Ok(table)
}

/// Parses a column header as a calendar date, if it is one.
pub fn parse_date_header(header: &str) -> Option<NaiveDate> {
    let header = header.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(header, fmt).ok())
}

pub fn read_cases<R: Read>(reader: R) -> Result<CaseTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let fips_col = headers
        .iter()
        .position(|h| h.trim() == "FIPS")
        .ok_or(PipelineError::MissingColumn {
            column: "FIPS",
            table: TABLE,
        })?;
    let name_col = headers.iter().position(|h| h.trim() == "Combined_Key");

    let mut date_cols: Vec<(NaiveDate, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| parse_date_header(h).map(|d| (d, i)))
        .collect();
    if date_cols.is_empty() {
        return Err(PipelineError::NoDateColumns.into());
    }

    // file order is not trusted to be chronological
    date_cols.sort_by_key(|(date, _)| *date);
    if let Some(pair) = date_cols.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(PipelineError::DuplicateDate(pair[0].0).into());
    }
    debug!(
        first = %date_cols[0].0,
        last = %date_cols[date_cols.len() - 1].0,
        days = date_cols.len(),
        "Classified case table columns"
    );

    let mut seen = HashSet::new();
    let mut series = Vec::new();
    let mut rows_without_fips = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = row + 2;

        let Some(id) = CountyId::parse_case_fips(record.get(fips_col).unwrap_or(""))
            .with_context(|| format!("line {line}"))?
        else {
            rows_without_fips += 1;
            continue;
        };

        if !seen.insert(id) {
            return Err(PipelineError::DuplicateCounty { id, table: TABLE }.into());
        }

        let name = name_col
            .and_then(|c| record.get(c))
            .unwrap_or("")
            .trim()
            .to_string();

        let cumulative = date_cols
            .iter()
            .map(|(date, col)| parse_count(record.get(*col).unwrap_or("")).with_context(|| {
                format!("line {line}: county {id} on {date}")
            }))
            .collect::<Result<Vec<f64>>>()?;

        series.push(DailyCaseSeries {
            id,
            name,
            cumulative,
        });
    }

    if rows_without_fips > 0 {
        warn!(rows = rows_without_fips, "Skipped case rows without a FIPS code");
    }

    Ok(CaseTable {
        dates: date_cols.into_iter().map(|(date, _)| date).collect(),
        series,
        rows_without_fips,
    })
}

fn parse_count(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid case count {raw:?}"))?;
    anyhow::ensure!(value.is_finite(), "invalid case count {raw:?}");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,1/22/20,1/23/20,1/24/20
84001001,US,USA,840,1001.0,Autauga,Alabama,US,32.5,-86.6,\"Autauga, Alabama, US\",0,1,3
84001003,US,USA,840,1003.0,Baldwin,Alabama,US,30.7,-87.7,\"Baldwin, Alabama, US\",2,2,2
84080001,US,USA,840,80001.0,Out of AL,Alabama,US,0,0,\"Out of AL, Alabama, US\",0,0,0
16,AS,ASM,16,,,American Samoa,US,-14.2,-170.1,\"American Samoa, US\",0,0,0
";

    #[test]
    fn test_parse_date_header() {
        assert_eq!(
            parse_date_header("1/22/20"),
            NaiveDate::from_ymd_opt(2020, 1, 22)
        );
        assert_eq!(
            parse_date_header("2020-12-31"),
            NaiveDate::from_ymd_opt(2020, 12, 31)
        );
        assert_eq!(parse_date_header("Combined_Key"), None);
        assert_eq!(parse_date_header("Lat"), None);
    }

    #[test]
    fn test_read_cases_drops_metadata() {
        let table = read_cases(SAMPLE.as_bytes()).unwrap();

        assert_eq!(table.dates.len(), 3);
        assert_eq!(table.series.len(), 3);
        assert_eq!(table.rows_without_fips, 1);

        let autauga = &table.series[0];
        assert_eq!(autauga.id.to_string(), "01001");
        assert_eq!(autauga.name, "Autauga, Alabama, US");
        assert_eq!(autauga.cumulative, vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_dates_are_sorted_regardless_of_column_order() {
        let csv = "FIPS,1/24/20,1/22/20,1/23/20\n1001,30,10,20\n";
        let table = read_cases(csv.as_bytes()).unwrap();

        assert_eq!(
            table.dates,
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 22).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 23).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 24).unwrap(),
            ]
        );
        assert_eq!(table.series[0].cumulative, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_missing_fips_column_is_fatal() {
        let csv = "UID,1/22/20\n1,0\n";
        let err = read_cases(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("FIPS"));
    }

    #[test]
    fn test_no_date_columns_is_fatal() {
        let csv = "FIPS,Combined_Key\n1001,x\n";
        let err = read_cases(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoDateColumns)
        ));
    }

    #[test]
    fn test_malformed_fips_is_fatal() {
        let csv = "FIPS,1/22/20\n10.5,0\n";
        assert!(read_cases(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_duplicate_date_is_fatal() {
        let csv = "FIPS,1/22/20,2020-01-22\n1001,0,0\n";
        let err = read_cases(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DuplicateDate(_))
        ));
    }
}
