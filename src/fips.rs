//! Canonical county identifier.
//!
//! The population and boundary tables carry separate state and county codes,
//! while the case table carries a single numeric FIPS value (often written as
//! a float, e.g. `1001.0`). Both are normalized into [`CountyId`] so every join
//! in the pipeline uses one key type.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{PipelineError, Result};

const MAX_STATE: u32 = 99;
const MAX_COUNTY: u32 = 999;
const MAX_ID: u32 = 99_999;

/// Five-digit county FIPS code stored as `state * 1000 + county`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountyId(u32);

impl CountyId {
    /// Combines a 2-digit state code and a 3-digit county code.
    pub fn from_parts(state: u32, county: u32) -> Result<Self> {
        if state > MAX_STATE {
            return Err(PipelineError::InvalidCode {
                kind: "state",
                value: state.to_string(),
            });
        }
        if county > MAX_COUNTY {
            return Err(PipelineError::InvalidCode {
                kind: "county",
                value: county.to_string(),
            });
        }
        Ok(Self(state * 1000 + county))
    }

    /// Parses textual state and county codes such as `"01"` and `"001"`.
    pub fn from_code_strs(state: &str, county: &str) -> Result<Self> {
        let state = parse_code("state", state)?;
        let county = parse_code("county", county)?;
        Self::from_parts(state, county)
    }

    /// Parses the case table's FIPS cell. Accepts `1001` and `1001.0`.
    ///
    /// Returns `Ok(None)` for an empty cell.
    pub fn parse_case_fips(raw: &str) -> Result<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        if let Ok(v) = raw.parse::<u32>() {
            return Self::from_u32(v).map(Some);
        }

        let invalid = || PipelineError::InvalidCountyId(raw.to_string());
        let v: f64 = raw.parse().map_err(|_| invalid())?;
        if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > MAX_ID as f64 {
            return Err(invalid());
        }
        Self::from_u32(v as u32).map(Some)
    }

    pub fn from_u32(v: u32) -> Result<Self> {
        if v > MAX_ID {
            return Err(PipelineError::InvalidCountyId(v.to_string()));
        }
        Ok(Self(v))
    }

    pub fn state(&self) -> u32 {
        self.0 / 1000
    }

    pub fn county(&self) -> u32 {
        self.0 % 1000
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

impl Serialize for CountyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_code(kind: &'static str, raw: &str) -> Result<u32> {
    raw.trim().parse().map_err(|_| PipelineError::InvalidCode {
        kind,
        value: raw.to_string(),
    })
}
