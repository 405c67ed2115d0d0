use chrono::NaiveDate;
use thiserror::Error;

use crate::fips::CountyId;

/// Errors raised by the county incidence pipeline.
///
/// Every variant is fatal; callers propagate them with `anyhow` context.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A state or county code could not be read as an integer of the right width
    #[error("invalid {kind} code {value:?}")]
    InvalidCode { kind: &'static str, value: String },

    /// A combined county identifier was not a non-negative integer <= 99999
    #[error("invalid county identifier {0:?}")]
    InvalidCountyId(String),

    /// The same county appeared twice in one input table
    #[error("county {id} appears more than once in {table}")]
    DuplicateCounty { id: CountyId, table: &'static str },

    /// The same calendar date appeared twice in the case table header
    #[error("date {0} appears more than once in the case table")]
    DuplicateDate(NaiveDate),

    /// A required column is absent from an input table
    #[error("missing column {column:?} in {table}")]
    MissingColumn {
        column: &'static str,
        table: &'static str,
    },

    /// The case table has no column whose header parses as a date
    #[error("case table has no date columns")]
    NoDateColumns,

    /// A boundary feature carried something other than (multi)polygons
    #[error("county {id}: unsupported geometry type {kind}")]
    UnsupportedGeometry { id: CountyId, kind: String },

    /// An inner join matched no counties
    #[error("joining {left} with {right} matched no counties")]
    EmptyJoin {
        left: &'static str,
        right: &'static str,
    },

    /// Every joined county was dropped for having zero population
    #[error("no counties remain after excluding {excluded} with zero population")]
    AllCountiesExcluded { excluded: usize },

    /// A county has a population of zero and the policy forbids excluding it
    #[error("county {0} has zero population")]
    ZeroPopulation(CountyId),

    /// A coordinate cannot be projected (antipode of the projection centre)
    #[error("coordinate ({lon}, {lat}) cannot be projected")]
    Projection { lon: f64, lat: f64 },

    /// The external video encoder is not installed or not runnable
    #[error("video encoder {program:?} is unavailable: {reason}")]
    EncoderUnavailable { program: String, reason: String },

    /// The external video encoder ran but reported failure
    #[error("video encoder exited with {0}")]
    EncoderFailed(String),

    /// The drawing backend failed
    #[error("render error: {0}")]
    Render(String),

    /// A configuration value could not be parsed
    #[error("invalid value {value:?} for {key}")]
    InvalidSetting { key: String, value: String },
}

/// Type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
