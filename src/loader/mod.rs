//! Readers for the three pipeline inputs.
//!
//! Each reader has a `read_*` form over an in-memory reader (used by tests)
//! and a `load_*` form that opens a path and adds file context to errors.

pub mod boundaries;
pub mod cases;
pub mod population;

pub use boundaries::{BoundaryRecord, load_boundaries, read_boundaries};
pub use cases::{CaseTable, load_cases, read_cases};
pub use population::{PopulationRecord, load_population, read_population};
