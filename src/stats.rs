use serde::Serialize;

/// Counters describing one dataset build.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    // inputs
    pub population_rows: usize,
    pub boundary_features: usize,
    pub case_rows: usize,
    pub case_rows_without_fips: usize,

    // joins
    pub counties_with_geometry: usize,
    pub counties_with_cases: usize,
    pub zero_population_excluded: usize,
    pub counties: usize,

    // series
    pub days: usize,
    pub weeks: usize,
    pub negative_deltas: usize,
    pub negative_deltas_clamped: usize,
}

impl DatasetStats {
    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of boundary features that found a population estimate.
    pub fn geometry_match_pct(&self) -> f64 {
        Self::pct(self.counties_with_geometry, self.boundary_features)
    }

    /// Share of geometry+population counties that found a case series.
    pub fn case_match_pct(&self) -> f64 {
        Self::pct(self.counties_with_cases, self.counties_with_geometry)
    }
}
