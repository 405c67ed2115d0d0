//! Joins the three inputs into weekly per-capita incidence per county.
//!
//! load → join population with geometry → difference and resample cases →
//! join weekly cases → divide by population → project geometry.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use geo::MultiPolygon;
use tracing::{debug, info, warn};

use crate::config::{NegativeDeltaPolicy, PipelineConfig, ZeroPopulationPolicy};
use crate::error::PipelineError;
use crate::fips::CountyId;
use crate::loader::{
    BoundaryRecord, CaseTable, PopulationRecord, load_boundaries, load_cases, load_population,
};
use crate::projection::US_NATIONAL_ATLAS;
use crate::series::WeeklyResampler;
use crate::stats::DatasetStats;

/// Population and outline of one county, before case data is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyBase {
    pub id: CountyId,
    pub boundary_name: Option<String>,
    pub population: u64,
    pub land_area_sq_mi: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

/// Weekly new-case sums for one county.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyIncidenceSeries {
    pub id: CountyId,
    pub name: String,
    pub weekly_cases: Vec<f64>,
}

/// One fully joined county.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyRecord {
    pub id: CountyId,
    pub name: String,
    pub population: u64,
    pub land_area_sq_mi: Option<f64>,
    /// EPSG:2163 metres.
    pub geometry: MultiPolygon<f64>,
    /// New cases per 1000 residents, one entry per [`Dataset::weeks`] entry.
    pub weekly_rates: Vec<f64>,
}

/// Tunables for turning raw tables into a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    pub negative_deltas: NegativeDeltaPolicy,
    pub zero_population: ZeroPopulationPolicy,
    pub resampler: WeeklyResampler,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            negative_deltas: NegativeDeltaPolicy::Clamp,
            zero_population: ZeroPopulationPolicy::Exclude,
            resampler: WeeklyResampler::default(),
        }
    }
}

impl From<&PipelineConfig> for BuildOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            negative_deltas: config.negative_deltas,
            zero_population: config.zero_population,
            resampler: WeeklyResampler {
                leading_days_dropped: config.leading_days_dropped,
                week_end: config.week_end,
            },
        }
    }
}

/// The merged, normalized and projected county table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Week-ending dates, strictly increasing.
    pub weeks: Vec<NaiveDate>,
    /// Sorted by county id.
    pub counties: Vec<CountyRecord>,
    pub stats: DatasetStats,
}

impl Dataset {
    /// Loads the configured input files and builds the dataset.
    #[tracing::instrument(skip_all)]
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let population = load_population(&config.population_path)?;
        let boundaries = load_boundaries(&config.boundaries_path, config.max_state_fips)?;
        let cases = load_cases(&config.cases_path)?;
        Self::build(population, boundaries, cases, BuildOptions::from(config))
    }

    /// Builds the dataset from already loaded tables.
    pub fn build(
        population: Vec<PopulationRecord>,
        boundaries: Vec<BoundaryRecord>,
        cases: CaseTable,
        options: BuildOptions,
    ) -> Result<Self> {
        let mut stats = DatasetStats {
            population_rows: population.len(),
            boundary_features: boundaries.len(),
            case_rows: cases.series.len(),
            case_rows_without_fips: cases.rows_without_fips,
            days: cases.dates.len(),
            ..Default::default()
        };

        let base = join_population_geometry(population, boundaries)?;
        stats.counties_with_geometry = base.len();
        info!(
            matched = base.len(),
            matched_pct = stats.geometry_match_pct(),
            "Joined population with geometry"
        );

        let (weeks, weekly) = weekly_incidence(&cases, &options, &mut stats);
        if weeks.is_empty() {
            bail!(
                "no weekly buckets remain after dropping {} leading days of {}",
                options.resampler.leading_days_dropped,
                cases.dates.len()
            );
        }
        stats.weeks = weeks.len();

        let mut counties = normalize(base, weekly, options.zero_population, &mut stats)?;
        info!(
            matched = stats.counties_with_cases,
            matched_pct = stats.case_match_pct(),
            excluded = stats.zero_population_excluded,
            "Joined weekly cases"
        );

        for county in &mut counties {
            county.geometry = US_NATIONAL_ATLAS.project(&county.geometry)?;
        }
        stats.counties = counties.len();

        Ok(Self {
            weeks,
            counties,
            stats,
        })
    }

    /// `YYYY-MM-DD` label of week `index`.
    pub fn week_label(&self, index: usize) -> String {
        self.weeks[index].format("%Y-%m-%d").to_string()
    }

    /// Every county's rate for week `index`, in county order.
    pub fn week_rates(&self, index: usize) -> Vec<f64> {
        self.counties
            .iter()
            .map(|c| c.weekly_rates[index])
            .collect()
    }
}

/// Inner join on county id; the result is sorted by id.
pub fn join_population_geometry(
    population: Vec<PopulationRecord>,
    boundaries: Vec<BoundaryRecord>,
) -> Result<Vec<CountyBase>> {
    let population: BTreeMap<CountyId, u64> = population
        .into_iter()
        .map(|p| (p.id, p.population))
        .collect();

    let mut joined: Vec<CountyBase> = boundaries
        .into_iter()
        .filter_map(|b| {
            population.get(&b.id).map(|pop| CountyBase {
                id: b.id,
                boundary_name: b.name,
                population: *pop,
                land_area_sq_mi: b.land_area_sq_mi,
                geometry: b.geometry,
            })
        })
        .collect();
    joined.sort_by_key(|c| c.id);

    if joined.is_empty() {
        return Err(PipelineError::EmptyJoin {
            left: "population table",
            right: "boundary table",
        }
        .into());
    }
    Ok(joined)
}

/// Differences and resamples every case series onto a shared weekly axis.
pub fn weekly_incidence(
    cases: &CaseTable,
    options: &BuildOptions,
    stats: &mut DatasetStats,
) -> (Vec<NaiveDate>, Vec<WeeklyIncidenceSeries>) {
    let resampler = options.resampler;
    let plan = resampler.plan(&cases.dates);

    let series = cases
        .series
        .iter()
        .map(|s| {
            let daily = s.daily_new_cases(options.negative_deltas);
            stats.negative_deltas += daily.negative_deltas;
            if options.negative_deltas == NegativeDeltaPolicy::Clamp {
                stats.negative_deltas_clamped += daily.negative_deltas;
            }
            WeeklyIncidenceSeries {
                id: s.id,
                name: s.name.clone(),
                weekly_cases: resampler.resample(&plan, &daily),
            }
        })
        .collect();

    if stats.negative_deltas > 0 {
        debug!(
            negative_deltas = stats.negative_deltas,
            clamped = stats.negative_deltas_clamped,
            "Cumulative counts decreased"
        );
    }

    (plan.labels, series)
}

/// New cases per 1000 residents.
pub fn per_thousand(cases: f64, population: u64) -> f64 {
    1000.0 * cases / population as f64
}

/// Inner-joins weekly cases onto `base` and converts them to rates.
pub fn normalize(
    base: Vec<CountyBase>,
    weekly: Vec<WeeklyIncidenceSeries>,
    policy: ZeroPopulationPolicy,
    stats: &mut DatasetStats,
) -> Result<Vec<CountyRecord>> {
    let mut weekly: BTreeMap<CountyId, WeeklyIncidenceSeries> =
        weekly.into_iter().map(|w| (w.id, w)).collect();

    let mut counties = Vec::with_capacity(base.len());
    for county in base {
        let Some(series) = weekly.remove(&county.id) else {
            continue;
        };
        stats.counties_with_cases += 1;

        if county.population == 0 {
            match policy {
                ZeroPopulationPolicy::Fail => {
                    return Err(PipelineError::ZeroPopulation(county.id).into());
                }
                ZeroPopulationPolicy::Exclude => {
                    warn!(county = %county.id, "Excluding county with zero population");
                    stats.zero_population_excluded += 1;
                    continue;
                }
            }
        }

        let name = if series.name.is_empty() {
            county.boundary_name.unwrap_or_default()
        } else {
            series.name
        };

        counties.push(CountyRecord {
            id: county.id,
            name,
            population: county.population,
            land_area_sq_mi: county.land_area_sq_mi,
            geometry: county.geometry,
            weekly_rates: series
                .weekly_cases
                .iter()
                .map(|c| per_thousand(*c, county.population))
                .collect(),
        });
    }

    if stats.counties_with_cases == 0 {
        return Err(PipelineError::EmptyJoin {
            left: "county table",
            right: "case table",
        }
        .into());
    }
    if counties.is_empty() {
        return Err(PipelineError::AllCountiesExcluded {
            excluded: stats.zero_population_excluded,
        }
        .into());
    }
    Ok(counties)
}
