//! Pipeline configuration.
//!
//! Defaults are the input layout and constants of the published maps. Each
//! value can be overridden through a `COVID_MAPS_*` environment variable (a
//! `.env` file is loaded by the binary before this runs).

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Weekday;

use crate::error::{PipelineError, Result};

/// How to treat a negative day-over-day change in a cumulative count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeDeltaPolicy {
    /// Replace the negative delta with zero (data corrections are not cases).
    #[default]
    Clamp,
    /// Keep the negative delta as-is.
    Keep,
}

impl FromStr for NegativeDeltaPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "keep" => Ok(Self::Keep),
            other => Err(format!("unknown negative delta policy {other:?}")),
        }
    }
}

/// What to do with a county whose population estimate is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroPopulationPolicy {
    /// Drop the county from the dataset and log it.
    #[default]
    Exclude,
    /// Abort the build.
    Fail,
}

impl FromStr for ZeroPopulationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(Self::Exclude),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown zero population policy {other:?}")),
        }
    }
}

/// Everything needed to build the dataset and render it.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub population_path: PathBuf,
    pub boundaries_path: PathBuf,
    pub cases_path: PathBuf,
    pub maps_dir: PathBuf,
    pub movie_path: PathBuf,
    pub table_path: PathBuf,
    pub negative_deltas: NegativeDeltaPolicy,
    pub zero_population: ZeroPopulationPolicy,
    /// Boundary features with a higher state code are dropped (56 keeps the
    /// 50 states and DC, removing territories).
    pub max_state_fips: u32,
    /// Raw dates skipped before weekly resampling.
    pub leading_days_dropped: usize,
    pub week_end: Weekday,
    /// Draw text (week labels, colourbar ticks) on rendered images.
    pub annotate: bool,
    /// TrueType font used for labels when `annotate` is set.
    pub font_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            population_path: PathBuf::from("geo_pop_data/county_pop.csv"),
            boundaries_path: PathBuf::from("geo_pop_data/cb_2019_us_county_500k.geojson"),
            cases_path: PathBuf::from("covid_data/time_series_covid19_confirmed_US.csv"),
            maps_dir: PathBuf::from("plots/maps"),
            movie_path: PathBuf::from("plots/worst_counties.mp4"),
            table_path: PathBuf::from("plots/county_rates.csv"),
            negative_deltas: NegativeDeltaPolicy::Clamp,
            zero_population: ZeroPopulationPolicy::Exclude,
            max_state_fips: 56,
            leading_days_dropped: 5,
            week_end: Weekday::Sun,
            annotate: true,
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
        }
    }
}

impl PipelineConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, falling back to [`Default`] values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("COVID_MAPS_POPULATION") {
            config.population_path = v.into();
        }
        if let Some(v) = lookup("COVID_MAPS_BOUNDARIES") {
            config.boundaries_path = v.into();
        }
        if let Some(v) = lookup("COVID_MAPS_CASES") {
            config.cases_path = v.into();
        }
        if let Some(v) = lookup("COVID_MAPS_MAPS_DIR") {
            config.maps_dir = v.into();
        }
        if let Some(v) = lookup("COVID_MAPS_MOVIE") {
            config.movie_path = v.into();
        }
        if let Some(v) = lookup("COVID_MAPS_TABLE") {
            config.table_path = v.into();
        }
        if let Some(v) = lookup("COVID_MAPS_NEGATIVE_DELTAS") {
            config.negative_deltas = parse_setting("COVID_MAPS_NEGATIVE_DELTAS", &v)?;
        }
        if let Some(v) = lookup("COVID_MAPS_ZERO_POPULATION") {
            config.zero_population = parse_setting("COVID_MAPS_ZERO_POPULATION", &v)?;
        }
        if let Some(v) = lookup("COVID_MAPS_MAX_STATE_FIPS") {
            config.max_state_fips = parse_setting("COVID_MAPS_MAX_STATE_FIPS", &v)?;
        }
        if let Some(v) = lookup("COVID_MAPS_ANNOTATE") {
            config.annotate = parse_setting("COVID_MAPS_ANNOTATE", &v)?;
        }
        if let Some(v) = lookup("COVID_MAPS_FONT") {
            config.font_path = v.into();
        }

        Ok(config)
    }
}

fn parse_setting<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        })
}
