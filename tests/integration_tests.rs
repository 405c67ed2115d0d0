use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use covid_county_maps::config::{PipelineConfig, ZeroPopulationPolicy};
use covid_county_maps::dataset::Dataset;
use covid_county_maps::error::PipelineError;
use covid_county_maps::fips::CountyId;
use covid_county_maps::output::{save_rate_table, write_rate_table};
use covid_county_maps::render::{
    FrameSequence, MovieRenderer, StaticMapRenderer, TextOptions, VideoEncoder,
};
use tempfile::TempDir;

/// Writes the three input files for a small synthetic country and returns a
/// config pointing at them.
///
/// - 01001: population 1000, cumulative cases double every day
/// - 01003: population 2000, cumulative cases never change
/// - 01005: population 0
/// - 01007: population only, no outline
/// - 01009: outline and cases, no population
fn write_inputs(dir: &Path) -> PipelineConfig {
    let population = "\
SUMLEV,STATE,COUNTY,CTYNAME,POPESTIMATE2019
050,01,001,First County,1000
050,01,003,Second County,2000
050,01,005,Empty County,0
050,01,007,Outline-less County,500
";
    std::fs::write(dir.join("pop.csv"), population).unwrap();

    let features: Vec<String> = [1, 3, 5, 9]
        .iter()
        .enumerate()
        .map(|(i, county)| {
            let lon = -100.0 + i as f64;
            format!(
                r#"{{"type":"Feature","properties":{{"STATEFP":"01","COUNTYFP":"{county:03}","NAME":"C{county}","ALAND":2590000000}},
                "geometry":{{"type":"Polygon","coordinates":[[[{lon},40.0],[{lon1},40.0],[{lon1},41.0],[{lon},41.0],[{lon},40.0]]]}}}}"#,
                lon1 = lon + 0.9
            )
        })
        .collect();
    let boundaries = format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    );
    std::fs::write(dir.join("counties.geojson"), boundaries).unwrap();

    let start = NaiveDate::from_ymd_opt(2020, 1, 22).unwrap();
    let mut cases = String::from("UID,FIPS,Combined_Key");
    for day in 0..14 {
        let date = start + Duration::days(day);
        write!(cases, ",{}", date.format("%-m/%-d/%y")).unwrap();
    }
    cases.push('\n');
    let rows: [(&str, &str, fn(u32) -> u64); 4] = [
        ("84001001", "1001.0", |d| 1u64 << d),
        ("84001003", "1003.0", |_| 7),
        ("84001005", "1005.0", |d| d as u64),
        ("84001009", "1009.0", |d| d as u64),
    ];
    for (uid, fips, cumulative) in rows {
        write!(cases, "{uid},{fips},\"County {fips}, Alabama, US\"").unwrap();
        for day in 0..14 {
            write!(cases, ",{}", cumulative(day)).unwrap();
        }
        cases.push('\n');
    }
    // row without a county code, as for cruise ships in the real data
    cases.push_str("84088888,,\"Grand Princess, US\"");
    for _ in 0..14 {
        cases.push_str(",1");
    }
    cases.push('\n');
    std::fs::write(dir.join("cases.csv"), cases).unwrap();

    PipelineConfig {
        population_path: dir.join("pop.csv"),
        boundaries_path: dir.join("counties.geojson"),
        cases_path: dir.join("cases.csv"),
        maps_dir: dir.join("maps"),
        movie_path: dir.join("out").join("movie.mp4"),
        table_path: dir.join("out").join("rates.csv"),
        annotate: false,
        ..Default::default()
    }
}

fn id(v: u32) -> CountyId {
    CountyId::from_u32(v).unwrap()
}

fn fixture() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());
    (dir, config)
}

#[test]
fn test_full_pipeline_rates() {
    let (_dir, config) = fixture();
    let dataset = Dataset::load(&config).expect("Failed to build dataset");

    assert_eq!(
        dataset.weeks,
        vec![
            NaiveDate::from_ymd_opt(2020, 2, 2).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 9).unwrap(),
        ]
    );

    let ids: Vec<CountyId> = dataset.counties.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![id(1001), id(1003)]);

    // days 5..=11 add 2^4..=2^10, days 12..=13 add 2^11 + 2^12
    assert_eq!(dataset.counties[0].weekly_rates, vec![2032.0, 6144.0]);
    assert_eq!(dataset.counties[1].weekly_rates, vec![0.0, 0.0]);
    assert_eq!(dataset.counties[0].name, "County 1001.0, Alabama, US");
    assert_eq!(dataset.counties[0].land_area_sq_mi, Some(1000.0));
}

#[test]
fn test_join_cardinality_and_stats() {
    let (_dir, config) = fixture();
    let dataset = Dataset::load(&config).unwrap();
    let stats = &dataset.stats;

    assert_eq!(stats.population_rows, 4);
    assert_eq!(stats.boundary_features, 4);
    // 01007 has no outline, 01009 has no population
    assert_eq!(stats.counties_with_geometry, 3);
    assert_eq!(stats.case_rows, 4);
    assert_eq!(stats.case_rows_without_fips, 1);
    assert_eq!(stats.counties_with_cases, 3);
    assert_eq!(stats.zero_population_excluded, 1);
    assert_eq!(stats.counties, 2);
    assert_eq!(stats.days, 14);
    assert_eq!(stats.weeks, 2);
}

#[test]
fn test_zero_population_fails_when_configured() {
    let (_dir, mut config) = fixture();
    config.zero_population = ZeroPopulationPolicy::Fail;

    let err = Dataset::load(&config).unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::ZeroPopulation(county)) => assert_eq!(*county, id(1005)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_rebuild_is_idempotent() {
    let (dir, config) = fixture();

    let first = Dataset::load(&config).unwrap();
    save_rate_table(&config.table_path, &first).unwrap();
    let first_bytes = std::fs::read(&config.table_path).unwrap();

    let second = Dataset::load(&config).unwrap();
    let second_path = dir.path().join("rates_again.csv");
    save_rate_table(&second_path, &second).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_bytes, std::fs::read(&second_path).unwrap());
}

#[test]
fn test_rate_table_contents() {
    let (_dir, config) = fixture();
    let dataset = Dataset::load(&config).unwrap();

    let mut buf = Vec::new();
    write_rate_table(&mut buf, &dataset).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();

    assert_eq!(
        lines.next(),
        Some("fips,name,population,land_area_sq_mi,2020-02-02,2020-02-09")
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("01001,"));
    assert!(first.ends_with(",2032,6144") || first.ends_with(",2032.0,6144.0"));
    assert_eq!(lines.count(), 1);
}

#[test]
fn test_missing_input_names_the_file() {
    let (_dir, mut config) = fixture();
    config.cases_path = PathBuf::from("/nonexistent/cases.csv");

    let err = Dataset::load(&config).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/cases.csv"));
}

#[test]
fn test_static_maps_for_every_week() {
    let (_dir, config) = fixture();
    let dataset = Dataset::load(&config).unwrap();

    let mut renderer = StaticMapRenderer::new(TextOptions::from(&config));
    renderer.size = (240, 160);
    let written = renderer.render_all(&dataset, &config.maps_dir).unwrap();

    assert_eq!(
        written,
        vec![
            config.maps_dir.join("2020-02-02.png"),
            config.maps_dir.join("2020-02-09.png"),
        ]
    );
}

/// Writes a placeholder file instead of running a real encoder.
struct FakeEncoder {
    available: bool,
}

impl VideoEncoder for FakeEncoder {
    fn check_available(&self) -> covid_county_maps::error::Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(PipelineError::EncoderUnavailable {
                program: "fake".to_string(),
                reason: "not installed".to_string(),
            })
        }
    }

    fn encode(
        &self,
        frames: &FrameSequence,
        _fps: u32,
        output: &Path,
    ) -> covid_county_maps::error::Result<()> {
        assert!((0..frames.count).all(|i| frames.frame_path(i).exists()));
        std::fs::write(output, b"video").unwrap();
        Ok(())
    }
}

#[test]
fn test_movie_encodes_every_week() {
    let (_dir, config) = fixture();
    let dataset = Dataset::load(&config).unwrap();

    let mut renderer = MovieRenderer::new(
        FakeEncoder { available: true },
        TextOptions::from(&config),
    );
    renderer.size = (240, 160);

    assert_eq!(renderer.render(&dataset, &config.movie_path).unwrap(), 2);
    assert!(config.movie_path.exists());
}

#[test]
fn test_movie_without_encoder_writes_nothing() {
    let (_dir, config) = fixture();
    let dataset = Dataset::load(&config).unwrap();

    let renderer = MovieRenderer::new(
        FakeEncoder { available: false },
        TextOptions::from(&config),
    );

    assert!(renderer.render(&dataset, &config.movie_path).is_err());
    assert!(!config.movie_path.exists());
}
