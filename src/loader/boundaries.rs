//! County boundary polygons from a GeoJSON feature collection.
//!
//! The Census cartographic boundary shapefile converts directly with
//! `ogr2ogr -f GeoJSON`; its `STATEFP`, `COUNTYFP`, `ALAND` and `NAME`
//! attributes become feature properties.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, Value};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::fips::CountyId;

const TABLE: &str = "boundary table";

/// Square metres per square mile, as used for the original area column.
pub const SQ_METRES_PER_SQ_MILE: f64 = 2.59e6;

/// One county outline in geographic (lon/lat) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRecord {
    pub id: CountyId,
    pub name: Option<String>,
    pub land_area_sq_mi: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

/// Opens and reads the boundary GeoJSON at `path`.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_boundaries(path: &Path, max_state_fips: u32) -> Result<Vec<BoundaryRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read boundary file {}", path.display()))?;
    let records = read_boundaries(&text, max_state_fips)
        .with_context(|| format!("failed to parse boundary file {}", path.display()))?;
    info!(features = records.len(), "Boundary table loaded");
    Ok(records)
}

/// Parses a feature collection, dropping features whose state code exceeds
/// `max_state_fips`.
pub fn read_boundaries(text: &str, max_state_fips: u32) -> Result<Vec<BoundaryRecord>> {
    let collection: FeatureCollection = text.parse()?;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(collection.features.len());
    let mut filtered = 0usize;

    for (index, feature) in collection.features.into_iter().enumerate() {
        let state = code_property(&feature, "STATEFP")
            .with_context(|| format!("feature {index}"))?;
        if state > max_state_fips {
            filtered += 1;
            continue;
        }
        let county = code_property(&feature, "COUNTYFP")
            .with_context(|| format!("feature {index}"))?;
        let id = CountyId::from_parts(state, county)?;

        if !seen.insert(id) {
            return Err(PipelineError::DuplicateCounty { id, table: TABLE }.into());
        }

        let name = feature
            .property("NAME")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        let land_area_sq_mi = feature
            .property("ALAND")
            .and_then(JsonValue::as_f64)
            .map(|m2| m2 / SQ_METRES_PER_SQ_MILE);

        let geometry = county_geometry(id, feature)?;

        records.push(BoundaryRecord {
            id,
            name,
            land_area_sq_mi,
            geometry,
        });
    }

    debug!(kept = records.len(), filtered, "Parsed boundary features");
    Ok(records)
}

/// Reads a FIPS code property that may be stored as `"01"` or `1`.
fn code_property(feature: &Feature, key: &'static str) -> Result<u32> {
    let kind = if key == "STATEFP" { "state" } else { "county" };
    let value = feature.property(key).ok_or(PipelineError::MissingColumn {
        column: key,
        table: TABLE,
    })?;

    let code = match value {
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        _ => None,
    };

    code.ok_or_else(|| {
        PipelineError::InvalidCode {
            kind,
            value: value.to_string(),
        }
        .into()
    })
}

fn county_geometry(id: CountyId, feature: Feature) -> Result<MultiPolygon<f64>> {
    let Some(geometry) = feature.geometry else {
        return Err(PipelineError::UnsupportedGeometry {
            id,
            kind: "null".to_string(),
        }
        .into());
    };

    let kind = value_kind(&geometry.value);
    if !matches!(geometry.value, Value::Polygon(_) | Value::MultiPolygon(_)) {
        return Err(PipelineError::UnsupportedGeometry {
            id,
            kind: kind.to_string(),
        }
        .into());
    }

    match Geometry::<f64>::try_from(geometry.value)? {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        _ => Err(PipelineError::UnsupportedGeometry {
            id,
            kind: kind.to_string(),
        }
        .into()),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
