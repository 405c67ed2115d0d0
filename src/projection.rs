//! EPSG:2163, the US National Atlas Equal Area projection.
//!
//! A spherical Lambert azimuthal equal-area projection centred on 45°N 100°W
//! with radius 6 370 997 m and no false easting or northing.

use geo::{Coord, MapCoords, MultiPolygon};

use crate::error::{PipelineError, Result};

/// Forward projection from lon/lat degrees to metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertAzimuthalEqualArea {
    pub radius: f64,
    pub lat0: f64,
    pub lon0: f64,
}

/// Parameters of EPSG:2163.
pub const US_NATIONAL_ATLAS: LambertAzimuthalEqualArea = LambertAzimuthalEqualArea {
    radius: 6_370_997.0,
    lat0: 45.0,
    lon0: -100.0,
};

impl LambertAzimuthalEqualArea {
    /// Projects one coordinate (`x` = longitude, `y` = latitude).
    pub fn forward(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let (sin_phi0, cos_phi0) = self.lat0.to_radians().sin_cos();
        let (sin_phi, cos_phi) = c.y.to_radians().sin_cos();
        let (sin_dl, cos_dl) = (c.x - self.lon0).to_radians().sin_cos();

        let denom = 1.0 + sin_phi0 * sin_phi + cos_phi0 * cos_phi * cos_dl;
        if denom <= 1e-12 {
            return Err(PipelineError::Projection { lon: c.x, lat: c.y });
        }
        let k = (2.0 / denom).sqrt();

        Ok(Coord {
            x: self.radius * k * cos_phi * sin_dl,
            y: self.radius * k * (cos_phi0 * sin_phi - sin_phi0 * cos_phi * cos_dl),
        })
    }

    pub fn project(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        geometry.try_map_coords(|c| self.forward(c))
    }
}
