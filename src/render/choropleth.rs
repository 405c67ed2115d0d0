//! Shared choropleth drawing used by both the weekly images and the movie.

use std::ops::Range;

use geo::{Area, BoundingRect, Rect};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::classify::PercentileScheme;
use crate::colormap::Colormap;
use crate::dataset::{CountyRecord, Dataset};
use crate::error::Result;
use crate::render::render_err;

pub type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const EDGE_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Visible window in projected metres.
#[derive(Debug, Clone, PartialEq)]
pub struct MapExtent {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

/// Contiguous United States in EPSG:2163.
pub const CONUS_EXTENT: MapExtent = MapExtent {
    x: -2.2e6..2.7e6,
    y: -2.3e6..9e5,
};

impl MapExtent {
    pub fn width(&self) -> f64 {
        self.x.end - self.x.start
    }

    pub fn height(&self) -> f64 {
        self.y.end - self.y.start
    }

    /// Margins `(top, bottom, left, right)` in pixels that centre the extent
    /// in a `width` x `height` area without distorting its aspect ratio.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let scale = (width as f64 / self.width()).min(height as f64 / self.height());
        let used_w = (self.width() * scale).round() as u32;
        let used_h = (self.height() * scale).round() as u32;

        let spare_w = width.saturating_sub(used_w);
        let spare_h = height.saturating_sub(used_h);
        let left = spare_w / 2;
        let top = spare_h / 2;
        (top, spare_h - top, left, spare_w - left)
    }

    /// Whether any part of `rect` lies inside the extent.
    pub fn intersects(&self, rect: &Rect<f64>) -> bool {
        rect.min().x < self.x.end
            && rect.max().x > self.x.start
            && rect.min().y < self.y.end
            && rect.max().y > self.y.start
    }
}

/// County indices ordered largest area first, so enclaves are drawn on top
/// of the county that surrounds them.
pub fn drawing_order(counties: &[CountyRecord]) -> Vec<usize> {
    let areas: Vec<f64> = counties.iter().map(|c| c.geometry.unsigned_area()).collect();
    let mut order: Vec<usize> = (0..counties.len()).collect();
    order.sort_by(|a, b| areas[*b].total_cmp(&areas[*a]).then(a.cmp(b)));
    order
}

/// Fill colour of every county for one week, in county order.
///
/// Shades are spread over the classes that occur this week, not over every
/// class of the scheme.
pub fn week_fills(
    dataset: &Dataset,
    week: usize,
    scheme: &PercentileScheme,
    colormap: &Colormap,
) -> Vec<RGBColor> {
    let classification = scheme.classify(&dataset.week_rates(week));
    let lowest = classification.classes.iter().copied().min().unwrap_or(0);
    let highest = classification.classes.iter().copied().max().unwrap_or(0);
    classification
        .classes
        .iter()
        .map(|k| {
            let [r, g, b] = colormap.class_color(*k, lowest, highest);
            RGBColor(r, g, b)
        })
        .collect()
}

/// Fills and outlines every county inside `extent`, with no axes.
///
/// Only exterior rings are drawn; holes are covered by the enclosed county,
/// which comes later in `order`.
pub fn draw_counties(
    area: &Canvas<'_>,
    counties: &[CountyRecord],
    order: &[usize],
    fills: &[RGBColor],
    extent: &MapExtent,
) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    let (top, bottom, left, right) = extent.fit(w, h);
    let map_area = area.margin(top, bottom, left, right);

    let mut chart = ChartBuilder::on(&map_area)
        .build_cartesian_2d(extent.x.clone(), extent.y.clone())
        .map_err(render_err)?;

    // counties entirely outside the window (Alaska, Hawaii) are not drawn
    let visible: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&i| {
            counties[i]
                .geometry
                .bounding_rect()
                .is_some_and(|r| extent.intersects(&r))
        })
        .collect();

    let rings = |i: usize| {
        counties[i]
            .geometry
            .0
            .iter()
            .map(|poly| {
                poly.exterior()
                    .coords()
                    .map(|c| (c.x, c.y))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    };

    chart
        .draw_series(visible.iter().flat_map(|&i| {
            let fill = fills[i].filled();
            rings(i)
                .into_iter()
                .map(move |ring| Polygon::new(ring, fill))
        }))
        .map_err(render_err)?;

    chart
        .draw_series(visible.iter().flat_map(|&i| {
            rings(i)
                .into_iter()
                .map(|ring| PathElement::new(ring, EDGE_COLOR.stroke_width(1)))
        }))
        .map_err(render_err)?;

    Ok(())
}

/// Draws `text` horizontally centred with its top edge at `y`.
pub fn draw_label(area: &Canvas<'_>, text: &str, y: i32, font_px: f64) -> Result<()> {
    let (w, _) = area.dim_in_pixel();
    let style = FontDesc::new(FontFamily::SansSerif, font_px, FontStyle::Normal)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    area.draw_text(text, &style, (w as i32 / 2, y))
        .map_err(render_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fips::CountyId;
    use crate::stats::DatasetStats;
    use chrono::NaiveDate;
    use geo::{MultiPolygon, polygon};

    fn county(v: u32, size: f64, rates: &[f64]) -> CountyRecord {
        CountyRecord {
            id: CountyId::from_u32(v).unwrap(),
            name: String::new(),
            population: 1,
            land_area_sq_mi: None,
            geometry: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: size, y: 0.0),
                (x: size, y: size),
                (x: 0.0, y: size),
            ]]),
            weekly_rates: rates.to_vec(),
        }
    }

    #[test]
    fn test_fit_preserves_aspect() {
        // 4.9e6 x 3.2e6 metres into a square area: width-limited
        let (top, bottom, left, right) = CONUS_EXTENT.fit(490, 490);
        assert_eq!((left, right), (0, 0));
        assert_eq!(top + bottom, 490 - 320);
        assert!(top.abs_diff(bottom) <= 1);
    }

    #[test]
    fn test_fit_height_limited() {
        let (top, bottom, left, right) = CONUS_EXTENT.fit(1000, 320);
        assert_eq!((top, bottom), (0, 0));
        assert_eq!(left + right, 1000 - 490);
    }

    #[test]
    fn test_intersects() {
        let inside = Rect::new((0.0, 0.0), (1.0, 1.0));
        let alaska = Rect::new((-3.0e6, 1.5e6), (-1.5e6, 4.5e6));
        let straddling = Rect::new((2.5e6, 0.0), (3.0e6, 1.0));
        assert!(CONUS_EXTENT.intersects(&inside));
        assert!(!CONUS_EXTENT.intersects(&alaska));
        assert!(CONUS_EXTENT.intersects(&straddling));
    }

    #[test]
    fn test_drawing_order_is_largest_first() {
        let counties = vec![county(1, 1.0, &[]), county(2, 3.0, &[]), county(3, 2.0, &[])];
        assert_eq!(drawing_order(&counties), vec![1, 2, 0]);
    }

    #[test]
    fn test_week_fills_follow_classes() {
        let rates: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let counties = (0..20).map(|i| county(i + 1, 1.0, &[rates[i as usize]])).collect();
        let dataset = Dataset {
            weeks: vec![NaiveDate::from_ymd_opt(2020, 2, 2).unwrap()],
            counties,
            stats: DatasetStats::default(),
        };

        let reds = Colormap::reds();
        let fills = week_fills(&dataset, 0, &PercentileScheme::top_decile(), &reds);

        let light = reds.interpolate(0.0);
        let dark = reds.interpolate(1.0);
        assert_eq!(fills[0], RGBColor(light[0], light[1], light[2]));
        assert_eq!(fills[19], RGBColor(dark[0], dark[1], dark[2]));
    }

    #[test]
    fn test_week_fills_with_empty_top_class() {
        // p95 and p100 coincide, so nobody lands in the top class
        let mut rates = vec![0.0; 18];
        rates.extend([5.0, 5.0]);
        let counties = (0..20).map(|i| county(i + 1, 1.0, &[rates[i as usize]])).collect();
        let dataset = Dataset {
            weeks: vec![NaiveDate::from_ymd_opt(2020, 2, 2).unwrap()],
            counties,
            stats: DatasetStats::default(),
        };

        let reds = Colormap::reds();
        let fills = week_fills(&dataset, 0, &PercentileScheme::top_decile(), &reds);

        let dark = reds.interpolate(1.0);
        assert_eq!(fills[19], RGBColor(dark[0], dark[1], dark[2]));
        let light = reds.interpolate(0.0);
        assert_eq!(fills[0], RGBColor(light[0], light[1], light[2]));
    }

    #[test]
    fn test_draw_counties_writes_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        let counties = vec![county(1, 1.0e6, &[]), county(2, 2.0e5, &[])];
        let order = drawing_order(&counties);
        let fills = vec![RGBColor(255, 0, 0), RGBColor(0, 0, 255)];

        {
            let root = BitMapBackend::new(&path, (200, 140)).into_drawing_area();
            root.fill(&WHITE).unwrap();
            draw_counties(&root, &counties, &order, &fills, &CONUS_EXTENT).unwrap();
            root.present().unwrap();
        }

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
