//! One choropleth image per week.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plotters::prelude::*;
use tracing::info;

use crate::classify::PercentileScheme;
use crate::colormap::Colormap;
use crate::dataset::Dataset;
use crate::render::choropleth::{
    CONUS_EXTENT, MapExtent, draw_counties, draw_label, drawing_order, week_fills,
};
use crate::render::fonts::TextOptions;
use crate::render::render_err;

/// Draws each week with the top-decile scheme into `<dir>/<YYYY-MM-DD>.png`.
#[derive(Debug, Clone)]
pub struct StaticMapRenderer {
    /// Image size in pixels (24 x 15.44 inches at 100 dpi).
    pub size: (u32, u32),
    pub scheme: PercentileScheme,
    pub colormap: Colormap,
    pub extent: MapExtent,
    pub text: TextOptions,
    pub label_px: f64,
}

impl StaticMapRenderer {
    pub fn new(text: TextOptions) -> Self {
        Self {
            size: (2400, 1544),
            scheme: PercentileScheme::top_decile(),
            colormap: Colormap::reds(),
            extent: CONUS_EXTENT,
            text,
            label_px: 44.0,
        }
    }

    /// Renders every week in chronological order, overwriting existing files.
    #[tracing::instrument(skip_all, fields(dir = %dir.display(), weeks = dataset.weeks.len()))]
    pub fn render_all(&self, dataset: &Dataset, dir: &Path) -> Result<Vec<PathBuf>> {
        self.text.prepare()?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create map directory {}", dir.display()))?;

        let order = drawing_order(&dataset.counties);
        let mut written = Vec::with_capacity(dataset.weeks.len());

        for week in 0..dataset.weeks.len() {
            let label = dataset.week_label(week);
            let path = dir.join(format!("{label}.png"));
            self.render_week(dataset, &order, week, &path)
                .with_context(|| format!("failed to render map for week {label}"))?;
            info!(week = %label, path = %path.display(), "Map written");
            written.push(path);
        }

        Ok(written)
    }

    fn render_week(
        &self,
        dataset: &Dataset,
        order: &[usize],
        week: usize,
        path: &Path,
    ) -> Result<()> {
        let fills = week_fills(dataset, week, &self.scheme, &self.colormap);

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        draw_counties(&root, &dataset.counties, order, &fills, &self.extent)?;
        if self.text.annotate {
            let top = (self.size.1 as f64 * 0.02) as i32;
            draw_label(&root, &dataset.week_label(week), top, self.label_px)?;
        }
        root.present().map_err(render_err)?;
        Ok(())
    }
}
