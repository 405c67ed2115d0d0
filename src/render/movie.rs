//! Animated weekly choropleth.
//!
//! Every week is drawn as a complete frame into a temporary directory, then
//! the frames are handed to a [`VideoEncoder`]. The encoder is checked before
//! the first frame is drawn.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, info};

use crate::classify::PercentileScheme;
use crate::colormap::Colormap;
use crate::dataset::Dataset;
use crate::error::PipelineError;
use crate::render::choropleth::{
    CONUS_EXTENT, Canvas, MapExtent, draw_counties, draw_label, drawing_order, week_fills,
};
use crate::render::fonts::TextOptions;
use crate::render::render_err;

/// Numbered PNG frames in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    pub dir: PathBuf,
    pub count: usize,
}

impl FrameSequence {
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.png"))
    }

    /// printf-style input pattern understood by ffmpeg.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join("frame_%05d.png")
    }
}

/// Turns a frame sequence into a video file.
pub trait VideoEncoder {
    /// Fails if the encoder cannot run at all.
    fn check_available(&self) -> crate::error::Result<()>;

    fn encode(&self, frames: &FrameSequence, fps: u32, output: &Path) -> crate::error::Result<()>;
}

/// Encodes H.264 MP4 with the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    pub program: String,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

impl VideoEncoder for Ffmpeg {
    fn check_available(&self) -> crate::error::Result<()> {
        let unavailable = |reason: String| PipelineError::EncoderUnavailable {
            program: self.program.clone(),
            reason,
        };

        let status = Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| unavailable(e.to_string()))?;

        if !status.success() {
            return Err(unavailable(format!("`-version` exited with {status}")));
        }
        Ok(())
    }

    fn encode(&self, frames: &FrameSequence, fps: u32, output: &Path) -> crate::error::Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-y", "-loglevel", "error", "-framerate"])
            .arg(fps.to_string())
            .arg("-i")
            .arg(frames.pattern())
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .arg(output);
        debug!(?cmd, "Running encoder");

        let status = cmd
            .status()
            .map_err(|e| PipelineError::EncoderUnavailable {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(PipelineError::EncoderFailed(status.to_string()));
        }
        Ok(())
    }
}

/// Draws each week with the seven-class percentile scheme and a fixed 0-100
/// percentile colourbar, then encodes the frames at `fps`.
#[derive(Debug, Clone)]
pub struct MovieRenderer<E> {
    encoder: E,
    /// Frame size in pixels (8 x 5 inches at 200 dpi).
    pub size: (u32, u32),
    pub fps: u32,
    pub scheme: PercentileScheme,
    pub colormap: Colormap,
    pub extent: MapExtent,
    pub text: TextOptions,
    pub label_px: f64,
}

impl<E: VideoEncoder> MovieRenderer<E> {
    pub fn new(encoder: E, text: TextOptions) -> Self {
        Self {
            encoder,
            size: (1600, 1000),
            fps: 1,
            scheme: PercentileScheme::ranked(),
            colormap: Colormap::hot_r(),
            extent: CONUS_EXTENT,
            text,
            label_px: 44.0,
        }
    }

    /// Renders all weeks and writes the video to `output`.
    ///
    /// Returns the number of frames encoded.
    #[tracing::instrument(skip_all, fields(output = %output.display(), weeks = dataset.weeks.len()))]
    pub fn render(&self, dataset: &Dataset, output: &Path) -> Result<usize> {
        self.encoder
            .check_available()
            .context("video encoder check failed")?;
        self.text.prepare()?;

        let frames_dir = tempfile::tempdir().context("failed to create frame directory")?;
        let frames = FrameSequence {
            dir: frames_dir.path().to_path_buf(),
            count: dataset.weeks.len(),
        };

        let order = drawing_order(&dataset.counties);
        for week in 0..dataset.weeks.len() {
            let started = Instant::now();
            let label = dataset.week_label(week);
            self.render_frame(dataset, &order, week, &frames.frame_path(week))
                .with_context(|| format!("failed to render frame for week {label}"))?;
            info!(
                week = %label,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Frame rendered"
            );
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        self.encoder
            .encode(&frames, self.fps, output)
            .with_context(|| format!("failed to encode {}", output.display()))?;

        info!(frames = frames.count, fps = self.fps, "Movie written");
        Ok(frames.count)
    }

    fn render_frame(&self, dataset: &Dataset, order: &[usize], week: usize, path: &Path) -> Result<()> {
        let fills = week_fills(dataset, week, &self.scheme, &self.colormap);

        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let bar_height = self.size.1 / 8;
        let (map_area, bar_area) = root.split_vertically(self.size.1 - bar_height);

        draw_counties(&map_area, &dataset.counties, order, &fills, &self.extent)?;
        draw_colorbar(&bar_area, &self.colormap, self.text.annotate)?;
        if self.text.annotate {
            let top = (self.size.1 as f64 * 0.03) as i32;
            draw_label(&map_area, &dataset.week_label(week), top, self.label_px)?;
        }

        root.present().map_err(render_err)?;
        Ok(())
    }
}

/// Horizontal colourbar for the percentile rank 0..=100, ticks every 20.
fn draw_colorbar(
    area: &Canvas<'_>,
    colormap: &Colormap,
    annotate: bool,
) -> crate::error::Result<()> {
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let x0 = w / 5;
    let x1 = w - w / 5;
    let y0 = h / 8;
    let y1 = y0 + (h / 5).max(4);

    for x in x0..x1 {
        let t = (x - x0) as f64 / (x1 - x0 - 1).max(1) as f64;
        let [r, g, b] = colormap.interpolate(t);
        area.draw(&Rectangle::new([(x, y0), (x + 1, y1)], RGBColor(r, g, b).filled()))
            .map_err(render_err)?;
    }
    area.draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))
        .map_err(render_err)?;

    for pct in (0..=100).step_by(20) {
        let x = x0 + (x1 - x0) * pct / 100;
        area.draw(&PathElement::new(vec![(x, y1), (x, y1 + 6)], BLACK.stroke_width(1)))
            .map_err(render_err)?;
        if annotate {
            draw_tick_label(area, &pct.to_string(), x, y1 + 8)?;
        }
    }
    if annotate {
        draw_tick_label(area, "Percentile", (x0 + x1) / 2, y1 + 36)?;
    }
    Ok(())
}

fn draw_tick_label(
    area: &Canvas<'_>,
    text: &str,
    x: i32,
    y: i32,
) -> crate::error::Result<()> {
    let style = FontDesc::new(FontFamily::SansSerif, 24.0, FontStyle::Normal)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    area.draw_text(text, &style, (x, y)).map_err(render_err)
}
