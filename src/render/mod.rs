//! Choropleth rendering: one image per week, or one movie for all weeks.

pub mod choropleth;
pub mod fonts;
pub mod maps;
pub mod movie;

pub use choropleth::{CONUS_EXTENT, MapExtent};
pub use fonts::TextOptions;
pub use maps::StaticMapRenderer;
pub use movie::{Ffmpeg, FrameSequence, MovieRenderer, VideoEncoder};

use crate::error::PipelineError;

pub(crate) fn render_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Render(e.to_string())
}
