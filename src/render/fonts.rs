//! Label font registration.
//!
//! Text is rasterized with the pure-Rust glyph backend, which has no system
//! font lookup: the TTF used for labels is read from a configured path and
//! registered once per process as the sans-serif family.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use plotters::style::{FontStyle, register_font};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

static REGISTERED: OnceLock<PathBuf> = OnceLock::new();

/// Whether and with which font to draw text on rendered images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    pub annotate: bool,
    pub font_path: PathBuf,
}

impl TextOptions {
    /// No labels; nothing needs to be registered.
    pub fn disabled() -> Self {
        Self {
            annotate: false,
            font_path: PathBuf::new(),
        }
    }

    /// Registers the label font if annotation is enabled.
    ///
    /// Called before any frame is drawn so a missing font fails the run early.
    pub fn prepare(&self) -> Result<()> {
        if self.annotate {
            register_label_font(&self.font_path)?;
        }
        Ok(())
    }
}

impl From<&PipelineConfig> for TextOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            annotate: config.annotate,
            font_path: config.font_path.clone(),
        }
    }
}

fn register_label_font(path: &Path) -> Result<()> {
    if REGISTERED.get().is_some_and(|existing| existing == path) {
        debug!(font = %path.display(), "Label font already registered");
        return Ok(());
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read label font {}", path.display()))?;
    // the glyph backend keeps a 'static reference for the process lifetime
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    // rejected bytes leave the font registry untouched
    register_font("sans-serif", FontStyle::Normal, bytes).map_err(|_| {
        PipelineError::InvalidSetting {
            key: "COVID_MAPS_FONT".to_string(),
            value: format!("{} (not a TrueType font)", path.display()),
        }
    })?;

    let _ = REGISTERED.set(path.to_path_buf());
    debug!(font = %path.display(), "Label font registered");
    Ok(())
}
