pub mod classify;
pub mod colormap;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fips;
pub mod loader;
pub mod output;
pub mod projection;
pub mod render;
pub mod series;
pub mod stats;
