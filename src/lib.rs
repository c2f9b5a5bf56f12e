pub mod analysis;
pub mod config;
pub mod error;
pub mod geometry;
pub mod landmarks;
pub mod modules;
pub mod overlay;
pub mod pipeline;
pub mod utils;
pub mod warp;

pub use config::config::Config;
pub use error::{Result, SymmetryError};
pub use pipeline::pipeline::{FrameContext, FrameOutput, SymmetryPipeline};
