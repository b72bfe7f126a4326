//! Render surface seam
//!
//! The simulation writes visuals; a `RenderSurface` draws them. The WebGPU
//! surface ray-marches the scene with signed distance fields in the fragment
//! shader. The headless surface only records what it was asked to draw.

pub mod headless;
pub mod sdf_pipeline;

pub use headless::HeadlessSurface;
pub use sdf_pipeline::SdfRenderState;

use thiserror::Error;

use crate::sim::{BodyPair, VisualHandle};

/// Surface failures reported by a render call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Surface lost; reconfigure and keep going
    #[error("render surface lost")]
    Lost,
    #[error("render surface outdated")]
    Outdated,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("render failed: {0}")]
    Other(String),
}

/// Camera projection derived from the surface size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
    /// Vertical field of view (radians)
    pub fov_y: f32,
}

impl Projection {
    pub const DEFAULT_FOV_Y: f32 = 0.9;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            aspect: width as f32 / height.max(1) as f32,
            fov_y: Self::DEFAULT_FOV_Y,
        }
    }
}

/// Everything a surface needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pairs: &'a [BodyPair],
    pub time_ms: f64,
    pub camera_shake: f32,
    pub arena_half_size: f32,
    pub wall_height: f32,
    pub projection: Projection,
}

impl<'a> FrameView<'a> {
    pub fn new(
        pairs: &'a [BodyPair],
        time_ms: f64,
        camera_shake: f32,
        arena_half_size: f32,
        wall_height: f32,
        projection: Projection,
    ) -> Self {
        Self {
            pairs,
            time_ms,
            camera_shake,
            arena_half_size,
            wall_height,
            projection,
        }
    }

    /// Visual handles in body order
    pub fn visuals(&self) -> impl Iterator<Item = &'a VisualHandle> + 'a {
        self.pairs.iter().map(|p| &p.visual)
    }

    pub fn visual_count(&self) -> usize {
        self.pairs.len()
    }
}

/// A drawing target with an explicit size
pub trait RenderSurface {
    /// Current drawable size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Apply a new, non-zero size
    fn resize(&mut self, width: u32, height: u32);

    /// Draw one frame
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError>;

    /// Drop GPU resources; rendering after release is a no-op
    fn release(&mut self);
}
