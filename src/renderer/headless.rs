//! Surface that draws nothing and remembers the last frame

use glam::{Quat, Vec3};

use super::{FrameView, RenderError, RenderSurface};

#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    size: (u32, u32),
    frames: u64,
    released: bool,
    last_frame: Vec<(u32, Vec3, Quat)>,
    last_shake: f32,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames drawn since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// (body id, position, orientation) of every visual in the last frame
    pub fn last_frame(&self) -> &[(u32, Vec3, Quat)] {
        &self.last_frame
    }

    pub fn last_shake(&self) -> f32 {
        self.last_shake
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), RenderError> {
        if self.released {
            return Ok(());
        }
        self.last_frame.clear();
        self.last_frame.extend(
            frame
                .visuals()
                .map(|v| (v.body_id(), v.position(), v.orientation())),
        );
        self.last_shake = frame.camera_shake;
        self.frames += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
        self.last_frame.clear();
    }
}
