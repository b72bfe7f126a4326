//! Render-side counterpart of a rigid body
//!
//! Written only by the frame stepper, once per tick. Physics never reads it.

use glam::{Quat, Vec3};

use super::body::{BodyShape, ObjectKind, RigidBody};

#[derive(Debug, Clone)]
pub struct VisualHandle {
    body_id: u32,
    kind: ObjectKind,
    shape: BodyShape,
    pub(super) position: Vec3,
    pub(super) orientation: Quat,
}

impl VisualHandle {
    pub(crate) fn new(body: &RigidBody) -> Self {
        Self {
            body_id: body.id,
            kind: body.kind,
            shape: body.shape,
            position: body.position,
            orientation: body.orientation,
        }
    }

    pub fn body_id(&self) -> u32 {
        self.body_id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn shape(&self) -> BodyShape {
        self.shape
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }
}
