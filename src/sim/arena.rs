//! Static arena geometry: floor plane plus four boundary walls

use std::rc::Rc;

use glam::{Quat, Vec3};

use super::material::PhysicsMaterial;
use super::sdf::{sd_box, sd_plane};
use crate::settings::ArenaConfig;

/// Position and rotation of a static collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticShape {
    /// Half-space below `normal · p = offset` (in collider space) is solid
    Plane { normal: Vec3, offset: f32 },
    Box { half_extents: Vec3 },
}

/// Infinite-mass collider that lives for the whole session
#[derive(Debug, Clone)]
pub struct StaticCollider {
    pub shape: StaticShape,
    pub pose: Pose,
    pub material: Rc<PhysicsMaterial>,
}

impl StaticCollider {
    /// Signed distance from a world point to the collider surface
    #[inline]
    pub fn signed_distance(&self, world: Vec3) -> f32 {
        let p = self.pose.to_local(world);
        match self.shape {
            StaticShape::Plane { normal, offset } => sd_plane(p, normal, offset),
            StaticShape::Box { half_extents } => sd_box(p, half_extents),
        }
    }
}

/// Builds the arena once per session
pub struct ArenaBuilder<'a> {
    config: &'a ArenaConfig,
}

impl<'a> ArenaBuilder<'a> {
    pub fn new(config: &'a ArenaConfig) -> Self {
        Self { config }
    }

    /// Floor at y = 0 and four walls enclosing `[-half_size, half_size]²`
    pub fn build(&self) -> Vec<StaticCollider> {
        let c = self.config;
        let floor_material = PhysicsMaterial::shared(c.floor);
        let wall_material = PhysicsMaterial::shared(c.walls);

        let mut colliders = Vec::with_capacity(5);
        colliders.push(StaticCollider {
            shape: StaticShape::Plane {
                normal: Vec3::Y,
                offset: 0.0,
            },
            pose: Pose::IDENTITY,
            material: floor_material,
        });

        let half_t = c.wall_thickness * 0.5;
        let half_h = c.wall_height * 0.5;
        let reach = c.half_size + half_t;
        // walls overlap at the corners so there is no gap to slip through
        let span = c.half_size + c.wall_thickness;
        let walls = [
            (Vec3::new(reach, half_h, 0.0), Vec3::new(half_t, half_h, span)),
            (Vec3::new(-reach, half_h, 0.0), Vec3::new(half_t, half_h, span)),
            (Vec3::new(0.0, half_h, reach), Vec3::new(span, half_h, half_t)),
            (Vec3::new(0.0, half_h, -reach), Vec3::new(span, half_h, half_t)),
        ];
        for (center, half_extents) in walls {
            colliders.push(StaticCollider {
                shape: StaticShape::Box { half_extents },
                pose: Pose::at(center),
                material: Rc::clone(&wall_material),
            });
        }

        log::debug!(
            "Arena built: {} colliders, half size {}",
            colliders.len(),
            c.half_size
        );
        colliders
    }

    /// Whether a point lies inside the playable volume
    pub fn contains(config: &ArenaConfig, p: Vec3, margin: f32) -> bool {
        p.x.abs() <= config.half_size + margin
            && p.z.abs() <= config.half_size + margin
            && p.y >= -margin
    }
}
