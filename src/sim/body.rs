//! Dynamic rigid bodies and their factory
//!
//! A die is a box, a coin is a short cylinder. Each body is created together
//! with its visual counterpart as one `BodyPair`.

use std::f32::consts::TAU;
use std::rc::Rc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::material::PhysicsMaterial;
use super::outcome::{COIN_MAPPING, DIE_MAPPING, FaceMapping};
use super::sdf::{sd_box, sd_cylinder};
use super::visual::VisualHandle;
use crate::consts::*;
use crate::settings::EngineConfig;

/// Rim samples per coin cap
const COIN_RIM_SAMPLES: usize = 16;

/// What is being tossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Die,
    Coin,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Die => "die",
            ObjectKind::Coin => "coin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "die" | "dice" => Some(ObjectKind::Die),
            "coin" => Some(ObjectKind::Coin),
            _ => None,
        }
    }

    pub fn shape(&self) -> BodyShape {
        match self {
            ObjectKind::Die => BodyShape::Box {
                half_extents: Vec3::splat(DIE_HALF_EXTENT),
            },
            ObjectKind::Coin => BodyShape::Cylinder {
                radius: COIN_RADIUS,
                height: COIN_HEIGHT,
            },
        }
    }

    pub fn mass(&self) -> f32 {
        match self {
            ObjectKind::Die => DIE_MASS,
            ObjectKind::Coin => COIN_MASS,
        }
    }

    pub fn mapping(&self) -> &'static FaceMapping {
        match self {
            ObjectKind::Die => &DIE_MAPPING,
            ObjectKind::Coin => &COIN_MAPPING,
        }
    }
}

/// Collision shape of a dynamic body, in body space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Box { half_extents: Vec3 },
    /// Cylinder with its axis along local Y
    Cylinder { radius: f32, height: f32 },
}

impl BodyShape {
    /// Signed distance from a body-space point to the surface
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        match *self {
            BodyShape::Box { half_extents } => sd_box(p, half_extents),
            BodyShape::Cylinder { radius, height } => sd_cylinder(p, radius, height * 0.5),
        }
    }

    /// Principal moments of inertia for a solid of the given mass
    pub fn inertia(&self, mass: f32) -> Vec3 {
        match *self {
            BodyShape::Box { half_extents: h } => {
                let h2 = h * h;
                Vec3::new(h2.y + h2.z, h2.x + h2.z, h2.x + h2.y) * (mass / 3.0)
            }
            BodyShape::Cylinder { radius, height } => {
                let side = mass * (3.0 * radius * radius + height * height) / 12.0;
                Vec3::new(side, 0.5 * mass * radius * radius, side)
            }
        }
    }

    /// Body-space points tested against other colliders
    pub fn hull_points(&self) -> Vec<Vec3> {
        match *self {
            BodyShape::Box { half_extents: h } => {
                let mut pts = Vec::with_capacity(8);
                for sx in [-1.0, 1.0] {
                    for sy in [-1.0, 1.0] {
                        for sz in [-1.0, 1.0] {
                            pts.push(Vec3::new(sx * h.x, sy * h.y, sz * h.z));
                        }
                    }
                }
                pts
            }
            BodyShape::Cylinder { radius, height } => {
                let half = height * 0.5;
                let mut pts = Vec::with_capacity(COIN_RIM_SAMPLES * 2);
                for i in 0..COIN_RIM_SAMPLES {
                    let (s, c) = (TAU * i as f32 / COIN_RIM_SAMPLES as f32).sin_cos();
                    pts.push(Vec3::new(c * radius, half, s * radius));
                    pts.push(Vec3::new(c * radius, -half, s * radius));
                }
                pts
            }
        }
    }

    /// Radius of the bounding sphere
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            BodyShape::Box { half_extents } => half_extents.length(),
            BodyShape::Cylinder { radius, height } => {
                (radius * radius + 0.25 * height * height).sqrt()
            }
        }
    }

    /// Height of the centre when lying flat on the floor
    pub fn resting_height(&self) -> f32 {
        match *self {
            BodyShape::Box { half_extents } => half_extents.min_element(),
            BodyShape::Cylinder { height, .. } => height * 0.5,
        }
    }
}

/// A dynamic rigid body
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: u32,
    pub kind: ObjectKind,
    pub shape: BodyShape,
    pub mass: f32,
    pub inv_mass: f32,
    /// Inverse principal inertia in body space
    inv_inertia: Vec3,
    pub material: Rc<PhysicsMaterial>,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Awake bodies are integrated; sleeping ones are skipped
    pub awake: bool,
    /// Seconds spent below the sleep thresholds
    pub(crate) sleep_timer: f32,
    hull: Vec<Vec3>,
}

impl RigidBody {
    pub fn new(id: u32, kind: ObjectKind, mass: f32, material: Rc<PhysicsMaterial>) -> Self {
        let shape = kind.shape();
        let inertia = shape.inertia(mass);
        Self {
            id,
            kind,
            shape,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia: inertia.recip(),
            material,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            awake: false,
            sleep_timer: 0.0,
            hull: shape.hull_points(),
        }
    }

    /// Apply world inverse inertia to a vector: R * I⁻¹ * Rᵀ * v
    #[inline]
    pub fn inv_inertia_world_mul(&self, v: Vec3) -> Vec3 {
        let local = self.orientation.inverse() * v;
        self.orientation * (self.inv_inertia * local)
    }

    /// Velocity of a point at offset `r` from the centre
    #[inline]
    pub fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    /// Apply an impulse at offset `r` from the centre
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world_mul(r.cross(impulse));
    }

    /// Effective inverse mass along `n` for a contact at offset `r`
    #[inline]
    pub fn effective_inv_mass(&self, r: Vec3, n: Vec3) -> f32 {
        let rn = r.cross(n);
        self.inv_mass + self.inv_inertia_world_mul(rn).cross(r).dot(n)
    }

    /// Hull points in world space
    pub fn hull_world(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.hull
            .iter()
            .map(move |p| self.position + self.orientation * *p)
    }

    /// Signed distance from a world point to this body's surface
    #[inline]
    pub fn signed_distance(&self, world: Vec3) -> f32 {
        let local = self.orientation.inverse() * (world - self.position);
        self.shape.signed_distance(local)
    }

    /// Threshold below which this body counts as resting on the floor
    pub fn rest_height(&self, margin: f32) -> f32 {
        self.shape.resting_height() + margin
    }

    /// Move to `position` with all motion cleared
    pub fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    pub fn wake(&mut self) {
        self.awake = true;
        self.sleep_timer = 0.0;
    }

    /// Stop integrating until something wakes the body
    pub fn sleep(&mut self) {
        self.awake = false;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Body-space axis `i` (0 = X, 1 = Y, 2 = Z) in world space
    #[inline]
    pub fn axis(&self, i: usize) -> Vec3 {
        self.orientation * Vec3::AXES[i]
    }
}

/// A body and its visual, created and destroyed together
#[derive(Debug, Clone)]
pub struct BodyPair {
    pub body: RigidBody,
    pub visual: VisualHandle,
}

/// Creates fresh body/visual pairs at deterministic start offsets
pub struct RigidBodyFactory {
    die_material: Rc<PhysicsMaterial>,
    coin_material: Rc<PhysicsMaterial>,
}

impl RigidBodyFactory {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            die_material: PhysicsMaterial::shared(config.die),
            coin_material: PhysicsMaterial::shared(config.coin),
        }
    }

    fn material(&self, kind: ObjectKind) -> Rc<PhysicsMaterial> {
        match kind {
            ObjectKind::Die => Rc::clone(&self.die_material),
            ObjectKind::Coin => Rc::clone(&self.coin_material),
        }
    }

    /// Non-overlapping start offset of body `index` out of `count`.
    /// Bodies are laid out in rows of four, centred on the arena.
    pub fn start_offset(kind: ObjectKind, index: usize, count: usize) -> Vec3 {
        let cols = count.clamp(1, 4);
        let rows = count.div_ceil(cols).max(1);
        let col = index % cols;
        let row = index / cols;
        let spacing = 2.0 * kind.shape().bounding_radius() + 0.4;
        let x = (col as f32 - (cols - 1) as f32 * 0.5) * spacing;
        let z = (row as f32 - (rows - 1) as f32 * 0.5) * spacing;
        Vec3::new(x, SPAWN_HEIGHT, z)
    }

    /// Build one awake pair
    pub fn create(&self, id: u32, kind: ObjectKind, index: usize, count: usize) -> BodyPair {
        let mut body = RigidBody::new(id, kind, kind.mass(), self.material(kind));
        body.position = Self::start_offset(kind, index, count);
        body.wake();
        let visual = VisualHandle::new(&body);
        BodyPair { body, visual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cube_inertia_is_isotropic() {
        let i = ObjectKind::Die.shape().inertia(6.0);
        // m/6 * s² for a unit cube
        assert_abs_diff_eq!(i.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(i.y, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(i.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_coin_spins_easiest_about_side_axis() {
        let i = ObjectKind::Coin.shape().inertia(1.0);
        assert!(i.y > i.x);
        assert_abs_diff_eq!(i.x, i.z, epsilon = 1e-6);
    }

    #[test]
    fn test_start_offsets_do_not_overlap() {
        for kind in [ObjectKind::Die, ObjectKind::Coin] {
            let r = kind.shape().bounding_radius();
            for count in 1..=MAX_BODIES {
                let offsets: Vec<Vec3> = (0..count)
                    .map(|i| RigidBodyFactory::start_offset(kind, i, count))
                    .collect();
                for a in 0..count {
                    for b in (a + 1)..count {
                        assert!(offsets[a].distance(offsets[b]) > 2.0 * r);
                    }
                    assert!(offsets[a].x.abs() + r < ARENA_HALF_SIZE);
                    assert!(offsets[a].z.abs() + r < ARENA_HALF_SIZE);
                }
            }
        }
    }

    #[test]
    fn test_start_offsets_are_deterministic() {
        let a = RigidBodyFactory::start_offset(ObjectKind::Die, 2, 5);
        let b = RigidBodyFactory::start_offset(ObjectKind::Die, 2, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_factory_creates_awake_pair() {
        let factory = RigidBodyFactory::new(&EngineConfig::default());
        let pair = factory.create(7, ObjectKind::Coin, 0, 1);
        assert!(pair.body.awake);
        assert_eq!(pair.body.id, 7);
        assert_eq!(pair.visual.body_id(), 7);
        assert_eq!(pair.visual.position(), pair.body.position);
    }

    #[test]
    fn test_impulse_through_centre_does_not_spin() {
        let factory = RigidBodyFactory::new(&EngineConfig::default());
        let mut body = factory.create(1, ObjectKind::Die, 0, 1).body;
        body.apply_impulse(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO);
        assert_abs_diff_eq!(body.linear_velocity.y, 2.0, epsilon = 1e-6);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_signed_distance_follows_pose() {
        let factory = RigidBodyFactory::new(&EngineConfig::default());
        let mut body = factory.create(1, ObjectKind::Die, 0, 1).body;
        body.position = Vec3::new(3.0, 1.0, 0.0);
        assert_abs_diff_eq!(body.signed_distance(Vec3::new(3.0, 1.0, 0.0)), -0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(body.signed_distance(Vec3::new(4.5, 1.0, 0.0)), 1.0, epsilon = 1e-5);
    }
}
