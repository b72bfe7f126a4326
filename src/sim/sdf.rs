//! Signed distance fields for collision detection
//!
//! Every collider (static or dynamic) answers "how far is this point from my
//! surface" in its own local frame. Contacts are found by sampling a body's
//! hull points against the other collider's field.

use glam::{Vec2, Vec3};

/// Signed distance to a plane through the origin offset by `offset` along `normal`
#[inline]
pub fn sd_plane(p: Vec3, normal: Vec3, offset: f32) -> f32 {
    p.dot(normal) - offset
}

/// Signed distance to an axis-aligned box centred at the origin
#[inline]
pub fn sd_box(p: Vec3, half_extents: Vec3) -> f32 {
    let q = p.abs() - half_extents;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

/// Signed distance to a Y-axis cylinder centred at the origin
#[inline]
pub fn sd_cylinder(p: Vec3, radius: f32, half_height: f32) -> f32 {
    let d = Vec2::new(Vec2::new(p.x, p.z).length() - radius, p.y.abs() - half_height);
    d.x.max(d.y).min(0.0) + d.max(Vec2::ZERO).length()
}

/// Compute SDF gradient (surface normal) using central differences
pub fn sdf_gradient<F>(p: Vec3, sdf: F) -> Vec3
where
    F: Fn(Vec3) -> f32,
{
    let eps = 1e-3;
    let dx = sdf(p + Vec3::new(eps, 0.0, 0.0)) - sdf(p - Vec3::new(eps, 0.0, 0.0));
    let dy = sdf(p + Vec3::new(0.0, eps, 0.0)) - sdf(p - Vec3::new(0.0, eps, 0.0));
    let dz = sdf(p + Vec3::new(0.0, 0.0, eps)) - sdf(p - Vec3::new(0.0, 0.0, eps));
    Vec3::new(dx, dy, dz).normalize_or_zero()
}

/// Result of a point-vs-SDF check
#[derive(Debug, Clone, Copy)]
pub struct SdfContact {
    pub hit: bool,
    pub distance: f32,
    /// Outward surface normal at the query point
    pub normal: Vec3,
    pub penetration: f32,
}

impl SdfContact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            distance: f32::MAX,
            normal: Vec3::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check a point against an SDF shape with a contact margin
pub fn check_point<F>(p: Vec3, margin: f32, sdf: F) -> SdfContact
where
    F: Fn(Vec3) -> f32,
{
    let dist = sdf(p);

    if dist < margin {
        let normal = sdf_gradient(p, &sdf);
        if normal == Vec3::ZERO {
            return SdfContact::miss();
        }
        SdfContact {
            hit: true,
            distance: dist,
            normal,
            penetration: (-dist).max(0.0),
        }
    } else {
        SdfContact::miss()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sd_box_inside_and_outside() {
        let h = Vec3::splat(0.5);
        assert_abs_diff_eq!(sd_box(Vec3::ZERO, h), -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(sd_box(Vec3::new(1.5, 0.0, 0.0), h), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(sd_box(Vec3::new(0.5, 0.5, 0.5), h), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sd_cylinder_cap_and_rim() {
        assert_abs_diff_eq!(sd_cylinder(Vec3::new(0.0, 1.0, 0.0), 1.0, 0.1), 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(sd_cylinder(Vec3::new(2.0, 0.0, 0.0), 1.0, 0.1), 1.0, epsilon = 1e-6);
        assert!(sd_cylinder(Vec3::ZERO, 1.0, 0.1) < 0.0);
    }

    #[test]
    fn test_box_gradient_points_out_of_face() {
        let n = sdf_gradient(Vec3::new(0.0, 0.45, 0.1), |p| sd_box(p, Vec3::splat(0.5)));
        assert_abs_diff_eq!(n.y, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_check_point_plane() {
        let c = check_point(Vec3::new(0.0, -0.02, 0.0), 0.0, |p| sd_plane(p, Vec3::Y, 0.0));
        assert!(c.hit);
        assert_abs_diff_eq!(c.penetration, 0.02, epsilon = 1e-5);
        assert_abs_diff_eq!(c.normal.y, 1.0, epsilon = 1e-4);

        let c = check_point(Vec3::new(0.0, 0.5, 0.0), 0.0, |p| sd_plane(p, Vec3::Y, 0.0));
        assert!(!c.hit);
    }
}
