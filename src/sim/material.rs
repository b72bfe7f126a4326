//! Surface materials

use std::rc::Rc;

use crate::settings::MaterialConfig;

/// Friction/restitution of a surface; shared by reference, never mutated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl PhysicsMaterial {
    pub const fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }

    pub fn shared(config: MaterialConfig) -> Rc<Self> {
        Rc::new(Self::new(config.friction, config.restitution))
    }

    /// Friction of a contact between two materials (geometric mean)
    #[inline]
    pub fn combined_friction(&self, other: &Self) -> f32 {
        (self.friction * other.friction).sqrt()
    }

    /// Restitution of a contact between two materials (the bouncier wins)
    #[inline]
    pub fn combined_restitution(&self, other: &Self) -> f32 {
        self.restitution.max(other.restitution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_rules() {
        let a = PhysicsMaterial::new(0.4, 0.2);
        let b = PhysicsMaterial::new(0.9, 0.6);
        assert!((a.combined_friction(&b) - 0.6).abs() < 1e-6);
        assert_eq!(a.combined_restitution(&b), 0.6);
        assert_eq!(b.combined_restitution(&a), 0.6);
    }
}
