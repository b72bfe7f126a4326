//! Toss launch: fresh orientation and velocities for every body

use glam::{Quat, Vec2, Vec3};
use rand::Rng;

use super::body::RigidBodyFactory;
use super::session::{SessionEvent, SessionPhase, SimulationSession};
use crate::renderer::RenderSurface;
use crate::settings::LaunchConfig;
use crate::{random_orientation, random_unit_vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched,
    /// A toss is already in flight, or there is nothing to launch
    Rejected,
}

/// Initial motion for one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TossImpulse {
    pub linear: Vec3,
    pub angular: Vec3,
    /// Orientation at release; `None` keeps the current one
    pub orientation: Option<Quat>,
}

impl TossImpulse {
    /// Random toss from `start`: uniform orientation, bounded upward speed,
    /// horizontal jitter pulled toward the arena centre
    pub fn random<R: Rng + ?Sized>(rng: &mut R, config: &LaunchConfig, start: Vec3) -> Self {
        let (v_min, v_max) = config.vertical_speed;
        let vertical = rng.random_range(v_min..=v_max);

        // uniform point in a disc
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let radius = config.horizontal_jitter * rng.random::<f32>().sqrt();
        let jitter = Vec2::from_angle(angle) * radius;
        let pull = -Vec2::new(start.x, start.z) * config.center_pull;
        let horizontal = jitter + pull;

        let (w_min, w_max) = config.angular_speed;
        let spin = rng.random_range(w_min..=w_max);

        Self {
            linear: Vec3::new(horizontal.x, vertical, horizontal.y),
            angular: random_unit_vector(rng) * spin,
            orientation: Some(random_orientation(rng)),
        }
    }
}

pub struct TossLauncher;

impl TossLauncher {
    /// Launch every body of the current set with random impulses
    pub fn launch<S: RenderSurface>(session: &mut SimulationSession<S>) -> LaunchOutcome {
        let Some(roll) = session.roll.as_ref() else {
            return LaunchOutcome::Rejected;
        };
        if roll.in_flight {
            return LaunchOutcome::Rejected;
        }

        let count = roll.pairs.len();
        let impulses: Vec<TossImpulse> = (0..count)
            .map(|i| {
                let start = RigidBodyFactory::start_offset(roll.kind, i, count);
                TossImpulse::random(&mut session.rng, &session.config.launch, start)
            })
            .collect();
        Self::launch_with(session, &impulses)
    }

    /// Launch with explicit impulses, one per body in body order.
    /// Bodies are put back at their start offsets first.
    pub fn launch_with<S: RenderSurface>(
        session: &mut SimulationSession<S>,
        impulses: &[TossImpulse],
    ) -> LaunchOutcome {
        if session.phase != SessionPhase::Live {
            return LaunchOutcome::Rejected;
        }
        let now = session.now_ms;
        let Some(roll) = session.roll.as_mut() else {
            return LaunchOutcome::Rejected;
        };
        if roll.in_flight {
            return LaunchOutcome::Rejected;
        }
        if impulses.len() != roll.pairs.len() {
            log::warn!(
                "Launch rejected: {} impulses for {} bodies",
                impulses.len(),
                roll.pairs.len()
            );
            return LaunchOutcome::Rejected;
        }

        let kind = roll.kind;
        let count = roll.pairs.len();
        for (index, (pair, impulse)) in roll.pairs.iter_mut().zip(impulses).enumerate() {
            let body = &mut pair.body;
            body.teleport(RigidBodyFactory::start_offset(kind, index, count));
            if let Some(q) = impulse.orientation {
                body.orientation = q.normalize();
            }
            body.linear_velocity = impulse.linear;
            body.angular_velocity = impulse.angular;
            body.wake();
        }
        roll.in_flight = true;
        roll.nudges = 0;
        roll.settle_clock.start(now);

        if session.shake_enabled {
            session.camera_shake = 1.0;
        }
        log::info!("Launched {} {}", count, kind.as_str());
        session.emit(SessionEvent::Launched { kind, count });
        LaunchOutcome::Launched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessSurface;
    use crate::settings::{EngineConfig, Settings};
    use crate::sim::{FrameStepper, ObjectKind};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn session() -> SimulationSession<HeadlessSurface> {
        let mut s = SimulationSession::new(HeadlessSurface::new(), EngineConfig::default(), 99);
        s.init(400, 300).unwrap();
        s
    }

    #[test]
    fn test_launch_without_bodies_is_rejected() {
        let mut s = session();
        assert_eq!(TossLauncher::launch(&mut s), LaunchOutcome::Rejected);
        assert!(!s.is_in_flight());
    }

    #[test]
    fn test_launch_sets_motion_and_starts_clock() {
        let mut s = session();
        s.create_objects(3, ObjectKind::Die);
        assert_eq!(TossLauncher::launch(&mut s), LaunchOutcome::Launched);
        assert!(s.is_in_flight());
        let config = s.config().launch.clone();
        for body in s.bodies() {
            assert!(body.awake);
            assert!(body.linear_velocity.y >= config.vertical_speed.0);
            assert!(body.linear_velocity.y <= config.vertical_speed.1);
            let spin = body.angular_velocity.length();
            assert!(spin >= config.angular_speed.0 - 1e-3 && spin <= config.angular_speed.1 + 1e-3);
        }
        assert!(s.roll_session().unwrap().settle_clock.is_running());
        let events = s.drain_events();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::Launched {
                kind: ObjectKind::Die,
                count: 3
            }]
        ));
        assert_eq!(s.camera_shake(), 1.0);
    }

    #[test]
    fn test_mismatched_impulses_are_rejected() {
        let mut s = session();
        s.create_objects(2, ObjectKind::Coin);
        let one = [TossImpulse {
            linear: Vec3::Y,
            angular: Vec3::ZERO,
            orientation: None,
        }];
        assert_eq!(TossLauncher::launch_with(&mut s, &one), LaunchOutcome::Rejected);
        assert!(!s.is_in_flight());
    }

    #[test]
    fn test_visuals_lag_until_next_frame() {
        let mut s = session();
        s.create_objects(1, ObjectKind::Die);
        let turned = Quat::from_rotation_x(1.0);
        let impulse = [TossImpulse {
            linear: Vec3::new(0.0, 12.0, 0.0),
            angular: Vec3::ZERO,
            orientation: Some(turned),
        }];
        assert_eq!(TossLauncher::launch_with(&mut s, &impulse), LaunchOutcome::Launched);

        let body = s.bodies().next().unwrap().clone();
        let visual = s.visuals().next().unwrap();
        assert!(body.orientation.abs_diff_eq(turned, 1e-6));
        assert_eq!(visual.orientation(), Quat::IDENTITY);

        FrameStepper::tick(&mut s);
        let body = s.bodies().next().unwrap();
        let visual = s.visuals().next().unwrap();
        assert_eq!(visual.position(), body.position);
        assert_eq!(visual.orientation(), body.orientation);
    }

    #[test]
    fn test_reduced_motion_disables_shake() {
        let mut s = session();
        let settings = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        s.apply_settings(&settings);
        s.create_objects(1, ObjectKind::Die);
        TossLauncher::launch(&mut s);
        assert_eq!(s.camera_shake(), 0.0);
    }

    #[test]
    fn test_apex_stays_below_walls() {
        let config = EngineConfig::default();
        let top = crate::consts::SPAWN_HEIGHT + config.max_apex();
        assert!(top < config.arena.wall_height);
    }

    proptest! {
        #[test]
        fn prop_random_impulse_respects_bounds(seed in any::<u64>(), x in -4.0f32..4.0, z in -4.0f32..4.0) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let config = LaunchConfig::default();
            let start = Vec3::new(x, 2.0, z);
            let imp = TossImpulse::random(&mut rng, &config, start);

            prop_assert!(imp.linear.y >= config.vertical_speed.0 && imp.linear.y <= config.vertical_speed.1);
            let pull = Vec2::new(x, z) * config.center_pull;
            let jitter = Vec2::new(imp.linear.x, imp.linear.z) + pull;
            prop_assert!(jitter.length() <= config.horizontal_jitter + 1e-4);
            let q = imp.orientation.unwrap();
            prop_assert!((q.length() - 1.0).abs() < 1e-4);
        }
    }
}
