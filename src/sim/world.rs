//! Fixed-step rigid-body world
//!
//! Semi-implicit Euler integration with a sequential-impulse contact solver.
//! Contacts against static colliders come from sampling each body's hull
//! points against the collider's signed distance field. Two boxes are tested
//! on their separating axes, other body pairs fall back to hull sampling.
//! Bodies that stay still for a while are put to sleep and no longer
//! integrated until a moving body comes near.

use glam::{Quat, Vec3};

use super::arena::StaticCollider;
use super::body::{BodyPair, BodyShape, RigidBody};
use super::sdf::check_point;
use crate::settings::EngineConfig;

/// Hull points closer than this to a surface produce a contact
const CONTACT_MARGIN: f32 = 0.01;
/// Penetration left uncorrected to keep resting contacts alive
const PENETRATION_SLOP: f32 = 0.005;
/// Fraction of remaining penetration removed per step
const CORRECTION_FACTOR: f32 = 0.8;
/// Static penetration deeper than this is a tunnel, left to the sanity floor
const MAX_STATIC_DEPTH: f32 = 2.0;
/// Closing speeds below this do not bounce
const RESTITUTION_THRESHOLD: f32 = 1.0;
/// Speed caps, keep a step's travel well below a body's size
const MAX_LINEAR_SPEED: f32 = 40.0;
const MAX_ANGULAR_SPEED: f32 = 60.0;
/// Seconds below the sleep thresholds before a body is put to sleep
const SLEEP_DELAY: f32 = 0.5;
/// An edge axis must separate better than the best face axis by this much
const EDGE_AXIS_TOLERANCE: f32 = 0.02;

/// What a single step saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub bodies_stepped: u32,
    pub contacts: u32,
    /// Bodies that went to sleep at the end of this step
    pub fell_asleep: u32,
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    a: usize,
    /// Other dynamic body, None for a static collider
    b: Option<usize>,
    /// Points from `b` (or the static collider) toward `a`
    normal: Vec3,
    tangents: [Vec3; 2],
    ra: Vec3,
    rb: Vec3,
    /// Negative while the surfaces are still apart
    penetration: f32,
    friction: f32,
    restitution: f32,
    /// Normal speed the solver drives toward
    target_speed: f32,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    acc_normal: f32,
    acc_tangent: [f32; 2],
}

/// Separating axis candidates for a box pair
#[derive(Debug, Clone, Copy)]
enum BoxAxis {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

/// Owns static geometry and the integration parameters
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    gravity: Vec3,
    timestep: f32,
    iterations: u32,
    linear_damping: f32,
    angular_damping: f32,
    sleep_linear: f32,
    sleep_angular: f32,
    statics: Vec<StaticCollider>,
}

impl PhysicsWorld {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            gravity: Vec3::from_array(config.gravity),
            timestep: config.timestep,
            iterations: config.solver_iterations.max(1),
            linear_damping: config.linear_damping,
            angular_damping: config.angular_damping,
            sleep_linear: config.rest.linear_eps,
            sleep_angular: config.rest.angular_eps,
            statics: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    pub fn statics(&self) -> &[StaticCollider] {
        &self.statics
    }

    pub fn has_statics(&self) -> bool {
        !self.statics.is_empty()
    }

    /// Install static colliders; they stay for the life of the world
    pub fn set_statics(&mut self, statics: Vec<StaticCollider>) {
        self.statics = statics;
    }

    /// Advance all awake bodies by one fixed timestep
    pub fn step(&self, pairs: &mut [BodyPair]) -> StepReport {
        let dt = self.timestep;
        let mut report = StepReport::default();
        self.wake_touched(pairs);

        let lin_keep = (1.0 - self.linear_damping * dt).max(0.0);
        let ang_keep = (1.0 - self.angular_damping * dt).max(0.0);
        for pair in pairs.iter_mut().filter(|p| p.body.awake) {
            let body = &mut pair.body;
            body.linear_velocity = (body.linear_velocity + self.gravity * dt) * lin_keep;
            body.angular_velocity *= ang_keep;
            report.bodies_stepped += 1;
        }
        if report.bodies_stepped == 0 {
            return report;
        }

        let mut contacts = self.collect_contacts(pairs);
        report.contacts = contacts.len() as u32;
        for c in &mut contacts {
            prepare_contact(pairs, c, dt);
        }
        for _ in 0..self.iterations {
            for c in &mut contacts {
                solve_contact(pairs, c);
            }
        }

        for pair in pairs.iter_mut().filter(|p| p.body.awake) {
            let body = &mut pair.body;
            body.linear_velocity = body.linear_velocity.clamp_length_max(MAX_LINEAR_SPEED);
            body.angular_velocity = body.angular_velocity.clamp_length_max(MAX_ANGULAR_SPEED);
            body.position += body.linear_velocity * dt;
            body.orientation =
                (Quat::from_scaled_axis(body.angular_velocity * dt) * body.orientation).normalize();
        }

        self.correct_positions(pairs, &contacts);
        report.fell_asleep = self.update_sleep(pairs);
        report
    }

    fn is_moving(&self, body: &RigidBody) -> bool {
        body.linear_velocity.length() >= self.sleep_linear
            || body.angular_velocity.length() >= self.sleep_angular
    }

    /// Wake sleeping bodies that a moving body is about to reach
    fn wake_touched(&self, pairs: &mut [BodyPair]) {
        for i in 0..pairs.len() {
            for j in (i + 1)..pairs.len() {
                let (a, b) = (&pairs[i].body, &pairs[j].body);
                if a.awake == b.awake || !within_reach(a, b) {
                    continue;
                }
                let (mover, sleeper) = if a.awake { (i, j) } else { (j, i) };
                if self.is_moving(&pairs[mover].body) {
                    pairs[sleeper].body.wake();
                }
            }
        }
    }

    /// Put bodies to sleep once they have been still for long enough
    fn update_sleep(&self, pairs: &mut [BodyPair]) -> u32 {
        let mut slept = 0;
        for pair in pairs.iter_mut().filter(|p| p.body.awake) {
            if self.is_moving(&pair.body) {
                pair.body.sleep_timer = 0.0;
                continue;
            }
            pair.body.sleep_timer += self.timestep;
            if pair.body.sleep_timer >= SLEEP_DELAY {
                pair.body.sleep();
                slept += 1;
            }
        }
        slept
    }

    fn collect_contacts(&self, pairs: &[BodyPair]) -> Vec<Contact> {
        let mut contacts = Vec::new();

        for (i, pair) in pairs.iter().enumerate() {
            let body = &pair.body;
            if !body.awake {
                continue;
            }
            for collider in &self.statics {
                let friction = body.material.combined_friction(&collider.material);
                let restitution = body.material.combined_restitution(&collider.material);
                for p in body.hull_world() {
                    let hit = check_point(p, CONTACT_MARGIN, |q| collider.signed_distance(q));
                    if hit.hit && hit.penetration <= MAX_STATIC_DEPTH {
                        contacts.push(Contact::new(
                            i,
                            None,
                            hit.normal,
                            p - body.position,
                            Vec3::ZERO,
                            hit.penetration,
                            friction,
                            restitution,
                        ));
                    }
                }
            }
        }

        for i in 0..pairs.len() {
            for j in (i + 1)..pairs.len() {
                let (a, b) = (&pairs[i].body, &pairs[j].body);
                if !a.awake && !b.awake {
                    continue;
                }
                let speculative = CONTACT_MARGIN + self.timestep * closing_bound(a, b);
                let reach = a.shape.bounding_radius() + b.shape.bounding_radius() + speculative;
                if a.position.distance_squared(b.position) > reach * reach {
                    continue;
                }
                match (a.shape, b.shape) {
                    (BodyShape::Box { half_extents: ha }, BodyShape::Box { half_extents: hb }) => {
                        box_contacts(a, i, ha, b, j, hb, speculative, &mut contacts);
                    }
                    _ => {
                        sampled_contacts(a, i, b, j, &mut contacts);
                        sampled_contacts(b, j, a, i, &mut contacts);
                    }
                }
            }
        }

        contacts
    }

    /// Push bodies out of whatever they still penetrate after integration
    fn correct_positions(&self, pairs: &mut [BodyPair], contacts: &[Contact]) {
        for pair in pairs.iter_mut().filter(|p| p.body.awake) {
            for collider in &self.statics {
                let body = &pair.body;
                let mut deepest = 0.0f32;
                let mut normal = Vec3::ZERO;
                for p in body.hull_world() {
                    let hit = check_point(p, 0.0, |q| collider.signed_distance(q));
                    if hit.hit && hit.penetration > deepest && hit.penetration <= MAX_STATIC_DEPTH {
                        deepest = hit.penetration;
                        normal = hit.normal;
                    }
                }
                let push = (deepest - PENETRATION_SLOP).max(0.0) * CORRECTION_FACTOR;
                if push > 0.0 {
                    pair.body.position += normal * push;
                }
            }
        }

        // deepest contact per body pair
        let mut deepest: Vec<&Contact> = Vec::new();
        for c in contacts.iter().filter(|c| c.b.is_some() && c.penetration > PENETRATION_SLOP) {
            let same_pair = |d: &&Contact| {
                (d.a, d.b) == (c.a, c.b) || (Some(d.a), d.b) == (c.b, Some(c.a))
            };
            match deepest.iter().position(same_pair) {
                Some(i) if deepest[i].penetration < c.penetration => deepest[i] = c,
                Some(_) => {}
                None => deepest.push(c),
            }
        }

        for c in deepest {
            let Some(b) = c.b else { continue };
            let push = (c.penetration - PENETRATION_SLOP) * CORRECTION_FACTOR;
            let (wa, wb) = (mobility(&pairs[c.a].body), mobility(&pairs[b].body));
            let total = wa + wb;
            if total <= 0.0 {
                continue;
            }
            pairs[c.a].body.position += c.normal * push * (wa / total);
            pairs[b].body.position -= c.normal * push * (wb / total);
        }
    }
}

/// Sleeping bodies take no impulse
#[inline]
fn mobility(body: &RigidBody) -> f32 {
    if body.awake { body.inv_mass } else { 0.0 }
}

fn within_reach(a: &RigidBody, b: &RigidBody) -> bool {
    let reach = a.shape.bounding_radius() + b.shape.bounding_radius() + CONTACT_MARGIN;
    a.position.distance_squared(b.position) <= reach * reach
}

/// Upper bound on how fast two bodies' surfaces can approach
fn closing_bound(a: &RigidBody, b: &RigidBody) -> f32 {
    (a.linear_velocity - b.linear_velocity).length()
        + a.angular_velocity.length() * a.shape.bounding_radius()
        + b.angular_velocity.length() * b.shape.bounding_radius()
}

/// Hull points of `a` inside `b`
fn sampled_contacts(a: &RigidBody, ia: usize, b: &RigidBody, ib: usize, out: &mut Vec<Contact>) {
    let friction = a.material.combined_friction(&b.material);
    let restitution = a.material.combined_restitution(&b.material);
    for p in a.hull_world() {
        let hit = check_point(p, CONTACT_MARGIN, |q| b.signed_distance(q));
        if hit.hit {
            out.push(Contact::new(
                ia,
                Some(ib),
                hit.normal,
                p - a.position,
                p - b.position,
                hit.penetration,
                friction,
                restitution,
            ));
        }
    }
}

/// Box against box over the 15 separating axes.
/// Face axes clip the incident face against the reference face; edge axes
/// give one contact between the two closest edges. Pairs closer than
/// `speculative` along every axis produce (possibly separated) contacts.
#[allow(clippy::too_many_arguments)]
fn box_contacts(
    a: &RigidBody,
    ia: usize,
    ha: Vec3,
    b: &RigidBody,
    ib: usize,
    hb: Vec3,
    speculative: f32,
    out: &mut Vec<Contact>,
) {
    let axes_a = [a.axis(0), a.axis(1), a.axis(2)];
    let axes_b = [b.axis(0), b.axis(1), b.axis(2)];
    let d = b.position - a.position;

    // overlap along `axis`, and the axis turned to point from a to b
    let project = |axis: Vec3| -> (f32, Vec3) {
        let ra: f32 = (0..3).map(|k| ha[k] * axes_a[k].dot(axis).abs()).sum();
        let rb: f32 = (0..3).map(|k| hb[k] * axes_b[k].dot(axis).abs()).sum();
        let dist = d.dot(axis);
        let n = if dist < 0.0 { -axis } else { axis };
        (ra + rb - dist.abs(), n)
    };

    let mut face = (f32::INFINITY, Vec3::Y, BoxAxis::FaceA(0));
    for (k, axis) in axes_a.iter().enumerate() {
        let (overlap, n) = project(*axis);
        if overlap < -speculative {
            return;
        }
        if overlap < face.0 {
            face = (overlap, n, BoxAxis::FaceA(k));
        }
    }
    for (k, axis) in axes_b.iter().enumerate() {
        let (overlap, n) = project(*axis);
        if overlap < -speculative {
            return;
        }
        if overlap < face.0 {
            face = (overlap, n, BoxAxis::FaceB(k));
        }
    }

    let mut edge = (f32::INFINITY, Vec3::Y, BoxAxis::Edge(0, 0));
    for i in 0..3 {
        for j in 0..3 {
            let cross = axes_a[i].cross(axes_b[j]);
            let len = cross.length();
            if len < 1e-4 {
                continue;
            }
            let (overlap, n) = project(cross / len);
            if overlap < -speculative {
                return;
            }
            if overlap < edge.0 {
                edge = (overlap, n, BoxAxis::Edge(i, j));
            }
        }
    }

    let (overlap, n, axis) = if edge.0 + EDGE_AXIS_TOLERANCE < face.0 { edge } else { face };
    let friction = a.material.combined_friction(&b.material);
    let restitution = a.material.combined_restitution(&b.material);
    let mut push = |point: Vec3, depth: f32| {
        out.push(Contact::new(
            ia,
            Some(ib),
            -n,
            point - a.position,
            point - b.position,
            depth,
            friction,
            restitution,
        ));
    };

    match axis {
        BoxAxis::FaceA(k) => {
            for (p, depth) in clip_incident_face(a.position, ha, &axes_a, k, n, b.position, hb, &axes_b)
            {
                if depth >= -speculative {
                    push(p, depth);
                }
            }
        }
        BoxAxis::FaceB(k) => {
            for (p, depth) in clip_incident_face(b.position, hb, &axes_b, k, -n, a.position, ha, &axes_a)
            {
                if depth >= -speculative {
                    push(p, depth);
                }
            }
        }
        BoxAxis::Edge(i, j) => {
            // edges of each box that lie furthest toward the other
            let mut pa = a.position;
            let mut pb = b.position;
            for k in 0..3 {
                if k != i {
                    pa += axes_a[k] * (ha[k] * axes_a[k].dot(n).signum());
                }
                if k != j {
                    pb -= axes_b[k] * (hb[k] * axes_b[k].dot(n).signum());
                }
            }
            let (da, db) = (axes_a[i], axes_b[j]);
            let r = pa - pb;
            let k = da.dot(db);
            let denom = 1.0 - k * k;
            let s = if denom > 1e-6 {
                ((k * db.dot(r) - da.dot(r)) / denom).clamp(-ha[i], ha[i])
            } else {
                0.0
            };
            let t = (k * s + db.dot(r)).clamp(-hb[j], hb[j]);
            push((pa + da * s + pb + db * t) * 0.5, overlap);
        }
    }
}

/// Clip the face of the incident box that faces the reference face against
/// the reference face's side planes. `normal` is the reference face normal,
/// pointing toward the incident box. Yields contact midpoints with depths.
#[allow(clippy::too_many_arguments)]
fn clip_incident_face(
    ref_pos: Vec3,
    ref_half: Vec3,
    ref_axes: &[Vec3; 3],
    face: usize,
    normal: Vec3,
    inc_pos: Vec3,
    inc_half: Vec3,
    inc_axes: &[Vec3; 3],
) -> Vec<(Vec3, f32)> {
    let mut k = 0;
    let mut best = inc_axes[0].dot(normal);
    for (i, axis) in inc_axes.iter().enumerate().skip(1) {
        let d = axis.dot(normal);
        if d.abs() > best.abs() {
            best = d;
            k = i;
        }
    }
    let sign = if best > 0.0 { -1.0 } else { 1.0 };
    let centre = inc_pos + inc_axes[k] * (inc_half[k] * sign);
    let eu = inc_axes[(k + 1) % 3] * inc_half[(k + 1) % 3];
    let ev = inc_axes[(k + 2) % 3] * inc_half[(k + 2) % 3];
    let mut polygon = vec![centre + eu + ev, centre - eu + ev, centre - eu - ev, centre + eu - ev];

    for side in [(face + 1) % 3, (face + 2) % 3] {
        let axis = ref_axes[side];
        let offset = axis.dot(ref_pos);
        polygon = clip_polygon(&polygon, axis, offset + ref_half[side]);
        polygon = clip_polygon(&polygon, -axis, ref_half[side] - offset);
        if polygon.is_empty() {
            return Vec::new();
        }
    }

    let face_level = normal.dot(ref_pos) + ref_half[face];
    polygon
        .into_iter()
        .map(|p| {
            let depth = face_level - normal.dot(p);
            (p + normal * (depth * 0.5), depth)
        })
        .collect()
}

/// Keep the part of `polygon` where `n . p <= c`
fn clip_polygon(polygon: &[Vec3], n: Vec3, c: f32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(polygon.len() + 2);
    for (i, &p) in polygon.iter().enumerate() {
        let q = polygon[(i + 1) % polygon.len()];
        let dp = n.dot(p) - c;
        let dq = n.dot(q) - c;
        if dp <= 0.0 {
            out.push(p);
        }
        if (dp < 0.0 && dq > 0.0) || (dp > 0.0 && dq < 0.0) {
            out.push(p + (q - p) * (dp / (dp - dq)));
        }
    }
    out
}

impl Contact {
    #[allow(clippy::too_many_arguments)]
    fn new(
        a: usize,
        b: Option<usize>,
        normal: Vec3,
        ra: Vec3,
        rb: Vec3,
        penetration: f32,
        friction: f32,
        restitution: f32,
    ) -> Self {
        let (t1, t2) = normal.any_orthonormal_pair();
        Self {
            a,
            b,
            normal,
            tangents: [t1, t2],
            ra,
            rb,
            penetration,
            friction,
            restitution,
            target_speed: 0.0,
            normal_mass: 0.0,
            tangent_mass: [0.0; 2],
            acc_normal: 0.0,
            acc_tangent: [0.0; 2],
        }
    }
}

fn relative_velocity(pairs: &[BodyPair], c: &Contact) -> Vec3 {
    let va = pairs[c.a].body.velocity_at(c.ra);
    let vb = c
        .b
        .map(|b| pairs[b].body.velocity_at(c.rb))
        .unwrap_or(Vec3::ZERO);
    va - vb
}

fn effective_inv_mass(pairs: &[BodyPair], c: &Contact, dir: Vec3) -> f32 {
    let a = &pairs[c.a].body;
    let ka = if a.awake { a.effective_inv_mass(c.ra, dir) } else { 0.0 };
    let kb = c
        .b
        .map(|b| &pairs[b].body)
        .filter(|b| b.awake)
        .map(|b| b.effective_inv_mass(c.rb, dir))
        .unwrap_or(0.0);
    ka + kb
}

fn apply_contact_impulse(pairs: &mut [BodyPair], c: &Contact, impulse: Vec3) {
    if pairs[c.a].body.awake {
        pairs[c.a].body.apply_impulse(impulse, c.ra);
    }
    if let Some(b) = c.b {
        if pairs[b].body.awake {
            pairs[b].body.apply_impulse(-impulse, c.rb);
        }
    }
}

fn prepare_contact(pairs: &[BodyPair], c: &mut Contact, dt: f32) {
    let vn = relative_velocity(pairs, c).dot(c.normal);
    c.target_speed = if c.penetration < -CONTACT_MARGIN {
        // still apart: only close the gap this step
        c.penetration / dt
    } else if vn < -RESTITUTION_THRESHOLD {
        -c.restitution * vn
    } else {
        0.0
    };
    let k = effective_inv_mass(pairs, c, c.normal);
    c.normal_mass = if k > 0.0 { 1.0 / k } else { 0.0 };
    for (i, t) in c.tangents.iter().enumerate() {
        let kt = effective_inv_mass(pairs, c, *t);
        c.tangent_mass[i] = if kt > 0.0 { 1.0 / kt } else { 0.0 };
    }
}

fn solve_contact(pairs: &mut [BodyPair], c: &mut Contact) {
    let vn = relative_velocity(pairs, c).dot(c.normal);
    let dj = (c.target_speed - vn) * c.normal_mass;
    let acc = (c.acc_normal + dj).max(0.0);
    let dj = acc - c.acc_normal;
    c.acc_normal = acc;
    if dj != 0.0 {
        apply_contact_impulse(pairs, c, c.normal * dj);
    }

    let limit = c.friction * c.acc_normal;
    for i in 0..2 {
        let t = c.tangents[i];
        let vt = relative_velocity(pairs, c).dot(t);
        let dj = -vt * c.tangent_mass[i];
        let acc = (c.acc_tangent[i] + dj).clamp(-limit, limit);
        let dj = acc - c.acc_tangent[i];
        c.acc_tangent[i] = acc;
        if dj != 0.0 {
            apply_contact_impulse(pairs, c, t * dj);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::ArenaBuilder;
    use crate::sim::body::{ObjectKind, RigidBodyFactory};

    fn world() -> (PhysicsWorld, RigidBodyFactory) {
        let config = EngineConfig::default();
        let mut world = PhysicsWorld::new(&config);
        world.set_statics(ArenaBuilder::new(&config.arena).build());
        (world, RigidBodyFactory::new(&config))
    }

    fn run(world: &PhysicsWorld, pairs: &mut [BodyPair], steps: usize) {
        for _ in 0..steps {
            world.step(pairs);
        }
    }

    #[test]
    fn test_free_fall_matches_gravity() {
        let config = EngineConfig::default();
        let world = PhysicsWorld::new(&config);
        let factory = RigidBodyFactory::new(&config);
        let mut pairs = vec![factory.create(1, ObjectKind::Die, 0, 1)];
        world.step(&mut pairs);
        let expected = config.gravity[1] * config.timestep * (1.0 - config.linear_damping * config.timestep);
        assert!((pairs[0].body.linear_velocity.y - expected).abs() < 1e-5);
    }

    #[test]
    fn test_die_comes_to_rest_on_floor() {
        let (world, factory) = world();
        let mut pairs = vec![factory.create(1, ObjectKind::Die, 0, 1)];
        run(&world, &mut pairs, 240);
        let body = &pairs[0].body;
        assert!(body.linear_velocity.length() < 0.05, "v = {}", body.linear_velocity);
        assert!((body.position.y - 0.5).abs() < 0.05, "y = {}", body.position.y);
    }

    #[test]
    fn test_coin_lands_flat() {
        let (world, factory) = world();
        let mut pairs = vec![factory.create(1, ObjectKind::Coin, 0, 1)];
        run(&world, &mut pairs, 240);
        let body = &pairs[0].body;
        assert!(body.position.y < 0.2, "y = {}", body.position.y);
        assert!(body.linear_velocity.length() < 0.05);
    }

    #[test]
    fn test_wall_stops_sideways_body() {
        let (world, factory) = world();
        let mut pairs = vec![factory.create(1, ObjectKind::Die, 0, 1)];
        pairs[0].body.linear_velocity = Vec3::new(30.0, 0.0, 0.0);
        run(&world, &mut pairs, 180);
        assert!(pairs[0].body.position.x < 6.0);
    }

    #[test]
    fn test_falling_die_does_not_sink_into_another() {
        let (world, factory) = world();
        let mut pairs = vec![
            factory.create(1, ObjectKind::Die, 0, 1),
            factory.create(2, ObjectKind::Die, 0, 1),
        ];
        pairs[1].body.position += Vec3::new(0.3, 1.5, 0.0);
        run(&world, &mut pairs, 300);
        let d = pairs[0].body.position.distance(pairs[1].body.position);
        assert!(d > 0.9, "dice overlap, distance {d}");
    }

    #[test]
    fn test_face_overlap_without_corners_inside_makes_contact() {
        let (world, factory) = world();
        let mut pairs = vec![
            factory.create(1, ObjectKind::Die, 0, 1),
            factory.create(2, ObjectKind::Die, 0, 1),
        ];
        // lower die on the floor, upper die turned 45 degrees and 0.05 into it;
        // no corner of either die is inside the other
        pairs[0].body.position = Vec3::new(0.0, 0.5, 0.0);
        pairs[1].body.position = Vec3::new(0.0, 1.45, 0.0);
        pairs[1].body.orientation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        for p in pairs[1].body.hull_world() {
            assert!(pairs[0].body.signed_distance(p) > 0.0);
        }
        for p in pairs[0].body.hull_world() {
            assert!(pairs[1].body.signed_distance(p) > 0.0);
        }

        let contacts = world.collect_contacts(&pairs);
        let between: Vec<&Contact> = contacts.iter().filter(|c| c.b == Some(1)).collect();
        assert!(between.len() >= 4, "only {} contacts", between.len());
        for c in &between {
            assert!(c.normal.y < -0.99);
            assert!((c.penetration - 0.05).abs() < 1e-3);
        }

        run(&world, &mut pairs, 120);
        let gap = pairs[1].body.position.y - pairs[0].body.position.y;
        assert!(gap > 0.95, "upper die sank to {gap}");
    }

    #[test]
    fn test_edge_on_edge_overlap_pushes_apart() {
        let (world, factory) = world();
        let mut pairs = vec![
            factory.create(1, ObjectKind::Die, 0, 1),
            factory.create(2, ObjectKind::Die, 0, 1),
        ];
        // two dice standing on opposite edges, crossed, edges overlapping
        let tilt = std::f32::consts::FRAC_PI_4;
        pairs[0].body.position = Vec3::new(0.0, 0.0, 0.0);
        pairs[0].body.orientation = Quat::from_rotation_x(tilt);
        pairs[1].body.position = Vec3::new(0.0, 1.35, 0.0);
        pairs[1].body.orientation = Quat::from_rotation_z(tilt);
        let contacts = world.collect_contacts(&pairs);
        let c = contacts
            .iter()
            .find(|c| c.b == Some(1))
            .expect("crossed edges touch");
        assert!(c.normal.y < -0.99);
        assert!(c.penetration > 0.0);
    }

    #[test]
    fn test_separated_dice_get_speculative_contact() {
        let (world, factory) = world();
        let mut pairs = vec![
            factory.create(1, ObjectKind::Die, 0, 1),
            factory.create(2, ObjectKind::Die, 0, 1),
        ];
        pairs[0].body.position = Vec3::new(0.0, 0.5, 0.0);
        pairs[0].body.linear_velocity = Vec3::ZERO;
        pairs[1].body.position = Vec3::new(0.0, 1.6, 0.0);
        pairs[1].body.linear_velocity = Vec3::new(0.0, -30.0, 0.0);
        let contacts = world.collect_contacts(&pairs);
        assert!(contacts.iter().any(|c| c.b == Some(1) && c.penetration < 0.0));

        // one step at that speed would otherwise go 0.4 deep
        world.step(&mut pairs);
        let gap = pairs[1].body.position.y - pairs[0].body.position.y;
        assert!(gap > 0.98, "gap {gap}");
    }

    #[test]
    fn test_still_die_falls_asleep_once() {
        let (world, factory) = world();
        let mut pairs = vec![factory.create(1, ObjectKind::Die, 0, 1)];
        pairs[0].body.position = Vec3::new(0.0, 0.5, 0.0);
        let mut slept = 0;
        for _ in 0..120 {
            slept += world.step(&mut pairs).fell_asleep;
        }
        assert_eq!(slept, 1);
        let body = &pairs[0].body;
        assert!(!body.awake);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_moving_die_wakes_sleeping_neighbour() {
        let (world, factory) = world();
        let mut pairs = vec![
            factory.create(1, ObjectKind::Die, 0, 1),
            factory.create(2, ObjectKind::Die, 0, 1),
        ];
        pairs[0].body.position = Vec3::new(0.0, 0.5, 0.0);
        pairs[0].body.sleep();
        pairs[1].body.position = Vec3::new(0.2, 2.0, 0.0);

        let mut woke = false;
        for _ in 0..120 {
            world.step(&mut pairs);
            woke |= pairs[0].body.awake;
        }
        assert!(woke);
        let d = pairs[0].body.position.distance(pairs[1].body.position);
        assert!(d > 0.95, "dice overlap, distance {d}");
    }

    #[test]
    fn test_sleeping_bodies_are_not_stepped() {
        let (world, factory) = world();
        let mut pairs = vec![factory.create(1, ObjectKind::Die, 0, 1)];
        pairs[0].body.sleep();
        let before = pairs[0].body.position;
        let report = world.step(&mut pairs);
        assert_eq!(report.bodies_stepped, 0);
        assert_eq!(pairs[0].body.position, before);
    }
}
