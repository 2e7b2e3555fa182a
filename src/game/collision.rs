//! Spatial resolver - wall sliding against static solids

use glam::Vec3;

/// Default player bounding radius used by the locomotion controller
pub const PLAYER_RADIUS: f32 = 0.5;

/// Horizontal probe directions, tested in this order
const PROBES: [Vec3; 4] = [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z];

/// Static axis-aligned obstacle registered at level load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solid {
    pub min: Vec3,
    pub max: Vec3,
}

impl Solid {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box of the given full size centered on `center`
    pub fn from_center(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Distance along a ray to the first surface of this solid.
    /// Zero when the origin is inside, `None` when the ray misses.
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_near = 0.0f32;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        Some(t_near)
    }
}

/// Registered solids for the current level. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    solids: Vec<Solid>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_solid(&mut self, solid: Solid) {
        self.solids.push(solid);
    }

    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    /// Whether any cardinal probe from `position` hits a solid closer than `radius`
    pub fn is_blocked(&self, position: Vec3, radius: f32) -> bool {
        PROBES.iter().any(|dir| {
            self.solids
                .iter()
                .filter_map(|s| s.ray_distance(position, *dir))
                .any(|dist| dist < radius)
        })
    }

    /// Best reachable horizontal position on the way from `current` to `desired`.
    ///
    /// Tries the full move, then X only, then Z only, then stays put. The
    /// X-before-Z order decides which wall a diagonal move slides along.
    pub fn resolve(&self, current: Vec3, desired: Vec3, radius: f32) -> Vec3 {
        if !self.is_blocked(desired, radius) {
            return desired;
        }

        let x_only = Vec3::new(desired.x, current.y, current.z);
        if !self.is_blocked(x_only, radius) {
            return x_only;
        }

        let z_only = Vec3::new(current.x, current.y, desired.z);
        if !self.is_blocked(z_only, radius) {
            return z_only;
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wall along the X axis at z = -5..-4, tall enough to cover eye height
    fn wall_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.register_solid(Solid::new(
            Vec3::new(-10.0, 0.0, -5.0),
            Vec3::new(10.0, 4.0, -4.0),
        ));
        world
    }

    #[test]
    fn clear_move_is_returned_unchanged() {
        let world = wall_world();
        let current = Vec3::new(0.0, 1.8, 0.0);
        let desired = Vec3::new(0.3, 1.8, -0.3);
        assert_eq!(world.resolve(current, desired, PLAYER_RADIUS), desired);
    }

    #[test]
    fn diagonal_into_wall_slides_along_x() {
        let world = wall_world();
        let current = Vec3::new(0.0, 1.8, -3.0);
        let desired = Vec3::new(0.4, 1.8, -3.6);
        let resolved = world.resolve(current, desired, PLAYER_RADIUS);
        assert_eq!(resolved, Vec3::new(0.4, 1.8, -3.0));
    }

    #[test]
    fn corner_falls_back_to_z_then_current() {
        let mut world = wall_world();
        // Second wall along Z at x = 2..3
        world.register_solid(Solid::new(
            Vec3::new(2.0, 0.0, -10.0),
            Vec3::new(3.0, 4.0, 10.0),
        ));

        // Moving +X into the side wall while backing away from the front wall
        let current = Vec3::new(1.0, 1.8, -3.0);
        let desired = Vec3::new(1.6, 1.8, -2.5);
        assert_eq!(
            world.resolve(current, desired, PLAYER_RADIUS),
            Vec3::new(1.0, 1.8, -2.5)
        );

        // Pushing into the corner stops completely
        let desired = Vec3::new(1.6, 1.8, -3.6);
        assert_eq!(world.resolve(current, desired, PLAYER_RADIUS), current);
    }

    #[test]
    fn inside_a_solid_counts_as_blocked() {
        let world = wall_world();
        assert!(world.is_blocked(Vec3::new(0.0, 1.8, -4.5), 0.01));
    }

    #[test]
    fn probes_ignore_solids_above_head_height() {
        let mut world = CollisionWorld::new();
        world.register_solid(Solid::new(
            Vec3::new(-1.0, 3.0, -1.0),
            Vec3::new(1.0, 4.0, 1.0),
        ));
        assert!(!world.is_blocked(Vec3::new(0.0, 1.8, 0.0), PLAYER_RADIUS));
    }

    #[test]
    fn blocked_desired_is_never_returned() {
        let world = wall_world();
        let current = Vec3::new(0.0, 1.8, -3.0);

        for ix in -10..=10 {
            for iz in -10..=10 {
                let desired = current + Vec3::new(ix as f32 * 0.1, 0.0, iz as f32 * 0.1);
                let resolved = world.resolve(current, desired, PLAYER_RADIUS);

                if world.is_blocked(desired, PLAYER_RADIUS) {
                    let x_only = Vec3::new(desired.x, current.y, current.z);
                    let z_only = Vec3::new(current.x, current.y, desired.z);
                    assert!(
                        resolved == x_only || resolved == z_only || resolved == current,
                        "desired {desired:?} resolved to {resolved:?}"
                    );
                    if resolved != current {
                        assert!(!world.is_blocked(resolved, PLAYER_RADIUS));
                    }
                } else {
                    assert_eq!(resolved, desired);
                }
            }
        }
    }
}
