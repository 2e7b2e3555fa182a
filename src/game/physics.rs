//! Locomotion - gravity, jumping, crouching, sliding and planar movement

use glam::Vec3;

use super::collision::{CollisionWorld, PLAYER_RADIUS};
use super::FrameInput;

/// Movement constants
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// Height of the flat ground plane
    pub ground_height: f32,
    /// Camera height above ground when standing
    pub stand_height: f32,
    /// Camera height above ground when crouching or sliding
    pub crouch_height: f32,
    /// Vertical acceleration (negative is down)
    pub gravity: f32,
    /// Vertical velocity set by a jump
    pub jump_impulse: f32,
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub crouch_speed: f32,
    /// Slide speed on entry, decays to 20% over the slide duration
    pub slide_initial_speed: f32,
    /// Slide duration in seconds
    pub slide_duration: f32,
    /// Slack above resting height still treated as grounded
    pub ground_tolerance: f32,
    /// Collision radius for the spatial resolver
    pub radius: f32,
}

impl Default for MovementStats {
    fn default() -> Self {
        Self {
            ground_height: 0.0,
            stand_height: 1.8,
            crouch_height: 1.0,
            gravity: -30.0,
            jump_impulse: 12.0,
            walk_speed: 8.0,
            sprint_speed: 15.0,
            crouch_speed: 3.0,
            slide_initial_speed: 25.0,
            slide_duration: 1.0,
            ground_tolerance: 0.1,
            radius: PLAYER_RADIUS,
        }
    }
}

/// Fraction of the initial slide speed left at the end of a slide
const SLIDE_END_FRACTION: f32 = 0.2;

/// Per-entity locomotion state
#[derive(Debug, Clone)]
pub struct Locomotion {
    stats: MovementStats,
    vertical_velocity: f32,
    can_jump: bool,
    /// Current camera height above ground (stand or crouch)
    current_height: f32,
    crouching: bool,
    crouch_held: bool,
    sprinting: bool,
    sliding: bool,
    slide_timer: f32,
    slide_speed: f32,
}

impl Locomotion {
    pub fn new(stats: MovementStats) -> Self {
        Self {
            stats,
            vertical_velocity: 0.0,
            can_jump: true,
            current_height: stats.stand_height,
            crouching: false,
            crouch_held: false,
            sprinting: false,
            sliding: false,
            slide_timer: 0.0,
            slide_speed: 0.0,
        }
    }

    pub fn stats(&self) -> &MovementStats {
        &self.stats
    }

    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    pub fn is_sliding(&self) -> bool {
        self.sliding
    }

    pub fn can_jump(&self) -> bool {
        self.can_jump
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn slide_speed(&self) -> f32 {
        self.slide_speed
    }

    /// Floor clamp for the camera at the current posture
    pub fn resting_height(&self) -> f32 {
        self.stats.ground_height + self.current_height
    }

    pub fn is_on_ground(&self, position: Vec3) -> bool {
        position.y <= self.resting_height() + self.stats.ground_tolerance
    }

    /// Clear all motion, used on respawn
    pub fn reset(&mut self) {
        *self = Self::new(self.stats);
    }

    /// Track the crouch key. Ignored for posture while sliding; the held
    /// state is still recorded so the slide exit knows whether to stand.
    pub fn set_crouch(&mut self, held: bool, position: &mut Vec3) {
        self.crouch_held = held;
        if self.sliding || self.crouching == held {
            return;
        }

        self.crouching = held;
        let target = if held {
            self.stats.crouch_height
        } else {
            self.stats.stand_height
        };
        position.y += target - self.current_height;
        self.current_height = target;
    }

    pub fn set_sprint(&mut self, held: bool) {
        self.sprinting = held;
    }

    /// Start a jump if grounded and upright. Returns whether it started.
    pub fn try_jump(&mut self, position: Vec3) -> bool {
        if !self.is_on_ground(position) || !self.can_jump || self.crouching || self.sliding {
            return false;
        }
        self.vertical_velocity = self.stats.jump_impulse;
        self.can_jump = false;
        true
    }

    /// Enter a slide. Requires ground contact, forward motion and an upright,
    /// non-sliding posture.
    pub fn try_slide(&mut self, position: &mut Vec3, moving_forward: bool) -> bool {
        if !moving_forward || self.crouching || self.sliding || !self.is_on_ground(*position) {
            return false;
        }

        self.sliding = true;
        self.slide_timer = 0.0;
        self.slide_speed = self.stats.slide_initial_speed;
        self.crouching = true;
        self.current_height = self.stats.crouch_height;
        position.y = self.resting_height();
        true
    }

    fn update_slide(&mut self, dt: f32, position: &mut Vec3) {
        if !self.sliding {
            return;
        }

        self.slide_timer += dt;
        if self.slide_timer >= self.stats.slide_duration {
            self.sliding = false;
            self.slide_speed = 0.0;
            if !self.crouch_held {
                self.crouching = false;
                self.current_height = self.stats.stand_height;
                position.y = self.resting_height();
            }
        } else {
            let progress = self.slide_timer / self.stats.slide_duration;
            self.slide_speed =
                self.stats.slide_initial_speed * (1.0 - progress * (1.0 - SLIDE_END_FRACTION));
        }
    }

    fn current_speed(&self) -> f32 {
        if self.sliding {
            self.slide_speed
        } else if self.crouching {
            self.stats.crouch_speed
        } else if self.sprinting {
            self.stats.sprint_speed
        } else {
            self.stats.walk_speed
        }
    }

    /// Advance one frame: vertical integration, slide, then horizontal movement
    /// through the spatial resolver.
    pub fn update(
        &mut self,
        dt: f32,
        position: &mut Vec3,
        yaw: f32,
        input: &FrameInput,
        world: &CollisionWorld,
    ) {
        // Vertical: gravity applies anywhere above the floor, the tolerance
        // only gates jump and slide
        if position.y > self.resting_height() {
            self.vertical_velocity += self.stats.gravity * dt;
        } else if self.vertical_velocity < 0.0 {
            self.vertical_velocity = 0.0;
            self.can_jump = true;
        }

        position.y += self.vertical_velocity * dt;

        let floor = self.resting_height();
        if position.y < floor {
            position.y = floor;
            self.vertical_velocity = 0.0;
            self.can_jump = true;
        }

        self.update_slide(dt, position);

        // Horizontal, forward flattened onto the ground plane
        let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
        let right = forward.cross(Vec3::Y).normalize_or_zero();

        let mut movement = Vec3::ZERO;
        if input.forward {
            movement += forward;
        }
        if input.backward {
            movement -= forward;
        }
        if input.right {
            movement += right;
        }
        if input.left {
            movement -= right;
        }

        if movement.length_squared() > 0.0 {
            movement = movement.normalize() * self.current_speed() * dt;
        }

        if self.sliding {
            movement = forward * self.slide_speed * dt;
        }

        if movement.length_squared() > 0.0 {
            let desired = *position + movement;
            let resolved = world.resolve(*position, desired, self.stats.radius);
            position.x = resolved.x;
            position.z = resolved.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn standing() -> (Locomotion, Vec3) {
        let stats = MovementStats::default();
        (Locomotion::new(stats), Vec3::new(0.0, stats.stand_height, 0.0))
    }

    fn forward_input() -> FrameInput {
        FrameInput {
            forward: true,
            ..FrameInput::default()
        }
    }

    #[test]
    fn resting_entity_stays_on_floor() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();
        for _ in 0..120 {
            loco.update(DT, &mut pos, 0.0, &FrameInput::default(), &world);
        }
        assert_eq!(pos.y, 1.8);
        assert!(loco.can_jump());
    }

    #[test]
    fn falling_without_ground_strictly_decreases_and_respects_clamp() {
        let stats = MovementStats {
            ground_height: -100.0,
            ..MovementStats::default()
        };
        let mut loco = Locomotion::new(stats);
        let mut pos = Vec3::new(0.0, 1.8, 0.0);
        let world = CollisionWorld::new();

        let mut last = pos.y;
        for _ in 0..60 {
            loco.update(DT, &mut pos, 0.0, &FrameInput::default(), &world);
            assert!(pos.y < last, "y did not decrease: {} -> {}", last, pos.y);
            assert!(pos.y >= loco.resting_height());
            last = pos.y;
        }
    }

    #[test]
    fn fall_is_clamped_at_resting_height() {
        let (mut loco, _) = standing();
        let mut pos = Vec3::new(0.0, 3.0, 0.0);
        let world = CollisionWorld::new();
        for _ in 0..120 {
            loco.update(DT, &mut pos, 0.0, &FrameInput::default(), &world);
            assert!(pos.y >= 1.8);
        }
        assert_eq!(pos.y, 1.8);
        assert_eq!(loco.vertical_velocity(), 0.0);
    }

    #[test]
    fn entity_within_ground_tolerance_still_settles() {
        let (mut loco, _) = standing();
        let mut pos = Vec3::new(0.0, 1.85, 0.0);
        let world = CollisionWorld::new();
        assert!(loco.is_on_ground(pos));

        for _ in 0..30 {
            loco.update(DT, &mut pos, 0.0, &FrameInput::default(), &world);
        }
        assert_eq!(pos.y, 1.8);
        assert_eq!(loco.vertical_velocity(), 0.0);
        assert!(loco.can_jump());
    }

    #[test]
    fn jump_requires_ground_and_lands_again() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();

        assert!(loco.try_jump(pos));
        assert!(!loco.try_jump(pos), "second jump before landing");

        let mut peak = pos.y;
        for _ in 0..120 {
            loco.update(DT, &mut pos, 0.0, &FrameInput::default(), &world);
            peak = peak.max(pos.y);
        }
        assert!(peak > 3.5);
        assert_eq!(pos.y, 1.8);
        assert!(loco.try_jump(pos));
    }

    #[test]
    fn crouch_blocks_jump_and_lowers_camera() {
        let (mut loco, mut pos) = standing();
        loco.set_crouch(true, &mut pos);
        assert!((pos.y - 1.0).abs() < 1e-6);
        assert!(!loco.try_jump(pos));

        loco.set_crouch(false, &mut pos);
        assert!((pos.y - 1.8).abs() < 1e-6);
    }

    #[test]
    fn walking_moves_along_view_forward() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();
        loco.update(1.0, &mut pos, 0.0, &forward_input(), &world);
        assert!((pos.z + 8.0).abs() < 1e-4);
        assert!(pos.x.abs() < 1e-4);
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();
        let input = FrameInput {
            forward: true,
            right: true,
            ..FrameInput::default()
        };
        loco.update(0.5, &mut pos, 0.0, &input, &world);
        let planar = Vec3::new(pos.x, 0.0, pos.z).length();
        assert!((planar - 4.0).abs() < 1e-4);
    }

    #[test]
    fn slide_requires_forward_motion_and_standing() {
        let (mut loco, mut pos) = standing();
        assert!(!loco.try_slide(&mut pos, false));

        loco.set_crouch(true, &mut pos);
        assert!(!loco.try_slide(&mut pos, true));
        loco.set_crouch(false, &mut pos);

        assert!(loco.try_slide(&mut pos, true));
        assert!(loco.is_sliding());
        assert!(loco.is_crouching());
        assert!(!loco.try_slide(&mut pos, true));
    }

    #[test]
    fn slide_decays_to_twenty_percent_then_stands() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();
        assert!(loco.try_slide(&mut pos, true));

        let mut last_speed = f32::MAX;
        let mut ticks = 0;
        while loco.is_sliding() {
            loco.update(DT, &mut pos, 0.0, &forward_input(), &world);
            if loco.is_sliding() {
                assert!(loco.slide_speed() < last_speed);
                assert!(loco.slide_speed() >= 25.0 * 0.2);
                last_speed = loco.slide_speed();
            }
            ticks += 1;
            assert!(ticks < 100, "slide never ended");
        }

        assert!(!loco.is_crouching());
        assert!((pos.y - 1.8).abs() < 1e-6);
    }

    #[test]
    fn slide_exit_keeps_crouch_when_key_held() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();
        assert!(loco.try_slide(&mut pos, true));
        loco.set_crouch(true, &mut pos);

        for _ in 0..90 {
            loco.update(DT, &mut pos, 0.0, &forward_input(), &world);
        }
        assert!(!loco.is_sliding());
        assert!(loco.is_crouching());
        assert!((pos.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn slide_overrides_strafe_with_forward_motion() {
        let (mut loco, mut pos) = standing();
        let world = CollisionWorld::new();
        assert!(loco.try_slide(&mut pos, true));

        let input = FrameInput {
            right: true,
            ..FrameInput::default()
        };
        loco.update(DT, &mut pos, 0.0, &input, &world);
        assert!(pos.x.abs() < 1e-6);
        assert!(pos.z < 0.0);
    }
}
