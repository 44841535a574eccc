//! Per-body controller state.
//!
//! [`LocomotionState`] is the mutable half of the controller (the immutable
//! half being [`LocomotionConfig`](crate::config::LocomotionConfig)). The
//! marker components mirror the ring's grip so other systems can filter on
//! them without touching the ring.

use bevy::prelude::*;

use crate::config::LocomotionConfig;

/// Mutable controller state of one body.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct LocomotionState {
    /// Seconds since the last jump. Starts at infinity (never jumped).
    pub time_since_jump: f32,

    /// Force accumulated by the controller this frame.
    #[reflect(ignore)]
    accumulated_force: Vec2,
    /// Torque accumulated by the controller this frame.
    #[reflect(ignore)]
    accumulated_torque: f32,
    /// Force handed to the physics engine last frame.
    #[reflect(ignore)]
    applied_force: Vec2,
    /// Torque handed to the physics engine last frame.
    #[reflect(ignore)]
    applied_torque: f32,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self {
            time_since_jump: f32::INFINITY,
            accumulated_force: Vec2::ZERO,
            accumulated_torque: 0.0,
            applied_force: Vec2::ZERO,
            applied_torque: 0.0,
        }
    }
}

impl LocomotionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the body is still inside the post-jump grace window, during
    /// which every anchor is released.
    #[inline]
    pub fn in_grace_window(&self, config: &LocomotionConfig) -> bool {
        self.time_since_jump <= config.jump_grace_window
    }

    /// Whether enough time has passed since the last jump to jump again.
    #[inline]
    pub fn jump_ready(&self, config: &LocomotionConfig) -> bool {
        self.time_since_jump > config.jump_debounce
    }

    /// Attempt a jump.
    ///
    /// Succeeds on the tick the jump key goes down (`jump_held == Some(0.0)`),
    /// once the debounce has elapsed and with at least `jump_min_grip`
    /// anchors attached. Returns the impulse, pointing away from the average
    /// contact direction, and restarts the jump timer.
    pub fn try_jump(
        &mut self,
        config: &LocomotionConfig,
        jump_held: Option<f32>,
        grip_count: usize,
        average_contact_angle: f32,
    ) -> Option<Vec2> {
        let pressed = jump_held == Some(0.0);
        if !pressed || !self.jump_ready(config) || grip_count < config.jump_min_grip {
            return None;
        }

        self.time_since_jump = 0.0;
        Some(-Vec2::from_angle(average_contact_angle) * config.jump_impulse)
    }

    /// Advance the jump timer.
    #[inline]
    pub fn tick(&mut self, dt: f32) {
        self.time_since_jump += dt;
    }

    /// Add a force to this frame's accumulator.
    #[inline]
    pub fn add_force(&mut self, force: Vec2) {
        self.accumulated_force += force;
    }

    /// Add a torque to this frame's accumulator.
    #[inline]
    pub fn add_torque(&mut self, torque: f32) {
        self.accumulated_torque += torque;
    }

    /// Force accumulated so far this frame.
    #[inline]
    pub fn accumulated_force(&self) -> Vec2 {
        self.accumulated_force
    }

    /// Torque accumulated so far this frame.
    #[inline]
    pub fn accumulated_torque(&self) -> f32 {
        self.accumulated_torque
    }

    /// Start a new frame: clear the accumulators and return what was handed
    /// to the physics engine last frame, so the backend can take it back out.
    pub fn prepare_new_frame(&mut self) -> (Vec2, f32) {
        let previous = (self.applied_force, self.applied_torque);
        self.accumulated_force = Vec2::ZERO;
        self.accumulated_torque = 0.0;
        self.applied_force = Vec2::ZERO;
        self.applied_torque = 0.0;
        previous
    }

    /// Finish the frame: return the accumulated force and torque and
    /// remember them as applied.
    pub fn finalize_frame(&mut self) -> (Vec2, f32) {
        self.applied_force = self.accumulated_force;
        self.applied_torque = self.accumulated_torque;
        (self.applied_force, self.applied_torque)
    }
}

/// Marker component: at least one anchor is attached.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Gripping;

/// Marker component: no anchor is attached.
///
/// Mutually exclusive with [`Gripping`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn pressed() -> Option<f32> {
        Some(0.0)
    }

    #[test]
    fn starts_ready_to_jump() {
        let state = LocomotionState::new();
        let config = LocomotionConfig::default();
        assert!(state.time_since_jump.is_infinite());
        assert!(state.jump_ready(&config));
        assert!(!state.in_grace_window(&config));
    }

    #[test]
    fn jump_pushes_away_from_contact() {
        let mut state = LocomotionState::new();
        let config = LocomotionConfig::default().with_jump_impulse(10.0);

        // Contact straight below: jump straight up.
        let impulse = state.try_jump(&config, pressed(), 3, -FRAC_PI_2).unwrap();

        assert!((impulse - Vec2::new(0.0, 10.0)).length() < 1e-4);
        assert_eq!(state.time_since_jump, 0.0);
        assert!(state.in_grace_window(&config));
    }

    #[test]
    fn jump_needs_rising_edge() {
        let mut state = LocomotionState::new();
        let config = LocomotionConfig::default();

        assert!(state.try_jump(&config, None, 4, 0.0).is_none());
        assert!(state.try_jump(&config, Some(0.2), 4, 0.0).is_none());
        assert!(state.time_since_jump.is_infinite());
    }

    #[test]
    fn jump_needs_grip() {
        let mut state = LocomotionState::new();
        let config = LocomotionConfig::default();

        assert!(state.try_jump(&config, pressed(), 1, 0.0).is_none());
        assert!(state.try_jump(&config, pressed(), 2, 0.0).is_some());
    }

    #[test]
    fn jump_is_debounced() {
        let mut state = LocomotionState::new();
        let config = LocomotionConfig::default();

        assert!(state.try_jump(&config, pressed(), 2, 0.0).is_some());
        state.tick(0.01);
        assert!(state.try_jump(&config, pressed(), 2, 0.0).is_none());
        state.tick(0.01);
        assert!(state.try_jump(&config, pressed(), 2, 0.0).is_some());
    }

    #[test]
    fn grace_window_ends() {
        let mut state = LocomotionState::new();
        let config = LocomotionConfig::default();
        state.try_jump(&config, pressed(), 2, 0.0);

        state.tick(0.05);
        assert!(state.in_grace_window(&config));
        state.tick(0.1);
        assert!(!state.in_grace_window(&config));
    }

    #[test]
    fn frame_accumulation_round() {
        let mut state = LocomotionState::new();

        state.add_force(Vec2::new(1.0, 2.0));
        state.add_force(Vec2::new(3.0, 0.0));
        state.add_torque(0.5);
        assert_eq!(state.accumulated_force(), Vec2::new(4.0, 2.0));

        let applied = state.finalize_frame();
        assert_eq!(applied, (Vec2::new(4.0, 2.0), 0.5));

        let previous = state.prepare_new_frame();
        assert_eq!(previous, applied);
        assert_eq!(state.accumulated_force(), Vec2::ZERO);
        assert_eq!(state.accumulated_torque(), 0.0);

        // Nothing applied since the last preparation.
        assert_eq!(state.prepare_new_frame(), (Vec2::ZERO, 0.0));
    }
}
