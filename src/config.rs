//! Locomotion configuration components.
//!
//! [`LocomotionConfig`] holds every tunable of the controller: ring layout,
//! per-anchor joint settings, movement and jump forces, and the torsion
//! spring that keeps the body aligned with its grip.

use bevy::prelude::*;

/// Settings shared by every anchor of a ring.
///
/// Joint lengths are derived from the ray length, so changing the ring size
/// keeps the anchors proportionate.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct AnchorSettings {
    /// A joint is recreated once its anchors are farther apart than
    /// `last_attach_length * stretch_ratio`.
    pub stretch_ratio: f32,

    /// Rest length = ray length * `joint_length_factor`.
    pub joint_length_factor: f32,

    /// Max length = rest length * `max_length_factor`.
    pub max_length_factor: f32,

    /// Spring frequency of anchor joints (Hz).
    pub spring_hertz: f32,

    /// Spring damping ratio of anchor joints.
    pub spring_damping_ratio: f32,

    /// How far the ray's contact may drift from the joint's surface anchor
    /// before the joint is re-anchored.
    pub tolerance_distance: f32,

    /// On a missed cast, measure drift against the ray tip instead of
    /// skipping the drift check. Anchors then release as soon as their
    /// surface leaves the ray.
    pub release_on_miss: bool,
}

impl Default for AnchorSettings {
    fn default() -> Self {
        Self {
            stretch_ratio: 1.1,
            joint_length_factor: 0.95,
            max_length_factor: 1.2,
            spring_hertz: 2.0,
            spring_damping_ratio: 0.3,
            tolerance_distance: 0.15,
            release_on_miss: true,
        }
    }
}

impl AnchorSettings {
    /// Rest length of a joint created by a ray of `ray_length`.
    #[inline]
    pub fn rest_length(&self, ray_length: f32) -> f32 {
        ray_length * self.joint_length_factor
    }

    /// Maximum length of a joint created by a ray of `ray_length`.
    #[inline]
    pub fn max_length(&self, ray_length: f32) -> f32 {
        self.rest_length(ray_length) * self.max_length_factor
    }

    /// Builder: set spring parameters.
    pub fn with_spring(mut self, hertz: f32, damping_ratio: f32) -> Self {
        self.spring_hertz = hertz;
        self.spring_damping_ratio = damping_ratio;
        self
    }

    /// Builder: set drift tolerance.
    pub fn with_tolerance(mut self, distance: f32) -> Self {
        self.tolerance_distance = distance;
        self
    }

    /// Builder: set stretch ratio.
    pub fn with_stretch_ratio(mut self, ratio: f32) -> Self {
        self.stretch_ratio = ratio;
        self
    }

    /// Builder: enable or disable releasing on a missed cast.
    pub fn with_release_on_miss(mut self, enabled: bool) -> Self {
        self.release_on_miss = enabled;
        self
    }
}

/// Configuration parameters for the locomotion controller.
///
/// This is configuration, not state: systems only read it. The ring is built
/// from `ray_count`, `ray_length` and `anchor` once, when the body spawns.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct LocomotionConfig {
    // === Ring Settings ===
    /// Number of rays cast around the body.
    pub ray_count: usize,

    /// Length of every ray (world units).
    pub ray_length: f32,

    /// Per-anchor joint settings.
    pub anchor: AnchorSettings,

    // === Movement Settings ===
    /// Force applied per axis while a direction key is held.
    pub move_force: f32,

    /// Vertical force is only applied with more than this many anchors attached.
    pub climb_grip_threshold: usize,

    // === Jump Settings ===
    /// Magnitude of the jump impulse.
    pub jump_impulse: f32,

    /// Minimum time between two jumps (seconds).
    pub jump_debounce: f32,

    /// After a jump, every anchor is released for this long (seconds).
    pub jump_grace_window: f32,

    /// Jumping requires at least this many anchors attached.
    pub jump_min_grip: usize,

    // === Orientation Settings ===
    /// Torsion spring stiffness.
    pub torsion_k: f32,

    /// Torsion spring damping.
    pub torsion_d: f32,

    /// Orientation torque is only applied with more than this many anchors attached.
    pub orientation_grip_threshold: usize,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            // Ring
            ray_count: 64,
            ray_length: 7.0,
            anchor: AnchorSettings::default(),

            // Movement
            move_force: 120.0,
            climb_grip_threshold: 2,

            // Jump
            jump_impulse: 60.0,
            jump_debounce: 0.016,
            jump_grace_window: 0.1,
            jump_min_grip: 2,

            // Orientation
            torsion_k: 150.0,
            torsion_d: 15.0,
            orientation_grip_threshold: 1,
        }
    }
}

impl LocomotionConfig {
    /// A small, sparse ring: fewer rays, shorter legs, snappier springs.
    pub fn spider() -> Self {
        Self {
            ray_count: 16,
            ray_length: 2.5,
            anchor: AnchorSettings::default().with_spring(4.0, 0.5),
            move_force: 40.0,
            jump_impulse: 20.0,
            torsion_k: 60.0,
            torsion_d: 8.0,
            ..default()
        }
    }

    /// Rest length of anchor joints.
    #[inline]
    pub fn joint_rest_length(&self) -> f32 {
        self.anchor.rest_length(self.ray_length)
    }

    /// Maximum length of anchor joints.
    #[inline]
    pub fn joint_max_length(&self) -> f32 {
        self.anchor.max_length(self.ray_length)
    }

    /// Builder: set ring layout.
    pub fn with_ring(mut self, ray_count: usize, ray_length: f32) -> Self {
        self.ray_count = ray_count;
        self.ray_length = ray_length;
        self
    }

    /// Builder: set anchor settings.
    pub fn with_anchor(mut self, anchor: AnchorSettings) -> Self {
        self.anchor = anchor;
        self
    }

    /// Builder: set move force.
    pub fn with_move_force(mut self, force: f32) -> Self {
        self.move_force = force;
        self
    }

    /// Builder: set jump impulse.
    pub fn with_jump_impulse(mut self, impulse: f32) -> Self {
        self.jump_impulse = impulse;
        self
    }

    /// Builder: set jump timing (debounce and grace window, in seconds).
    pub fn with_jump_timing(mut self, debounce: f32, grace_window: f32) -> Self {
        self.jump_debounce = debounce;
        self.jump_grace_window = grace_window;
        self
    }

    /// Builder: set torsion spring parameters.
    pub fn with_torsion(mut self, k: f32, d: f32) -> Self {
        self.torsion_k = k;
        self.torsion_d = d;
        self
    }

    /// Builder: set grip thresholds for climbing, jumping and orientation.
    pub fn with_grip_thresholds(mut self, climb: usize, jump_min: usize, orientation: usize) -> Self {
        self.climb_grip_threshold = climb;
        self.jump_min_grip = jump_min;
        self.orientation_grip_threshold = orientation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_defaults() {
        let settings = AnchorSettings::default();
        assert_eq!(settings.stretch_ratio, 1.1);
        assert_eq!(settings.joint_length_factor, 0.95);
        assert_eq!(settings.max_length_factor, 1.2);
        assert_eq!(settings.tolerance_distance, 0.15);
        assert!(settings.release_on_miss);
    }

    #[test]
    fn derived_joint_lengths() {
        let settings = AnchorSettings::default();
        assert!((settings.rest_length(10.0) - 9.5).abs() < 1e-5);
        assert!((settings.max_length(10.0) - 11.4).abs() < 1e-5);
    }

    #[test]
    fn config_defaults_match_thresholds() {
        let config = LocomotionConfig::default();
        assert_eq!(config.ray_count, 64);
        assert_eq!(config.ray_length, 7.0);
        assert_eq!(config.climb_grip_threshold, 2);
        assert_eq!(config.jump_min_grip, 2);
        assert_eq!(config.orientation_grip_threshold, 1);
        assert_eq!(config.jump_debounce, 0.016);
        assert_eq!(config.jump_grace_window, 0.1);
    }

    #[test]
    fn config_joint_lengths_follow_ray_length() {
        let config = LocomotionConfig::default().with_ring(8, 2.0);
        assert!((config.joint_rest_length() - 1.9).abs() < 1e-5);
        assert!((config.joint_max_length() - 2.28).abs() < 1e-5);
    }

    #[test]
    fn spider_preset_is_smaller() {
        let spider = LocomotionConfig::spider();
        let default = LocomotionConfig::default();
        assert!(spider.ray_count < default.ray_count);
        assert!(spider.ray_length < default.ray_length);
        assert_eq!(spider.jump_min_grip, default.jump_min_grip);
    }

    #[test]
    fn builders_set_fields() {
        let config = LocomotionConfig::default()
            .with_move_force(5.0)
            .with_jump_impulse(7.0)
            .with_jump_timing(0.5, 0.25)
            .with_torsion(3.0, 1.0)
            .with_grip_thresholds(4, 3, 2)
            .with_anchor(AnchorSettings::default().with_tolerance(0.5).with_release_on_miss(false));

        assert_eq!(config.move_force, 5.0);
        assert_eq!(config.jump_impulse, 7.0);
        assert_eq!(config.jump_debounce, 0.5);
        assert_eq!(config.jump_grace_window, 0.25);
        assert_eq!(config.torsion_k, 3.0);
        assert_eq!(config.torsion_d, 1.0);
        assert_eq!(config.climb_grip_threshold, 4);
        assert_eq!(config.jump_min_grip, 3);
        assert_eq!(config.orientation_grip_threshold, 2);
        assert_eq!(config.anchor.tolerance_distance, 0.5);
        assert!(!config.anchor.release_on_miss);
    }
}
