//! Torsion spring helpers.
//!
//! A proportional-derivative controller for rotational alignment. The only
//! subtle part is the wrap-around: the angular error must always be the
//! shortest signed distance, otherwise a body sitting near `±π` spins the
//! long way around.

use std::f32::consts::{PI, TAU};

/// Returns the signed shortest angular distance from `from` to `to`,
/// in the range `(-π, π]`.
#[inline]
pub fn angle_difference(from: f32, to: f32) -> f32 {
    let mut difference = (to - from + PI) % TAU;
    // `%` keeps the sign of the dividend.
    if difference <= 0.0 {
        difference += TAU;
    }
    difference - PI
}

/// Torque that drives `angle` toward `target_angle`.
///
/// `diff * k - (angular_velocity - target_angular_velocity) * d`, where
/// `diff` is the wrapped error from [`angle_difference`].
#[inline]
pub fn torsion_spring_torque(
    angle: f32,
    angular_velocity: f32,
    target_angle: f32,
    target_angular_velocity: f32,
    k: f32,
    d: f32,
) -> f32 {
    let diff = angle_difference(angle, target_angle);
    diff * k - (angular_velocity - target_angular_velocity) * d
}
