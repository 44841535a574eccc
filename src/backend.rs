//! Physics backend abstraction.
//!
//! Two traits separate the controller from the physics engine:
//!
//! - [`AnchorPhysics`] is the instance-level capability the anchors need:
//!   raycasts, frame conversions, and spring joint creation/destruction.
//!   Backends usually implement it on a system parameter.
//! - [`LocomotionBackend`] is the static, `World`-level capability the
//!   generic control systems need: forces, impulses, torque and body state.
//!
//! This allows swapping physics engines (Rapier2D, XPBD, custom) without
//! touching the anchor logic.

use bevy::prelude::*;

use crate::cast::RayCandidate;

/// Definition of a spring-damped distance joint between two bodies.
///
/// Body A is always the controlled body, anchored at its origin. Body B is
/// whatever the anchor ray hit, anchored at the hit point expressed in its
/// local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringJointDef {
    /// Controlled body.
    pub body_a: Entity,
    /// Surface body.
    pub body_b: Entity,
    /// Anchor on body A, in body A's local space.
    pub local_anchor_a: Vec2,
    /// Anchor on body B, in body B's local space.
    pub local_anchor_b: Vec2,
    /// Length the spring pulls toward.
    pub rest_length: f32,
    /// Hard limit on the joint length.
    pub max_length: f32,
    /// Spring frequency (Hz).
    pub hertz: f32,
    /// Spring damping ratio.
    pub damping_ratio: f32,
}

impl SpringJointDef {
    /// Spring stiffness per unit mass (`ω²`) derived from the frequency.
    #[inline]
    pub fn stiffness(&self) -> f32 {
        let omega = std::f32::consts::TAU * self.hertz;
        omega * omega
    }

    /// Spring damping per unit mass (`2ζω`) derived from the damping ratio.
    #[inline]
    pub fn damping(&self) -> f32 {
        let omega = std::f32::consts::TAU * self.hertz;
        2.0 * self.damping_ratio * omega
    }
}

/// Physics capabilities consumed by [`RayAnchor`](crate::anchor::RayAnchor)
/// and [`RayAnchorRing`](crate::ring::RayAnchorRing).
///
/// Querying a body that no longer exists is a lifecycle bug in the caller;
/// implementations should panic rather than return a made-up value.
pub trait AnchorPhysics {
    /// World position of a body's origin.
    fn body_position(&self, body: Entity) -> Vec2;

    /// Whether `body` still exists. Anchors holding a joint to a body that
    /// went away treat the joint as broken instead of querying it.
    fn body_exists(&self, body: Entity) -> bool;

    /// Report every intersection between colliders and the segment
    /// `origin .. origin + translation`.
    ///
    /// Candidates may arrive in any order; `fraction` is measured along
    /// `translation`. Filtering and narrowing are the caller's job.
    fn visit_ray_hits(
        &self,
        origin: Vec2,
        translation: Vec2,
        visitor: &mut dyn FnMut(RayCandidate),
    );

    /// Convert a world point into a body's local space.
    fn world_to_local(&self, body: Entity, point: Vec2) -> Vec2;

    /// Convert a point in a body's local space into world space.
    fn local_to_world(&self, body: Entity, point: Vec2) -> Vec2;

    /// Create a spring joint and return its id.
    fn create_joint(&mut self, def: &SpringJointDef) -> Entity;

    /// Destroy a joint created by [`AnchorPhysics::create_joint`], waking
    /// the bodies it connected.
    fn destroy_joint(&mut self, joint: Entity);
}

/// Trait for physics backend implementations.
///
/// Implement this trait (together with an [`AnchorPhysics`] system
/// parameter) to integrate a physics engine with the locomotion controller.
///
/// For an example implementation, see the `rapier` module's
/// `Rapier2dBackend`.
pub trait LocomotionBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    ///
    /// The plugin must add the anchor maintenance systems to
    /// [`LocomotionSet::Sensors`](crate::LocomotionSet::Sensors) and
    /// [`LocomotionSet::Release`](crate::LocomotionSet::Release).
    fn plugin() -> impl Plugin;

    /// Apply an impulse to an entity.
    ///
    /// Impulse is an instantaneous change in momentum.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2);

    /// Apply a force to an entity.
    ///
    /// Force is applied over the physics timestep.
    fn apply_force(world: &mut World, entity: Entity, force: Vec2);

    /// Apply a torque to an entity.
    ///
    /// Positive values rotate counter-clockwise.
    fn apply_torque(world: &mut World, entity: Entity, torque: f32);

    /// Get the current rotation angle of an entity (in radians).
    fn get_rotation(world: &World, entity: Entity) -> f32;

    /// Get the current angular velocity of an entity.
    fn get_angular_velocity(world: &World, entity: Entity) -> f32;

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}
