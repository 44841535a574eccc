//! Ray anchors.
//!
//! A [`RayAnchor`] owns one fixed ray direction and at most one spring joint.
//! Every tick it casts its ray and decides whether the joint still matches
//! the surface under the ray, re-anchoring when the contact has drifted or
//! the joint has been stretched too far.

use bevy::prelude::*;

use crate::backend::{AnchorPhysics, SpringJointDef};
use crate::cast::{CastResult, NearestHit};
use crate::config::AnchorSettings;

/// Owned handle to a live anchor joint.
///
/// Not `Clone`: exactly one owner exists, and [`AnchorJoint::release`]
/// consumes it, so a joint cannot be destroyed twice.
#[derive(Debug, PartialEq)]
pub struct AnchorJoint {
    id: Entity,
    def: SpringJointDef,
}

impl AnchorJoint {
    /// Backend id of the joint.
    #[inline]
    pub fn id(&self) -> Entity {
        self.id
    }

    /// Definition the joint was created from.
    #[inline]
    pub fn def(&self) -> &SpringJointDef {
        &self.def
    }

    /// Body the joint is anchored to (the surface that was hit).
    #[inline]
    pub fn surface_body(&self) -> Entity {
        self.def.body_b
    }

    /// Current world positions of both joint anchors `(a, b)`.
    pub fn world_points(&self, physics: &impl AnchorPhysics) -> (Vec2, Vec2) {
        (
            physics.local_to_world(self.def.body_a, self.def.local_anchor_a),
            physics.local_to_world(self.def.body_b, self.def.local_anchor_b),
        )
    }

    /// Destroy the joint.
    pub fn release(self, physics: &mut impl AnchorPhysics) {
        physics.destroy_joint(self.id);
    }
}

/// One ray direction plus its optional spring joint.
#[derive(Debug)]
pub struct RayAnchor {
    direction: Vec2,
    joint: Option<AnchorJoint>,
    last_attach_length: f32,
    settings: AnchorSettings,
}

impl RayAnchor {
    /// Create a detached anchor. `direction` is world-frame and its length is
    /// the ray length.
    ///
    /// # Panics
    ///
    /// Panics if the ray length is not finite and positive.
    pub fn new(direction: Vec2, settings: AnchorSettings) -> Self {
        let length = direction.length();
        assert!(
            length > 0.0 && length.is_finite(),
            "Anchor ray length must be positive and finite, got: {}",
            length
        );
        Self {
            direction,
            joint: None,
            last_attach_length: 0.0,
            settings,
        }
    }

    /// Ray translation (direction scaled by ray length).
    #[inline]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Length of the ray.
    #[inline]
    pub fn ray_length(&self) -> f32 {
        self.direction.length()
    }

    /// Angle of the ray direction (radians from world +X).
    #[inline]
    pub fn angle(&self) -> f32 {
        self.direction.to_angle()
    }

    /// Whether a joint is currently held.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.joint.is_some()
    }

    /// The live joint, if any.
    #[inline]
    pub fn joint(&self) -> Option<&AnchorJoint> {
        self.joint.as_ref()
    }

    /// Length recorded at the most recent attach.
    #[inline]
    pub fn last_attach_length(&self) -> f32 {
        self.last_attach_length
    }

    /// Settings this anchor was built with.
    #[inline]
    pub fn settings(&self) -> &AnchorSettings {
        &self.settings
    }

    /// Cast the ray from `origin` and maintain the joint.
    ///
    /// Bodies in `ignore` never produce hits (pass the controlled body).
    /// Returns the nearest hit, if any.
    pub fn update(
        &mut self,
        physics: &mut impl AnchorPhysics,
        body: Entity,
        origin: Vec2,
        ignore: &[Entity],
    ) -> Option<CastResult> {
        let hit = self.cast(&*physics, origin, ignore);

        if self.needs_recreate(&*physics, origin, hit.as_ref()) {
            self.detach(physics);
            if let Some(hit) = hit {
                self.attach(physics, body, &hit);
            }
        }

        hit
    }

    /// Nearest hit along the ray, skipping ignored bodies.
    pub fn cast(
        &self,
        physics: &impl AnchorPhysics,
        origin: Vec2,
        ignore: &[Entity],
    ) -> Option<CastResult> {
        let mut nearest = NearestHit::new();
        physics.visit_ray_hits(origin, self.direction, &mut |candidate| {
            if ignore.contains(&candidate.body) {
                return;
            }
            nearest.offer(CastResult::from_candidate(origin, candidate));
        });
        nearest.into_inner()
    }

    /// Release the joint, if any. Calling this on a detached anchor is a no-op.
    pub fn detach(&mut self, physics: &mut impl AnchorPhysics) {
        if let Some(joint) = self.joint.take() {
            trace!("anchor {:?} released joint {:?}", self.direction, joint.id());
            joint.release(physics);
        }
    }

    fn needs_recreate(
        &self,
        physics: &impl AnchorPhysics,
        origin: Vec2,
        hit: Option<&CastResult>,
    ) -> bool {
        let Some(joint) = &self.joint else {
            return true;
        };

        // The surface was despawned under the joint.
        if !physics.body_exists(joint.surface_body()) {
            return true;
        }

        let (point_a, point_b) = joint.world_points(physics);

        if point_a.distance(point_b) > self.last_attach_length * self.settings.stretch_ratio {
            return true;
        }

        let reference = match hit {
            Some(hit) => Some(hit.point),
            None if self.settings.release_on_miss => Some(origin + self.direction),
            None => None,
        };

        reference.is_some_and(|point| point.distance(point_b) > self.settings.tolerance_distance)
    }

    fn attach(&mut self, physics: &mut impl AnchorPhysics, body: Entity, hit: &CastResult) {
        let ray_length = self.ray_length();
        let def = SpringJointDef {
            body_a: body,
            body_b: hit.body,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: physics.world_to_local(hit.body, hit.point),
            rest_length: self.settings.rest_length(ray_length),
            max_length: self.settings.max_length(ray_length),
            hertz: self.settings.spring_hertz,
            damping_ratio: self.settings.spring_damping_ratio,
        };

        let id = physics.create_joint(&def);
        trace!("anchor {:?} attached to {:?} at {:?}", self.direction, hit.body, hit.point);

        self.joint = Some(AnchorJoint { id, def });
        self.last_attach_length = ray_length;
    }
}
