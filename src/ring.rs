//! The anchor ring.
//!
//! [`RayAnchorRing`] lays out a fixed number of [`RayAnchor`]s evenly around
//! the controlled body and answers the aggregate grip queries the control
//! loop runs on.

use bevy::prelude::*;

use crate::anchor::RayAnchor;
use crate::backend::AnchorPhysics;
use crate::cast::CastResult;
use crate::config::{AnchorSettings, LocomotionConfig};

/// Headings shorter than this do not cull anything.
pub const HEADING_EPSILON: f32 = 1e-5;

/// Ring of anchors around a controlled body.
///
/// Lives as a component on the body's entity. The number of anchors is fixed
/// at construction.
#[derive(Component, Debug)]
pub struct RayAnchorRing {
    anchors: Vec<RayAnchor>,
    latest_casts: Vec<CastResult>,
    ray_length: f32,
}

impl RayAnchorRing {
    /// Build a ring of `ray_count` rays of `ray_length`, anchor `i` pointing
    /// at `2π·i / ray_count`.
    ///
    /// # Panics
    ///
    /// Panics if `ray_count` is zero or `ray_length` is not finite and
    /// positive.
    pub fn new(ray_count: usize, ray_length: f32, settings: AnchorSettings) -> Self {
        assert!(ray_count > 0, "Anchor ring needs at least one ray");

        let step = std::f32::consts::TAU / ray_count as f32;
        let anchors = (0..ray_count)
            .map(|i| RayAnchor::new(Vec2::from_angle(step * i as f32) * ray_length, settings))
            .collect();

        Self {
            anchors,
            latest_casts: Vec::with_capacity(ray_count),
            ray_length,
        }
    }

    /// Build a ring from a controller configuration.
    pub fn from_config(config: &LocomotionConfig) -> Self {
        Self::new(config.ray_count, config.ray_length, config.anchor)
    }

    /// Anchors in index order.
    #[inline]
    pub fn anchors(&self) -> &[RayAnchor] {
        &self.anchors
    }

    /// Successful casts of the last [`update`](Self::update), in anchor order.
    #[inline]
    pub fn latest_casts(&self) -> &[CastResult] {
        &self.latest_casts
    }

    /// Length of every ray.
    #[inline]
    pub fn ray_length(&self) -> f32 {
        self.ray_length
    }

    /// Cast every ray from `body`'s position and maintain the joints.
    pub fn update(&mut self, physics: &mut impl AnchorPhysics, body: Entity) {
        let origin = physics.body_position(body);
        let ignore = [body];

        self.latest_casts.clear();
        for anchor in &mut self.anchors {
            if let Some(hit) = anchor.update(physics, body, origin, &ignore) {
                self.latest_casts.push(hit);
            }
        }
    }

    /// Detach every anchor.
    pub fn cull_all_joints(&mut self, physics: &mut impl AnchorPhysics) {
        for anchor in &mut self.anchors {
            anchor.detach(physics);
        }
    }

    /// Detach every attached anchor pointing away from `heading`.
    ///
    /// Does nothing if `heading` is (nearly) zero.
    pub fn cull_joints(&mut self, physics: &mut impl AnchorPhysics, heading: Vec2) {
        if heading.length() < HEADING_EPSILON {
            return;
        }

        for anchor in &mut self.anchors {
            if anchor.is_attached() && anchor.direction().dot(heading) < 0.0 {
                anchor.detach(physics);
            }
        }
    }

    /// Release every joint. Call before despawning the body by hand.
    pub fn release_all(&mut self, physics: &mut impl AnchorPhysics) {
        self.cull_all_joints(physics);
        self.latest_casts.clear();
    }

    /// Release every joint anchored to `surface` right away. A surface
    /// despawned without this is dropped on the next [`update`](Self::update).
    pub fn release_attached_to(&mut self, physics: &mut impl AnchorPhysics, surface: Entity) {
        for anchor in &mut self.anchors {
            if anchor
                .joint()
                .is_some_and(|joint| joint.surface_body() == surface)
            {
                anchor.detach(physics);
            }
        }
    }

    /// Number of attached anchors.
    pub fn grip_count(&self) -> usize {
        self.anchors.iter().filter(|a| a.is_attached()).count()
    }

    /// Angle of the sum of the attached anchors' unit directions, or `0`
    /// when nothing is attached.
    pub fn average_contact_angle(&self) -> f32 {
        let mut sum = Vec2::ZERO;
        let mut any = false;
        for anchor in self.anchors.iter().filter(|a| a.is_attached()) {
            sum += anchor.direction().normalize();
            any = true;
        }

        if any {
            sum.to_angle()
        } else {
            0.0
        }
    }
}
