//! Ray cast results.
//!
//! Casts are recomputed every tick and never persisted. The physics backend
//! reports every intersection along a ray; [`NearestHit`] narrows them down
//! to the closest one.

use bevy::prelude::*;

/// One intersection reported by the physics backend while visiting a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCandidate {
    /// Rigid body owning the intersected collider.
    pub body: Entity,
    /// World position of the intersection.
    pub point: Vec2,
    /// Surface normal at the intersection.
    pub normal: Vec2,
    /// Position along the cast translation, in `[0, 1]`.
    pub fraction: f32,
}

/// Result of a single anchor ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastResult {
    /// Body that was hit.
    pub body: Entity,
    /// Ray origin in world space.
    pub origin: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Normal of the surface at the hit point.
    pub normal: Vec2,
    /// Fraction of the ray translation at which the hit occurred.
    pub fraction: f32,
}

impl CastResult {
    /// Build a result from a backend candidate.
    pub fn from_candidate(origin: Vec2, candidate: RayCandidate) -> Self {
        Self {
            body: candidate.body,
            origin,
            point: candidate.point,
            normal: candidate.normal,
            fraction: candidate.fraction,
        }
    }

    /// Distance from the ray origin to the hit point.
    #[inline]
    pub fn length(&self) -> f32 {
        self.origin.distance(self.point)
    }
}

/// Keeps the nearest accepted hit and the current search bound.
///
/// The first candidate may sit anywhere on the ray (`fraction <= 1`). Every
/// accepted candidate clips the bound to its own fraction, so later ones must
/// be strictly closer. On a tie the hit accepted first at the tightest bound
/// wins.
#[derive(Debug, Clone, Copy)]
pub struct NearestHit {
    best: Option<CastResult>,
    bound: f32,
}

impl Default for NearestHit {
    fn default() -> Self {
        Self {
            best: None,
            bound: 1.0,
        }
    }
}

impl NearestHit {
    /// Create an empty reducer covering the whole ray.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current search bound.
    #[inline]
    pub fn bound(&self) -> f32 {
        self.bound
    }

    /// Offer a candidate. Returns `true` if it became the new nearest hit.
    pub fn offer(&mut self, hit: CastResult) -> bool {
        if !(0.0..=1.0).contains(&hit.fraction) {
            return false;
        }

        let accepted = match self.best {
            None => hit.fraction <= self.bound,
            Some(_) => hit.fraction < self.bound,
        };

        if accepted {
            self.bound = hit.fraction;
            self.best = Some(hit);
        }
        accepted
    }

    /// The nearest hit, if any candidate was accepted.
    pub fn into_inner(self) -> Option<CastResult> {
        self.best
    }
}
