//! In-crate physics double for unit tests.
//!
//! Surfaces are one-sided infinite lines. Bodies only carry a translation,
//! which is enough to exercise frame conversions without a solver.

use bevy::prelude::*;

use crate::backend::{AnchorPhysics, SpringJointDef};
use crate::cast::RayCandidate;

/// An infinite line owned by a body. Rays only hit its front face.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub body: Entity,
    pub point: Vec2,
    pub normal: Vec2,
}

#[derive(Debug, Default)]
pub struct MockPhysics {
    pub positions: Vec<(Entity, Vec2)>,
    pub planes: Vec<Plane>,
    pub live_joints: Vec<(Entity, SpringJointDef)>,
    pub destroyed: Vec<Entity>,
    next_id: u32,
}

impl MockPhysics {
    pub fn new() -> Self {
        Self {
            next_id: 10_000,
            ..default()
        }
    }

    pub fn add_body(&mut self, raw: u32, position: Vec2) -> Entity {
        let entity = Entity::from_raw(raw);
        self.positions.push((entity, position));
        entity
    }

    /// Remove a body and every plane it owns.
    pub fn remove_body(&mut self, body: Entity) {
        self.positions.retain(|(e, _)| *e != body);
        self.planes.retain(|plane| plane.body != body);
    }

    pub fn set_position(&mut self, body: Entity, position: Vec2) {
        let slot = self
            .positions
            .iter_mut()
            .find(|(e, _)| *e == body)
            .expect("unknown body");
        slot.1 = position;
    }

    /// Add a plane owned by `body`, through `point` with `normal`.
    pub fn add_plane(&mut self, body: Entity, point: Vec2, normal: Vec2) {
        self.planes.push(Plane {
            body,
            point,
            normal: normal.normalize(),
        });
    }

    pub fn joint_def(&self, joint: Entity) -> Option<&SpringJointDef> {
        self.live_joints
            .iter()
            .find(|(id, _)| *id == joint)
            .map(|(_, def)| def)
    }
}

impl AnchorPhysics for MockPhysics {
    fn body_position(&self, body: Entity) -> Vec2 {
        self.positions
            .iter()
            .find(|(e, _)| *e == body)
            .map(|(_, p)| *p)
            .unwrap_or_else(|| panic!("body {body:?} does not exist"))
    }

    fn body_exists(&self, body: Entity) -> bool {
        self.positions.iter().any(|(e, _)| *e == body)
    }

    fn visit_ray_hits(
        &self,
        origin: Vec2,
        translation: Vec2,
        visitor: &mut dyn FnMut(RayCandidate),
    ) {
        for plane in &self.planes {
            let denom = plane.normal.dot(translation);
            if denom >= 0.0 {
                continue;
            }
            let fraction = plane.normal.dot(plane.point - origin) / denom;
            if (0.0..=1.0).contains(&fraction) {
                visitor(RayCandidate {
                    body: plane.body,
                    point: origin + translation * fraction,
                    normal: plane.normal,
                    fraction,
                });
            }
        }
    }

    fn world_to_local(&self, body: Entity, point: Vec2) -> Vec2 {
        point - self.body_position(body)
    }

    fn local_to_world(&self, body: Entity, point: Vec2) -> Vec2 {
        point + self.body_position(body)
    }

    fn create_joint(&mut self, def: &SpringJointDef) -> Entity {
        let id = Entity::from_raw(self.next_id);
        self.next_id += 1;
        self.live_joints.push((id, *def));
        id
    }

    fn destroy_joint(&mut self, joint: Entity) {
        let index = self
            .live_joints
            .iter()
            .position(|(id, _)| *id == joint)
            .unwrap_or_else(|| panic!("joint {joint:?} destroyed twice or never created"));
        self.live_joints.swap_remove(index);
        self.destroyed.push(joint);
    }
}
