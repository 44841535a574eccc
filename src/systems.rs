//! Core locomotion systems.
//!
//! These systems run the control loop on top of the anchor ring. They are
//! generic over the physics backend; the anchor maintenance itself (culling,
//! casting, joint upkeep) needs raycasts and joints, so it is added by the
//! backend plugin into [`LocomotionSet::Sensors`](crate::LocomotionSet::Sensors)
//! and [`LocomotionSet::Release`](crate::LocomotionSet::Release).

use bevy::prelude::*;

use crate::backend::LocomotionBackend;
use crate::config::LocomotionConfig;
use crate::keys::{KeyState, LocomotionKey};
use crate::ring::RayAnchorRing;
use crate::state::{Airborne, Gripping, LocomotionState};
use crate::torsion::torsion_spring_torque;

/// Force requested by the held direction keys.
///
/// The horizontal part is always applied while left or right is held. The
/// vertical part (climbing) needs more than `climb_grip_threshold` anchors.
pub fn movement_force(keys: &KeyState, grip_count: usize, config: &LocomotionConfig) -> Vec2 {
    let heading = keys.heading();
    let mut force = Vec2::ZERO;

    if keys.is_down(LocomotionKey::Left) || keys.is_down(LocomotionKey::Right) {
        force.x = heading.x * config.move_force;
    }

    if grip_count > config.climb_grip_threshold {
        force.y = heading.y * config.move_force;
    }

    force
}

/// Torque aligning the body with its grip, or `None` without enough grip.
pub fn orientation_torque(
    angle: f32,
    angular_velocity: f32,
    grip_count: usize,
    average_contact_angle: f32,
    config: &LocomotionConfig,
) -> Option<f32> {
    if grip_count <= config.orientation_grip_threshold {
        return None;
    }

    Some(torsion_spring_torque(
        angle,
        angular_velocity,
        average_contact_angle,
        0.0,
        config.torsion_k,
        config.torsion_d,
    ))
}

/// Apply movement forces from the held direction keys.
pub fn apply_movement_forces<B: LocomotionBackend>(world: &mut World) {
    let forces: Vec<(Entity, Vec2)> = world
        .query::<(Entity, &LocomotionConfig, &KeyState, &RayAnchorRing)>()
        .iter(world)
        .map(|(e, config, keys, ring)| (e, movement_force(keys, ring.grip_count(), config)))
        .filter(|(_, force)| *force != Vec2::ZERO)
        .collect();

    for (entity, force) in forces {
        B::apply_force(world, entity, force);
    }
}

/// Jump on the tick the jump key goes down.
///
/// The impulse points away from the average contact direction, so the body
/// kicks off whatever it is holding on to.
pub fn apply_jump<B: LocomotionBackend>(world: &mut World) {
    let jumps: Vec<(Entity, Vec2)> = world
        .query::<(
            Entity,
            &LocomotionConfig,
            &KeyState,
            &RayAnchorRing,
            &mut LocomotionState,
        )>()
        .iter_mut(world)
        .filter_map(|(e, config, keys, ring, mut state)| {
            state
                .try_jump(
                    config,
                    keys.held_time(LocomotionKey::Jump),
                    ring.grip_count(),
                    ring.average_contact_angle(),
                )
                .map(|impulse| (e, impulse))
        })
        .collect();

    for (entity, impulse) in jumps {
        debug!("{:?} jumped with impulse {:?}", entity, impulse);
        B::apply_impulse(world, entity, impulse);
    }
}

/// Apply the torsion spring torque that keeps the body aligned with its grip.
pub fn apply_orientation_torque<B: LocomotionBackend>(world: &mut World) {
    let entities: Vec<(Entity, LocomotionConfig, usize, f32)> = world
        .query::<(Entity, &LocomotionConfig, &RayAnchorRing)>()
        .iter(world)
        .map(|(e, config, ring)| (e, *config, ring.grip_count(), ring.average_contact_angle()))
        .collect();

    for (entity, config, grip_count, target) in entities {
        let angle = B::get_rotation(world, entity);
        let angular_velocity = B::get_angular_velocity(world, entity);

        if let Some(torque) = orientation_torque(angle, angular_velocity, grip_count, target, &config)
        {
            B::apply_torque(world, entity, torque);
        }
    }
}

/// Advance jump timers and key hold durations by one fixed step.
pub fn advance_locomotion_timers<B: LocomotionBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    for mut state in world.query::<&mut LocomotionState>().iter_mut(world) {
        state.tick(dt);
    }

    for mut keys in world
        .query_filtered::<&mut KeyState, With<RayAnchorRing>>()
        .iter_mut(world)
    {
        keys.advance(dt);
    }
}

/// Keep the [`Gripping`] / [`Airborne`] markers in line with the ring.
pub fn sync_state_markers(
    mut commands: Commands,
    q_rings: Query<(Entity, &RayAnchorRing, Has<Gripping>, Has<Airborne>)>,
) {
    for (entity, ring, has_gripping, has_airborne) in &q_rings {
        let gripping = ring.grip_count() > 0;

        if gripping && !has_gripping {
            commands.entity(entity).insert(Gripping).remove::<Airborne>();
        } else if !gripping && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Gripping>();
        }
    }
}
