//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.
//!
//! Anchor joints are spawned as child entities of the controlled body, each
//! carrying an [`ImpulseJoint`] whose parent is the surface body. Despawning
//! the controlled body recursively therefore also removes its joints.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::backend::{AnchorPhysics, LocomotionBackend, SpringJointDef};
use crate::cast::RayCandidate;
use crate::config::LocomotionConfig;
use crate::keys::KeyState;
use crate::ring::RayAnchorRing;
use crate::state::LocomotionState;
use crate::LocomotionSet;

/// Rapier2D physics backend for the locomotion controller.
///
/// Forces and torques go through the [`LocomotionState`] accumulators and
/// reach [`ExternalForce`] at the end of the frame. Raycasts and joints are
/// handled by [`RapierAnchorPhysics`] inside dedicated Rapier systems.
pub struct Rapier2dBackend;

impl LocomotionBackend for Rapier2dBackend {
    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec2) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
            return;
        }

        // Fallback: apply as velocity change if no ExternalImpulse component.
        // Without a known mass the impulse cannot be converted and is dropped.
        let mass = world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite());
        let Some(mass) = mass else {
            debug!("{:?} has no ExternalImpulse or mass, impulse dropped", entity);
            return;
        };
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel += impulse / mass;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec2) {
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.add_force(force);
        }
    }

    fn apply_torque(world: &mut World, entity: Entity, torque: f32) {
        if let Some(mut state) = world.get_mut::<LocomotionState>(entity) {
            state.add_torque(torque);
        }
    }

    fn get_rotation(world: &World, entity: Entity) -> f32 {
        world
            .get::<Transform>(entity)
            .map(|t| {
                let (_, _, z) = t.rotation.to_euler(EulerRot::XYZ);
                z
            })
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    let (_, _, z) = rotation.to_euler(EulerRot::XYZ);
                    z
                })
            })
            .unwrap_or(0.0)
    }

    fn get_angular_velocity(world: &World, entity: Entity) -> f32 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.angvel)
            .unwrap_or(0.0)
    }
}

/// Plugin that sets up Rapier2D-specific systems for the locomotion controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            clear_locomotion_forces.in_set(LocomotionSet::Preparation),
        );

        app.add_systems(
            FixedUpdate,
            rapier_update_anchors.in_set(LocomotionSet::Sensors),
        );

        app.add_systems(
            FixedUpdate,
            rapier_release_in_grace.in_set(LocomotionSet::Release),
        );

        app.add_systems(
            FixedUpdate,
            apply_locomotion_forces.in_set(LocomotionSet::FinalApplication),
        );
    }
}

/// Build the Rapier joint for an anchor.
///
/// A spring along the coupled linear axes pulls toward `rest_length`, and a
/// limit keeps the length within `[0, max_length]`. Rapier's first body is
/// the surface (the [`ImpulseJoint`] parent), the second the controlled body.
pub fn spring_joint(def: &SpringJointDef) -> GenericJoint {
    GenericJointBuilder::new(JointAxesMask::empty())
        .coupled_axes(JointAxesMask::LIN_AXES)
        .motor_model(JointAxis::LinX, MotorModel::AccelerationBased)
        .motor_position(JointAxis::LinX, def.rest_length, def.stiffness(), def.damping())
        .limits(JointAxis::LinX, [0.0, def.max_length])
        .local_anchor1(def.local_anchor_b)
        .local_anchor2(def.local_anchor_a)
        .build()
}

/// Joint component for an anchor, parented to the surface body.
pub fn anchor_impulse_joint(def: &SpringJointDef) -> ImpulseJoint {
    ImpulseJoint::new(def.body_b, TypedJoint::GenericJoint(spring_joint(def)))
}

/// [`AnchorPhysics`] on top of the Rapier context.
///
/// Joint creation and destruction are deferred through [`Commands`]; Rapier
/// picks them up on its next sync.
#[derive(SystemParam)]
pub struct RapierAnchorPhysics<'w, 's> {
    rapier_context: ReadRapierContext<'w, 's>,
    transforms: Query<'w, 's, &'static GlobalTransform>,
    hierarchy: Query<'w, 's, (Has<RigidBody>, Option<&'static ChildOf>)>,
    commands: Commands<'w, 's>,
}

impl RapierAnchorPhysics<'_, '_> {
    /// Whether a Rapier context exists to cast against.
    pub fn is_ready(&self) -> bool {
        self.rapier_context.single().is_ok()
    }

    /// Rigid body owning `collider`: the entity itself or its nearest
    /// ancestor with a [`RigidBody`].
    fn owning_body(&self, collider: Entity) -> Option<Entity> {
        let mut current = collider;
        loop {
            let (is_body, parent) = self.hierarchy.get(current).ok()?;
            if is_body {
                return Some(current);
            }
            current = parent?.parent();
        }
    }

    fn global_transform(&self, body: Entity) -> &GlobalTransform {
        self.transforms
            .get(body)
            .unwrap_or_else(|_| panic!("Anchor body {:?} has no GlobalTransform", body))
    }
}

impl AnchorPhysics for RapierAnchorPhysics<'_, '_> {
    fn body_position(&self, body: Entity) -> Vec2 {
        self.global_transform(body).translation().xy()
    }

    fn body_exists(&self, body: Entity) -> bool {
        self.transforms.contains(body)
    }

    fn visit_ray_hits(
        &self,
        origin: Vec2,
        translation: Vec2,
        visitor: &mut dyn FnMut(RayCandidate),
    ) {
        let Ok(context) = self.rapier_context.single() else {
            return;
        };

        let filter = QueryFilter::default().exclude_sensors();

        // With max_toi = 1 and an unnormalized direction, time of impact is
        // the fraction along the translation.
        context.intersect_ray(
            origin,
            translation,
            1.0,
            true,
            filter,
            |collider, intersection| {
                // Colliders without a body cannot hold a joint.
                if let Some(body) = self.owning_body(collider) {
                    visitor(RayCandidate {
                        body,
                        point: intersection.point,
                        normal: intersection.normal,
                        fraction: intersection.time_of_impact,
                    });
                }
                true
            },
        );
    }

    fn world_to_local(&self, body: Entity, point: Vec2) -> Vec2 {
        self.global_transform(body)
            .affine()
            .inverse()
            .transform_point3(point.extend(0.0))
            .xy()
    }

    fn local_to_world(&self, body: Entity, point: Vec2) -> Vec2 {
        self.global_transform(body)
            .transform_point(point.extend(0.0))
            .xy()
    }

    fn create_joint(&mut self, def: &SpringJointDef) -> Entity {
        self.commands
            .spawn((
                anchor_impulse_joint(def),
                ChildOf(def.body_a),
            ))
            .id()
    }

    fn destroy_joint(&mut self, joint: Entity) {
        self.commands.entity(joint).despawn();
    }
}

/// Cull rear-facing anchors, then cast and maintain every ring.
pub fn rapier_update_anchors(
    mut physics: RapierAnchorPhysics,
    mut q_rings: Query<(Entity, &mut RayAnchorRing, Option<&KeyState>)>,
) {
    if !physics.is_ready() {
        return;
    }

    for (entity, mut ring, keys) in &mut q_rings {
        if let Some(keys) = keys {
            ring.cull_joints(&mut physics, keys.heading());
        }
        ring.update(&mut physics, entity);
    }
}

/// Release every anchor of bodies inside their post-jump grace window.
pub fn rapier_release_in_grace(
    mut physics: RapierAnchorPhysics,
    mut q_rings: Query<(&LocomotionConfig, &LocomotionState, &mut RayAnchorRing)>,
) {
    for (config, state, mut ring) in &mut q_rings {
        if state.in_grace_window(config) && ring.grip_count() > 0 {
            ring.cull_all_joints(&mut physics);
        }
    }
}

/// Take last frame's controller forces back out of [`ExternalForce`].
///
/// Runs before any controller force system, so forces other systems put on
/// [`ExternalForce`] are left alone.
pub fn clear_locomotion_forces(mut q: Query<(&mut ExternalForce, &mut LocomotionState)>) {
    for (mut ext_force, mut state) in &mut q {
        let (force_to_subtract, torque_to_subtract) = state.prepare_new_frame();

        ext_force.force -= force_to_subtract;
        ext_force.torque -= torque_to_subtract;
    }
}

/// Hand this frame's accumulated controller forces to [`ExternalForce`].
pub fn apply_locomotion_forces(mut q: Query<(&mut ExternalForce, &mut LocomotionState)>) {
    for (mut ext_force, mut state) in &mut q {
        let (force_to_apply, torque_to_apply) = state.finalize_frame();

        ext_force.force += force_to_apply;
        ext_force.torque += torque_to_apply;
    }
}

/// Rapier2D components for a ray-anchored body.
///
/// Rotation stays unlocked so the torsion spring can turn the body toward
/// its grip.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use ray_anchor_locomotion::prelude::*;
/// use ray_anchor_locomotion::rapier::Rapier2dLocomotionBundle;
///
/// fn spawn_crawler(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 10.0, 0.0),
///         LocomotionBundle::new(LocomotionConfig::default()),
///         KeyboardControlled,
///         Rapier2dLocomotionBundle::new(),
///         Collider::ball(1.0),
///     ));
/// }
/// ```
#[derive(Bundle, Clone)]
pub struct Rapier2dLocomotionBundle {
    /// The rigid body type. Should be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity.
    pub velocity: Velocity,
    /// Controller forces are added here at the end of each frame.
    pub external_force: ExternalForce,
    /// Jump impulses are added here.
    pub external_impulse: ExternalImpulse,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Velocity damping.
    pub damping: Damping,
    /// Computed mass properties.
    pub mass_properties: ReadMassProperties,
}

impl Default for Rapier2dLocomotionBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier2dLocomotionBundle {
    /// Dynamic body, free rotation, light damping.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            locked_axes: LockedAxes::empty(),
            damping: Damping {
                linear_damping: 0.5,
                angular_damping: 1.0,
            },
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the rigid body type.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set linear and angular damping.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    /// Set locked axes.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    fn def() -> SpringJointDef {
        SpringJointDef {
            body_a: Entity::from_raw(1),
            body_b: Entity::from_raw(2),
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::new(0.5, -1.0),
            rest_length: 1.9,
            max_length: 2.28,
            hertz: 2.0,
            damping_ratio: 0.3,
        }
    }

    #[test]
    fn spring_joint_limits_and_anchors() {
        let def = def();
        let joint = spring_joint(&def);

        let limits = joint.limits(JointAxis::LinX).unwrap();
        assert_eq!(limits.min, 0.0);
        assert!((limits.max - 2.28).abs() < 1e-5);

        assert_eq!(joint.local_anchor1(), def.local_anchor_b);
        assert_eq!(joint.local_anchor2(), def.local_anchor_a);
    }

    #[test]
    fn spring_joint_motor_targets_rest_length() {
        let def = def();
        let joint = spring_joint(&def);

        let motor = joint.motor(JointAxis::LinX).unwrap();
        assert!((motor.target_pos - 1.9).abs() < 1e-5);
        assert!((motor.stiffness - def.stiffness()).abs() < 1e-3);
        assert!((motor.damping - def.damping()).abs() < 1e-4);
    }

    #[test]
    fn rapier_backend_accumulates_forces() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), LocomotionState::new()))
            .id();

        Rapier2dBackend::apply_force(app.world_mut(), entity, Vec2::new(1.0, 0.0));
        Rapier2dBackend::apply_force(app.world_mut(), entity, Vec2::new(0.0, 2.0));
        Rapier2dBackend::apply_torque(app.world_mut(), entity, 3.0);

        let state = app.world().get::<LocomotionState>(entity).unwrap();
        assert_eq!(state.accumulated_force(), Vec2::new(1.0, 2.0));
        assert_eq!(state.accumulated_torque(), 3.0);
    }

    #[test]
    fn rapier_backend_impulse_goes_to_external_impulse() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), ExternalImpulse::default()))
            .id();

        Rapier2dBackend::apply_impulse(app.world_mut(), entity, Vec2::Y);

        assert_eq!(
            app.world().get::<ExternalImpulse>(entity).unwrap().impulse,
            Vec2::Y
        );
    }

    #[test]
    fn rapier_backend_impulse_fallback_divides_by_mass() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                GlobalTransform::default(),
                RigidBody::Dynamic,
                Collider::ball(2.0),
                GravityScale(0.0),
                Velocity::default(),
                ReadMassProperties::default(),
            ))
            .id();

        app.update();

        let mass = app.world().get::<ReadMassProperties>(entity).unwrap().mass;
        assert!(mass > 1.0, "mass = {}", mass);
        let before = app.world().get::<Velocity>(entity).unwrap().linvel;

        Rapier2dBackend::apply_impulse(app.world_mut(), entity, Vec2::new(6.0, 0.0));

        let after = app.world().get::<Velocity>(entity).unwrap().linvel;
        assert!(((after - before).x - 6.0 / mass).abs() < 1e-4);
    }

    #[test]
    fn rapier_backend_impulse_without_mass_is_dropped() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), Velocity::default()))
            .id();

        Rapier2dBackend::apply_impulse(app.world_mut(), entity, Vec2::X);

        assert_eq!(app.world().get::<Velocity>(entity).unwrap().linvel, Vec2::ZERO);
    }

    #[test]
    fn anchor_joint_component_wraps_generic_joint() {
        let def = def();
        let joint = anchor_impulse_joint(&def);

        assert_eq!(joint.parent, def.body_b);
        match &joint.data {
            TypedJoint::GenericJoint(generic) => {
                let limits = generic.limits(JointAxis::LinX).unwrap();
                assert!((limits.max - def.max_length).abs() < 1e-5);
            }
            _ => panic!("anchor joints must be generic joints"),
        }
    }

    #[test]
    fn rapier_backend_rotation_and_spin() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((
                Transform::from_rotation(Quat::from_rotation_z(FRAC_PI_4)),
                Velocity::angular(2.0),
            ))
            .id();

        let rotation = Rapier2dBackend::get_rotation(app.world(), entity);
        assert!((rotation - FRAC_PI_4).abs() < 1e-5);
        assert_eq!(Rapier2dBackend::get_angular_velocity(app.world(), entity), 2.0);
    }

    #[test]
    fn fixed_timestep_from_time_resource() {
        let app = create_test_app();
        let dt = Rapier2dBackend::get_fixed_timestep(app.world());
        assert!((dt - 1.0 / 60.0).abs() < 1e-5);
    }

    #[test]
    fn locomotion_bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier2dLocomotionBundle::new().with_damping(0.1, 0.2),
                Collider::ball(1.0),
            ))
            .id();

        app.update();

        assert!(app.world().get::<RigidBody>(entity).is_some());
        assert!(app.world().get::<ExternalForce>(entity).is_some());
        assert_eq!(
            app.world().get::<LockedAxes>(entity).copied(),
            Some(LockedAxes::empty())
        );
        assert_eq!(app.world().get::<Damping>(entity).unwrap().linear_damping, 0.1);
    }
}
