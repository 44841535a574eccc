//! # `ray_anchor_locomotion`
//!
//! A ray-anchored 2D locomotion controller with physics backend abstraction.
//!
//! Instead of legs, the controlled body casts a fixed ring of rays around
//! itself and hangs on to whatever those rays touch with short spring
//! joints. The controller:
//! - Re-anchors joints every tick as the body moves over a surface
//! - Releases rear-facing anchors so the body leans into its heading
//! - Climbs walls and ceilings once enough anchors hold on
//! - Jumps away from the average contact direction
//! - Turns the body toward its grip with a torsion spring
//! - Abstracts the physics backend (Rapier2D included)
//!
//! ## Architecture
//!
//! Every fixed tick runs the [`LocomotionSet`]s in order:
//! 1. Read input into [`KeyState`](keys::KeyState)
//! 2. Cull rear-facing anchors and cast the [`RayAnchorRing`](ring::RayAnchorRing)
//! 3. Apply movement forces and jump impulses
//! 4. Release every anchor during the post-jump grace window
//! 5. Apply the orientation torque
//! 6. Hand accumulated forces to the physics engine, advance timers
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use ray_anchor_locomotion::prelude::*;
//!
//! // Components for a keyboard-driven crawler
//! let bundle = LocomotionBundle::new(LocomotionConfig::spider());
//! assert_eq!(bundle.ring.anchors().len(), 16);
//!
//! // Spawn it together with `KeyboardControlled` and physics components
//! ```

use bevy::prelude::*;

pub mod anchor;
pub mod backend;
pub mod cast;
pub mod config;
pub mod keys;
pub mod ring;
pub mod state;
pub mod systems;
pub mod torsion;

#[cfg(feature = "rapier2d")]
pub mod rapier;

#[cfg(test)]
mod testing;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::anchor::{AnchorJoint, RayAnchor};
    pub use crate::backend::{AnchorPhysics, LocomotionBackend, SpringJointDef};
    pub use crate::cast::CastResult;
    pub use crate::config::{AnchorSettings, LocomotionConfig};
    pub use crate::keys::{KeyBindings, KeyState, KeyboardControlled, LocomotionKey};
    pub use crate::ring::RayAnchorRing;
    pub use crate::state::{Airborne, Gripping, LocomotionState};
    pub use crate::torsion::torsion_spring_torque;
    pub use crate::{LocomotionBundle, LocomotionSet, RayAnchorLocomotionPlugin};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, Rapier2dLocomotionBundle};
}

/// Phases of one locomotion tick, chained in this order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Backend clears last frame's controller forces.
    Preparation,
    /// Input capture into [`KeyState`](keys::KeyState).
    Input,
    /// Heading culling and ring casts (backend systems).
    Sensors,
    /// Movement forces and jumps.
    Movement,
    /// Post-jump anchor release (backend systems).
    Release,
    /// Orientation torque and state markers.
    Orientation,
    /// Backend applies accumulated forces.
    FinalApplication,
    /// Timers advance.
    Bookkeeping,
}

/// Everything a body needs besides its physics components.
#[derive(Bundle)]
pub struct LocomotionBundle {
    pub config: config::LocomotionConfig,
    pub state: state::LocomotionState,
    pub keys: keys::KeyState,
    pub ring: ring::RayAnchorRing,
}

impl LocomotionBundle {
    /// Build the bundle, laying out the ring from `config`.
    pub fn new(config: config::LocomotionConfig) -> Self {
        Self {
            ring: ring::RayAnchorRing::from_config(&config),
            config,
            state: state::LocomotionState::default(),
            keys: keys::KeyState::default(),
        }
    }
}

impl Default for LocomotionBundle {
    fn default() -> Self {
        Self::new(config::LocomotionConfig::default())
    }
}

/// Main plugin for the locomotion controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (raycasting, joints, force application).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use ray_anchor_locomotion::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(RayAnchorLocomotionPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct RayAnchorLocomotionPlugin<B: backend::LocomotionBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::LocomotionBackend> Default for RayAnchorLocomotionPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::LocomotionBackend> Plugin for RayAnchorLocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::LocomotionConfig>();
        app.register_type::<config::AnchorSettings>();
        app.register_type::<state::LocomotionState>();
        app.register_type::<state::Gripping>();
        app.register_type::<state::Airborne>();
        app.register_type::<keys::KeyState>();
        app.register_type::<keys::LocomotionKey>();
        app.register_type::<keys::KeyboardControlled>();

        app.init_resource::<keys::KeyBindings>();

        app.configure_sets(
            FixedUpdate,
            (
                LocomotionSet::Preparation,
                LocomotionSet::Input,
                LocomotionSet::Sensors,
                LocomotionSet::Movement,
                LocomotionSet::Release,
                LocomotionSet::Orientation,
                LocomotionSet::FinalApplication,
                LocomotionSet::Bookkeeping,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            keys::capture_keyboard.in_set(LocomotionSet::Input),
        );

        app.add_systems(
            FixedUpdate,
            (systems::apply_movement_forces::<B>, systems::apply_jump::<B>)
                .chain()
                .in_set(LocomotionSet::Movement),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::apply_orientation_torque::<B>,
                systems::sync_state_markers,
            )
                .chain()
                .in_set(LocomotionSet::Orientation),
        );

        app.add_systems(
            FixedUpdate,
            systems::advance_locomotion_timers::<B>.in_set(LocomotionSet::Bookkeeping),
        );
    }
}
