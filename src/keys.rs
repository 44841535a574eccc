//! Logical key tracking.
//!
//! [`KeyState`] records, per logical key, how long it has been held. A held
//! time of exactly `0.0` means the key went down this tick, which is how the
//! jump logic tells a fresh press from a continuous hold.

use bevy::prelude::*;

/// The fixed set of logical inputs the locomotion loop reads.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionKey {
    Left,
    Right,
    Up,
    Down,
    Jump,
}

impl LocomotionKey {
    /// Number of logical keys.
    pub const COUNT: usize = 5;

    /// All keys, in index order.
    pub const ALL: [LocomotionKey; Self::COUNT] = [
        LocomotionKey::Left,
        LocomotionKey::Right,
        LocomotionKey::Up,
        LocomotionKey::Down,
        LocomotionKey::Jump,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Held durations for each [`LocomotionKey`].
///
/// `None` means the key is up. `Some(t)` is the number of seconds since the
/// key went down, advanced by [`KeyState::advance`] once per tick.
///
/// # Example
///
/// ```rust
/// use ray_anchor_locomotion::prelude::*;
///
/// let mut keys = KeyState::default();
/// keys.set_key_down(LocomotionKey::Jump);
/// assert!(keys.just_pressed(LocomotionKey::Jump));
///
/// keys.advance(1.0 / 60.0);
/// assert!(keys.is_down(LocomotionKey::Jump));
/// assert!(!keys.just_pressed(LocomotionKey::Jump));
/// ```
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct KeyState {
    held: [Option<f32>; LocomotionKey::COUNT],
}

impl KeyState {
    /// Create a state with every key up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as pressed. Does nothing if it is already held, so the
    /// held time keeps counting across repeated calls.
    pub fn set_key_down(&mut self, key: LocomotionKey) {
        let slot = &mut self.held[key.index()];
        if slot.is_none() {
            *slot = Some(0.0);
        }
    }

    /// Mark a key as released.
    pub fn set_key_up(&mut self, key: LocomotionKey) {
        self.held[key.index()] = None;
    }

    /// Level-triggered helper: press or release depending on `down`.
    pub fn set_held(&mut self, key: LocomotionKey, down: bool) {
        if down {
            self.set_key_down(key);
        } else {
            self.set_key_up(key);
        }
    }

    /// Advance every held key by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        for time in self.held.iter_mut().flatten() {
            *time += dt;
        }
    }

    /// Whether the key is currently held.
    #[inline]
    pub fn is_down(&self, key: LocomotionKey) -> bool {
        self.held[key.index()].is_some()
    }

    /// Seconds since the key went down, or `None` if it is up.
    #[inline]
    pub fn held_time(&self, key: LocomotionKey) -> Option<f32> {
        self.held[key.index()]
    }

    /// Whether the key went down this tick (rising edge).
    #[inline]
    pub fn just_pressed(&self, key: LocomotionKey) -> bool {
        self.held_time(key) == Some(0.0)
    }

    /// Release every key.
    pub fn clear(&mut self) {
        self.held = [None; LocomotionKey::COUNT];
    }

    /// Intended travel direction from the four directional keys.
    ///
    /// Opposite keys cancel out. The result is not normalized.
    pub fn heading(&self) -> Vec2 {
        let mut heading = Vec2::ZERO;
        if self.is_down(LocomotionKey::Left) {
            heading.x -= 1.0;
        }
        if self.is_down(LocomotionKey::Right) {
            heading.x += 1.0;
        }
        if self.is_down(LocomotionKey::Up) {
            heading.y += 1.0;
        }
        if self.is_down(LocomotionKey::Down) {
            heading.y -= 1.0;
        }
        heading
    }
}

/// Keyboard bindings used by [`capture_keyboard`].
///
/// Each logical key may be bound to several physical keys; the logical key
/// is held while any of them is pressed.
#[derive(Resource, Debug, Clone)]
pub struct KeyBindings {
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub jump: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: vec![KeyCode::ArrowLeft, KeyCode::KeyA],
            right: vec![KeyCode::ArrowRight, KeyCode::KeyD],
            up: vec![KeyCode::ArrowUp, KeyCode::KeyW],
            down: vec![KeyCode::ArrowDown, KeyCode::KeyS],
            jump: vec![KeyCode::Space],
        }
    }
}

impl KeyBindings {
    /// Physical keys bound to a logical key.
    pub fn codes(&self, key: LocomotionKey) -> &[KeyCode] {
        match key {
            LocomotionKey::Left => &self.left,
            LocomotionKey::Right => &self.right,
            LocomotionKey::Up => &self.up,
            LocomotionKey::Down => &self.down,
            LocomotionKey::Jump => &self.jump,
        }
    }
}

/// Marker for bodies whose [`KeyState`] is driven by the keyboard.
///
/// Bodies without it keep whatever state game code (or AI) writes.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct KeyboardControlled;

/// Copy keyboard state into [`KeyState`] for [`KeyboardControlled`] bodies.
///
/// Skipped when no `ButtonInput<KeyCode>` resource exists (headless apps).
pub fn capture_keyboard(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    bindings: Res<KeyBindings>,
    mut q: Query<&mut KeyState, With<KeyboardControlled>>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };

    for mut keys in &mut q {
        for key in LocomotionKey::ALL {
            let down = keyboard.any_pressed(bindings.codes(key).iter().copied());
            keys.set_held(key, down);
        }
    }
}
