use crate::config::Handedness;
use crate::space::Pose;

/// Pressed state and analog value of one hardware button.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GamepadButton {
    pub pressed: bool,
    pub value: f32,
}

/// Raw per-frame gamepad state for one hand. Rebuilt on every poll; the
/// monitor keeps the previous snapshot for edge detection.
#[derive(Clone, Debug, Default)]
pub struct GamepadSnapshot {
    pub buttons: Vec<GamepadButton>,
    /// Axis array in hardware order; the thumbstick occupies indices 2 (x)
    /// and 3 (y).
    pub axes: Vec<f32>,
}

/// Fire-and-forget haptic handle for one hand. Hosts without haptics simply
/// never hand one out.
pub trait HapticActuator {
    fn pulse(&self, intensity: f32, duration_ms: f32);
}

/// Per-frame hardware state supplied by the host runtime. All lookups are
/// transient: a `None` means the device is absent this frame, which is an
/// expected steady state, not an error.
pub trait InputSource {
    /// Raw gamepad state for `hand`, or `None` while no session or gamepad
    /// is present.
    fn gamepad(&self, hand: Handedness) -> Option<GamepadSnapshot>;

    /// Tracked pose of the hand's target-ray space.
    fn controller_pose(&self, hand: Handedness) -> Option<Pose>;

    /// Tracked pose of the hand's grip space.
    fn grip_pose(&self, hand: Handedness) -> Option<Pose>;

    /// Tracked pose of the viewer's head.
    fn head_pose(&self) -> Option<Pose>;

    /// Haptic actuator for `hand`, if the hardware has one.
    fn haptics(&self, _hand: Handedness) -> Option<&dyn HapticActuator> {
        None
    }
}
