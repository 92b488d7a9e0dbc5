// Controller input pipeline: raw hardware polling, per-hand gesture
// synthesis, and the two-hand manager that fans everything onto one bus.

pub mod controllers_manager;
pub mod gamepad_monitor;
pub mod hand_controller;
pub mod source;

pub use controllers_manager::{
    ControllersManager, DoubleSqueezeGesture, HeadTransform, ManagerEvent, ManagerEventKind,
};
pub use gamepad_monitor::{
    apply_dead_zone, GamepadMonitor, MonitorEvent, StickDirection, AXES_DEAD_ZONE,
    HOLD_EVENT_INTERVAL, HOLD_THRESHOLD, STICK_CLICK_THRESHOLD,
};
pub use hand_controller::{AttachedObject, HandController, HandEvent, HandEventKind};
pub use source::{GamepadButton, GamepadSnapshot, HapticActuator, InputSource};
