use cgmath::{InnerSpace, Vector2};

use crate::config::{buttons_mapping, ButtonName, Handedness};
use crate::input::source::{GamepadButton, GamepadSnapshot, InputSource};

/// Raw axis magnitudes below this are treated as stick noise.
pub const AXES_DEAD_ZONE: f32 = 0.4;
/// Raw axis magnitude past which a stick direction counts as pushed.
pub const HOLD_THRESHOLD: f32 = 0.5;
/// Seconds between repeated hold events while the stick stays pushed.
pub const HOLD_EVENT_INTERVAL: f32 = 0.75;
/// A down/up transition faster than this is a click, in seconds.
pub const STICK_CLICK_THRESHOLD: f32 = 0.4;

/// Direction a stick axis is deflected in. Forward is negative y, left is
/// negative x, matching the hardware convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StickDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Semantic events produced by one hand's gamepad. The monitor is a leaf
/// producer: events are drained into a caller buffer each poll and the hand
/// controller republishes them on its bus.
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    ButtonDown {
        handedness: Handedness,
        index: usize,
        button: Option<ButtonName>,
        value: f32,
    },
    ButtonUp {
        handedness: Handedness,
        index: usize,
        button: Option<ButtonName>,
        value: f32,
    },
    AxisChanged {
        handedness: Handedness,
        position: Vector2<f32>,
        frame_delta: f32,
    },
    AxisDown {
        handedness: Handedness,
        direction: StickDirection,
        position: Vector2<f32>,
    },
    AxisUp {
        handedness: Handedness,
        direction: StickDirection,
        position: Vector2<f32>,
    },
    AxisClick {
        handedness: Handedness,
        direction: StickDirection,
    },
    /// Repeats every `HOLD_EVENT_INTERVAL` while the x axis stays pushed.
    AxisXHeld { handedness: Handedness, value: f32 },
    /// Same, for the y axis.
    AxisYHeld { handedness: Handedness, value: f32 },
}

/// Per-hand stick and button state machine, polled once per frame.
///
/// Threshold crossings and hold checks compare the raw axis values; the
/// dead-zoned vector is what event payloads carry and what continuous
/// motion consumes.
pub struct GamepadMonitor {
    handedness: Handedness,
    buttons_state: Option<Vec<GamepadButton>>,

    stick_raw: Vector2<f32>,
    stick: Vector2<f32>,
    stick_raw_previous: Vector2<f32>,
    stick_previous: Vector2<f32>,
    hold_timer: f32,

    x_activated_at: Option<f32>,
    y_activated_at: Option<f32>,

    forward_down: bool,
    backward_down: bool,
    left_down: bool,
    right_down: bool,

    x_held: bool,
    y_held: bool,
}

impl GamepadMonitor {
    pub fn new(handedness: Handedness) -> GamepadMonitor {
        GamepadMonitor {
            handedness,
            buttons_state: None,
            stick_raw: Vector2::new(0.0, 0.0),
            stick: Vector2::new(0.0, 0.0),
            stick_raw_previous: Vector2::new(0.0, 0.0),
            stick_previous: Vector2::new(0.0, 0.0),
            hold_timer: 0.0,
            x_activated_at: None,
            y_activated_at: None,
            forward_down: false,
            backward_down: false,
            left_down: false,
            right_down: false,
            x_held: false,
            y_held: false,
        }
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Polls the hardware once. A missing gamepad is a silent no-op.
    pub fn poll(
        &mut self,
        source: &dyn InputSource,
        time: f32,
        delta: f32,
        events: &mut Vec<MonitorEvent>,
    ) {
        let Some(gamepad) = source.gamepad(self.handedness) else {
            return;
        };

        self.poll_buttons(&gamepad, events);
        self.poll_axes(&gamepad, time, delta, events);
    }

    pub fn is_down(&self, button: ButtonName) -> bool {
        self.lookup(button).map_or(false, |b| b.pressed)
    }

    pub fn button_value(&self, button: ButtonName) -> f32 {
        self.lookup(button).map_or(0.0, |b| b.value)
    }

    /// The dead-zoned stick vector from the last poll.
    pub fn stick_position(&self) -> Vector2<f32> {
        self.stick
    }

    pub fn x_is_held(&self) -> bool {
        self.x_held
    }

    pub fn y_is_held(&self) -> bool {
        self.y_held
    }

    /// Whether the x axis is currently past the hold threshold, regardless
    /// of the hold timer.
    pub fn x_is_above_hold_threshold(&self) -> bool {
        self.stick_raw.x.abs() > HOLD_THRESHOLD
    }

    /// Re-arms the hold timer so a hold event never straddles a trigger
    /// gesture boundary.
    pub fn restart_holding_timer(&mut self) {
        self.hold_timer = HOLD_EVENT_INTERVAL;
    }

    fn lookup(&self, button: ButtonName) -> Option<&GamepadButton> {
        let index = buttons_mapping(self.handedness)
            .iter()
            .position(|mapped| *mapped == Some(button))?;
        self.buttons_state.as_ref()?.get(index)
    }

    fn poll_buttons(&mut self, gamepad: &GamepadSnapshot, events: &mut Vec<MonitorEvent>) {
        let new_state = gamepad.buttons.clone();

        let Some(previous) = &self.buttons_state else {
            // First poll after (re)connection seeds state without edges.
            self.buttons_state = Some(new_state);
            return;
        };

        let mapping = buttons_mapping(self.handedness);
        for (index, current) in new_state.iter().enumerate() {
            let was_pressed = previous.get(index).map_or(false, |b| b.pressed);
            let button = mapping.get(index).copied().flatten();

            if !was_pressed && current.pressed {
                events.push(MonitorEvent::ButtonDown {
                    handedness: self.handedness,
                    index,
                    button,
                    value: current.value,
                });
            }
            if was_pressed && !current.pressed {
                events.push(MonitorEvent::ButtonUp {
                    handedness: self.handedness,
                    index,
                    button,
                    value: current.value,
                });
            }
        }

        self.buttons_state = Some(new_state);
    }

    fn poll_axes(
        &mut self,
        gamepad: &GamepadSnapshot,
        time: f32,
        delta: f32,
        events: &mut Vec<MonitorEvent>,
    ) {
        if gamepad.axes.len() < 4 {
            return;
        }

        let raw = Vector2::new(gamepad.axes[2], gamepad.axes[3]);
        let filtered = apply_dead_zone(raw);
        self.stick_raw = raw;
        self.stick = filtered;

        if self.stick_previous != filtered {
            events.push(MonitorEvent::AxisChanged {
                handedness: self.handedness,
                position: filtered,
                frame_delta: delta,
            });

            self.detect_y_edges(raw, filtered, time, events);
            self.detect_x_edges(raw, filtered, time, events);
        }

        self.check_stick_holding(delta, events);

        self.stick_raw_previous = raw;
        self.stick_previous = filtered;
    }

    fn detect_y_edges(
        &mut self,
        raw: Vector2<f32>,
        filtered: Vector2<f32>,
        time: f32,
        events: &mut Vec<MonitorEvent>,
    ) {
        let crossed_down = self.stick_raw_previous.y.abs() < HOLD_THRESHOLD
            && raw.y.abs() > HOLD_THRESHOLD;

        if crossed_down {
            if raw.y < 0.0 && !self.forward_down {
                self.forward_down = true;
                self.y_activated_at = Some(time);
                events.push(MonitorEvent::AxisDown {
                    handedness: self.handedness,
                    direction: StickDirection::Forward,
                    position: filtered,
                });
            }
            if raw.y > 0.0 && !self.backward_down {
                self.backward_down = true;
                self.y_activated_at = Some(time);
                events.push(MonitorEvent::AxisDown {
                    handedness: self.handedness,
                    direction: StickDirection::Backward,
                    position: filtered,
                });
            }
        }

        if raw.y.abs() < HOLD_THRESHOLD {
            let held_for = self.y_activated_at.map(|at| time - at);
            if self.forward_down {
                self.forward_down = false;
                self.release(StickDirection::Forward, filtered, held_for, events);
            }
            if self.backward_down {
                self.backward_down = false;
                self.release(StickDirection::Backward, filtered, held_for, events);
            }
        }
    }

    fn detect_x_edges(
        &mut self,
        raw: Vector2<f32>,
        filtered: Vector2<f32>,
        time: f32,
        events: &mut Vec<MonitorEvent>,
    ) {
        let crossed_down = self.stick_raw_previous.x.abs() < HOLD_THRESHOLD
            && raw.x.abs() > HOLD_THRESHOLD;

        if crossed_down {
            if raw.x < 0.0 && !self.left_down {
                self.left_down = true;
                self.x_activated_at = Some(time);
                events.push(MonitorEvent::AxisDown {
                    handedness: self.handedness,
                    direction: StickDirection::Left,
                    position: filtered,
                });
            }
            if raw.x > 0.0 && !self.right_down {
                self.right_down = true;
                self.x_activated_at = Some(time);
                events.push(MonitorEvent::AxisDown {
                    handedness: self.handedness,
                    direction: StickDirection::Right,
                    position: filtered,
                });
            }
        }

        if raw.x.abs() < HOLD_THRESHOLD {
            let held_for = self.x_activated_at.map(|at| time - at);
            if self.left_down {
                self.left_down = false;
                self.release(StickDirection::Left, filtered, held_for, events);
            }
            if self.right_down {
                self.right_down = false;
                self.release(StickDirection::Right, filtered, held_for, events);
            }
        }
    }

    fn release(
        &mut self,
        direction: StickDirection,
        position: Vector2<f32>,
        held_for: Option<f32>,
        events: &mut Vec<MonitorEvent>,
    ) {
        events.push(MonitorEvent::AxisUp {
            handedness: self.handedness,
            direction,
            position,
        });
        if matches!(held_for, Some(duration) if duration < STICK_CLICK_THRESHOLD) {
            events.push(MonitorEvent::AxisClick {
                handedness: self.handedness,
                direction,
            });
        }
    }

    fn check_stick_holding(&mut self, delta: f32, events: &mut Vec<MonitorEvent>) {
        if self.stick.magnitude() > 0.0 && self.hold_timer <= 0.0 {
            if self.stick_raw.x.abs() > HOLD_THRESHOLD {
                self.x_held = true;
                events.push(MonitorEvent::AxisXHeld {
                    handedness: self.handedness,
                    value: self.stick.x,
                });
            } else {
                self.x_held = false;
            }

            if self.stick_raw.y.abs() > HOLD_THRESHOLD {
                self.y_held = true;
                events.push(MonitorEvent::AxisYHeld {
                    handedness: self.handedness,
                    value: self.stick.y,
                });
            } else {
                self.y_held = false;
            }

            self.restart_holding_timer();
        } else {
            self.hold_timer = (self.hold_timer - delta).max(0.0);
        }
    }
}

/// Shrinks each component toward zero by the dead zone, clamping small
/// magnitudes to exactly zero.
pub fn apply_dead_zone(raw: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(dead_zone_component(raw.x), dead_zone_component(raw.y))
}

fn dead_zone_component(value: f32) -> f32 {
    if value < 0.0 {
        (value + AXES_DEAD_ZONE).min(0.0)
    } else {
        (value - AXES_DEAD_ZONE).max(0.0)
    }
}
