use std::rc::Rc;

use cgmath::{vec3, Vector2, Vector3, Zero};
use engine::events::{Event, EventDispatcher};
use engine::input_log;

use crate::config::{ButtonName, Handedness};
use crate::error::AttachError;
use crate::input::gamepad_monitor::{GamepadMonitor, MonitorEvent, StickDirection};
use crate::input::source::InputSource;
use crate::scene::{NodeId, SceneGraph};
use crate::space::{Ray, RigidTransform};

/// Events published on a hand controller's bus. Every variant names the hand
/// that raised it and carries a fresh copy of the data it describes.
#[derive(Clone, Debug)]
pub enum HandEvent {
    Connected {
        handedness: Handedness,
    },
    Disconnected {
        handedness: Handedness,
    },
    SelectStart {
        handedness: Handedness,
        ray: Ray,
    },
    SelectEnd {
        handedness: Handedness,
        ray: Ray,
    },
    SqueezeStart {
        handedness: Handedness,
        ray: Ray,
        grip_position: Vector3<f32>,
    },
    SqueezeEnd {
        handedness: Handedness,
        ray: Ray,
        grip_position: Vector3<f32>,
    },
    RayStarted {
        handedness: Handedness,
        ray: Ray,
        stick_position: Vector2<f32>,
    },
    /// Published every frame while the trigger is held.
    RayUpdated {
        handedness: Handedness,
        ray: Ray,
        stick_position: Vector2<f32>,
    },
    RayEnded {
        handedness: Handedness,
        ray: Ray,
        stick_position: Vector2<f32>,
    },
    RotateLeft {
        handedness: Handedness,
    },
    RotateRight {
        handedness: Handedness,
    },
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
    /// Published every frame while the stick y axis is deflected and the x
    /// axis is not past the hold threshold. Feeds continuous locomotion.
    AxisYNotZero {
        handedness: Handedness,
        ray: Ray,
        stick_position: Vector2<f32>,
        delta_time: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandEventKind {
    Connected,
    Disconnected,
    SelectStart,
    SelectEnd,
    SqueezeStart,
    SqueezeEnd,
    RayStarted,
    RayUpdated,
    RayEnded,
    RotateLeft,
    RotateRight,
    ButtonDown,
    ButtonUp,
    AxisChanged,
    AxisDown,
    AxisUp,
    AxisClick,
    AxisYNotZero,
}

impl HandEventKind {
    pub const ALL: [HandEventKind; 18] = [
        HandEventKind::Connected,
        HandEventKind::Disconnected,
        HandEventKind::SelectStart,
        HandEventKind::SelectEnd,
        HandEventKind::SqueezeStart,
        HandEventKind::SqueezeEnd,
        HandEventKind::RayStarted,
        HandEventKind::RayUpdated,
        HandEventKind::RayEnded,
        HandEventKind::RotateLeft,
        HandEventKind::RotateRight,
        HandEventKind::ButtonDown,
        HandEventKind::ButtonUp,
        HandEventKind::AxisChanged,
        HandEventKind::AxisDown,
        HandEventKind::AxisUp,
        HandEventKind::AxisClick,
        HandEventKind::AxisYNotZero,
    ];
}

impl Event for HandEvent {
    type Kind = HandEventKind;

    fn kind(&self) -> HandEventKind {
        match self {
            HandEvent::Connected { .. } => HandEventKind::Connected,
            HandEvent::Disconnected { .. } => HandEventKind::Disconnected,
            HandEvent::SelectStart { .. } => HandEventKind::SelectStart,
            HandEvent::SelectEnd { .. } => HandEventKind::SelectEnd,
            HandEvent::SqueezeStart { .. } => HandEventKind::SqueezeStart,
            HandEvent::SqueezeEnd { .. } => HandEventKind::SqueezeEnd,
            HandEvent::RayStarted { .. } => HandEventKind::RayStarted,
            HandEvent::RayUpdated { .. } => HandEventKind::RayUpdated,
            HandEvent::RayEnded { .. } => HandEventKind::RayEnded,
            HandEvent::RotateLeft { .. } => HandEventKind::RotateLeft,
            HandEvent::RotateRight { .. } => HandEventKind::RotateRight,
            HandEvent::ButtonDown { .. } => HandEventKind::ButtonDown,
            HandEvent::ButtonUp { .. } => HandEventKind::ButtonUp,
            HandEvent::AxisChanged { .. } => HandEventKind::AxisChanged,
            HandEvent::AxisDown { .. } => HandEventKind::AxisDown,
            HandEvent::AxisUp { .. } => HandEventKind::AxisUp,
            HandEvent::AxisClick { .. } => HandEventKind::AxisClick,
            HandEvent::AxisYNotZero { .. } => HandEventKind::AxisYNotZero,
        }
    }
}

impl HandEvent {
    pub fn handedness(&self) -> Handedness {
        match self {
            HandEvent::Connected { handedness }
            | HandEvent::Disconnected { handedness }
            | HandEvent::SelectStart { handedness, .. }
            | HandEvent::SelectEnd { handedness, .. }
            | HandEvent::SqueezeStart { handedness, .. }
            | HandEvent::SqueezeEnd { handedness, .. }
            | HandEvent::RayStarted { handedness, .. }
            | HandEvent::RayUpdated { handedness, .. }
            | HandEvent::RayEnded { handedness, .. }
            | HandEvent::RotateLeft { handedness }
            | HandEvent::RotateRight { handedness }
            | HandEvent::ButtonDown { handedness, .. }
            | HandEvent::ButtonUp { handedness, .. }
            | HandEvent::AxisChanged { handedness, .. }
            | HandEvent::AxisDown { handedness, .. }
            | HandEvent::AxisUp { handedness, .. }
            | HandEvent::AxisClick { handedness, .. }
            | HandEvent::AxisYNotZero { handedness, .. } => *handedness,
        }
    }
}

/// Non-owning record of a grabbed object and where to put it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachedObject {
    pub object: NodeId,
    pub original_parent: Option<NodeId>,
}

/// One tracked hand: owns the gamepad monitor and the hand's ray state, and
/// turns hardware lifecycle plus monitor events into a unified event stream.
///
/// Lifecycle edges (`handle_connected`, `handle_select_start`, ...) are host
/// calls; `update` runs once per frame with the current tracked-to-world
/// transform so published rays are always world-space.
pub struct HandController {
    events: Rc<EventDispatcher<HandEvent>>,
    monitor: Option<GamepadMonitor>,

    handedness: Option<Handedness>,
    connected: bool,
    skilled: bool,

    trigger_down: bool,
    squeezing: bool,

    ray: Ray,
    last_ray: Option<Ray>,
    grip_position: Vector3<f32>,

    holding_point: Option<NodeId>,
    attached: Option<AttachedObject>,

    time: f32,
    poll_events: Vec<MonitorEvent>,
}

impl HandController {
    pub fn new() -> HandController {
        HandController {
            events: Rc::new(EventDispatcher::new()),
            monitor: None,
            handedness: None,
            connected: false,
            skilled: false,
            trigger_down: false,
            squeezing: false,
            ray: Ray::new(Vector3::zero(), vec3(0.0, 0.0, -1.0)),
            last_ray: None,
            grip_position: Vector3::zero(),
            holding_point: None,
            attached: None,
            time: 0.0,
            poll_events: Vec::new(),
        }
    }

    pub fn events(&self) -> &Rc<EventDispatcher<HandEvent>> {
        &self.events
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn is_skilled(&self) -> bool {
        self.skilled
    }

    pub(crate) fn set_skilled(&mut self, skilled: bool) {
        self.skilled = skilled;
    }

    pub fn trigger_is_down(&self) -> bool {
        self.trigger_down
    }

    pub fn is_squeezing(&self) -> bool {
        self.squeezing
    }

    /// Accumulated time from the update deltas, seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// The current world-space ray, recomputed at the top of every update.
    pub fn ray(&self) -> Ray {
        self.ray
    }

    /// The previous frame's ray, kept for velocity/gesture calculations.
    pub fn last_ray(&self) -> Option<Ray> {
        self.last_ray
    }

    /// World-space grip position from the latest pose refresh.
    pub fn grip_position(&self) -> Vector3<f32> {
        self.grip_position
    }

    pub fn is_down(&self, button: ButtonName) -> bool {
        self.monitor.as_ref().map_or(false, |m| m.is_down(button))
    }

    pub fn button_value(&self, button: ButtonName) -> f32 {
        self.monitor.as_ref().map_or(0.0, |m| m.button_value(button))
    }

    pub fn stick_position(&self) -> Vector2<f32> {
        self.monitor
            .as_ref()
            .map_or(Vector2::new(0.0, 0.0), |m| m.stick_position())
    }

    /// Grip-relative node objects get parented under while held.
    pub fn set_holding_point(&mut self, node: NodeId) {
        self.holding_point = Some(node);
    }

    pub fn attached_object(&self) -> Option<AttachedObject> {
        self.attached
    }

    pub fn handle_connected(&mut self, handedness: Handedness) {
        self.connected = true;
        self.handedness = Some(handedness);
        self.monitor = Some(GamepadMonitor::new(handedness));
        input_log!(debug, "controller connected: {:?}", handedness);
        self.events.publish(&HandEvent::Connected { handedness });
    }

    pub fn handle_disconnected(&mut self) {
        let Some(handedness) = self.handedness else {
            return;
        };
        self.connected = false;
        self.monitor = None;
        input_log!(debug, "controller disconnected: {:?}", handedness);
        self.events.publish(&HandEvent::Disconnected { handedness });
    }

    /// Trigger pressed. Idempotent: repeated starts while already down are
    /// ignored.
    pub fn handle_select_start(
        &mut self,
        source: &dyn InputSource,
        tracked_to_world: &RigidTransform,
    ) {
        let Some(handedness) = self.handedness else {
            return;
        };
        if self.trigger_down {
            return;
        }
        self.trigger_down = true;

        self.refresh_poses(source, tracked_to_world);
        let stick_position = self.stick_position();

        self.events.publish(&HandEvent::SelectStart {
            handedness,
            ray: self.ray,
        });
        self.events.publish(&HandEvent::RayStarted {
            handedness,
            ray: self.ray,
            stick_position,
        });

        if let Some(monitor) = &mut self.monitor {
            monitor.restart_holding_timer();
        }
    }

    pub fn handle_select_end(
        &mut self,
        source: &dyn InputSource,
        tracked_to_world: &RigidTransform,
    ) {
        let Some(handedness) = self.handedness else {
            return;
        };
        if !self.trigger_down {
            return;
        }
        self.trigger_down = false;

        self.refresh_poses(source, tracked_to_world);
        let stick_position = self.stick_position();

        self.events.publish(&HandEvent::RayEnded {
            handedness,
            ray: self.ray,
            stick_position,
        });
        self.events.publish(&HandEvent::SelectEnd {
            handedness,
            ray: self.ray,
        });

        if let Some(monitor) = &mut self.monitor {
            monitor.restart_holding_timer();
        }
    }

    /// Squeeze pressed. Idempotent like the trigger, which also keeps the
    /// two-hand gesture from re-capturing on repeated start events.
    pub fn handle_squeeze_start(
        &mut self,
        source: &dyn InputSource,
        tracked_to_world: &RigidTransform,
    ) {
        let Some(handedness) = self.handedness else {
            return;
        };
        if self.squeezing {
            return;
        }
        self.squeezing = true;

        self.refresh_poses(source, tracked_to_world);
        self.events.publish(&HandEvent::SqueezeStart {
            handedness,
            ray: self.ray,
            grip_position: self.grip_position,
        });
    }

    pub fn handle_squeeze_end(
        &mut self,
        source: &dyn InputSource,
        tracked_to_world: &RigidTransform,
    ) {
        let Some(handedness) = self.handedness else {
            return;
        };
        if !self.squeezing {
            return;
        }
        self.squeezing = false;

        self.refresh_poses(source, tracked_to_world);
        self.events.publish(&HandEvent::SqueezeEnd {
            handedness,
            ray: self.ray,
            grip_position: self.grip_position,
        });
    }

    /// Per-frame update: refresh poses, poll the monitor, publish the
    /// derived per-frame events. Button/axis events for this hand always
    /// precede its `RayUpdated`/`AxisYNotZero`.
    pub fn update(
        &mut self,
        source: &dyn InputSource,
        tracked_to_world: &RigidTransform,
        time: f32,
        delta: f32,
    ) {
        self.time += delta;

        // The ray refresh happens even with no monitor so lifecycle events
        // always see current geometry.
        self.refresh_poses(source, tracked_to_world);

        if self.monitor.is_none() {
            return;
        }

        let mut drained = std::mem::take(&mut self.poll_events);
        drained.clear();
        if let Some(monitor) = &mut self.monitor {
            monitor.poll(source, time, delta, &mut drained);
        }
        for event in drained.drain(..) {
            self.forward_monitor_event(event);
        }
        self.poll_events = drained;

        let Some(handedness) = self.handedness else {
            return;
        };
        let stick_position = self.stick_position();

        if self.trigger_down {
            self.events.publish(&HandEvent::RayUpdated {
                handedness,
                ray: self.ray,
                stick_position,
            });
        }

        self.check_axis_y_not_zero(handedness, stick_position, delta);
    }

    /// Haptic pulse request; silently ignored when unsupported.
    pub fn pulse(&self, source: &dyn InputSource, intensity: f32, duration_ms: f32) {
        let Some(handedness) = self.handedness else {
            return;
        };
        if let Some(haptics) = source.haptics(handedness) {
            haptics.pulse(intensity.clamp(0.0, 1.0), duration_ms);
        }
    }

    /// Parents `object` under this hand's holding point, recording its
    /// original parent for [`Self::detach_object`]. Grabbing while already
    /// holding is refused rather than silently dropping the earlier
    /// relation.
    pub fn attach_object(
        &mut self,
        scene: &mut dyn SceneGraph,
        object: NodeId,
    ) -> Result<(), AttachError> {
        let holding_point = self.holding_point.ok_or(AttachError::NoHoldingPoint)?;
        if let Some(attached) = &self.attached {
            return Err(AttachError::AlreadyHolding(attached.object));
        }

        let original_parent = scene.parent_of(object);
        scene.attach(object, holding_point);
        self.attached = Some(AttachedObject {
            object,
            original_parent,
        });
        Ok(())
    }

    /// Restores the held object to its original parent and clears the
    /// relation. No-op when nothing is held.
    pub fn detach_object(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(attached) = self.attached.take() {
            if let Some(parent) = attached.original_parent {
                scene.attach(attached.object, parent);
            }
        }
    }

    fn refresh_poses(&mut self, source: &dyn InputSource, tracked_to_world: &RigidTransform) {
        let Some(handedness) = self.handedness else {
            return;
        };

        self.last_ray = Some(self.ray);
        if let Some(pose) = source.controller_pose(handedness) {
            let origin = tracked_to_world.transform_point(pose.position);
            let direction = tracked_to_world.transform_vector(pose.forward());
            self.ray = Ray::new(origin, direction);
        }
        if let Some(grip) = source.grip_pose(handedness) {
            self.grip_position = tracked_to_world.transform_point(grip.position);
        }
    }

    fn forward_monitor_event(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::ButtonDown {
                handedness,
                index,
                button,
                value,
            } => self.events.publish(&HandEvent::ButtonDown {
                handedness,
                index,
                button,
                value,
            }),
            MonitorEvent::ButtonUp {
                handedness,
                index,
                button,
                value,
            } => self.events.publish(&HandEvent::ButtonUp {
                handedness,
                index,
                button,
                value,
            }),
            MonitorEvent::AxisChanged {
                handedness,
                position,
                frame_delta,
            } => self.events.publish(&HandEvent::AxisChanged {
                handedness,
                position,
                frame_delta,
            }),
            MonitorEvent::AxisDown {
                handedness,
                direction,
                position,
            } => self.events.publish(&HandEvent::AxisDown {
                handedness,
                direction,
                position,
            }),
            MonitorEvent::AxisUp {
                handedness,
                direction,
                position,
            } => self.events.publish(&HandEvent::AxisUp {
                handedness,
                direction,
                position,
            }),
            MonitorEvent::AxisClick {
                handedness,
                direction,
            } => self.events.publish(&HandEvent::AxisClick {
                handedness,
                direction,
            }),
            // X-axis holds drive snap rotation.
            MonitorEvent::AxisXHeld { handedness, value } => {
                if value > 0.0 {
                    self.events.publish(&HandEvent::RotateRight { handedness });
                } else {
                    self.events.publish(&HandEvent::RotateLeft { handedness });
                }
            }
            // Y-axis holds have no per-hand consumer; continuous motion
            // rides on AxisYNotZero instead.
            MonitorEvent::AxisYHeld { .. } => {}
        }
    }

    fn check_axis_y_not_zero(
        &self,
        handedness: Handedness,
        stick_position: Vector2<f32>,
        delta: f32,
    ) {
        let Some(monitor) = &self.monitor else {
            return;
        };
        // Skip while the x axis is rotating so the two gestures don't fight.
        if stick_position.y.abs() > 0.0 && !monitor.x_is_above_hold_threshold() {
            self.events.publish(&HandEvent::AxisYNotZero {
                handedness,
                ray: self.ray,
                stick_position,
                delta_time: delta,
            });
        }
    }
}

impl Default for HandController {
    fn default() -> Self {
        Self::new()
    }
}
