use std::cell::RefCell;
use std::rc::Rc;

use cgmath::{InnerSpace, Vector3};
use engine::events::{handler, Event, EventDispatcher, Priority, Propagation};
use engine::gesture_log;

use crate::config::{Handedness, ManagerOptions};
use crate::input::hand_controller::{HandController, HandEvent, HandEventKind};
use crate::input::source::InputSource;
use crate::space::{Pose, ReferenceSpace, RigidTransform};

/// Events published on the manager's bus. Every hand-level event is mirrored
/// here wrapped in [`ManagerEvent::Hand`], so consumers subscribe in one
/// place without knowing which controller instance maps to which hand.
#[derive(Clone, Debug)]
pub enum ManagerEvent {
    Hand(HandEvent),
    LeftControllerConnected,
    RightControllerConnected,
    LeftControllerDisconnected,
    RightControllerDisconnected,
    /// Both hands transitioned to squeezing; payload captures the gesture
    /// seed for a consuming two-handed scale/pan component.
    DoubleSqueezeStarted {
        initial_distance: f32,
        initial_center_point: Vector3<f32>,
    },
    DoubleSqueezeEnded,
    /// Per-frame hook published after both hands finished updating.
    Update { time: f32, delta: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManagerEventKind {
    Hand(HandEventKind),
    LeftControllerConnected,
    RightControllerConnected,
    LeftControllerDisconnected,
    RightControllerDisconnected,
    DoubleSqueezeStarted,
    DoubleSqueezeEnded,
    Update,
}

impl Event for ManagerEvent {
    type Kind = ManagerEventKind;

    fn kind(&self) -> ManagerEventKind {
        match self {
            ManagerEvent::Hand(event) => ManagerEventKind::Hand(event.kind()),
            ManagerEvent::LeftControllerConnected => ManagerEventKind::LeftControllerConnected,
            ManagerEvent::RightControllerConnected => ManagerEventKind::RightControllerConnected,
            ManagerEvent::LeftControllerDisconnected => {
                ManagerEventKind::LeftControllerDisconnected
            }
            ManagerEvent::RightControllerDisconnected => {
                ManagerEventKind::RightControllerDisconnected
            }
            ManagerEvent::DoubleSqueezeStarted { .. } => ManagerEventKind::DoubleSqueezeStarted,
            ManagerEvent::DoubleSqueezeEnded => ManagerEventKind::DoubleSqueezeEnded,
            ManagerEvent::Update { .. } => ManagerEventKind::Update,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SqueezeState {
    is_down: bool,
    initial_position: Option<Vector3<f32>>,
}

/// Bookkeeping for the two-hand squeeze gesture. The gesture-level fields
/// are `Some` exactly while both hands are squeezing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleSqueezeGesture {
    left: SqueezeState,
    right: SqueezeState,
    pub initial_distance: Option<f32>,
    pub initial_center_point: Option<Vector3<f32>>,
}

impl DoubleSqueezeGesture {
    pub fn is_down(&self, hand: Handedness) -> bool {
        self.state(hand).is_down
    }

    pub fn initial_position(&self, hand: Handedness) -> Option<Vector3<f32>> {
        self.state(hand).initial_position
    }

    fn state(&self, hand: Handedness) -> &SqueezeState {
        match hand {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }

    fn state_mut(&mut self, hand: Handedness) -> &mut SqueezeState {
        match hand {
            Handedness::Left => &mut self.left,
            Handedness::Right => &mut self.right,
        }
    }
}

/// World-space head placement derived from the tracked head pose and the
/// active reference transform.
#[derive(Clone, Copy, Debug)]
pub struct HeadTransform {
    pub position: Vector3<f32>,
    pub view_direction: Vector3<f32>,
}

/// Owns the two hand controllers, resolves left/right/skilled identity,
/// re-exports both hands' events on one bus and correlates the two-hand
/// squeeze gesture.
///
/// Hands are owned by value and addressed by index; handedness is resolved
/// dynamically from what each controller reported at connect time. There is
/// exactly one manager per host application, owned by it and passed by
/// reference to dependent components.
pub struct ControllersManager {
    events: Rc<EventDispatcher<ManagerEvent>>,
    hands: [HandController; 2],
    source: Rc<dyn InputSource>,
    reference: Rc<RefCell<dyn ReferenceSpace>>,
    user_handedness: Handedness,
    double_squeeze: DoubleSqueezeGesture,
}

impl ControllersManager {
    pub fn new(
        source: Rc<dyn InputSource>,
        reference: Rc<RefCell<dyn ReferenceSpace>>,
        options: ManagerOptions,
    ) -> ControllersManager {
        let manager = ControllersManager {
            events: Rc::new(EventDispatcher::new()),
            hands: [HandController::new(), HandController::new()],
            source,
            reference,
            user_handedness: options.user_handedness,
            double_squeeze: DoubleSqueezeGesture::default(),
        };

        for hand in &manager.hands {
            let bus = Rc::clone(&manager.events);
            let forward = handler(move |event: &HandEvent| {
                bus.publish(&ManagerEvent::Hand(event.clone()));
                Propagation::Continue
            });
            for kind in HandEventKind::ALL {
                hand.events().subscribe(kind, &forward, Priority::Value(0));
            }
        }

        manager
    }

    pub fn events(&self) -> &Rc<EventDispatcher<ManagerEvent>> {
        &self.events
    }

    pub fn hand(&self, index: usize) -> Option<&HandController> {
        self.hands.get(index)
    }

    pub fn hand_mut(&mut self, index: usize) -> Option<&mut HandController> {
        self.hands.get_mut(index)
    }

    pub fn left(&self) -> Option<&HandController> {
        self.hand_for(Handedness::Left)
    }

    pub fn right(&self) -> Option<&HandController> {
        self.hand_for(Handedness::Right)
    }

    /// The controller matching the configured user handedness.
    pub fn skilled_hand(&self) -> &HandController {
        if self.hands[0].handedness() == Some(self.user_handedness) {
            &self.hands[0]
        } else {
            &self.hands[1]
        }
    }

    pub fn other_hand(&self) -> &HandController {
        if self.hands[0].handedness() == Some(self.user_handedness) {
            &self.hands[1]
        } else {
            &self.hands[0]
        }
    }

    pub fn user_handedness(&self) -> Handedness {
        self.user_handedness
    }

    pub fn connected(&self) -> bool {
        self.hands[0].connected() && self.hands[1].connected()
    }

    pub fn double_squeeze(&self) -> &DoubleSqueezeGesture {
        &self.double_squeeze
    }

    /// Switches the configured user handedness; passing `None` flips it.
    pub fn toggle_handedness(&mut self, handedness: Option<Handedness>) {
        let handedness = handedness.unwrap_or_else(|| self.user_handedness.other());
        self.user_handedness = handedness;
        for hand in &mut self.hands {
            let skilled = hand.handedness() == Some(handedness);
            hand.set_skilled(skilled);
        }
    }

    pub fn distance_between_hands(&self) -> Option<f32> {
        if !self.connected() {
            return None;
        }
        Some((self.hands[0].grip_position() - self.hands[1].grip_position()).magnitude())
    }

    pub fn center_point_between_hands(&self) -> Option<Vector3<f32>> {
        if !self.connected() {
            return None;
        }
        Some((self.hands[0].grip_position() + self.hands[1].grip_position()) * 0.5)
    }

    /// World-space head position and view direction.
    pub fn headset_transform(&self) -> Option<HeadTransform> {
        let pose: Pose = self.source.head_pose()?;
        let tracked_to_world = self.tracked_to_world();
        Some(HeadTransform {
            position: tracked_to_world.transform_point(pose.position),
            view_direction: tracked_to_world.transform_vector(pose.forward()),
        })
    }

    pub fn on_controller_connected(&mut self, index: usize, handedness: Handedness) {
        let user_handedness = self.user_handedness;
        let Some(hand) = self.hands.get_mut(index) else {
            return;
        };
        hand.handle_connected(handedness);
        hand.set_skilled(handedness == user_handedness);

        self.events.publish(&match handedness {
            Handedness::Left => ManagerEvent::LeftControllerConnected,
            Handedness::Right => ManagerEvent::RightControllerConnected,
        });
    }

    pub fn on_controller_disconnected(&mut self, index: usize) {
        let Some(hand) = self.hands.get_mut(index) else {
            return;
        };
        let handedness = hand.handedness();
        hand.handle_disconnected();

        if let Some(handedness) = handedness {
            self.events.publish(&match handedness {
                Handedness::Left => ManagerEvent::LeftControllerDisconnected,
                Handedness::Right => ManagerEvent::RightControllerDisconnected,
            });
        }
    }

    pub fn on_select_start(&mut self, index: usize) {
        let tracked_to_world = self.tracked_to_world();
        let source = Rc::clone(&self.source);
        if let Some(hand) = self.hands.get_mut(index) {
            hand.handle_select_start(&*source, &tracked_to_world);
        }
    }

    pub fn on_select_end(&mut self, index: usize) {
        let tracked_to_world = self.tracked_to_world();
        let source = Rc::clone(&self.source);
        if let Some(hand) = self.hands.get_mut(index) {
            hand.handle_select_end(&*source, &tracked_to_world);
        }
    }

    pub fn on_squeeze_start(&mut self, index: usize) {
        let tracked_to_world = self.tracked_to_world();
        let source = Rc::clone(&self.source);

        let Some(hand) = self.hands.get_mut(index) else {
            return;
        };
        let was_squeezing = hand.is_squeezing();
        hand.handle_squeeze_start(&*source, &tracked_to_world);

        if was_squeezing {
            return;
        }
        if let Some(handedness) = self.hands[index].handedness() {
            self.correlate_squeeze_start(handedness);
        }
    }

    pub fn on_squeeze_end(&mut self, index: usize) {
        let tracked_to_world = self.tracked_to_world();
        let source = Rc::clone(&self.source);

        let Some(hand) = self.hands.get_mut(index) else {
            return;
        };
        let was_squeezing = hand.is_squeezing();
        hand.handle_squeeze_end(&*source, &tracked_to_world);

        if !was_squeezing {
            return;
        }
        if let Some(handedness) = self.hands[index].handedness() {
            self.correlate_squeeze_end(handedness);
        }
    }

    /// Per-frame update. Both hands update in a fixed order, then the
    /// manager-level `Update` event gives downstream listeners a single
    /// well-ordered hook with all ray state current.
    pub fn update(&mut self, time: f32, delta: f32) {
        let tracked_to_world = self.tracked_to_world();
        let source = Rc::clone(&self.source);
        for hand in &mut self.hands {
            hand.update(&*source, &tracked_to_world, time, delta);
        }
        self.events.publish(&ManagerEvent::Update { time, delta });
    }

    fn hand_for(&self, handedness: Handedness) -> Option<&HandController> {
        self.hands
            .iter()
            .find(|hand| hand.handedness() == Some(handedness))
    }

    fn tracked_to_world(&self) -> RigidTransform {
        self.reference.borrow().transform().inverse()
    }

    fn correlate_squeeze_start(&mut self, handedness: Handedness) {
        let grip = self.hand_for(handedness).map(|hand| hand.grip_position());
        {
            let state = self.double_squeeze.state_mut(handedness);
            state.is_down = true;
            state.initial_position = grip;
        }

        if self.double_squeeze.left.is_down && self.double_squeeze.right.is_down {
            let (Some(initial_distance), Some(initial_center_point)) = (
                self.distance_between_hands(),
                self.center_point_between_hands(),
            ) else {
                return;
            };
            self.double_squeeze.initial_distance = Some(initial_distance);
            self.double_squeeze.initial_center_point = Some(initial_center_point);
            gesture_log!(
                debug,
                "double squeeze started, initial distance {initial_distance}"
            );
            self.events.publish(&ManagerEvent::DoubleSqueezeStarted {
                initial_distance,
                initial_center_point,
            });
        }
    }

    fn correlate_squeeze_end(&mut self, handedness: Handedness) {
        self.double_squeeze.state_mut(handedness).is_down = false;

        // Exclusive or: the gesture ends when exactly one hand remains down.
        // Releasing both hands from "both down" therefore emits exactly one
        // DoubleSqueezeEnded, on the first release.
        if self.double_squeeze.left.is_down != self.double_squeeze.right.is_down {
            self.double_squeeze.initial_distance = None;
            self.double_squeeze.initial_center_point = None;
            gesture_log!(debug, "double squeeze ended");
            self.events.publish(&ManagerEvent::DoubleSqueezeEnded);
        }
    }
}
