use std::cell::RefCell;
use std::f32::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use cgmath::{vec3, InnerSpace, Quaternion, Rad, Rotation3, Vector2, Vector3, Zero};
use engine::events::{handler, EventDispatcher, Handler, Priority, Propagation};
use engine::locomotion_log;
use serde::{Deserialize, Serialize};

use crate::config::{EnabledHands, Handedness, HandSet};
use crate::error::ConfigError;
use crate::input::controllers_manager::{
    ControllersManager, ManagerEvent, ManagerEventKind,
};
use crate::input::hand_controller::{HandEvent, HandEventKind};
use crate::input::source::InputSource;
use crate::locomotion::marker::TeleportMarker;
use crate::locomotion::nav_query::{NavigableSurfaceQuery, SurfaceHit};
use crate::space::{Ray, ReferenceSpace, RigidTransform};

/// Stick deflection past which the facing arrow is shown while aiming.
const STICK_ARROW_THRESHOLD: f32 = 0.5;
/// Facing arrow snaps to multiples of this angle (15 degrees).
const ARROW_ANGLE_INCREMENT: f32 = PI / 12.0;
/// Surfaces whose world normal has a smaller y are rejected as teleport
/// targets.
const VERTICALITY_THRESHOLD: f32 = 0.75;
/// The locomotion controller listens behind every other consumer; a menu or
/// grab interaction that wants a ray stops it from ever reaching here.
const LISTENER_PRIORITY: i32 = -999;

/// Tunables for the locomotion controller.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionOptions {
    /// Hands that may teleport, rotate and fly.
    pub enabled_hands: EnabledHands,
    /// Stick-driven translation in the direction of the ray.
    pub continuous_motion: bool,
    /// Zero out the vertical ray component while flying.
    pub restrict_vertical_movement: bool,
    /// Continuous motion speed, meters per second.
    pub forward_speed: f32,
    /// Snap rotation step, degrees.
    pub rotation_increment: f32,
}

impl Default for LocomotionOptions {
    fn default() -> Self {
        LocomotionOptions {
            enabled_hands: EnabledHands::Right,
            continuous_motion: true,
            restrict_vertical_movement: false,
            forward_speed: 10.0,
            rotation_increment: 15.0,
        }
    }
}

impl LocomotionOptions {
    pub fn from_json(json: &str) -> Result<LocomotionOptions, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// State machine over world placement, driven by ray and axis events from
/// the controllers manager.
///
/// Owns the world offset and yaw exclusively; both are only mutated inside
/// the single-threaded update pass and composed into the rigid transform
/// installed on the reference-space sink. Subscribes behind all other
/// consumers and consumes ray events while a teleport aim owns them.
pub struct LocomotionController {
    options: LocomotionOptions,
    enabled_hands: HandSet,

    source: Rc<dyn InputSource>,
    reference: Rc<RefCell<dyn ReferenceSpace>>,
    surfaces: Option<Rc<dyn NavigableSurfaceQuery>>,

    world_offset: Vector3<f32>,
    world_yaw: f32,
    current_transform: RigidTransform,

    presenting: bool,
    aiming: Option<Handedness>,
    marker: TeleportMarker,

    time: f32,
    subscriptions: Vec<(ManagerEventKind, Handler<ManagerEvent>)>,
}

impl LocomotionController {
    /// Builds the controller and subscribes it to the manager's bus.
    /// Configuration problems are construction failures, never absorbed.
    pub fn new(
        manager: &ControllersManager,
        source: Rc<dyn InputSource>,
        reference: Rc<RefCell<dyn ReferenceSpace>>,
        options: LocomotionOptions,
    ) -> Result<Rc<RefCell<LocomotionController>>, ConfigError> {
        if !options.forward_speed.is_finite() || options.forward_speed <= 0.0 {
            return Err(ConfigError::InvalidForwardSpeed(options.forward_speed));
        }
        if !options.rotation_increment.is_finite() || options.rotation_increment == 0.0 {
            return Err(ConfigError::InvalidRotationIncrement(
                options.rotation_increment,
            ));
        }

        let controller = Rc::new(RefCell::new(LocomotionController {
            enabled_hands: options.enabled_hands.to_set(),
            options,
            source,
            reference,
            surfaces: None,
            world_offset: Vector3::zero(),
            world_yaw: 0.0,
            current_transform: RigidTransform::identity(),
            presenting: false,
            aiming: None,
            marker: TeleportMarker::hidden(),
            time: 0.0,
            subscriptions: Vec::new(),
        }));

        Self::wire(&controller, manager.events());
        Ok(controller)
    }

    fn wire(controller: &Rc<RefCell<Self>>, bus: &Rc<EventDispatcher<ManagerEvent>>) {
        let mut subscribe = |kind: ManagerEventKind, h: Handler<ManagerEvent>| {
            bus.subscribe(kind, &h, Priority::Value(LISTENER_PRIORITY));
            controller.borrow_mut().subscriptions.push((kind, h));
        };

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Hand(HandEventKind::RayStarted),
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Hand(HandEvent::RayStarted { handedness, ray, .. }) = e {
                    me.borrow_mut().on_ray_started(*handedness, ray)
                } else {
                    Propagation::Continue
                }
            }),
        );

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Hand(HandEventKind::RayUpdated),
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Hand(HandEvent::RayUpdated {
                    handedness,
                    ray,
                    stick_position,
                }) = e
                {
                    me.borrow_mut()
                        .on_ray_updated(*handedness, ray, *stick_position)
                } else {
                    Propagation::Continue
                }
            }),
        );

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Hand(HandEventKind::RayEnded),
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Hand(HandEvent::RayEnded { handedness, ray, .. }) = e {
                    me.borrow_mut().on_ray_ended(*handedness, ray)
                } else {
                    Propagation::Continue
                }
            }),
        );

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Hand(HandEventKind::RotateLeft),
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Hand(HandEvent::RotateLeft { handedness }) = e {
                    me.borrow_mut().on_rotate(*handedness, -1.0)
                } else {
                    Propagation::Continue
                }
            }),
        );

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Hand(HandEventKind::RotateRight),
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Hand(HandEvent::RotateRight { handedness }) = e {
                    me.borrow_mut().on_rotate(*handedness, 1.0)
                } else {
                    Propagation::Continue
                }
            }),
        );

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Hand(HandEventKind::AxisYNotZero),
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Hand(HandEvent::AxisYNotZero {
                    handedness,
                    ray,
                    stick_position,
                    delta_time,
                }) = e
                {
                    me.borrow_mut().on_axis_y_not_zero(
                        *handedness,
                        ray,
                        *stick_position,
                        *delta_time,
                    )
                } else {
                    Propagation::Continue
                }
            }),
        );

        let me = Rc::clone(controller);
        subscribe(
            ManagerEventKind::Update,
            handler(move |e: &ManagerEvent| {
                if let ManagerEvent::Update { time, .. } = e {
                    me.borrow_mut().on_update(*time)
                } else {
                    Propagation::Continue
                }
            }),
        );
    }

    /// Unsubscribes from the manager's bus.
    pub fn detach(&mut self, bus: &EventDispatcher<ManagerEvent>) {
        for (kind, handler) in self.subscriptions.drain(..) {
            bus.unsubscribe(kind, &handler);
        }
    }

    /// Installs the navigable-surface raycast service. Until one is set,
    /// every ray event passes through untouched.
    pub fn set_surfaces(&mut self, surfaces: Rc<dyn NavigableSurfaceQuery>) {
        self.surfaces = Some(surfaces);
    }

    pub fn on_session_start(&mut self) {
        self.presenting = true;
        self.apply_current_transform();
    }

    pub fn on_session_end(&mut self) {
        self.presenting = false;
    }

    pub fn is_presenting(&self) -> bool {
        self.presenting
    }

    pub fn options(&self) -> &LocomotionOptions {
        &self.options
    }

    /// The hand currently aiming a teleport, if any.
    pub fn aiming_hand(&self) -> Option<Handedness> {
        self.aiming
    }

    pub fn marker(&self) -> TeleportMarker {
        self.marker
    }

    pub fn world_offset(&self) -> Vector3<f32> {
        self.world_offset
    }

    /// World yaw in radians.
    pub fn world_yaw(&self) -> f32 {
        self.world_yaw
    }

    /// The active world-to-tracked rigid transform.
    pub fn reference_transform(&self) -> RigidTransform {
        self.current_transform
    }

    /// The tracking origin expressed in world space; the inverse of
    /// [`Self::reference_transform`], useful for debug visualization.
    pub fn tracking_origin_transform(&self) -> RigidTransform {
        self.current_transform.inverse()
    }

    fn on_ray_started(&mut self, handedness: Handedness, ray: &Ray) -> Propagation {
        let Some(surfaces) = &self.surfaces else {
            return Propagation::Continue;
        };
        if !self.enabled_hands.contains_hand(handedness) {
            return Propagation::Continue;
        }

        if surfaces.raycast(ray).is_some() {
            self.aiming = Some(handedness);
            locomotion_log!(debug, "teleport aim started ({:?})", handedness);
            return Propagation::Stop;
        }
        Propagation::Continue
    }

    fn on_ray_updated(
        &mut self,
        handedness: Handedness,
        ray: &Ray,
        stick_position: Vector2<f32>,
    ) -> Propagation {
        let Some(surfaces) = &self.surfaces else {
            return Propagation::Continue;
        };
        if self.aiming != Some(handedness) || !self.enabled_hands.contains_hand(handedness) {
            return Propagation::Continue;
        }

        match surfaces.raycast(ray) {
            Some(hit) if is_horizontal_surface(&hit) => {
                self.marker.show_at(hit.point);
                if stick_position.magnitude() > STICK_ARROW_THRESHOLD {
                    let angle = teleport_arrow_angle(stick_position, ray);
                    self.marker.show_arrow(angle, self.time);
                } else {
                    self.marker.hide_arrow();
                }
                Propagation::Stop
            }
            // Misses and rejected surfaces keep the previous marker state.
            _ => Propagation::Continue,
        }
    }

    fn on_ray_ended(&mut self, handedness: Handedness, ray: &Ray) -> Propagation {
        let Some(surfaces) = &self.surfaces else {
            return Propagation::Continue;
        };
        if self.aiming != Some(handedness) || !self.enabled_hands.contains_hand(handedness) {
            return Propagation::Continue;
        }

        if let Some(hit) = surfaces.raycast(ray) {
            if is_horizontal_surface(&hit) {
                self.teleport(hit.point);
            }
        }

        self.aiming = None;
        self.marker.hide();
        Propagation::Stop
    }

    fn on_rotate(&mut self, handedness: Handedness, sign: f32) -> Propagation {
        if self.aiming.is_some() || !self.enabled_hands.contains_hand(handedness) {
            return Propagation::Continue;
        }
        self.rotate(sign * self.options.rotation_increment);
        Propagation::Continue
    }

    fn on_axis_y_not_zero(
        &mut self,
        handedness: Handedness,
        ray: &Ray,
        stick_position: Vector2<f32>,
        delta_time: f32,
    ) -> Propagation {
        if !self.options.continuous_motion {
            return Propagation::Continue;
        }
        if self.aiming.is_some() || !self.enabled_hands.contains_hand(handedness) {
            return Propagation::Continue;
        }
        self.move_in_direction(ray, stick_position.y, delta_time);
        Propagation::Continue
    }

    fn on_update(&mut self, time: f32) -> Propagation {
        self.time = time;
        if self.presenting {
            self.apply_current_transform();
        }
        Propagation::Continue
    }

    /// Places the world so `destination` lands exactly under the user's
    /// tracked position, applying the arrow facing first when it is fresh.
    fn teleport(&mut self, destination: Vector3<f32>) {
        if !self.presenting {
            return;
        }
        let Some(head) = self.source.head_pose() else {
            return;
        };

        if self.marker.arrow_fresh(self.time) {
            // Rotate the user's head-forward onto the arrow's chosen facing.
            let tracked_to_world = self.current_transform.inverse();
            let mut head_direction = tracked_to_world.transform_vector(head.forward());
            head_direction.y = 0.0;
            if head_direction.magnitude2() > 0.0 {
                head_direction = head_direction.normalize();
            }
            let head_angle = head_direction.z.atan2(head_direction.x);
            self.world_yaw += -(self.marker.arrow_angle + head_angle);
        }

        let rotation = Quaternion::from_angle_y(Rad(self.world_yaw));
        let mut target = rotation * -destination;
        target.x += head.position.x;
        target.z += head.position.z;

        locomotion_log!(
            debug,
            "teleport to {:?}, world offset {:?}",
            destination,
            target
        );
        self.world_offset = target;
        self.apply_current_transform();
    }

    /// Adds `degrees` to the world yaw, pivoting the world around the
    /// user's tracked position so the user turns in place.
    fn rotate(&mut self, degrees: f32) {
        if !self.presenting {
            return;
        }
        let Some(head) = self.source.head_pose() else {
            return;
        };

        let delta = degrees.to_radians();
        self.world_yaw += delta;

        let pivot = vec3(head.position.x, 0.0, head.position.z);
        let rotation = Quaternion::from_angle_y(Rad(delta));
        self.world_offset = rotation * (self.world_offset - pivot) + pivot;

        self.apply_current_transform();
        self.marker.hide();
    }

    /// Translates the world opposite the ray so the user flies along it.
    fn move_in_direction(&mut self, ray: &Ray, stick_y: f32, delta_time: f32) {
        let mut direction = ray.direction;
        if self.options.restrict_vertical_movement {
            direction.y = 0.0;
            if direction.magnitude2() > 0.0 {
                direction = direction.normalize();
            }
        }

        let step = direction * (stick_y * self.options.forward_speed * delta_time);
        let rotation = Quaternion::from_angle_y(Rad(self.world_yaw));
        self.world_offset += rotation * step;
    }

    fn apply_current_transform(&mut self) {
        if !self.presenting {
            return;
        }
        let transform = RigidTransform::from_offset_yaw(self.world_offset, Rad(self.world_yaw));
        self.current_transform = transform;
        self.reference.borrow_mut().set_transform(transform);
    }
}

fn is_horizontal_surface(hit: &SurfaceHit) -> bool {
    hit.normal.y > VERTICALITY_THRESHOLD
}

/// Arrow yaw for the current stick deflection, snapped to 15-degree steps
/// and made relative to the ray's forward facing in the ground plane.
fn teleport_arrow_angle(stick_position: Vector2<f32>, ray: &Ray) -> f32 {
    let mut projected = vec3(ray.direction.x, 0.0, ray.direction.z);
    if projected.magnitude2() > 0.0 {
        projected = projected.normalize();
    }
    let forward_angle = projected.z.atan2(projected.x);

    let mut angle = stick_position.y.atan2(-stick_position.x);
    angle = (angle / ARROW_ANGLE_INCREMENT).round() * ARROW_ANGLE_INCREMENT;

    FRAC_PI_2 + angle - forward_angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerOptions;
    use crate::input::source::GamepadSnapshot;
    use crate::locomotion::nav_query::HorizontalPlane;
    use crate::space::{OffsetReferenceSpace, Pose};
    use std::collections::HashMap;

    #[derive(Default)]
    struct SourceState {
        gamepads: HashMap<Handedness, GamepadSnapshot>,
        controllers: HashMap<Handedness, Pose>,
        head: Option<Pose>,
    }

    #[derive(Default)]
    struct ScriptedSource {
        state: RefCell<SourceState>,
    }

    impl ScriptedSource {
        fn aim_at(&self, hand: Handedness, origin: Vector3<f32>, target: Vector3<f32>) {
            let direction = target - origin;
            let rotation = Quaternion::from_arc(vec3(0.0, 0.0, -1.0), direction.normalize(), None);
            self.state
                .borrow_mut()
                .controllers
                .insert(hand, Pose::new(origin, rotation));
        }

        fn set_head(&self, position: Vector3<f32>) {
            self.state.borrow_mut().head = Some(Pose::new(
                position,
                Quaternion::new(1.0, 0.0, 0.0, 0.0),
            ));
        }
    }

    impl InputSource for ScriptedSource {
        fn gamepad(&self, hand: Handedness) -> Option<GamepadSnapshot> {
            self.state.borrow().gamepads.get(&hand).cloned()
        }

        fn controller_pose(&self, hand: Handedness) -> Option<Pose> {
            self.state.borrow().controllers.get(&hand).copied()
        }

        fn grip_pose(&self, hand: Handedness) -> Option<Pose> {
            self.state.borrow().controllers.get(&hand).copied()
        }

        fn head_pose(&self) -> Option<Pose> {
            self.state.borrow().head
        }
    }

    struct Rig {
        source: Rc<ScriptedSource>,
        reference: Rc<RefCell<OffsetReferenceSpace>>,
        manager: ControllersManager,
        locomotion: Rc<RefCell<LocomotionController>>,
    }

    fn rig_with_options(options: LocomotionOptions) -> Rig {
        let source = Rc::new(ScriptedSource::default());
        let reference = Rc::new(RefCell::new(OffsetReferenceSpace::new()));
        let manager = ControllersManager::new(
            Rc::clone(&source) as Rc<dyn InputSource>,
            Rc::clone(&reference) as Rc<RefCell<dyn ReferenceSpace>>,
            ManagerOptions::default(),
        );
        let locomotion = LocomotionController::new(
            &manager,
            Rc::clone(&source) as Rc<dyn InputSource>,
            Rc::clone(&reference) as Rc<RefCell<dyn ReferenceSpace>>,
            options,
        )
        .unwrap();
        locomotion
            .borrow_mut()
            .set_surfaces(Rc::new(HorizontalPlane { height: 0.0 }));
        locomotion.borrow_mut().on_session_start();

        Rig {
            source,
            reference,
            manager,
            locomotion,
        }
    }

    fn rig() -> Rig {
        rig_with_options(LocomotionOptions::default())
    }

    /// Where a tracked-space point currently sits in world space.
    fn to_world(rig: &Rig, tracked: Vector3<f32>) -> Vector3<f32> {
        rig.locomotion
            .borrow()
            .reference_transform()
            .inverse()
            .transform_point(tracked)
    }

    fn normalized_angle(angle: f32) -> f32 {
        (angle + PI).rem_euclid(2.0 * PI) - PI
    }

    #[test]
    fn test_invalid_options_fail_construction() {
        let source = Rc::new(ScriptedSource::default());
        let reference = Rc::new(RefCell::new(OffsetReferenceSpace::new()));
        let manager = ControllersManager::new(
            Rc::clone(&source) as Rc<dyn InputSource>,
            Rc::clone(&reference) as Rc<RefCell<dyn ReferenceSpace>>,
            ManagerOptions::default(),
        );

        let result = LocomotionController::new(
            &manager,
            Rc::clone(&source) as Rc<dyn InputSource>,
            Rc::clone(&reference) as Rc<RefCell<dyn ReferenceSpace>>,
            LocomotionOptions {
                forward_speed: -1.0,
                ..LocomotionOptions::default()
            },
        );
        assert!(matches!(
            result.err(),
            Some(ConfigError::InvalidForwardSpeed(_))
        ));
    }

    #[test]
    fn test_options_parse_from_json() {
        let options = LocomotionOptions::from_json(
            r#"{ "enabled_hands": "both", "continuous_motion": false, "forward_speed": 4.5 }"#,
        )
        .unwrap();
        assert_eq!(options.enabled_hands, EnabledHands::Both);
        assert!(!options.continuous_motion);
        assert!((options.forward_speed - 4.5).abs() < 1e-6);
        // Unspecified fields fall back to defaults.
        assert!((options.rotation_increment - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_teleport_lands_tracked_origin_on_hit_point() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.1, 1.4, 0.0), vec3(2.0, 0.0, -3.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        rig.manager.on_select_start(0);
        assert_eq!(
            rig.locomotion.borrow().aiming_hand(),
            Some(Handedness::Right)
        );

        rig.manager.update(0.016, 0.016);
        assert!(rig.locomotion.borrow().marker().visible);

        rig.manager.on_select_end(0);
        assert!(rig.locomotion.borrow().aiming_hand().is_none());
        assert!(!rig.locomotion.borrow().marker().visible);

        // The tracking origin now maps onto the hit point.
        let origin_world = to_world(&rig, Vector3::zero());
        assert!((origin_world - vec3(2.0, 0.0, -3.0)).magnitude() < 1e-4);

        // The sink saw the same transform the controller exposes.
        assert_eq!(
            rig.reference.borrow().transform(),
            rig.locomotion.borrow().reference_transform()
        );
    }

    #[test]
    fn test_teleport_rejected_on_steep_surface() {
        struct Wall;
        impl NavigableSurfaceQuery for Wall {
            fn raycast(&self, _ray: &Ray) -> Option<SurfaceHit> {
                Some(SurfaceHit {
                    point: vec3(0.0, 1.0, -2.0),
                    normal: vec3(1.0, 0.0, 0.0),
                    distance: 2.0,
                })
            }
        }

        let rig = rig();
        rig.locomotion.borrow_mut().set_surfaces(Rc::new(Wall));
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(0.0, 1.0, -2.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        // Any hit starts the aim, but a steep surface never commits.
        rig.manager.on_select_start(0);
        assert!(rig.locomotion.borrow().aiming_hand().is_some());
        rig.manager.update(0.016, 0.016);
        // Rejected surface: marker is never shown.
        assert!(!rig.locomotion.borrow().marker().visible);
        rig.manager.on_select_end(0);

        assert!((rig.locomotion.borrow().world_offset()).magnitude() < 1e-6);
        assert!(rig.locomotion.borrow().aiming_hand().is_none());
    }

    #[test]
    fn test_teleport_noop_when_terminal_raycast_misses() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(2.0, 0.0, -3.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        rig.manager.on_select_start(0);
        // The hand swings up before release; the terminal raycast misses.
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(0.0, 5.0, -1.0));
        rig.manager.on_select_end(0);

        assert!((rig.locomotion.borrow().world_offset()).magnitude() < 1e-6);
        assert!(rig.locomotion.borrow().aiming_hand().is_none());
    }

    #[test]
    fn test_teleport_requires_presenting_session() {
        let rig = rig();
        rig.locomotion.borrow_mut().on_session_end();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(2.0, 0.0, -3.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        rig.manager.on_select_start(0);
        rig.manager.on_select_end(0);

        assert!((rig.locomotion.borrow().world_offset()).magnitude() < 1e-6);
    }

    #[test]
    fn test_snap_rotation_pivots_around_user() {
        let rig = rig();
        rig.source.set_head(vec3(1.0, 1.7, 2.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        let head_before = to_world(&rig, vec3(1.0, 1.7, 2.0));

        rig.manager.events().publish(&ManagerEvent::Hand(HandEvent::RotateRight {
            handedness: Handedness::Right,
        }));
        let yaw_after_right = rig.locomotion.borrow().world_yaw();
        assert!((normalized_angle(yaw_after_right) - 15.0_f32.to_radians()).abs() < 1e-5);

        rig.manager.events().publish(&ManagerEvent::Hand(HandEvent::RotateLeft {
            handedness: Handedness::Right,
        }));

        let yaw = rig.locomotion.borrow().world_yaw();
        assert!(normalized_angle(yaw).abs() < 1e-5);

        // The user's world position is unchanged by the round trip.
        let head_after = to_world(&rig, vec3(1.0, 1.7, 2.0));
        assert!((head_after - head_before).magnitude() < 1e-4);
    }

    #[test]
    fn test_rotation_ignored_while_aiming() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(1.0, 0.0, -2.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        rig.manager.on_select_start(0);
        rig.manager.events().publish(&ManagerEvent::Hand(HandEvent::RotateRight {
            handedness: Handedness::Right,
        }));
        assert!(rig.locomotion.borrow().world_yaw().abs() < 1e-6);
    }

    #[test]
    fn test_continuous_motion_flies_along_ray() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        let ray = Ray::new(vec3(0.0, 1.4, 0.0), vec3(0.0, 0.0, -1.0));
        // Stick pushed fully forward for half a second.
        rig.manager.events().publish(&ManagerEvent::Hand(HandEvent::AxisYNotZero {
            handedness: Handedness::Right,
            ray,
            stick_position: Vector2::new(0.0, -1.0),
            delta_time: 0.5,
        }));
        rig.manager.update(0.5, 0.016);

        // forward_speed 10 m/s for 0.5 s along -z.
        let origin_world = to_world(&rig, Vector3::zero());
        assert!((origin_world - vec3(0.0, 0.0, -5.0)).magnitude() < 1e-4);
    }

    #[test]
    fn test_restricted_vertical_movement_stays_level() {
        let rig = rig_with_options(LocomotionOptions {
            restrict_vertical_movement: true,
            ..LocomotionOptions::default()
        });
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        // Ray tilted down 45 degrees.
        let ray = Ray::new(vec3(0.0, 1.4, 0.0), vec3(0.0, -1.0, -1.0));
        rig.manager.events().publish(&ManagerEvent::Hand(HandEvent::AxisYNotZero {
            handedness: Handedness::Right,
            ray,
            stick_position: Vector2::new(0.0, -1.0),
            delta_time: 0.5,
        }));
        rig.manager.update(0.5, 0.016);

        let origin_world = to_world(&rig, Vector3::zero());
        assert!(origin_world.y.abs() < 1e-5);
        assert!((origin_world.z - (-5.0)).abs() < 1e-4);
    }

    #[test]
    fn test_disabled_hand_is_ignored_everywhere() {
        // Only the right hand is enabled by default.
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Left, vec3(0.0, 1.4, 0.0), vec3(2.0, 0.0, -3.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Left);

        rig.manager.on_select_start(0);
        assert!(rig.locomotion.borrow().aiming_hand().is_none());

        rig.manager.events().publish(&ManagerEvent::Hand(HandEvent::RotateRight {
            handedness: Handedness::Left,
        }));
        assert!(rig.locomotion.borrow().world_yaw().abs() < 1e-6);
    }

    #[test]
    fn test_aim_start_consumes_the_ray_event() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(1.0, 0.0, -2.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        // A listener behind the locomotion controller (lower priority).
        let reached = Rc::new(RefCell::new(0));
        let tail = {
            let reached = Rc::clone(&reached);
            handler(move |_e: &ManagerEvent| {
                *reached.borrow_mut() += 1;
                Propagation::Continue
            })
        };
        rig.manager.events().subscribe(
            ManagerEventKind::Hand(HandEventKind::RayStarted),
            &tail,
            Priority::Lower,
        );

        rig.manager.on_select_start(0);
        // The aim consumed the event before it reached the tail listener.
        assert_eq!(*reached.borrow(), 0);

        // A ray that misses everything is not consumed.
        rig.manager.on_select_end(0);
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(0.0, 5.0, -1.0));
        rig.manager.on_select_start(0);
        assert_eq!(*reached.borrow(), 1);
    }

    #[test]
    fn test_fresh_arrow_applies_facing_on_commit() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(0.0, 0.0, -3.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);
        // The stick deflection arrives through the monitor; give the hand a
        // gamepad with the stick pushed right.
        {
            let mut state = rig.source.state.borrow_mut();
            let snapshot = state.gamepads.entry(Handedness::Right).or_default();
            snapshot.axes = vec![0.0, 0.0, 1.0, 0.0];
        }

        rig.manager.on_select_start(0);
        rig.manager.update(0.016, 0.016);
        assert!(rig.locomotion.borrow().marker().arrow_visible);

        rig.manager.on_select_end(0);
        // Stick right turns the facing by a quarter circle.
        let yaw = normalized_angle(rig.locomotion.borrow().world_yaw());
        assert!((yaw - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_stale_arrow_keeps_current_facing() {
        let rig = rig();
        rig.source.set_head(vec3(0.0, 1.6, 0.0));
        rig.source
            .aim_at(Handedness::Right, vec3(0.0, 1.4, 0.0), vec3(2.0, 0.0, -3.0));
        let mut rig = rig;
        rig.manager.on_controller_connected(0, Handedness::Right);

        // No stick deflection: the arrow is never updated.
        rig.manager.on_select_start(0);
        rig.manager.update(0.016, 0.016);
        rig.manager.on_select_end(0);

        assert!(rig.locomotion.borrow().world_yaw().abs() < 1e-6);
    }
}
