//! Controller input pipeline and locomotion control for room-scale XR.
//!
//! The crate turns raw per-frame gamepad state from two hand-held
//! controllers into semantic gesture events, and uses those events to move
//! the user through a virtual world whose coordinate frame is decoupled from
//! the hardware-tracked reference frame.
//!
//! Data flows leaves-first through one synchronous update per frame:
//!
//! ```text
//! hardware -> GamepadMonitor (per hand)  debounce, clicks, holds
//!          -> HandController  (per hand) rays, lifecycle, per-hand bus
//!          -> ControllersManager         fan-in, double-squeeze gesture
//!          -> LocomotionController       teleport / rotate / fly,
//!                                        reference transform commit
//! ```
//!
//! Within one frame, a hand's button and axis events always precede that
//! hand's `RayUpdated`/`AxisYNotZero`, and both hands are fully processed
//! before the manager's `Update` event fires.
//!
//! The host supplies the hardware seams: an [`input::InputSource`] for
//! per-frame device state, a [`space::ReferenceSpace`] sink for the rigid
//! transform, and a [`locomotion::NavigableSurfaceQuery`] for teleport
//! raycasts. A typical frame loop:
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use xrkit::config::{Handedness, ManagerOptions};
//! use xrkit::input::{ControllersManager, GamepadSnapshot, InputSource};
//! use xrkit::locomotion::{HorizontalPlane, LocomotionController, LocomotionOptions};
//! use xrkit::space::{OffsetReferenceSpace, Pose, ReferenceSpace};
//!
//! struct Runtime;
//!
//! impl InputSource for Runtime {
//!     fn gamepad(&self, _hand: Handedness) -> Option<GamepadSnapshot> {
//!         None // wire to the platform's input API
//!     }
//!     fn controller_pose(&self, _hand: Handedness) -> Option<Pose> {
//!         None
//!     }
//!     fn grip_pose(&self, _hand: Handedness) -> Option<Pose> {
//!         None
//!     }
//!     fn head_pose(&self) -> Option<Pose> {
//!         None
//!     }
//! }
//!
//! let source: Rc<dyn InputSource> = Rc::new(Runtime);
//! let reference: Rc<RefCell<dyn ReferenceSpace>> =
//!     Rc::new(RefCell::new(OffsetReferenceSpace::new()));
//!
//! let mut manager = ControllersManager::new(
//!     Rc::clone(&source),
//!     Rc::clone(&reference),
//!     ManagerOptions::default(),
//! );
//! let locomotion = LocomotionController::new(
//!     &manager,
//!     Rc::clone(&source),
//!     Rc::clone(&reference),
//!     LocomotionOptions::default(),
//! )
//! .expect("valid locomotion options");
//! locomotion
//!     .borrow_mut()
//!     .set_surfaces(Rc::new(HorizontalPlane { height: 0.0 }));
//! locomotion.borrow_mut().on_session_start();
//!
//! // Host frame loop: lifecycle edges between frames, one update per frame.
//! manager.on_controller_connected(0, Handedness::Right);
//! let (time, delta) = (0.016_f32, 0.016_f32);
//! manager.update(time, delta);
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod locomotion;
pub mod scene;
pub mod space;

pub use config::{ButtonName, EnabledHands, HandSet, Handedness, ManagerOptions};
pub use error::{AttachError, ConfigError};
pub use input::{ControllersManager, HandController, InputSource};
pub use locomotion::{LocomotionController, LocomotionOptions, NavigableSurfaceQuery};
pub use scene::{NodeId, SceneGraph};
pub use space::{Pose, Ray, ReferenceSpace, RigidTransform};
