// Room-scale locomotion: teleportation with a target marker and facing
// arrow, snap rotation pivoting around the user, and stick-driven
// continuous movement. The world's placement relative to the tracking
// origin is a single yaw-plus-offset rigid transform owned here.

pub mod controller;
pub mod marker;
pub mod nav_query;

pub use controller::{LocomotionController, LocomotionOptions};
pub use marker::{TeleportMarker, ARROW_UPDATE_WINDOW, MARKER_RING_RADIUS, MARKER_RING_TUBE};
pub use nav_query::{HorizontalPlane, NavigableSurfaceQuery, SurfaceHit};
