pub mod events;
pub mod logging;

pub use events::{handler, Event, EventDispatcher, Handler, Priority, Propagation};
