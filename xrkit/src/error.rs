use thiserror::Error;

use crate::scene::NodeId;

/// Construction-time configuration failures. These are raised to the caller
/// and never absorbed internally.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("forward speed must be finite and positive, got {0}")]
    InvalidForwardSpeed(f32),
    #[error("rotation increment must be finite and non-zero, got {0}")]
    InvalidRotationIncrement(f32),
}

/// Grab bookkeeping failures reported by a hand controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The hand already holds an object. Detach first; silently dropping the
    /// earlier relation would lose its parent-restore bookkeeping.
    #[error("hand is already holding object {0:?}")]
    AlreadyHolding(NodeId),
    #[error("no holding point has been assigned to this hand")]
    NoHoldingPoint,
}
