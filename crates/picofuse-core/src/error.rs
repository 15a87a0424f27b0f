//! Errors raised when converting raw numbers into identifiers.

/// A raw number did not name a valid identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Only cores 0 and 1 exist.
    #[error("invalid core number {0}")]
    InvalidCore(u8),
    /// The number is outside the event type table.
    #[error("invalid event type {0}")]
    InvalidEventType(u8),
}
