//! Runtime error types.
//!
//! Caller-recoverable conditions surface as one of these enums. Caller bugs
//! (over-release, retaining a freed value) panic at the
//! [`Application`](crate::Application) layer instead.

use picofuse_alloc::AllocError;
use picofuse_core::{Core, Tag};

use crate::config::ConfigError;
use crate::value::ValueRef;

/// Errors from value construction, lookup and rendering.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// Pool failure: exhaustion or a stale handle.
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// No descriptor is registered under this tag.
    #[error("no type registered for tag {0}")]
    UnregisteredTag(Tag),
    /// A constructor rejected its arguments or failed to acquire a resource.
    #[error("constructing {type_name} failed: {reason}")]
    Construct {
        /// Name of the type whose constructor failed.
        type_name: &'static str,
        /// What went wrong.
        reason: String,
    },
    /// The value exists but is not of the kind the operation needs.
    #[error("{handle} is a {found}, expected {expected}")]
    WrongType {
        /// The offending value.
        handle: ValueRef,
        /// What the operation needed.
        expected: &'static str,
        /// Name of the value's actual type.
        found: &'static str,
    },
    /// `free_value` on a value something still references.
    #[error("{handle} is still referenced ({refs} references)")]
    InUse {
        /// The offending value.
        handle: ValueRef,
        /// Its current reference count.
        refs: u16,
    },
    /// Writing rendered text failed.
    #[error("formatting failed")]
    Format(#[from] std::fmt::Error),
}

impl ValueError {
    /// Shorthand for [`ValueError::Construct`].
    pub fn construct(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self::Construct {
            type_name,
            reason: reason.into(),
        }
    }
}

/// Errors from list operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ListError {
    /// Lookup or type failure on the list or the element.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// The element is already linked into a list.
    #[error("{element} is already linked into {owner}")]
    AlreadyLinked {
        /// The element being pushed.
        element: ValueRef,
        /// The list currently holding it.
        owner: ValueRef,
    },
    /// A list cannot contain itself.
    #[error("{0} cannot be pushed onto itself")]
    SelfLink(ValueRef),
    /// The element is a list that already contains `list`, directly or
    /// through nested lists.
    #[error("{element} encloses {list}; pushing it would form a cycle")]
    Cycle {
        /// The element being pushed.
        element: ValueRef,
        /// The list it was pushed onto.
        list: ValueRef,
    },
}

impl From<AllocError> for ListError {
    fn from(e: AllocError) -> Self {
        Self::Value(e.into())
    }
}

/// Errors from map operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MapError {
    /// A new key would exceed the declared capacity. The table is unchanged.
    #[error("map full: capacity {capacity}")]
    Full {
        /// The declared capacity.
        capacity: usize,
    },
    /// Lookup or type failure on the map value.
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl From<AllocError> for MapError {
    fn from(e: AllocError) -> Self {
        Self::Value(e.into())
    }
}

/// Errors from event posting and dispatch.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EventError {
    /// Building the event value failed.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// Queueing the event failed.
    #[error(transparent)]
    List(#[from] ListError),
    /// The interrupt inbox for this core is at capacity.
    #[error("interrupt inbox for {core} is full")]
    InboxFull {
        /// Target core.
        core: Core,
    },
    /// The application owning the inbox has been destroyed.
    #[error("interrupt inbox for {core} is closed")]
    InboxClosed {
        /// Target core.
        core: Core,
    },
}

impl From<AllocError> for EventError {
    fn from(e: AllocError) -> Self {
        Self::Value(e.into())
    }
}

/// Top-level errors from [`Application`](crate::Application) construction
/// and the run loop.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AppError {
    /// Configuration rejected.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    /// Value failure during setup.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// List failure during setup.
    #[error(transparent)]
    List(#[from] ListError),
    /// Event failure in the run loop.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl From<AllocError> for AppError {
    fn from(e: AllocError) -> Self {
        Self::Value(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_shorthand() {
        let e = ValueError::construct("adc", "channel mask is empty");
        assert_eq!(e.to_string(), "constructing adc failed: channel mask is empty");
    }

    #[test]
    fn alloc_errors_convert_through_layers() {
        let alloc = AllocError::InvalidConfig {
            reason: "x".into(),
        };
        let e: EventError = alloc.clone().into();
        assert_eq!(e, EventError::Value(ValueError::Alloc(alloc)));
    }

    #[test]
    fn inbox_full_names_core() {
        let e = EventError::InboxFull { core: Core::One };
        assert_eq!(e.to_string(), "interrupt inbox for core1 is full");
    }
}
