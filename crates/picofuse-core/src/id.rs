//! Strongly-typed identifiers: [`Tag`], [`Core`], [`EventType`] and exit codes.

use std::fmt;

use crate::error::IdError;

/// Exit code reported when the application finished successfully.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code reserved for "memory leaks at shutdown".
///
/// Only produced when leak checking is enabled. Any other non-zero exit
/// code is a user-supplied failure code.
pub const EXIT_MEMORY_LEAKS: i32 = -1;

/// Identifies the concrete type of a value.
///
/// A tag indexes the application's descriptor registry. Tags below
/// [`Tag::FIRST_COLLABORATOR`] are built into the runtime; the range up to
/// [`Tag::FIRST_USER`] is reserved for hardware collaborators; everything
/// above is free for application types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u16);

impl Tag {
    /// The null value.
    pub const NULL: Tag = Tag(0);
    /// Variable-size raw byte buffer.
    pub const DATA: Tag = Tag(1);
    /// Unsigned 8-bit integer.
    pub const U8: Tag = Tag(2);
    /// Unsigned 16-bit integer.
    pub const U16: Tag = Tag(3);
    /// Unsigned 32-bit integer.
    pub const U32: Tag = Tag(4);
    /// Unsigned 64-bit integer.
    pub const U64: Tag = Tag(5);
    /// Signed 8-bit integer.
    pub const S8: Tag = Tag(6);
    /// Signed 16-bit integer.
    pub const S16: Tag = Tag(7);
    /// Signed 32-bit integer.
    pub const S32: Tag = Tag(8);
    /// Signed 64-bit integer.
    pub const S64: Tag = Tag(9);
    /// 32-bit float.
    pub const F32: Tag = Tag(10);
    /// 64-bit float.
    pub const F64: Tag = Tag(11);
    /// Boolean.
    pub const BOOL: Tag = Tag(12);
    /// Owned UTF-8 string.
    pub const CSTR: Tag = Tag(13);
    /// Doubly linked list container.
    pub const LIST: Tag = Tag(14);
    /// Fixed-capacity key/value table.
    pub const MAP: Tag = Tag(15);
    /// Queued event.
    pub const EVENT: Tag = Tag(16);

    /// First tag reserved for hardware collaborators.
    pub const FIRST_COLLABORATOR: Tag = Tag(32);
    /// GPIO pin.
    pub const GPIO: Tag = Tag(32);
    /// SPI interface.
    pub const SPI: Tag = Tag(33);
    /// ADC sampler.
    pub const ADC: Tag = Tag(34);
    /// Hardware timer.
    pub const TIMER: Tag = Tag(35);
    /// Mutex wrapper.
    pub const MUTEX: Tag = Tag(36);
    /// Display controller.
    pub const DISPLAY: Tag = Tag(37);

    /// First tag available to application-defined types.
    pub const FIRST_USER: Tag = Tag(64);

    /// Whether this tag is one of the runtime's built-in types.
    pub fn is_builtin(self) -> bool {
        self < Self::FIRST_COLLABORATOR
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Tag {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// One of the two physical execution contexts.
///
/// Each core owns an independent event queue and callback table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Core {
    /// Core 0, which runs the application entry point.
    Zero,
    /// Core 1.
    One,
}

impl Core {
    /// Number of physical cores.
    pub const COUNT: usize = 2;

    /// Both cores in index order.
    pub const ALL: [Core; Core::COUNT] = [Core::Zero, Core::One];

    /// Zero-based index, suitable for per-core arrays.
    pub fn index(self) -> usize {
        match self {
            Core::Zero => 0,
            Core::One => 1,
        }
    }
}

impl fmt::Display for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.index())
    }
}

impl TryFrom<u8> for Core {
    type Error = IdError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Core::Zero),
            1 => Ok(Core::One),
            other => Err(IdError::InvalidCore(other)),
        }
    }
}

/// Classification of an event, used to select a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EventType {
    /// Placeholder for events without a classification.
    Null = 0,
    /// GPIO edge or level change.
    Gpio = 1,
    /// Timer expiry.
    Timer = 2,
    /// ADC conversion complete.
    Adc = 3,
    /// SPI transfer complete.
    Spi = 4,
    /// Display refresh complete.
    Display = 5,
    /// Application-defined event.
    User = 6,
}

impl EventType {
    /// Number of event types; the size of each per-core callback table.
    pub const COUNT: usize = 7;

    /// All event types in index order.
    pub const ALL: [EventType; EventType::COUNT] = [
        EventType::Null,
        EventType::Gpio,
        EventType::Timer,
        EventType::Adc,
        EventType::Spi,
        EventType::Display,
        EventType::User,
    ];

    /// Zero-based index into a callback table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case name used when rendering events.
    pub fn name(self) -> &'static str {
        match self {
            EventType::Null => "null",
            EventType::Gpio => "gpio",
            EventType::Timer => "timer",
            EventType::Adc => "adc",
            EventType::Spi => "spi",
            EventType::Display => "display",
            EventType::User => "user",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for EventType {
    type Error = IdError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(v as usize)
            .copied()
            .ok_or(IdError::InvalidEventType(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tags_are_below_collaborator_range() {
        assert!(Tag::EVENT.is_builtin());
        assert!(Tag::NULL.is_builtin());
        assert!(!Tag::GPIO.is_builtin());
        assert!(!Tag::FIRST_USER.is_builtin());
    }

    #[test]
    fn core_index_round_trips() {
        for core in Core::ALL {
            assert_eq!(Core::try_from(core.index() as u8), Ok(core));
        }
        assert_eq!(Core::try_from(2), Err(IdError::InvalidCore(2)));
    }

    #[test]
    fn event_type_indices_are_dense() {
        for (i, ty) in EventType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
        assert_eq!(
            EventType::try_from(EventType::COUNT as u8),
            Err(IdError::InvalidEventType(EventType::COUNT as u8))
        );
    }

    #[test]
    fn display_formats() {
        assert_eq!(Tag(42).to_string(), "42");
        assert_eq!(Core::One.to_string(), "core1");
        assert_eq!(EventType::Gpio.to_string(), "gpio");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn event_type_try_from_accepts_exactly_the_dense_range(v in any::<u8>()) {
                let parsed = EventType::try_from(v);
                prop_assert_eq!(parsed.is_ok(), (v as usize) < EventType::COUNT);
                if let Ok(ty) = parsed {
                    prop_assert_eq!(ty as u8, v);
                }
            }
        }
    }
}
