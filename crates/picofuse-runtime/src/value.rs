//! Values: the payload of every pool block, plus construction and typed
//! access on [`Application`].
//!
//! A value is a pool block whose payload is a [`Value`]: intrusive
//! container [`Links`] plus a [`Body`]. The tag lives in the block header
//! and never changes after construction.

use std::any::Any;
use std::panic::Location;

use picofuse_alloc::{BlockRef, Provenance};
use picofuse_core::{EventType, Tag};

use crate::app::Application;
use crate::error::ValueError;
use crate::event::Event;
use crate::list::Container;
use crate::map::FixedMap;

/// Handle to a value owned by an [`Application`].
pub type ValueRef = BlockRef;

/// Intrusive links used while a value is an element of a list.
///
/// All three are `None` for an unlinked value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Links {
    /// The list this value is linked into.
    pub owner: Option<ValueRef>,
    /// Next element toward the tail.
    pub next: Option<ValueRef>,
    /// Previous element toward the head.
    pub prev: Option<ValueRef>,
}

impl Links {
    /// Whether the value is currently an element of some list.
    pub fn is_linked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Fixed-width scalar payloads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    /// `Tag::U8`
    U8(u8),
    /// `Tag::U16`
    U16(u16),
    /// `Tag::U32`
    U32(u32),
    /// `Tag::U64`
    U64(u64),
    /// `Tag::S8`
    I8(i8),
    /// `Tag::S16`
    I16(i16),
    /// `Tag::S32`
    I32(i32),
    /// `Tag::S64`
    I64(i64),
    /// `Tag::F32`
    F32(f32),
    /// `Tag::F64`
    F64(f64),
    /// `Tag::BOOL`
    Bool(bool),
}

impl Scalar {
    /// The built-in tag this scalar is stored under.
    pub fn tag(self) -> Tag {
        match self {
            Self::U8(_) => Tag::U8,
            Self::U16(_) => Tag::U16,
            Self::U32(_) => Tag::U32,
            Self::U64(_) => Tag::U64,
            Self::I8(_) => Tag::S8,
            Self::I16(_) => Tag::S16,
            Self::I32(_) => Tag::S32,
            Self::I64(_) => Tag::S64,
            Self::F32(_) => Tag::F32,
            Self::F64(_) => Tag::F64,
            Self::Bool(_) => Tag::BOOL,
        }
    }

    /// Widen an unsigned or non-negative signed integer.
    pub fn to_u64(self) -> Option<u64> {
        match self {
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => Some(v),
            Self::I8(v) => u64::try_from(v).ok(),
            Self::I16(v) => u64::try_from(v).ok(),
            Self::I32(v) => u64::try_from(v).ok(),
            Self::I64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Widen a signed integer, or an unsigned one that fits.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Any numeric scalar as `f64`. Wide integers lose precision.
    pub fn to_f64(self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            Self::Bool(_) => None,
            other => other
                .to_i64()
                .map(|v| v as f64)
                .or_else(|| other.to_u64().map(|v| v as f64)),
        }
    }
}

/// What a value holds.
#[derive(Debug, Default)]
pub enum Body {
    /// No payload.
    #[default]
    Null,
    /// A fixed-width number or boolean.
    Scalar(Scalar),
    /// Raw bytes (`Tag::DATA`).
    Data(Box<[u8]>),
    /// Text (`Tag::CSTR`).
    Str(String),
    /// List bookkeeping (`Tag::LIST`).
    List(Container),
    /// Fixed-capacity map (`Tag::MAP`).
    Map(FixedMap),
    /// Event record (`Tag::EVENT`).
    Event(Event),
    /// Collaborator-defined state.
    Custom(Box<dyn Any + Send>),
}

impl Body {
    /// Short kind name, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar(_) => "scalar",
            Self::Data(_) => "data",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Event(_) => "event",
            Self::Custom(_) => "custom",
        }
    }
}

/// Block payload for every value.
#[derive(Debug, Default)]
pub struct Value {
    /// Container links; unlinked unless the value is a list element.
    pub links: Links,
    /// The payload proper.
    pub body: Body,
}

/// Arguments handed to a [`ValueType`](crate::ValueType) constructor.
///
/// Each built-in type documents which variants it accepts; anything else
/// is a construction failure.
#[derive(Clone, Copy, Debug)]
pub enum InitArgs<'a> {
    /// No arguments; numbers start at zero, containers empty.
    None,
    /// Unsigned integer initialiser (truncated to the target width).
    Unsigned(u64),
    /// Signed integer initialiser (truncated to the target width).
    Signed(i64),
    /// Floating-point initialiser.
    Float(f64),
    /// Boolean initialiser.
    Bool(bool),
    /// Bytes copied into a DATA value; the size is the slice length.
    Bytes(&'a [u8]),
    /// A zero-filled DATA value of this many bytes.
    Zeroed(usize),
    /// Text copied into a CSTR value.
    Str(&'a str),
    /// Declared capacity of a MAP value.
    Capacity(usize),
    /// Fields of an EVENT value.
    Event {
        /// The value that raised the event; retained by the event.
        source: ValueRef,
        /// Classification.
        event_type: EventType,
        /// Opaque payload.
        payload: usize,
    },
    /// Collaborator-specific configuration, downcast by the constructor.
    Any(&'a (dyn Any + Send + Sync)),
}

// ── Construction ───────────────────────────────────────────────────

impl Application {
    /// Allocate a value of a registered type and run its constructor.
    ///
    /// The payload size comes from the descriptor, or from the arguments
    /// for variable-size types. If the constructor fails, the block is
    /// freed before the error is returned, so the live block count is
    /// unchanged.
    #[track_caller]
    pub fn new_value(&mut self, tag: Tag, args: InitArgs<'_>) -> Result<ValueRef, ValueError> {
        let caller = Location::caller();
        self.new_value_at(tag, args, caller)
    }

    fn new_value_at(
        &mut self,
        tag: Tag,
        args: InitArgs<'_>,
        caller: Provenance,
    ) -> Result<ValueRef, ValueError> {
        let ty = self
            .registry
            .get(tag)
            .ok_or(ValueError::UnregisteredTag(tag))?;
        let size = ty.instance_size(&args);
        let handle = self
            .pool
            .allocate(size, tag, Value::default(), Some(caller))?;
        match ty.construct(self, handle, args) {
            Ok(body) => {
                self.pool.get_mut(handle)?.payload_mut().body = body;
                Ok(handle)
            }
            Err(e) => {
                tracing::debug!(type_name = ty.name(), %caller, error = %e, "constructor failed");
                self.pool.free(handle)?;
                Err(e)
            }
        }
    }

    /// Run the value's destructor and free its block immediately.
    ///
    /// Only values nothing references may be freed this way; everything
    /// else is reclaimed by [`drain`](Application::drain).
    pub fn free_value(&mut self, value: ValueRef) -> Result<(), ValueError> {
        let block = self.pool.get(value)?;
        let refs = block.header().ref_count();
        if refs > 0 {
            return Err(ValueError::InUse {
                handle: value,
                refs,
            });
        }
        let tag = block.header().tag();
        let body = std::mem::take(&mut self.pool.get_mut(value)?.payload_mut().body);
        match self.registry.get(tag) {
            Some(ty) => ty.destroy(self, value, body),
            None => drop(body),
        }
        self.pool.free(value)?;
        Ok(())
    }

    /// A `Tag::NULL` value.
    #[track_caller]
    pub fn new_null(&mut self) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::NULL, InitArgs::None)
    }

    /// A `Tag::U8` value.
    #[track_caller]
    pub fn new_u8(&mut self, v: u8) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::U8, InitArgs::Unsigned(v.into()))
    }

    /// A `Tag::U16` value.
    #[track_caller]
    pub fn new_u16(&mut self, v: u16) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::U16, InitArgs::Unsigned(v.into()))
    }

    /// A `Tag::U32` value.
    #[track_caller]
    pub fn new_u32(&mut self, v: u32) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::U32, InitArgs::Unsigned(v.into()))
    }

    /// A `Tag::U64` value.
    #[track_caller]
    pub fn new_u64(&mut self, v: u64) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::U64, InitArgs::Unsigned(v))
    }

    /// A `Tag::S8` value.
    #[track_caller]
    pub fn new_i8(&mut self, v: i8) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::S8, InitArgs::Signed(v.into()))
    }

    /// A `Tag::S16` value.
    #[track_caller]
    pub fn new_i16(&mut self, v: i16) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::S16, InitArgs::Signed(v.into()))
    }

    /// A `Tag::S32` value.
    #[track_caller]
    pub fn new_i32(&mut self, v: i32) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::S32, InitArgs::Signed(v.into()))
    }

    /// A `Tag::S64` value.
    #[track_caller]
    pub fn new_i64(&mut self, v: i64) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::S64, InitArgs::Signed(v))
    }

    /// A `Tag::F32` value.
    #[track_caller]
    pub fn new_f32(&mut self, v: f32) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::F32, InitArgs::Float(v.into()))
    }

    /// A `Tag::F64` value.
    #[track_caller]
    pub fn new_f64(&mut self, v: f64) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::F64, InitArgs::Float(v))
    }

    /// A `Tag::BOOL` value.
    #[track_caller]
    pub fn new_bool(&mut self, v: bool) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::BOOL, InitArgs::Bool(v))
    }

    /// A `Tag::DATA` value holding a copy of `bytes`.
    #[track_caller]
    pub fn new_data(&mut self, bytes: &[u8]) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::DATA, InitArgs::Bytes(bytes))
    }

    /// A `Tag::DATA` value of `len` zero bytes.
    #[track_caller]
    pub fn new_zeroed(&mut self, len: usize) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::DATA, InitArgs::Zeroed(len))
    }

    /// A `Tag::CSTR` value holding a copy of `s`.
    #[track_caller]
    pub fn new_str(&mut self, s: &str) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::CSTR, InitArgs::Str(s))
    }
}

// ── Access ─────────────────────────────────────────────────────────

impl Application {
    /// The value's type tag.
    pub fn tag_of(&self, value: ValueRef) -> Result<Tag, ValueError> {
        Ok(self.pool.tag(value)?)
    }

    /// Name of the value's type, as reported by its descriptor.
    pub fn type_name(&self, value: ValueRef) -> Result<&'static str, ValueError> {
        let tag = self.tag_of(value)?;
        Ok(self.registry.name(tag))
    }

    /// Payload size charged for the value, excluding the header.
    pub fn size_of(&self, value: ValueRef) -> Result<usize, ValueError> {
        Ok(self.pool.size(value)?)
    }

    /// Current reference count.
    pub fn ref_count(&self, value: ValueRef) -> Result<u16, ValueError> {
        Ok(self.pool.ref_count(value)?)
    }

    /// Where the value was allocated, if provenance tracking is enabled.
    pub fn provenance(&self, value: ValueRef) -> Result<Option<Provenance>, ValueError> {
        Ok(self.pool.get(value)?.header().provenance())
    }

    /// Whether `value` names a live value.
    pub fn contains(&self, value: ValueRef) -> bool {
        self.pool.contains(value)
    }

    /// The value's payload.
    pub fn body(&self, value: ValueRef) -> Result<&Body, ValueError> {
        Ok(&self.pool.get(value)?.payload().body)
    }

    /// The value's container links.
    pub fn links(&self, value: ValueRef) -> Result<Links, ValueError> {
        Ok(self.pool.get(value)?.payload().links)
    }

    pub(crate) fn body_mut(&mut self, value: ValueRef) -> Result<&mut Body, ValueError> {
        Ok(&mut self.pool.get_mut(value)?.payload_mut().body)
    }

    pub(crate) fn links_mut(&mut self, value: ValueRef) -> Result<&mut Links, ValueError> {
        Ok(&mut self.pool.get_mut(value)?.payload_mut().links)
    }

    pub(crate) fn wrong_type(&self, value: ValueRef, expected: &'static str) -> ValueError {
        ValueError::WrongType {
            handle: value,
            expected,
            found: self.type_name(value).unwrap_or("?"),
        }
    }

    /// The scalar held by a number or bool value.
    pub fn scalar(&self, value: ValueRef) -> Result<Scalar, ValueError> {
        match self.body(value)? {
            Body::Scalar(s) => Ok(*s),
            _ => Err(self.wrong_type(value, "scalar")),
        }
    }

    /// An integer value widened to `u64`.
    pub fn as_u64(&self, value: ValueRef) -> Result<u64, ValueError> {
        self.scalar(value)?
            .to_u64()
            .ok_or_else(|| self.wrong_type(value, "unsigned integer"))
    }

    /// An integer value widened to `i64`.
    pub fn as_i64(&self, value: ValueRef) -> Result<i64, ValueError> {
        self.scalar(value)?
            .to_i64()
            .ok_or_else(|| self.wrong_type(value, "signed integer"))
    }

    /// A numeric value as `f64`.
    pub fn as_f64(&self, value: ValueRef) -> Result<f64, ValueError> {
        self.scalar(value)?
            .to_f64()
            .ok_or_else(|| self.wrong_type(value, "number"))
    }

    /// A bool value.
    pub fn as_bool(&self, value: ValueRef) -> Result<bool, ValueError> {
        match self.scalar(value)? {
            Scalar::Bool(b) => Ok(b),
            _ => Err(self.wrong_type(value, "bool")),
        }
    }

    /// The bytes of a DATA value.
    pub fn as_bytes(&self, value: ValueRef) -> Result<&[u8], ValueError> {
        match self.body(value)? {
            Body::Data(bytes) => Ok(bytes),
            _ => Err(self.wrong_type(value, "data")),
        }
    }

    /// Mutable bytes of a DATA value. The length is fixed.
    pub fn as_bytes_mut(&mut self, value: ValueRef) -> Result<&mut [u8], ValueError> {
        if !matches!(self.body(value)?, Body::Data(_)) {
            return Err(self.wrong_type(value, "data"));
        }
        match self.body_mut(value)? {
            Body::Data(bytes) => Ok(bytes),
            _ => unreachable!("checked above"),
        }
    }

    /// The text of a CSTR value.
    pub fn as_str(&self, value: ValueRef) -> Result<&str, ValueError> {
        match self.body(value)? {
            Body::Str(s) => Ok(s),
            _ => Err(self.wrong_type(value, "string")),
        }
    }

    /// Collaborator state of type `T`.
    pub fn custom<T: Any>(&self, value: ValueRef) -> Result<&T, ValueError> {
        match self.body(value)? {
            Body::Custom(state) => state
                .downcast_ref::<T>()
                .ok_or_else(|| self.wrong_type(value, std::any::type_name::<T>())),
            _ => Err(self.wrong_type(value, std::any::type_name::<T>())),
        }
    }

    /// Mutable collaborator state of type `T`.
    pub fn custom_mut<T: Any>(&mut self, value: ValueRef) -> Result<&mut T, ValueError> {
        let fits = matches!(self.body(value)?, Body::Custom(state) if state.is::<T>());
        if !fits {
            return Err(self.wrong_type(value, std::any::type_name::<T>()));
        }
        match self.body_mut(value)? {
            Body::Custom(state) => match state.downcast_mut::<T>() {
                Some(state) => Ok(state),
                None => unreachable!("checked above"),
            },
            _ => unreachable!("checked above"),
        }
    }
}
