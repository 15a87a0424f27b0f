//! Descriptors for the built-in tags.

use std::fmt::Write;
use std::sync::Arc;

use picofuse_core::Tag;

use crate::app::Application;
use crate::error::ValueError;
use crate::event::Event;
use crate::list::Container;
use crate::map::FixedMap;
use crate::render;
use crate::types::{Registry, ValueType};
use crate::value::{Body, InitArgs, Scalar, ValueRef};

/// Register every built-in descriptor into an empty registry.
pub(crate) fn register_all(registry: &mut Registry) {
    registry.register(Tag::NULL, Arc::new(NullType));
    registry.register(Tag::DATA, Arc::new(DataType));
    for ty in NumberType::ALL {
        registry.register(ty.tag, Arc::new(ty));
    }
    registry.register(Tag::CSTR, Arc::new(StrType));
    registry.register(Tag::LIST, Arc::new(ListType));
    registry.register(Tag::MAP, Arc::new(MapType));
    registry.register(Tag::EVENT, Arc::new(EventValueType));
}

fn mismatch(name: &'static str, args: &InitArgs<'_>) -> ValueError {
    ValueError::construct(name, format!("unsupported initialiser {args:?}"))
}

// ── null ───────────────────────────────────────────────────────────

/// `Tag::NULL`: no payload, renders `null`.
#[derive(Debug)]
pub struct NullType;

impl ValueType for NullType {
    fn name(&self) -> &'static str {
        "null"
    }

    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        _body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        out.push_str("null");
        Ok(())
    }
}

// ── numbers and bool ───────────────────────────────────────────────

/// Fixed-width scalars: the integer tags, the float tags and `BOOL`.
///
/// Integer tags accept `Unsigned` or `Signed` and truncate to the target
/// width. Float tags accept any numeric initialiser. `BOOL` accepts only
/// `Bool`. Every tag accepts `None` for zero/false.
#[derive(Clone, Copy, Debug)]
pub struct NumberType {
    tag: Tag,
    name: &'static str,
    size: usize,
}

impl NumberType {
    const ALL: [NumberType; 11] = [
        Self::new(Tag::U8, "u8", 1),
        Self::new(Tag::U16, "u16", 2),
        Self::new(Tag::U32, "u32", 4),
        Self::new(Tag::U64, "u64", 8),
        Self::new(Tag::S8, "s8", 1),
        Self::new(Tag::S16, "s16", 2),
        Self::new(Tag::S32, "s32", 4),
        Self::new(Tag::S64, "s64", 8),
        Self::new(Tag::F32, "f32", 4),
        Self::new(Tag::F64, "f64", 8),
        Self::new(Tag::BOOL, "bool", 1),
    ];

    const fn new(tag: Tag, name: &'static str, size: usize) -> Self {
        Self { tag, name, size }
    }

    fn from_bits(&self, bits: u64) -> Option<Scalar> {
        Some(match self.tag {
            Tag::U8 => Scalar::U8(bits as u8),
            Tag::U16 => Scalar::U16(bits as u16),
            Tag::U32 => Scalar::U32(bits as u32),
            Tag::U64 => Scalar::U64(bits),
            Tag::S8 => Scalar::I8(bits as i8),
            Tag::S16 => Scalar::I16(bits as i16),
            Tag::S32 => Scalar::I32(bits as i32),
            Tag::S64 => Scalar::I64(bits as i64),
            _ => return None,
        })
    }

    fn from_float(&self, v: f64) -> Option<Scalar> {
        match self.tag {
            Tag::F32 => Some(Scalar::F32(v as f32)),
            Tag::F64 => Some(Scalar::F64(v)),
            _ => None,
        }
    }

    fn scalar(&self, args: &InitArgs<'_>) -> Option<Scalar> {
        match *args {
            InitArgs::None if self.tag == Tag::BOOL => Some(Scalar::Bool(false)),
            InitArgs::None => self.from_bits(0).or_else(|| self.from_float(0.0)),
            InitArgs::Bool(b) if self.tag == Tag::BOOL => Some(Scalar::Bool(b)),
            InitArgs::Unsigned(v) => self.from_bits(v).or_else(|| self.from_float(v as f64)),
            InitArgs::Signed(v) => self
                .from_bits(v as u64)
                .or_else(|| self.from_float(v as f64)),
            InitArgs::Float(v) => self.from_float(v),
            _ => None,
        }
    }
}

impl ValueType for NumberType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn size(&self) -> usize {
        self.size
    }

    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        self.scalar(&args)
            .map(Body::Scalar)
            .ok_or_else(|| mismatch(self.name, &args))
    }

    fn render(
        &self,
        _app: &Application,
        this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        scalar_body(this, self.name, body, out, false)
    }

    fn render_quoted(
        &self,
        _app: &Application,
        this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        scalar_body(this, self.name, body, out, true)
    }
}

fn scalar_body(
    this: ValueRef,
    name: &'static str,
    body: &Body,
    out: &mut String,
    quoted: bool,
) -> Result<(), ValueError> {
    match body {
        Body::Scalar(s) => render::scalar(out, *s, quoted),
        other => Err(ValueError::WrongType {
            handle: this,
            expected: name,
            found: other.kind(),
        }),
    }
}

// ── data ───────────────────────────────────────────────────────────

/// `Tag::DATA`: variable-size raw bytes.
///
/// Plain rendering is uppercase hex; quoted rendering is base64 in double
/// quotes.
#[derive(Debug)]
pub struct DataType;

impl ValueType for DataType {
    fn name(&self) -> &'static str {
        "data"
    }

    fn instance_size(&self, args: &InitArgs<'_>) -> usize {
        match *args {
            InitArgs::Bytes(bytes) => bytes.len(),
            InitArgs::Zeroed(len) => len,
            _ => 0,
        }
    }

    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        match args {
            InitArgs::None => Ok(Body::Data(Box::default())),
            InitArgs::Bytes(bytes) => Ok(Body::Data(bytes.into())),
            InitArgs::Zeroed(len) => Ok(Body::Data(vec![0; len].into_boxed_slice())),
            other => Err(mismatch(self.name(), &other)),
        }
    }

    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        if let Body::Data(bytes) = body {
            render::hex(out, bytes)?;
        }
        Ok(())
    }

    fn render_quoted(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        if let Body::Data(bytes) = body {
            render::base64_quoted(out, bytes);
        }
        Ok(())
    }
}

// ── cstr ───────────────────────────────────────────────────────────

/// `Tag::CSTR`: owned text.
#[derive(Debug)]
pub struct StrType;

impl ValueType for StrType {
    fn name(&self) -> &'static str {
        "cstr"
    }

    fn instance_size(&self, args: &InitArgs<'_>) -> usize {
        match *args {
            InitArgs::Str(s) => s.len(),
            _ => 0,
        }
    }

    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        match args {
            InitArgs::None => Ok(Body::Str(String::new())),
            InitArgs::Str(s) => Ok(Body::Str(s.to_owned())),
            other => Err(mismatch(self.name(), &other)),
        }
    }

    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        if let Body::Str(s) = body {
            out.push_str(s);
        }
        Ok(())
    }

    fn render_quoted(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        match body {
            Body::Str(s) => render::json_string(out, s),
            _ => Ok(()),
        }
    }
}

// ── list ───────────────────────────────────────────────────────────

/// `Tag::LIST`: releases its elements when destroyed.
#[derive(Debug)]
pub struct ListType;

impl ValueType for ListType {
    fn name(&self) -> &'static str {
        "list"
    }

    fn size(&self) -> usize {
        std::mem::size_of::<Container>()
    }

    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        match args {
            InitArgs::None => Ok(Body::List(Container::default())),
            other => Err(mismatch(self.name(), &other)),
        }
    }

    fn destroy(&self, app: &mut Application, _this: ValueRef, body: Body) {
        let Body::List(container) = body else {
            return;
        };
        let mut cursor = container.head;
        while let Some(element) = cursor {
            cursor = match app.links_mut(element) {
                Ok(links) => std::mem::take(links).next,
                Err(_) => None,
            };
            app.release(element);
        }
    }

    fn render(
        &self,
        app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        let Body::List(container) = body else {
            return Ok(());
        };
        out.push('[');
        let mut cursor = container.head;
        let mut first = true;
        while let Some(element) = cursor {
            if !first {
                out.push(',');
            }
            first = false;
            app.render_into(element, true, out)?;
            cursor = app.links(element)?.next;
        }
        out.push(']');
        Ok(())
    }
}

// ── map ────────────────────────────────────────────────────────────

/// `Tag::MAP`: a fixed-capacity table sized at construction.
///
/// Accepts `Capacity(n)`; `None` builds a zero-capacity map.
#[derive(Debug)]
pub struct MapType;

impl ValueType for MapType {
    fn name(&self) -> &'static str {
        "map"
    }

    fn instance_size(&self, args: &InitArgs<'_>) -> usize {
        match *args {
            InitArgs::Capacity(capacity) => FixedMap::table_bytes(capacity),
            _ => FixedMap::table_bytes(0),
        }
    }

    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        match args {
            InitArgs::None => Ok(Body::Map(FixedMap::new(0)?)),
            InitArgs::Capacity(capacity) => Ok(Body::Map(FixedMap::new(capacity)?)),
            other => Err(mismatch(self.name(), &other)),
        }
    }

    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        let Body::Map(map) = body else {
            return Ok(());
        };
        out.push('{');
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write!(out, "\"{key}\":{value}")?;
        }
        out.push('}');
        Ok(())
    }
}

// ── event ──────────────────────────────────────────────────────────

/// `Tag::EVENT`: holds a reference on its source for its whole life.
#[derive(Debug)]
pub struct EventValueType;

impl ValueType for EventValueType {
    fn name(&self) -> &'static str {
        "event"
    }

    fn size(&self) -> usize {
        std::mem::size_of::<Event>()
    }

    fn construct(
        &self,
        app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        match args {
            InitArgs::Event {
                source,
                event_type,
                payload,
            } => {
                app.pool.retain(source)?;
                Ok(Body::Event(Event {
                    source,
                    event_type,
                    payload,
                }))
            }
            other => Err(mismatch(self.name(), &other)),
        }
    }

    fn destroy(&self, app: &mut Application, _this: ValueRef, body: Body) {
        if let Body::Event(event) = body {
            app.release(event.source);
        }
    }

    fn render(
        &self,
        app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        let Body::Event(event) = body else {
            return Ok(());
        };
        write!(out, "{{\"type\":\"{}\",\"source\":", event.event_type)?;
        if app.contains(event.source) {
            app.render_into(event.source, true, out)?;
        } else {
            out.push_str("null");
        }
        write!(out, ",\"payload\":{}}}", event.payload)?;
        Ok(())
    }
}
