//! Type descriptors and the tag registry.
//!
//! Every value's behaviour (payload size, construction, teardown and text
//! rendering) comes from the [`ValueType`] registered under its tag.
//! Built-in types are registered when the application starts; collaborator
//! drivers register their own lazily, on first construction.

use std::sync::Arc;

use indexmap::IndexMap;
use picofuse_core::Tag;

use crate::app::Application;
use crate::error::ValueError;
use crate::value::{Body, InitArgs, ValueRef};

/// Per-type operation table.
///
/// Only [`name`](ValueType::name) is required. The defaults describe a
/// zero-size type with no constructor or destructor that renders as
/// `<name>`.
pub trait ValueType: Send + Sync {
    /// Human-readable type name, used in diagnostics and leak reports.
    fn name(&self) -> &'static str;

    /// Fixed payload size in bytes. Zero for variable-size types.
    fn size(&self) -> usize {
        0
    }

    /// Payload size for one instance built from `args`.
    ///
    /// Variable-size types override this to read the size from the
    /// arguments.
    fn instance_size(&self, _args: &InitArgs<'_>) -> usize {
        self.size()
    }

    /// Build the payload for a freshly allocated block.
    ///
    /// `this` is already live (count zero) so the constructor may record
    /// it in children it creates. On `Err` the runtime frees `this`; the
    /// constructor must release or free anything it acquired first.
    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        _args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        Ok(Body::Null)
    }

    /// Release whatever the payload holds. Runs just before the block is
    /// freed; `this` is still live but its body has been moved out.
    fn destroy(&self, _app: &mut Application, _this: ValueRef, _body: Body) {}

    /// Plain text rendering.
    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        _body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        out.push('<');
        out.push_str(self.name());
        out.push('>');
        Ok(())
    }

    /// JSON-safe rendering. Defaults to the plain form.
    fn render_quoted(
        &self,
        app: &Application,
        this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        self.render(app, this, body, out)
    }
}

/// Tag → descriptor table, in registration order.
#[derive(Clone, Default)]
pub struct Registry {
    types: IndexMap<Tag, Arc<dyn ValueType>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` under `tag`.
    ///
    /// Returns `false` and leaves the existing entry in place if the tag
    /// is already taken.
    pub fn register(&mut self, tag: Tag, ty: Arc<dyn ValueType>) -> bool {
        if self.types.contains_key(&tag) {
            return false;
        }
        self.types.insert(tag, ty);
        true
    }

    /// The descriptor for `tag`.
    pub fn get(&self, tag: Tag) -> Option<Arc<dyn ValueType>> {
        self.types.get(&tag).cloned()
    }

    /// Whether `tag` is registered.
    pub fn contains(&self, tag: Tag) -> bool {
        self.types.contains_key(&tag)
    }

    /// The registered name for `tag`, or `"?"`.
    pub fn name(&self, tag: Tag) -> &'static str {
        self.types.get(&tag).map_or("?", |ty| ty.name())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// `(tag, name)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &'static str)> + '_ {
        self.types.iter().map(|(tag, ty)| (*tag, ty.name()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Application {
    /// Register a descriptor. Returns `false` (no-op) if `tag` is taken.
    pub fn register_type(&mut self, tag: Tag, ty: Arc<dyn ValueType>) -> bool {
        let added = self.registry.register(tag, ty);
        if added {
            tracing::debug!(%tag, name = self.registry.name(tag), "type registered");
        }
        added
    }

    /// Whether `tag` has a descriptor.
    pub fn is_registered(&self, tag: Tag) -> bool {
        self.registry.contains(tag)
    }

    /// The descriptor registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
