//! Access to the host data model.
//!
//! The host exposes its values through [`DataModel`]: a path is resolved once into
//! a handle, and the handle is used for every later get/set. Each session owns a
//! [`BindingCache`] so paths are resolved lazily, on first use, and never again.

use crate::schema::{Chunk, ChunkSource};
use crate::value::Value;
use std::collections::HashMap;

/// Typed get/set access to named values owned by the host.
pub trait DataModel {
    type Handle: Clone;

    /// Resolve a path to a handle, creating the value if the model allows it.
    fn resolve(&mut self, path: &str) -> Option<Self::Handle>;

    fn get(&self, handle: &Self::Handle) -> Value;

    fn set(&mut self, handle: &Self::Handle, value: Value);
}

/// Path → handle map owned by one session.
#[derive(Debug)]
pub struct BindingCache<H> {
    handles: HashMap<String, H>,
}

impl<H> Default for BindingCache<H> {
    fn default() -> Self {
        BindingCache {
            handles: HashMap::new(),
        }
    }
}

impl<H: Clone> BindingCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cached handle for `path`, resolving it through `model` on first use.
    /// Failed resolutions are not cached.
    pub fn handle<M>(&mut self, model: &mut M, path: &str) -> Option<H>
    where
        M: DataModel<Handle = H>,
    {
        if let Some(h) = self.handles.get(path) {
            return Some(h.clone());
        }
        let h = model.resolve(path)?;
        tracing::debug!(path, "resolved binding");
        self.handles.insert(path.to_string(), h.clone());
        Some(h)
    }
}

/// One cycle's view of the model, as used by the codecs: one read or write per chunk.
pub struct Bindings<'a, M: DataModel> {
    model: &'a mut M,
    cache: &'a mut BindingCache<M::Handle>,
}

impl<'a, M: DataModel> Bindings<'a, M> {
    pub fn new(model: &'a mut M, cache: &'a mut BindingCache<M::Handle>) -> Self {
        Bindings { model, cache }
    }

    /// Current value of the chunk's binding, or its constant.
    pub fn read(&mut self, chunk: &Chunk) -> Value {
        match &chunk.source {
            ChunkSource::Const(literal) => Value::String(literal.clone()),
            ChunkSource::Node(path) => match self.cache.handle(self.model, path) {
                Some(h) => self.model.get(&h),
                None => {
                    tracing::warn!(path = path.as_str(), "unresolvable binding, reading as unset");
                    Value::None
                }
            },
        }
    }

    /// Store a decoded value. Returns false for constants and unresolvable paths.
    pub fn write(&mut self, chunk: &Chunk, value: Value) -> bool {
        match &chunk.source {
            ChunkSource::Const(_) => false,
            ChunkSource::Node(path) => match self.cache.handle(self.model, path) {
                Some(h) => {
                    self.model.set(&h, value);
                    true
                }
                None => {
                    tracing::warn!(path = path.as_str(), "unresolvable binding, dropping update");
                    false
                }
            },
        }
    }
}

/// In-memory data model: a flat, insertion-ordered map of paths to values.
#[derive(Debug, Default, Clone)]
pub struct MemoryModel {
    slots: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value by path, creating it if needed.
    pub fn set_value(&mut self, path: &str, value: impl Into<Value>) {
        let h = self.slot(path);
        self.slots[h].1 = value.into();
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.index.get(path).map(|&i| &self.slots[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(p, v)| (p.as_str(), v))
    }

    fn slot(&mut self, path: &str) -> usize {
        if let Some(&i) = self.index.get(path) {
            return i;
        }
        self.slots.push((path.to_string(), Value::None));
        let i = self.slots.len() - 1;
        self.index.insert(path.to_string(), i);
        i
    }
}

impl DataModel for MemoryModel {
    type Handle = usize;

    fn resolve(&mut self, path: &str) -> Option<usize> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        Some(self.slot(path))
    }

    fn get(&self, handle: &usize) -> Value {
        self.slots
            .get(*handle)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    /// Typed slots keep their type: the incoming value is converted to it.
    fn set(&mut self, handle: &usize, value: Value) {
        if let Some((_, slot)) = self.slots.get_mut(*handle) {
            *slot = value.coerce_like(slot);
        }
    }
}
