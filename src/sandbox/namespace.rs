//! Per-invocation class namespaces.
//!
//! A namespace is the sandbox's answer to host-level class visibility: every
//! invocation gets a fresh one, defines the patched class into it, and drops
//! it when the invocation ends. Redefining a name in a later invocation is
//! therefore never a conflict - the earlier definition died with its
//! namespace.
//!
//! The namespace also records which single class name is bound to the
//! capture sink; references to that name resolve to the sink's streams, and
//! references to anything else undefined fail with
//! [`crate::Error::ClassNotFound`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::{sandbox::loader::LoadedClass, Result};

/// An isolated set of class definitions for one invocation.
#[derive(Debug, Default)]
pub struct Namespace {
    classes: HashMap<String, Arc<LoadedClass>>,
    sink_class: Option<String>,
}

impl Namespace {
    /// Create an empty namespace with no sink binding.
    #[must_use]
    pub fn new() -> Namespace {
        Namespace::default()
    }

    /// Bind an internal class name to the capture sink.
    ///
    /// Static field accesses and calls against this name resolve to the
    /// sink's capture surface instead of a defined class.
    pub fn bind_sink(&mut self, name: &str) {
        self.sink_class = Some(name.replace('.', "/"));
    }

    /// The name currently bound to the sink, if any.
    #[must_use]
    pub fn sink_class(&self) -> Option<&str> {
        self.sink_class.as_deref()
    }

    /// Whether a name resolves to the capture sink.
    #[must_use]
    pub fn is_sink(&self, name: &str) -> bool {
        self.sink_class.as_deref() == Some(name)
    }

    /// Define a class from its (patched) bytes.
    ///
    /// The bytes are parsed completely; the definition is registered under
    /// the name the class declares for itself. A redefinition within the
    /// same namespace replaces the previous entry.
    ///
    /// # Errors
    /// Any parse error from [`LoadedClass::parse`].
    pub fn define(&mut self, bytes: Vec<u8>) -> Result<Arc<LoadedClass>> {
        let class = Arc::new(LoadedClass::parse(bytes)?);
        self.classes.insert(class.name().to_string(), Arc::clone(&class));
        Ok(class)
    }

    /// Look up a defined class by internal name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<LoadedClass>> {
        self.classes.get(name).cloned()
    }

    /// Number of defined classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class has been defined yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
