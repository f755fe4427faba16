//! Common imports for working with this crate.
//!
//! ```rust
//! use classpatch::prelude::*;
//! ```

pub use crate::classfile::{
    ClassAccess, ClassBuilder, ConstPool, MethodAccess, PoolEntry, PoolTag,
};
pub use crate::file::{parser::Parser, File};
pub use crate::rewrite::{redirect, RedirectionRequest};
pub use crate::sandbox::{
    CaptureSink, ExecutionLimits, LoadedClass, MethodInfo, Namespace, Sandbox,
};
pub use crate::{ClassFile, Error, Result};
