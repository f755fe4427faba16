//! Isolated loading and execution of patched modules.
//!
//! The sandbox half of the crate picks up where the rewriter leaves off: the
//! patched bytes are defined into a throwaway [`Namespace`], the redirected
//! class name is bound to a [`CaptureSink`], and the entry routine runs on a
//! bounded interpreter. [`Sandbox`] is the one-call orchestrator over the
//! whole pipeline.
//!
//! Isolation here means three guarantees: definitions never outlive their
//! invocation, all output lands in the invocation's own sink, and
//! termination requests are recorded instead of honored.

pub(crate) mod capture;
pub(crate) mod executor;
pub(crate) mod interp;
pub(crate) mod loader;
pub(crate) mod namespace;

pub use capture::CaptureSink;
pub use executor::Sandbox;
pub use interp::ExecutionLimits;
pub use loader::{CodeAttribute, LoadedClass, MethodInfo};
pub use namespace::Namespace;
