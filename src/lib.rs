// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # classpatch
//!
//! A library for rewriting symbolic names inside JVM class file constant pools
//! and executing the patched class in a fully isolated, output-capturing
//! sandbox. Built in pure Rust, `classpatch` parses the class file format
//! directly and carries its own minimal bytecode runtime, so no JVM is
//! required on the host.
//!
//! ## Features
//!
//! - **Constant pool parsing** - Typed, 1-indexed pool entries with exact byte
//!   spans, tolerant of tags the rewriter never needs to interpret
//! - **Name redirection** - Exact byte-level substitution of one internal name
//!   for another, including occurrences embedded in descriptor strings, with
//!   length-delta propagation across the rest of the pool
//! - **Isolated loading** - Patched bytes are defined inside a throwaway
//!   namespace, never the process-wide state, so repeated invocations with
//!   colliding class names cannot interfere
//! - **Captured execution** - The designated `main` routine runs against a
//!   substitute output component; everything it would have printed is returned
//!   as a string, including diagnostics for failures it did not handle
//!
//! ## Quick Start
//!
//! ```rust
//! use classpatch::prelude::*;
//!
//! # fn sample_class() -> Vec<u8> {
//! #     let mut b = ClassBuilder::new("demo/Hello");
//! #     let system = b.class("java/lang/System");
//! #     let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
//! #     let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
//! #     let hello = b.string("hello");
//! #     let _ = system;
//! #     let code = vec![
//! #         0xB2, (out >> 8) as u8, out as u8,
//! #         0x12, hello as u8,
//! #         0xB6, (println >> 8) as u8, println as u8,
//! #         0xB1,
//! #     ];
//! #     b.method(
//! #         MethodAccess::PUBLIC | MethodAccess::STATIC,
//! #         "main",
//! #         "([Ljava/lang/String;)V",
//! #         2,
//! #         1,
//! #         &code,
//! #     );
//! #     b.build()
//! # }
//! let class_bytes = sample_class();
//!
//! // Redirect every reference to java/lang/System toward the capture sink,
//! // then run `main` and collect its output.
//! let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
//! let output = Sandbox::new().execute(&class_bytes, &request);
//! assert_eq!(output, "hello\n");
//! ```
//!
//! ## Architecture
//!
//! `classpatch` is organized into four layers, composed leaves-first per
//! invocation:
//!
//! - [`classfile`] - Class file header and constant pool parsing, plus a
//!   builder for crafting minimal classes in tests and tooling
//! - [`rewrite`] - The name rewriter operating on a parsed [`ClassFile`]
//! - [`sandbox`] - Throwaway namespace, structural class loading, the capture
//!   sink and the execution orchestrator
//! - [`Error`] and [`Result`] - Crate-wide error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). The
//! orchestrator itself is an exception by design: [`sandbox::Sandbox::execute`]
//! always returns a string, because failures originating inside the sandboxed
//! code are rendered into the captured output rather than propagated.
//!
//! ```rust,no_run
//! use classpatch::{classfile::ClassFile, Error};
//!
//! match ClassFile::parse(std::fs::read("Hello.class")?) {
//!     Ok(class) => println!("{} pool entries", class.pool().entry_count()),
//!     Err(Error::BadMagic(magic)) => println!("not a class file: 0x{magic:08X}"),
//!     Err(Error::Truncated) => println!("truncated input"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared factories for crafting class files in unit tests.
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use classpatch::prelude::*;
///
/// let bytes = std::fs::read("Hello.class")?;
/// let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
/// let output = Sandbox::new().execute(&bytes, &request);
/// println!("{output}");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod prelude;

/// Class file structure: header, constant pool, modified-UTF-8 and a builder.
///
/// The [`classfile::ClassFile`] type is the entry point for parsing. It reads
/// the fixed header and the complete constant pool while leaving the tail of
/// the file (members, attributes) as opaque bytes - structural rewriting never
/// needs to interpret them.
pub mod classfile;

/// Constant pool name redirection.
///
/// Replaces one `/`-separated internal name with another across every UTF-8
/// pool entry, shifting subsequent entries by the encoded length delta. See
/// [`rewrite::redirect`].
pub mod rewrite;

/// Isolated loading and captured execution of patched classes.
///
/// A [`sandbox::Namespace`] is created per invocation and discarded
/// afterwards; the [`sandbox::Sandbox`] orchestrator drives the whole
/// parse → redirect → define → invoke pipeline and returns the captured
/// output text.
pub mod sandbox;

/// `classpatch` Result type.
///
/// A type alias for [`std::result::Result<T, Error>`] used consistently
/// throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `classpatch` Error type.
///
/// The main error type for all operations in this crate. See [`error::Error`]
/// for the full taxonomy covering parsing, rewriting, loading and execution.
pub use error::Error;

/// Main entry point for parsing class files.
///
/// See [`classfile::ClassFile`] for header and constant pool access.
pub use classfile::ClassFile;

/// Provides access to low-level file and memory parsing utilities.
pub use file::{parser::Parser, File};
