//! Constant pool name redirection.
//!
//! The rewriter substitutes one `/`-separated internal name for another in
//! every `Utf8` pool entry that mentions it - both whole-entry matches (a
//! class name constant) and occurrences embedded in longer descriptor or
//! signature strings (`"Ljava/lang/System;"`). Because the encoded
//! replacement generally differs in length from the target, each substitution
//! rewrites the entry's 2-byte length prefix, splices the new payload over
//! the old span, and shifts everything behind it - later pool entries and
//! the entire opaque tail - by the length delta.
//!
//! Entries are identified by pool index throughout, so the index-based
//! references other entries hold (`Class.name_index`, member references)
//! remain valid untouched; only byte offsets move.
//!
//! A target that appears nowhere is deliberately not an error: a module that
//! never references the symbol simply has nothing to redirect, and the
//! caller sees a substitution count of zero. Callers that consider that
//! fatal can turn the count into [`crate::Error::TargetNotFound`] themselves.
//!
//! # Usage Examples
//!
//! ```rust
//! use classpatch::{
//!     classfile::ClassBuilder,
//!     rewrite::{redirect, RedirectionRequest},
//!     ClassFile,
//! };
//!
//! let mut b = ClassBuilder::new("demo/Hello");
//! b.class("java/lang/System");
//! let mut class = ClassFile::parse(b.build())?;
//!
//! let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
//! let replaced = redirect(&mut class, &request)?;
//! assert_eq!(replaced, 1);
//! # Ok::<(), classpatch::Error>(())
//! ```

use crate::{
    classfile::{mutf8, PoolEntry},
    file::io::write_be_at,
    ClassFile, Result,
};

/// An immutable redirection: replace `target` with `replacement`.
///
/// Both names use the module format's internal separator convention
/// (`/`-separated, e.g. `java/lang/System`); dotted names are normalized on
/// construction so either spelling works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionRequest {
    target: String,
    replacement: String,
}

impl RedirectionRequest {
    /// Create a request from target and replacement names.
    #[must_use]
    pub fn new(target: &str, replacement: &str) -> RedirectionRequest {
        RedirectionRequest {
            target: target.replace('.', "/"),
            replacement: replacement.replace('.', "/"),
        }
    }

    /// The name being redirected away from.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The name references are redirected toward.
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Rewrite every `Utf8` entry mentioning the target name.
///
/// Scans entries in index order; for each `Utf8` entry containing the target
/// (as the whole text or as a substring), replaces all occurrences, re-encodes
/// the payload and propagates the length delta to every later span and the
/// tail. Returns the number of entries rewritten - zero when the target is
/// absent, which is a valid no-op.
///
/// # Arguments
/// * `class` - The parsed class file to patch in place
/// * `request` - The target/replacement name pair
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a rewritten payload would exceed
/// the format's 2-byte length field.
pub fn redirect(class: &mut ClassFile, request: &RedirectionRequest) -> Result<usize> {
    if request.target().is_empty() || request.target() == request.replacement() {
        return Ok(0);
    }

    let (data, pool) = class.parts_mut();
    let indices: Vec<u16> = pool
        .iter()
        .filter_map(|(index, entry)| match entry {
            PoolEntry::Utf8 { text, .. } if text.contains(request.target()) => Some(index),
            _ => None,
        })
        .collect();

    for index in &indices {
        let (span, new_text) = {
            let Some(PoolEntry::Utf8 { span, text }) = pool.get(*index) else {
                continue;
            };
            (*span, text.replace(request.target(), request.replacement()))
        };

        let payload = mutf8::encode(&new_text);
        if payload.len() > usize::from(u16::MAX) {
            return Err(malformed_error!(
                "Rewritten text at pool index {} exceeds the 65535-byte entry limit",
                index
            ));
        }

        let old_len = span.len;
        let new_len = 3 + payload.len();
        let delta = new_len as isize - old_len as isize;

        // Length prefix sits right behind the tag byte
        let mut prefix = span.offset + 1;
        write_be_at(data, &mut prefix, payload.len() as u16)?;
        data.splice(span.offset + 3..span.offset + old_len, payload);

        if let Some(PoolEntry::Utf8 { span, text }) = pool.get_mut(*index) {
            span.len = new_len;
            *text = new_text;
        }
        if delta != 0 {
            // Shift everything that sat at or past the entry's old end
            pool.shift_spans(span.end(), delta);
        }
    }

    Ok(indices.len())
}
