//! Constant pool parsing and typed entry access.
//!
//! The constant pool is an ordered, 1-indexed table of tagged, variable-length
//! entries sitting directly behind the class file header. Entries whose
//! structure the rewriter must understand - text, class references and member
//! references - are decoded into typed variants; every other standard tag is
//! preserved as an opaque span, since structural rewriting never needs to
//! interpret it. Tags outside the standard set are rejected: an entry's
//! length depends on its tag, so an unknown tag would corrupt the offset
//! arithmetic of everything behind it.
//!
//! Each entry records its absolute byte span within the owning buffer. Spans
//! in table order are contiguous and non-overlapping; the stable identity of
//! an entry is its pool index, never a cached offset - the rewriter moves
//! spans, indices stay put.

use strum::Display;

use crate::{classfile::mutf8, file::parser::Parser, Result};

/// Tag byte of a `Utf8` entry.
pub const TAG_UTF8: u8 = 1;
/// Tag byte of an `Integer` entry.
pub const TAG_INTEGER: u8 = 3;
/// Tag byte of a `Float` entry.
pub const TAG_FLOAT: u8 = 4;
/// Tag byte of a `Long` entry (occupies two pool slots).
pub const TAG_LONG: u8 = 5;
/// Tag byte of a `Double` entry (occupies two pool slots).
pub const TAG_DOUBLE: u8 = 6;
/// Tag byte of a `Class` entry.
pub const TAG_CLASS: u8 = 7;
/// Tag byte of a `String` entry.
pub const TAG_STRING: u8 = 8;
/// Tag byte of a `Fieldref` entry.
pub const TAG_FIELDREF: u8 = 9;
/// Tag byte of a `Methodref` entry.
pub const TAG_METHODREF: u8 = 10;
/// Tag byte of an `InterfaceMethodref` entry.
pub const TAG_INTERFACE_METHODREF: u8 = 11;
/// Tag byte of a `NameAndType` entry.
pub const TAG_NAME_AND_TYPE: u8 = 12;
/// Tag byte of a `MethodHandle` entry.
pub const TAG_METHOD_HANDLE: u8 = 15;
/// Tag byte of a `MethodType` entry.
pub const TAG_METHOD_TYPE: u8 = 16;
/// Tag byte of a `Dynamic` entry.
pub const TAG_DYNAMIC: u8 = 17;
/// Tag byte of an `InvokeDynamic` entry.
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
/// Tag byte of a `Module` entry.
pub const TAG_MODULE: u8 = 19;
/// Tag byte of a `Package` entry.
pub const TAG_PACKAGE: u8 = 20;

/// The kind of a constant pool entry, derived from its tag byte.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PoolTag {
    /// Length-prefixed modified-UTF-8 text
    Utf8,
    /// 4-byte integer constant
    Integer,
    /// 4-byte float constant
    Float,
    /// 8-byte long constant, occupies two slots
    Long,
    /// 8-byte double constant, occupies two slots
    Double,
    /// Reference to a class name `Utf8` entry
    Class,
    /// Reference to a string literal `Utf8` entry
    String,
    /// Field reference (class index + name-and-type index)
    Fieldref,
    /// Method reference (class index + name-and-type index)
    Methodref,
    /// Interface method reference (class index + name-and-type index)
    InterfaceMethodref,
    /// Name and descriptor pair
    NameAndType,
    /// Method handle (kind byte + reference index)
    MethodHandle,
    /// Method type (descriptor index)
    MethodType,
    /// Dynamically computed constant
    Dynamic,
    /// Dynamically computed call site
    InvokeDynamic,
    /// Module name reference
    Module,
    /// Package name reference
    Package,
}

impl PoolTag {
    /// Map a tag byte to its kind, or `None` for tags outside the standard set.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<PoolTag> {
        match tag {
            TAG_UTF8 => Some(PoolTag::Utf8),
            TAG_INTEGER => Some(PoolTag::Integer),
            TAG_FLOAT => Some(PoolTag::Float),
            TAG_LONG => Some(PoolTag::Long),
            TAG_DOUBLE => Some(PoolTag::Double),
            TAG_CLASS => Some(PoolTag::Class),
            TAG_STRING => Some(PoolTag::String),
            TAG_FIELDREF => Some(PoolTag::Fieldref),
            TAG_METHODREF => Some(PoolTag::Methodref),
            TAG_INTERFACE_METHODREF => Some(PoolTag::InterfaceMethodref),
            TAG_NAME_AND_TYPE => Some(PoolTag::NameAndType),
            TAG_METHOD_HANDLE => Some(PoolTag::MethodHandle),
            TAG_METHOD_TYPE => Some(PoolTag::MethodType),
            TAG_DYNAMIC => Some(PoolTag::Dynamic),
            TAG_INVOKE_DYNAMIC => Some(PoolTag::InvokeDynamic),
            TAG_MODULE => Some(PoolTag::Module),
            TAG_PACKAGE => Some(PoolTag::Package),
            _ => None,
        }
    }

    /// Total entry size in bytes including the tag byte, or `None` for
    /// variable-length entries (`Utf8`).
    #[must_use]
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            PoolTag::Utf8 => None,
            PoolTag::Integer | PoolTag::Float => Some(5),
            PoolTag::Long | PoolTag::Double => Some(9),
            PoolTag::Class
            | PoolTag::String
            | PoolTag::MethodType
            | PoolTag::Module
            | PoolTag::Package => Some(3),
            PoolTag::MethodHandle => Some(4),
            PoolTag::Fieldref
            | PoolTag::Methodref
            | PoolTag::InterfaceMethodref
            | PoolTag::NameAndType
            | PoolTag::Dynamic
            | PoolTag::InvokeDynamic => Some(5),
        }
    }

    /// Whether the entry occupies two pool slots (`Long` and `Double`).
    #[must_use]
    pub fn is_wide(self) -> bool {
        matches!(self, PoolTag::Long | PoolTag::Double)
    }
}

/// Absolute byte span of a pool entry within its owning buffer.
///
/// Covers the tag byte through the last payload byte. Spans move when an
/// earlier entry is rewritten; the pool keeps them up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset of the entry's tag byte
    pub offset: usize,
    /// Total length including the tag byte
    pub len: usize,
}

impl Span {
    /// Offset of the first byte past the entry.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// One parsed constant pool entry.
///
/// Only the kinds the rewriter and the sandbox resolver must understand are
/// decoded; the rest are carried as [`PoolEntry::Other`] spans and written
/// back untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    /// Modified-UTF-8 text, decoded eagerly
    Utf8 {
        /// Byte span of the whole entry (tag + length prefix + payload)
        span: Span,
        /// The decoded text
        text: String,
    },
    /// Class reference
    Class {
        /// Byte span of the entry
        span: Span,
        /// Pool index of the class name `Utf8` entry
        name_index: u16,
    },
    /// Name and descriptor pair
    NameAndType {
        /// Byte span of the entry
        span: Span,
        /// Pool index of the name `Utf8` entry
        name_index: u16,
        /// Pool index of the descriptor `Utf8` entry
        descriptor_index: u16,
    },
    /// Field reference
    Fieldref {
        /// Byte span of the entry
        span: Span,
        /// Pool index of the owning `Class` entry
        class_index: u16,
        /// Pool index of the `NameAndType` entry
        name_and_type_index: u16,
    },
    /// Method reference
    Methodref {
        /// Byte span of the entry
        span: Span,
        /// Pool index of the owning `Class` entry
        class_index: u16,
        /// Pool index of the `NameAndType` entry
        name_and_type_index: u16,
    },
    /// Interface method reference
    InterfaceMethodref {
        /// Byte span of the entry
        span: Span,
        /// Pool index of the owning `Class` entry
        class_index: u16,
        /// Pool index of the `NameAndType` entry
        name_and_type_index: u16,
    },
    /// Any other standard entry, preserved as an opaque span
    Other {
        /// Byte span of the entry
        span: Span,
        /// The entry's tag byte
        tag: u8,
    },
}

impl PoolEntry {
    /// The entry's byte span.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            PoolEntry::Utf8 { span, .. }
            | PoolEntry::Class { span, .. }
            | PoolEntry::NameAndType { span, .. }
            | PoolEntry::Fieldref { span, .. }
            | PoolEntry::Methodref { span, .. }
            | PoolEntry::InterfaceMethodref { span, .. }
            | PoolEntry::Other { span, .. } => *span,
        }
    }

    pub(crate) fn span_mut(&mut self) -> &mut Span {
        match self {
            PoolEntry::Utf8 { span, .. }
            | PoolEntry::Class { span, .. }
            | PoolEntry::NameAndType { span, .. }
            | PoolEntry::Fieldref { span, .. }
            | PoolEntry::Methodref { span, .. }
            | PoolEntry::InterfaceMethodref { span, .. }
            | PoolEntry::Other { span, .. } => span,
        }
    }

    /// The entry's kind.
    #[must_use]
    pub fn tag(&self) -> PoolTag {
        match self {
            PoolEntry::Utf8 { .. } => PoolTag::Utf8,
            PoolEntry::Class { .. } => PoolTag::Class,
            PoolEntry::NameAndType { .. } => PoolTag::NameAndType,
            PoolEntry::Fieldref { .. } => PoolTag::Fieldref,
            PoolEntry::Methodref { .. } => PoolTag::Methodref,
            PoolEntry::InterfaceMethodref { .. } => PoolTag::InterfaceMethodref,
            // Other entries only exist for tags the parser accepted
            PoolEntry::Other { tag, .. } => PoolTag::from_tag(*tag).unwrap_or(PoolTag::Integer),
        }
    }
}

/// The parsed constant pool of one class file.
///
/// Indices run from 1 to `count - 1`; index 0 is reserved and unused, and the
/// slot behind a `Long` or `Double` entry is a placeholder. The pool must be
/// considered stale after any byte-level rewrite of the owning buffer unless
/// the rewriter itself maintained the spans (as [`crate::rewrite::redirect`]
/// does).
#[derive(Debug, Clone)]
pub struct ConstPool {
    /// Slot 0 and the phantom slot behind wide entries are `None`
    slots: Vec<Option<PoolEntry>>,
    /// Offset of the first byte past the pool (start of the class tail)
    end_offset: usize,
}

impl ConstPool {
    /// Parse the constant pool from a cursor positioned on the entry count.
    ///
    /// On success the cursor rests on the first byte past the pool.
    ///
    /// # Errors
    /// - [`crate::Error::Truncated`] if a declared length runs past the buffer
    /// - [`crate::Error::UnknownTag`] for tags outside the standard set
    /// - [`crate::Error::Malformed`] for invalid modified-UTF-8 payloads
    pub fn parse(parser: &mut Parser<'_>) -> Result<ConstPool> {
        let count = parser.read_be::<u16>()?;
        let mut slots: Vec<Option<PoolEntry>> = Vec::with_capacity(count as usize);
        slots.push(None);

        let mut index: u16 = 1;
        while index < count {
            let offset = parser.pos();
            let tag = parser.read_be::<u8>()?;
            let Some(kind) = PoolTag::from_tag(tag) else {
                return Err(crate::Error::UnknownTag { tag, index });
            };

            let entry = match kind {
                PoolTag::Utf8 => {
                    let length = parser.read_be::<u16>()? as usize;
                    let payload = parser.read_bytes(length)?;
                    let text = mutf8::decode(payload)?;
                    PoolEntry::Utf8 {
                        span: Span { offset, len: 3 + length },
                        text,
                    }
                }
                PoolTag::Class => {
                    let name_index = parser.read_be::<u16>()?;
                    PoolEntry::Class { span: Span { offset, len: 3 }, name_index }
                }
                PoolTag::NameAndType => {
                    let name_index = parser.read_be::<u16>()?;
                    let descriptor_index = parser.read_be::<u16>()?;
                    PoolEntry::NameAndType {
                        span: Span { offset, len: 5 },
                        name_index,
                        descriptor_index,
                    }
                }
                PoolTag::Fieldref | PoolTag::Methodref | PoolTag::InterfaceMethodref => {
                    let class_index = parser.read_be::<u16>()?;
                    let name_and_type_index = parser.read_be::<u16>()?;
                    let span = Span { offset, len: 5 };
                    match kind {
                        PoolTag::Fieldref => PoolEntry::Fieldref { span, class_index, name_and_type_index },
                        PoolTag::Methodref => PoolEntry::Methodref { span, class_index, name_and_type_index },
                        _ => PoolEntry::InterfaceMethodref { span, class_index, name_and_type_index },
                    }
                }
                other => {
                    // fixed_len is always Some for non-Utf8 tags
                    let len = other.fixed_len().unwrap_or(3);
                    parser.advance_by(len - 1)?;
                    PoolEntry::Other { span: Span { offset, len }, tag }
                }
            };

            let wide = kind.is_wide();
            slots.push(Some(entry));
            index += 1;

            if wide {
                if index >= count {
                    return Err(malformed_error!(
                        "Wide constant at index {} has no room for its second slot",
                        index - 1
                    ));
                }
                slots.push(None);
                index += 1;
            }
        }

        Ok(ConstPool { slots, end_offset: parser.pos() })
    }

    /// Number of pool slots as declared in the header (`constant_pool_count`).
    ///
    /// This is one greater than the number of indexable entries, and wide
    /// entries consume an extra slot.
    #[must_use]
    pub fn slot_count(&self) -> u16 {
        self.slots.len() as u16
    }

    /// Number of actual entries (excluding slot 0 and phantom slots).
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Offset of the first byte past the pool (start of the class tail).
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    pub(crate) fn set_end_offset(&mut self, end: usize) {
        self.end_offset = end;
    }

    /// Look up an entry by pool index.
    ///
    /// Returns `None` for index 0, out-of-range indices and the phantom slot
    /// behind wide entries.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&PoolEntry> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: u16) -> Option<&mut PoolEntry> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Iterate over `(index, entry)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &PoolEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|entry| (index as u16, entry)))
    }

    /// Resolve a `Utf8` entry's text by index.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is vacant or the entry
    /// is not a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(PoolEntry::Utf8 { text, .. }) => Ok(text),
            Some(other) => Err(malformed_error!(
                "Pool index {} is a {} entry, expected Utf8",
                index,
                other.tag()
            )),
            None => Err(malformed_error!("Pool index {} is vacant", index)),
        }
    }

    /// Resolve a `Class` entry to its internal name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index does not lead through
    /// a `Class` entry to a `Utf8` entry.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(PoolEntry::Class { name_index, .. }) => self.utf8(*name_index),
            Some(other) => Err(malformed_error!(
                "Pool index {} is a {} entry, expected Class",
                index,
                other.tag()
            )),
            None => Err(malformed_error!("Pool index {} is vacant", index)),
        }
    }

    /// Resolve a `NameAndType` entry to its `(name, descriptor)` pair.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on any indirection failure.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index) {
            Some(PoolEntry::NameAndType { name_index, descriptor_index, .. }) => {
                Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            Some(other) => Err(malformed_error!(
                "Pool index {} is a {} entry, expected NameAndType",
                index,
                other.tag()
            )),
            None => Err(malformed_error!("Pool index {} is vacant", index)),
        }
    }

    /// Resolve a member reference to `(class_name, member_name, descriptor)`.
    ///
    /// Accepts `Fieldref`, `Methodref` and `InterfaceMethodref` entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on any indirection failure.
    pub fn member_ref(&self, index: u16) -> Result<(&str, &str, &str)> {
        let (class_index, nat_index) = match self.get(index) {
            Some(PoolEntry::Fieldref { class_index, name_and_type_index, .. })
            | Some(PoolEntry::Methodref { class_index, name_and_type_index, .. })
            | Some(PoolEntry::InterfaceMethodref { class_index, name_and_type_index, .. }) => {
                (*class_index, *name_and_type_index)
            }
            Some(other) => {
                return Err(malformed_error!(
                    "Pool index {} is a {} entry, expected a member reference",
                    index,
                    other.tag()
                ))
            }
            None => return Err(malformed_error!("Pool index {} is vacant", index)),
        };

        let class = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok((class, name, descriptor))
    }

    /// Shift the spans of every entry at or past `from_offset` by `delta`.
    ///
    /// Called by the rewriter after splicing bytes; also moves the recorded
    /// tail offset.
    pub(crate) fn shift_spans(&mut self, from_offset: usize, delta: isize) {
        for slot in self.slots.iter_mut().flatten() {
            let span = slot.span_mut();
            if span.offset >= from_offset {
                span.offset = (span.offset as isize + delta) as usize;
            }
        }
        if self.end_offset >= from_offset {
            self.end_offset = (self.end_offset as isize + delta) as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::hello_class;
    use crate::ClassFile;

    #[test]
    fn parses_hello_pool() {
        let class = ClassFile::parse(hello_class()).unwrap();
        let pool = class.pool();

        assert!(pool.entry_count() > 0);
        let system = pool
            .iter()
            .find(|(_, e)| matches!(e, PoolEntry::Utf8 { text, .. } if text == "java/lang/System"));
        assert!(system.is_some());
    }

    #[test]
    fn spans_are_contiguous() {
        let class = ClassFile::parse(hello_class()).unwrap();
        let pool = class.pool();

        // Header is magic(4) + versions(4) + count(2)
        let mut expected = 10;
        for (_, entry) in pool.iter() {
            assert_eq!(entry.span().offset, expected);
            expected = entry.span().end();
        }
        assert_eq!(pool.end_offset(), expected);
    }

    #[test]
    fn unknown_tag_rejected() {
        // magic, version 52.0, count = 2, then a bogus tag
        let mut data = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x02];
        data.push(99);
        data.extend_from_slice(&[0, 0, 0, 0]);

        let err = ClassFile::parse(data).unwrap_err();
        assert!(matches!(err, crate::Error::UnknownTag { tag: 99, index: 1 }));
    }

    #[test]
    fn truncated_utf8_rejected() {
        // Utf8 entry declaring 10 bytes with only 2 available
        let mut data = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x02];
        data.extend_from_slice(&[TAG_UTF8, 0x00, 0x0A, b'h', b'i']);

        let err = ClassFile::parse(data).unwrap_err();
        assert!(matches!(err, crate::Error::Truncated));
    }

    #[test]
    fn wide_entry_consumes_two_slots() {
        // One Long entry followed by one Utf8 entry: count must be 4
        let mut data = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x04];
        data.push(TAG_LONG);
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 42]);
        data.extend_from_slice(&[TAG_UTF8, 0x00, 0x02, b'h', b'i']);
        // Empty tail
        data.extend_from_slice(&[0x00, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        let class = ClassFile::parse(data).unwrap();
        let pool = class.pool();
        assert!(pool.get(2).is_none(), "slot behind a Long must be vacant");
        assert_eq!(pool.utf8(3).unwrap(), "hi");
    }
}
