//! Class file header and constant pool access.
//!
//! A class file is big-endian throughout: a fixed header (4-byte magic
//! `0xCAFEBABE`, minor and major version words), the constant pool, and a
//! tail holding access flags, the this/super class indices, interfaces,
//! fields, methods and attributes. [`ClassFile`] validates the header for
//! well-formedness (the version is read but not semantically interpreted),
//! parses the pool completely, and keeps the tail as opaque bytes - the
//! rewriter only ever touches pool content and shifts the tail wholesale.
//!
//! The deeper structural parse of the tail (methods, `Code` attributes) is
//! the loader's job; see [`crate::sandbox`].

pub(crate) mod builder;
pub(crate) mod constpool;
pub(crate) mod mutf8;

pub use builder::ClassBuilder;
pub use constpool::{ConstPool, PoolEntry, PoolTag, Span};

use bitflags::bitflags;

use crate::{file::parser::Parser, Result};

/// The 4-byte signature every class file begins with.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

bitflags! {
    /// Class-level access and property flags from the tail's `access_flags` word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final
        const FINAL = 0x0010;
        /// Treat superclass methods specially on invokespecial
        const SUPER = 0x0020;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation type
        const ANNOTATION = 0x2000;
        /// Declared as an enum type
        const ENUM = 0x4000;
        /// Is a module description
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Method-level access and property flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// Bridge method generated by the compiler
        const BRIDGE = 0x0040;
        /// Declared with a variable number of arguments
        const VARARGS = 0x0080;
        /// Implemented in a language other than the module format
        const NATIVE = 0x0100;
        /// Declared abstract, no implementation
        const ABSTRACT = 0x0400;
        /// Strict floating-point mode
        const STRICT = 0x0800;
        /// Not present in source
        const SYNTHETIC = 0x1000;
    }
}

/// A parsed class file: validated header, typed constant pool, opaque tail.
///
/// Owns its byte buffer exclusively; the rewriter mutates it in place while
/// keeping the pool's spans synchronized, and [`ClassFile::into_bytes`]
/// releases the (possibly patched) buffer for loading.
///
/// # Examples
///
/// ```rust
/// use classpatch::{classfile::ClassBuilder, ClassFile};
///
/// let bytes = ClassBuilder::new("demo/Empty").build();
/// let class = ClassFile::parse(bytes)?;
/// assert_eq!(class.major_version(), 52);
/// # Ok::<(), classpatch::Error>(())
/// ```
#[derive(Debug)]
pub struct ClassFile {
    data: Vec<u8>,
    minor_version: u16,
    major_version: u16,
    pool: ConstPool,
}

impl ClassFile {
    /// Parse the header and constant pool of a class file.
    ///
    /// The tail behind the pool is not interpreted; it only has to exist.
    ///
    /// # Arguments
    /// * `data` - The raw class file bytes; ownership is taken for in-place rewriting
    ///
    /// # Errors
    /// - [`crate::Error::BadMagic`] if the signature is absent
    /// - [`crate::Error::Truncated`] if the pool runs past the buffer
    /// - [`crate::Error::UnknownTag`] for pool tags outside the standard set
    pub fn parse(data: Vec<u8>) -> Result<ClassFile> {
        let mut parser = Parser::new(&data);

        let magic = parser.read_be::<u32>()?;
        if magic != CLASS_MAGIC {
            return Err(crate::Error::BadMagic(magic));
        }

        let minor_version = parser.read_be::<u16>()?;
        let major_version = parser.read_be::<u16>()?;

        let pool = ConstPool::parse(&mut parser)?;

        Ok(ClassFile { data, minor_version, major_version, pool })
    }

    /// The minor version word from the header.
    #[must_use]
    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    /// The major version word from the header.
    #[must_use]
    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    /// The parsed constant pool.
    #[must_use]
    pub fn pool(&self) -> &ConstPool {
        &self.pool
    }

    /// The current (possibly patched) bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The opaque tail: everything past the constant pool.
    #[must_use]
    pub fn tail(&self) -> &[u8] {
        &self.data[self.pool.end_offset()..]
    }

    /// Release the (possibly patched) byte buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<u8>, &mut ConstPool) {
        (&mut self.data, &mut self.pool)
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, ConstPool) {
        (self.data, self.pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::hello_class;

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(ClassFile::parse(Vec::new()), Err(crate::Error::Truncated)));
    }

    #[test]
    fn rejects_bad_magic() {
        let err = ClassFile::parse(vec![0x00, 0x01, 0x02, 0x03, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, crate::Error::BadMagic(0x0001_0203)));
    }

    #[test]
    fn debug_formatting_is_available() {
        // Result<ClassFile> combinators like unwrap_err need this
        let class = ClassFile::parse(hello_class()).unwrap();
        assert!(format!("{class:?}").contains("ClassFile"));
    }

    #[test]
    fn tail_starts_past_pool() {
        let class = ClassFile::parse(hello_class()).unwrap();
        assert_eq!(
            class.pool().end_offset() + class.tail().len(),
            class.as_bytes().len()
        );
        // access_flags is the first tail word
        assert!(class.tail().len() >= 2);
    }
}
