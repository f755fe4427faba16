//! Structural loading of patched class bytes.
//!
//! Where [`crate::ClassFile`] stops at the constant pool and keeps the tail
//! opaque, the loader parses the tail completely: access flags, the this and
//! super class names, and every method with its `Code` attribute. The raw
//! bytes are retained alongside the parse so the interpreter can decode
//! constants the pool carries only as opaque spans (`Integer`, `String`).

use crate::{
    classfile::{
        constpool::{TAG_INTEGER, TAG_STRING},
        ClassAccess, ConstPool, MethodAccess, PoolEntry,
    },
    file::parser::Parser,
    ClassFile, Result,
};

/// The executable body of a method: its `Code` attribute.
#[derive(Debug, Clone)]
pub struct CodeAttribute {
    /// Declared operand stack depth
    pub max_stack: u16,
    /// Declared local variable slot count
    pub max_locals: u16,
    /// The raw bytecode
    pub bytecode: Vec<u8>,
}

/// One method of a loaded class.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Access and property flags
    pub access: MethodAccess,
    /// Simple method name
    pub name: String,
    /// Method descriptor, e.g. `([Ljava/lang/String;)V`
    pub descriptor: String,
    /// The method body, absent for abstract and native methods
    pub code: Option<CodeAttribute>,
}

/// A constant resolvable at execution time from an `ldc`-style instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RuntimeConstant<'a> {
    Int(i32),
    Str(&'a str),
}

/// A fully parsed class, ready for execution.
///
/// Holds the (patched) bytes, the constant pool and the decoded method table.
/// Loading performs no execution and resolves no other classes; names stay
/// names until an instruction references them.
#[derive(Debug)]
pub struct LoadedClass {
    name: String,
    super_name: Option<String>,
    access: ClassAccess,
    pool: ConstPool,
    methods: Vec<MethodInfo>,
    data: Vec<u8>,
}

impl LoadedClass {
    /// Parse class bytes completely, tail included.
    ///
    /// # Errors
    /// Any header or pool error from [`ClassFile::parse`], plus
    /// [`crate::Error::Truncated`] or [`crate::Error::Malformed`] for a tail
    /// whose declared counts and attribute lengths do not fit the buffer.
    pub fn parse(data: Vec<u8>) -> Result<LoadedClass> {
        let class = ClassFile::parse(data)?;
        let (data, pool) = class.into_parts();

        let mut parser = Parser::new(&data);
        parser.seek(pool.end_offset())?;

        let access = ClassAccess::from_bits_truncate(parser.read_be::<u16>()?);
        let this_class = parser.read_be::<u16>()?;
        let super_class = parser.read_be::<u16>()?;

        let name = pool.class_name(this_class)?.to_string();
        let super_name = if super_class == 0 {
            None
        } else {
            Some(pool.class_name(super_class)?.to_string())
        };

        let interfaces_count = parser.read_be::<u16>()?;
        parser.advance_by(usize::from(interfaces_count) * 2)?;

        let fields_count = parser.read_be::<u16>()?;
        for _ in 0..fields_count {
            // access_flags, name_index, descriptor_index
            parser.advance_by(6)?;
            skip_attributes(&mut parser)?;
        }

        let methods_count = parser.read_be::<u16>()?;
        let mut methods = Vec::with_capacity(usize::from(methods_count));
        for _ in 0..methods_count {
            methods.push(parse_method(&mut parser, &pool)?);
        }

        Ok(LoadedClass { name, super_name, access, pool, methods, data })
    }

    /// The class's internal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The superclass's internal name, absent only for the root class.
    #[must_use]
    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    /// Class access flags.
    #[must_use]
    pub fn access(&self) -> ClassAccess {
        self.access
    }

    /// The constant pool.
    #[must_use]
    pub fn pool(&self) -> &ConstPool {
        &self.pool
    }

    /// The decoded method table.
    #[must_use]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// Find a method by name and descriptor.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// The entry routine: a static `main` with a body.
    ///
    /// Accepts the conventional `([Ljava/lang/String;)V` shape, or a
    /// no-argument `()V` variant.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoEntryPoint`] when no such method exists or
    /// the candidate has no code.
    pub fn entry_point(&self) -> Result<&MethodInfo> {
        ["([Ljava/lang/String;)V", "()V"]
            .iter()
            .filter_map(|descriptor| self.method("main", descriptor))
            .find(|m| m.access.contains(MethodAccess::STATIC) && m.code.is_some())
            .ok_or_else(|| crate::Error::NoEntryPoint(self.name.clone()))
    }

    /// Decode the constant behind an `ldc`-style pool index.
    ///
    /// `Integer` and `String` payloads live in the retained raw bytes; the
    /// pool carries them as opaque spans.
    pub(crate) fn constant(&self, index: u16) -> Result<RuntimeConstant<'_>> {
        match self.pool.get(index) {
            Some(PoolEntry::Other { span, tag: TAG_INTEGER }) => {
                let bytes: [u8; 4] = self.data[span.offset + 1..span.offset + 5]
                    .try_into()
                    .map_err(|_| crate::Error::Truncated)?;
                Ok(RuntimeConstant::Int(i32::from_be_bytes(bytes)))
            }
            Some(PoolEntry::Other { span, tag: TAG_STRING }) => {
                let bytes: [u8; 2] = self.data[span.offset + 1..span.offset + 3]
                    .try_into()
                    .map_err(|_| crate::Error::Truncated)?;
                let utf8 = u16::from_be_bytes(bytes);
                Ok(RuntimeConstant::Str(self.pool.utf8(utf8)?))
            }
            Some(other) => Err(crate::Error::Unsupported(format!(
                "Loadable constant of kind {} at pool index {}",
                other.tag(),
                index
            ))),
            None => Err(malformed_error!("Pool index {} is vacant", index)),
        }
    }
}

fn parse_method(parser: &mut Parser<'_>, pool: &ConstPool) -> Result<MethodInfo> {
    let access = MethodAccess::from_bits_truncate(parser.read_be::<u16>()?);
    let name = pool.utf8(parser.read_be::<u16>()?)?.to_string();
    let descriptor = pool.utf8(parser.read_be::<u16>()?)?.to_string();

    let mut code = None;
    let attributes_count = parser.read_be::<u16>()?;
    for _ in 0..attributes_count {
        let attr_name = parser.read_be::<u16>()?;
        let attr_len = parser.read_be::<u32>()? as usize;
        let payload = parser.read_bytes(attr_len)?;

        if pool.utf8(attr_name)? == "Code" {
            code = Some(parse_code(payload)?);
        }
    }

    Ok(MethodInfo { access, name, descriptor, code })
}

fn parse_code(payload: &[u8]) -> Result<CodeAttribute> {
    let mut parser = Parser::new(payload);
    let max_stack = parser.read_be::<u16>()?;
    let max_locals = parser.read_be::<u16>()?;
    let code_length = parser.read_be::<u32>()? as usize;
    let bytecode = parser.read_bytes(code_length)?.to_vec();
    // Exception table and nested attributes are carried in the payload but
    // not interpreted.
    Ok(CodeAttribute { max_stack, max_locals, bytecode })
}

fn skip_attributes(parser: &mut Parser<'_>) -> Result<()> {
    let count = parser.read_be::<u16>()?;
    for _ in 0..count {
        parser.advance_by(2)?;
        let len = parser.read_be::<u32>()? as usize;
        parser.advance_by(len)?;
    }
    Ok(())
}
