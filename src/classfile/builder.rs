//! Assembly of minimal, well-formed class files.
//!
//! [`ClassBuilder`] emits just enough of the format for crafting inputs in
//! tests, benchmarks and tooling: a deduplicated constant pool, the fixed
//! header, and static methods carrying a `Code` attribute. Pool indices are
//! handed back to the caller so bytecode can be assembled against them
//! before the final byte emission.
//!
//! # Usage Examples
//!
//! ```rust
//! use classpatch::classfile::{ClassBuilder, MethodAccess};
//!
//! let mut b = ClassBuilder::new("demo/Hello");
//! let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
//! let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
//! let hello = b.string("hello");
//!
//! let code = [
//!     0xB2, (out >> 8) as u8, out as u8,             // getstatic System.out
//!     0x12, hello as u8,                             // ldc "hello"
//!     0xB6, (println >> 8) as u8, println as u8,     // invokevirtual println
//!     0xB1,                                          // return
//! ];
//! b.method(
//!     MethodAccess::PUBLIC | MethodAccess::STATIC,
//!     "main",
//!     "([Ljava/lang/String;)V",
//!     2,
//!     1,
//!     &code,
//! );
//! let bytes = b.build();
//! assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! ```

use std::collections::HashMap;

use crate::classfile::{
    constpool::{
        TAG_CLASS, TAG_FIELDREF, TAG_INTEGER, TAG_METHODREF, TAG_NAME_AND_TYPE, TAG_STRING,
        TAG_UTF8,
    },
    mutf8, ClassAccess, MethodAccess, CLASS_MAGIC,
};

enum RawConst {
    Utf8(String),
    Integer(i32),
    Class { name: u16 },
    Str { utf8: u16 },
    NameAndType { name: u16, descriptor: u16 },
    Fieldref { class: u16, nat: u16 },
    Methodref { class: u16, nat: u16 },
}

struct RawMethod {
    access: u16,
    name_index: u16,
    descriptor_index: u16,
    max_stack: u16,
    max_locals: u16,
    code: Vec<u8>,
    code_attr_name: Option<u16>,
}

/// Builder for minimal class files with a deduplicated constant pool.
///
/// Entries are appended in insertion order and indexed from 1; the builder
/// never emits wide (`Long`/`Double`) entries, so indices and slots coincide.
pub struct ClassBuilder {
    minor_version: u16,
    major_version: u16,
    access: ClassAccess,
    consts: Vec<RawConst>,
    utf8_dedup: HashMap<String, u16>,
    class_dedup: HashMap<String, u16>,
    nat_dedup: HashMap<(u16, u16), u16>,
    this_class: u16,
    super_class: u16,
    methods: Vec<RawMethod>,
}

impl ClassBuilder {
    /// Start a class named by its `/`-separated internal name.
    ///
    /// The class is public, extends `java/lang/Object` and targets the 52.0
    /// format version.
    #[must_use]
    pub fn new(name: &str) -> ClassBuilder {
        let mut builder = ClassBuilder {
            minor_version: 0,
            major_version: 52,
            access: ClassAccess::PUBLIC | ClassAccess::SUPER,
            consts: Vec::new(),
            utf8_dedup: HashMap::new(),
            class_dedup: HashMap::new(),
            nat_dedup: HashMap::new(),
            this_class: 0,
            super_class: 0,
            methods: Vec::new(),
        };
        builder.this_class = builder.class(name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    fn push(&mut self, entry: RawConst) -> u16 {
        self.consts.push(entry);
        self.consts.len() as u16
    }

    /// Add (or reuse) a `Utf8` entry, returning its pool index.
    pub fn utf8(&mut self, text: &str) -> u16 {
        if let Some(index) = self.utf8_dedup.get(text) {
            return *index;
        }
        let index = self.push(RawConst::Utf8(text.to_string()));
        self.utf8_dedup.insert(text.to_string(), index);
        index
    }

    /// Add an `Integer` entry, returning its pool index.
    pub fn integer(&mut self, value: i32) -> u16 {
        self.push(RawConst::Integer(value))
    }

    /// Add (or reuse) a `Class` entry for an internal name.
    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.class_dedup.get(name) {
            return *index;
        }
        let utf8 = self.utf8(name);
        let index = self.push(RawConst::Class { name: utf8 });
        self.class_dedup.insert(name.to_string(), index);
        index
    }

    /// Add a `String` entry for a literal, returning its pool index.
    pub fn string(&mut self, text: &str) -> u16 {
        let utf8 = self.utf8(text);
        self.push(RawConst::Str { utf8 })
    }

    /// Add (or reuse) a `NameAndType` entry.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        if let Some(index) = self.nat_dedup.get(&(name, descriptor)) {
            return *index;
        }
        let index = self.push(RawConst::NameAndType { name, descriptor });
        self.nat_dedup.insert((name, descriptor), index);
        index
    }

    /// Add a `Fieldref` entry, returning its pool index.
    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        self.push(RawConst::Fieldref { class, nat })
    }

    /// Add a `Methodref` entry, returning its pool index.
    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        self.push(RawConst::Methodref { class, nat })
    }

    /// Override the class access flags.
    pub fn access(&mut self, access: ClassAccess) -> &mut Self {
        self.access = access;
        self
    }

    /// Override the format version.
    pub fn version(&mut self, major: u16, minor: u16) -> &mut Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    /// Add a method with the given bytecode as its `Code` attribute.
    ///
    /// An empty `code` slice produces a method without a `Code` attribute
    /// (useful for modelling abstract or native methods).
    pub fn method(
        &mut self,
        access: MethodAccess,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let code_attr_name = if code.is_empty() { None } else { Some(self.utf8("Code")) };

        self.methods.push(RawMethod {
            access: access.bits(),
            name_index,
            descriptor_index,
            max_stack,
            max_locals,
            code: code.to_vec(),
            code_attr_name,
        });
        self
    }

    /// Emit the class file bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);

        out.extend_from_slice(&CLASS_MAGIC.to_be_bytes());
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());

        out.extend_from_slice(&(self.consts.len() as u16 + 1).to_be_bytes());
        for entry in &self.consts {
            match entry {
                RawConst::Utf8(text) => {
                    let encoded = mutf8::encode(text);
                    out.push(TAG_UTF8);
                    out.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
                    out.extend_from_slice(&encoded);
                }
                RawConst::Integer(value) => {
                    out.push(TAG_INTEGER);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                RawConst::Class { name } => {
                    out.push(TAG_CLASS);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                RawConst::Str { utf8 } => {
                    out.push(TAG_STRING);
                    out.extend_from_slice(&utf8.to_be_bytes());
                }
                RawConst::NameAndType { name, descriptor } => {
                    out.push(TAG_NAME_AND_TYPE);
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&descriptor.to_be_bytes());
                }
                RawConst::Fieldref { class, nat } => {
                    out.push(TAG_FIELDREF);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                RawConst::Methodref { class, nat } => {
                    out.push(TAG_METHODREF);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
            }
        }

        out.extend_from_slice(&self.access.bits().to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());

        // interfaces_count, fields_count
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());

        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            out.extend_from_slice(&method.access.to_be_bytes());
            out.extend_from_slice(&method.name_index.to_be_bytes());
            out.extend_from_slice(&method.descriptor_index.to_be_bytes());

            match method.code_attr_name {
                Some(code_name) => {
                    out.extend_from_slice(&1u16.to_be_bytes());
                    out.extend_from_slice(&code_name.to_be_bytes());
                    // max_stack + max_locals + code_length + exception_table_length + attributes_count
                    let attr_len = 12 + method.code.len() as u32;
                    out.extend_from_slice(&attr_len.to_be_bytes());
                    out.extend_from_slice(&method.max_stack.to_be_bytes());
                    out.extend_from_slice(&method.max_locals.to_be_bytes());
                    out.extend_from_slice(&(method.code.len() as u32).to_be_bytes());
                    out.extend_from_slice(&method.code);
                    out.extend_from_slice(&0u16.to_be_bytes());
                    out.extend_from_slice(&0u16.to_be_bytes());
                }
                None => out.extend_from_slice(&0u16.to_be_bytes()),
            }
        }

        // class attributes_count
        out.extend_from_slice(&0u16.to_be_bytes());

        out
    }
}
