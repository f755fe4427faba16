//! Shared factories for crafting class file inputs in unit tests.

use crate::classfile::{ClassBuilder, MethodAccess};

/// A class whose static `main` prints `"hello"` through `System.out` and
/// returns.
pub(crate) fn hello_class() -> Vec<u8> {
    let mut b = ClassBuilder::new("demo/Hello");
    let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let hello = b.string("hello");

    let code = [
        0xB2, (out >> 8) as u8, out as u8,
        0x12, hello as u8,
        0xB6, (println >> 8) as u8, println as u8,
        0xB1,
    ];
    b.method(
        MethodAccess::PUBLIC | MethodAccess::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        2,
        1,
        &code,
    );
    b.build()
}

/// A class whose static `main` prints `"hello"` and then raises an
/// `IllegalStateException` carrying the message `"boom"`.
pub(crate) fn hello_then_throw_class() -> Vec<u8> {
    let mut b = ClassBuilder::new("demo/Failing");
    let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let hello = b.string("hello");

    let exception = b.class("java/lang/IllegalStateException");
    let ctor = b.method_ref(
        "java/lang/IllegalStateException",
        "<init>",
        "(Ljava/lang/String;)V",
    );
    let boom = b.string("boom");

    let code = [
        0xB2, (out >> 8) as u8, out as u8,
        0x12, hello as u8,
        0xB6, (println >> 8) as u8, println as u8,
        0xBB, (exception >> 8) as u8, exception as u8,
        0x59,
        0x12, boom as u8,
        0xB7, (ctor >> 8) as u8, ctor as u8,
        0xBF,
    ];
    b.method(
        MethodAccess::PUBLIC | MethodAccess::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        3,
        1,
        &code,
    );
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassFile;

    #[test]
    fn factories_produce_parseable_classes() {
        assert!(ClassFile::parse(hello_class()).is_ok());
        assert!(ClassFile::parse(hello_then_throw_class()).is_ok());
    }
}
