//! Integration tests for constant pool name redirection on whole class files.

use classpatch::prelude::*;

fn hello_class() -> Vec<u8> {
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

fn utf8_texts(class: &ClassFile) -> Vec<String> {
    class
        .pool()
        .iter()
        .filter_map(|(_, entry)| match entry {
            PoolEntry::Utf8 { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn redirection_removes_every_target_occurrence() {
    let mut class = ClassFile::parse(hello_class()).unwrap();
    let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");

    let replaced = redirect(&mut class, &request).unwrap();
    assert_eq!(replaced, 1);

    let texts = utf8_texts(&class);
    assert!(texts.iter().all(|t| !t.contains("java/lang/System")));
    assert!(texts.iter().any(|t| t == "sandbox/Capture"));
}

#[test]
fn tail_bytes_survive_redirection_unchanged() {
    let original = ClassFile::parse(hello_class()).unwrap();
    let tail_before = original.tail().to_vec();

    let mut class = ClassFile::parse(hello_class()).unwrap();
    let request = RedirectionRequest::new("java/lang/System", "sandbox/LongerCaptureName");
    redirect(&mut class, &request).unwrap();

    // The tail moved but its bytes are untouched
    assert_eq!(class.tail(), &tail_before[..]);
}

#[test]
fn patched_bytes_reparse_and_reload() {
    let mut class = ClassFile::parse(hello_class()).unwrap();
    let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
    redirect(&mut class, &request).unwrap();

    let reloaded = LoadedClass::parse(class.into_bytes()).unwrap();
    assert_eq!(reloaded.name(), "demo/Hello");
    assert!(reloaded.method("main", "([Ljava/lang/String;)V").is_some());
}

#[test]
fn absent_target_leaves_bytes_identical() {
    let bytes = hello_class();
    let mut class = ClassFile::parse(bytes.clone()).unwrap();

    let request = RedirectionRequest::new("com/example/Absent", "sandbox/Capture");
    assert_eq!(redirect(&mut class, &request).unwrap(), 0);
    assert_eq!(class.into_bytes(), bytes);
}

#[test]
fn repeated_redirection_chains() {
    let mut class = ClassFile::parse(hello_class()).unwrap();

    let first = RedirectionRequest::new("java/lang/System", "stage/One");
    redirect(&mut class, &first).unwrap();
    let second = RedirectionRequest::new("stage/One", "stage/Two");
    redirect(&mut class, &second).unwrap();

    let texts = utf8_texts(&class);
    assert!(texts.iter().any(|t| t == "stage/Two"));
    assert!(texts.iter().all(|t| !t.contains("stage/One")));
}

#[test]
fn memory_backed_file_roundtrip() {
    let file = File::from_mem(hello_class());
    let class = ClassFile::parse(file.data().to_vec()).unwrap();
    assert!(class.pool().entry_count() > 0);
}
