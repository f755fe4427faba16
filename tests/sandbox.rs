//! End-to-end tests: patch a class, run it in isolation, inspect the capture.

use std::time::Duration;

use classpatch::prelude::*;

fn request() -> RedirectionRequest {
    RedirectionRequest::new("java/lang/System", "sandbox/Capture")
}

fn builder_with_streams(name: &str) -> (ClassBuilder, u16, u16) {
    let mut b = ClassBuilder::new(name);
    let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    (b, out, println)
}

fn hello_class() -> Vec<u8> {
    let (mut b, out, println) = builder_with_streams("demo/Hello");
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

fn hello_then_throw_class() -> Vec<u8> {
    let (mut b, out, println) = builder_with_streams("demo/Failing");
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

#[test]
fn captured_output_in_emission_order() {
    let output = Sandbox::new().execute(&hello_class(), &request());
    assert_eq!(output, "hello\n");
}

#[test]
fn partial_output_precedes_exception_diagnostic() {
    let output = Sandbox::new().execute(&hello_then_throw_class(), &request());
    assert_eq!(
        output,
        "hello\nException in thread \"main\" java.lang.IllegalStateException: boom\n"
    );
}

#[test]
fn same_class_name_loads_cleanly_every_invocation() {
    let sandbox = Sandbox::new();
    for _ in 0..3 {
        assert_eq!(sandbox.execute(&hello_class(), &request()), "hello\n");
    }
}

#[test]
fn err_stream_shares_the_capture() {
    let mut b = ClassBuilder::new("demo/Mixed");
    let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let err = b.field_ref("java/lang/System", "err", "Ljava/io/PrintStream;");
    let print = b.method_ref("java/io/PrintStream", "print", "(Ljava/lang/String;)V");
    let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let first = b.string("first ");
    let second = b.string("second");

    let code = [
        0xB2, (out >> 8) as u8, out as u8,
        0x12, first as u8,
        0xB6, (print >> 8) as u8, print as u8,
        0xB2, (err >> 8) as u8, err as u8,
        0x12, second as u8,
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

    let output = Sandbox::new().execute(&b.build(), &request());
    assert_eq!(output, "first second\n");
}

#[test]
fn unpatched_environment_reference_is_undefined() {
    // Redirect a name the class never mentions, leaving System unresolvable
    let absent = RedirectionRequest::new("com/example/Absent", "sandbox/Capture");
    let output = Sandbox::new().execute(&hello_class(), &absent);
    assert!(output.contains("java/lang/System"), "got: {output}");
    assert!(output.starts_with("Execution failed:"));
}

#[test]
fn missing_entry_routine_is_diagnosed() {
    let mut b = ClassBuilder::new("demo/NoMain");
    b.method(MethodAccess::PUBLIC | MethodAccess::STATIC, "run", "()V", 0, 0, &[0xB1]);

    let output = Sandbox::new().execute(&b.build(), &request());
    assert!(output.starts_with("Execution failed:"));
    assert!(output.contains("demo/NoMain"));
}

#[test]
fn not_a_class_file_is_diagnosed() {
    let output = Sandbox::new().execute(b"PK\x03\x04 definitely a zip", &request());
    assert!(output.starts_with("Execution failed:"));
}

#[test]
fn runaway_loop_is_cut_off() {
    let mut b = ClassBuilder::new("demo/Spin");
    b.method(
        MethodAccess::PUBLIC | MethodAccess::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        0,
        1,
        &[0xA7, 0x00, 0x00],
    );

    let limits = ExecutionLimits {
        max_instructions: 10_000,
        timeout: Some(Duration::from_secs(5)),
        ..ExecutionLimits::default()
    };
    let output = Sandbox::with_limits(limits).execute(&b.build(), &request());
    assert!(output.starts_with("Execution failed:"), "got: {output}");
}

// Runs on a default test thread: guest recursion must stay off the host
// stack and come back as a diagnostic, not blow the process up.
#[test]
fn runaway_recursion_is_contained() {
    let mut b = ClassBuilder::new("demo/Rec");
    let again = b.method_ref("demo/Rec", "again", "()V");
    let call = [0xB8, (again >> 8) as u8, again as u8, 0xB1];
    b.method(
        MethodAccess::PUBLIC | MethodAccess::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        1,
        1,
        &call,
    );
    b.method(MethodAccess::PRIVATE | MethodAccess::STATIC, "again", "()V", 1, 0, &call);

    let output = Sandbox::new().execute(&b.build(), &request());
    assert!(output.starts_with("Execution failed:"), "got: {output}");
    assert!(output.contains("call depth"), "got: {output}");
}

#[test]
fn no_arg_entry_variant_runs() {
    let (mut b, out, println) = builder_with_streams("demo/Bare");
    let text = b.string("bare");
    let code = [
        0xB2, (out >> 8) as u8, out as u8,
        0x12, text as u8,
        0xB6, (println >> 8) as u8, println as u8,
        0xB1,
    ];
    b.method(MethodAccess::PUBLIC | MethodAccess::STATIC, "main", "()V", 2, 0, &code);

    let output = Sandbox::new().execute(&b.build(), &request());
    assert_eq!(output, "bare\n");
}

#[test]
fn termination_request_does_not_stop_the_run() {
    let (mut b, out, println) = builder_with_streams("demo/Exiter");
    let exit = b.method_ref("java/lang/System", "exit", "(I)V");
    let after = b.string("after exit");

    let code = [
        0x04,                                    // iconst_1
        0xB8, (exit >> 8) as u8, exit as u8,     // System.exit(1), redirected
        0xB2, (out >> 8) as u8, out as u8,
        0x12, after as u8,
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

    let output = Sandbox::new().execute(&b.build(), &request());
    assert_eq!(output, "after exit\n");
}
