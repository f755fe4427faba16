//! End-to-end patched execution.
//!
//! [`Sandbox`] ties the pipeline together: parse the module, redirect the
//! configured target name to the capture class, define the patched bytes in
//! a fresh namespace, locate the entry routine and interpret it under the
//! configured limits. The caller always receives the captured output as a
//! `String` - failures at any stage are rendered into the capture as
//! diagnostics rather than surfaced as errors, mirroring how a console
//! harness would present them.

use crate::{
    rewrite::{redirect, RedirectionRequest},
    sandbox::{
        capture::CaptureSink,
        interp::{ExecutionLimits, Interpreter, Value},
        namespace::Namespace,
    },
    ClassFile, Result,
};

/// Executes class bytes with their environment references redirected into a
/// capture sink.
///
/// The sandbox itself is stateless across invocations; every call to
/// [`Sandbox::execute`] builds a fresh namespace and a fresh sink.
///
/// # Examples
///
/// ```rust
/// use classpatch::{
///     classfile::{ClassBuilder, MethodAccess},
///     rewrite::RedirectionRequest,
///     sandbox::Sandbox,
/// };
///
/// let mut b = ClassBuilder::new("demo/Hello");
/// let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
/// let println = b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
/// let hello = b.string("hello");
/// let code = [
///     0xB2, (out >> 8) as u8, out as u8,
///     0x12, hello as u8,
///     0xB6, (println >> 8) as u8, println as u8,
///     0xB1,
/// ];
/// b.method(
///     MethodAccess::PUBLIC | MethodAccess::STATIC,
///     "main",
///     "([Ljava/lang/String;)V",
///     2,
///     1,
///     &code,
/// );
///
/// let request = RedirectionRequest::new("java/lang/System", "sandbox/Capture");
/// let output = Sandbox::new().execute(&b.build(), &request);
/// assert_eq!(output, "hello\n");
/// ```
#[derive(Debug, Default)]
pub struct Sandbox {
    limits: ExecutionLimits,
}

impl Sandbox {
    /// A sandbox with default limits.
    #[must_use]
    pub fn new() -> Sandbox {
        Sandbox::default()
    }

    /// A sandbox with explicit limits.
    #[must_use]
    pub fn with_limits(limits: ExecutionLimits) -> Sandbox {
        Sandbox { limits }
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Patch, load and run the module's entry routine, returning everything
    /// it produced.
    ///
    /// Never fails: malformed input, a missing entry routine, guest
    /// exceptions and exceeded limits all come back as diagnostic text in
    /// the returned output, after whatever the guest managed to print first.
    pub fn execute(&self, bytes: &[u8], request: &RedirectionRequest) -> String {
        let mut sink = CaptureSink::new();
        if let Err(error) = self.run(bytes, request, &mut sink) {
            render_failure(&mut sink, &error);
        }
        sink.into_string()
    }

    fn run(&self, bytes: &[u8], request: &RedirectionRequest, sink: &mut CaptureSink) -> Result<()> {
        let mut class = ClassFile::parse(bytes.to_vec())?;
        redirect(&mut class, request)?;

        let mut namespace = Namespace::new();
        namespace.bind_sink(request.replacement());
        let loaded = namespace.define(class.into_bytes())?;
        let entry = loaded.entry_point()?.clone();

        let args = if entry.descriptor == "()V" {
            Vec::new()
        } else {
            vec![Value::Null]
        };

        let mut interpreter = Interpreter::new(&namespace, sink, self.limits);
        interpreter.run(loaded, &entry, args)?;
        Ok(())
    }
}

/// Render a failure the way a console harness would.
fn render_failure(sink: &mut CaptureSink, error: &crate::Error) {
    match error {
        crate::Error::Thrown { class, message } => {
            let name = class.replace('/', ".");
            match message {
                Some(message) => {
                    sink.println(&format!("Exception in thread \"main\" {name}: {message}"));
                }
                None => sink.println(&format!("Exception in thread \"main\" {name}")),
            }
        }
        other => sink.println(&format!("Execution failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{hello_class, hello_then_throw_class};

    fn request() -> RedirectionRequest {
        RedirectionRequest::new("java/lang/System", "sandbox/Capture")
    }

    #[test]
    fn captures_entry_output() {
        let output = Sandbox::new().execute(&hello_class(), &request());
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn guest_exception_becomes_diagnostic() {
        let output = Sandbox::new().execute(&hello_then_throw_class(), &request());
        assert_eq!(
            output,
            "hello\nException in thread \"main\" java.lang.IllegalStateException: boom\n"
        );
    }

    #[test]
    fn malformed_input_becomes_diagnostic() {
        let output = Sandbox::new().execute(&[0x00, 0x01, 0x02], &request());
        assert!(output.starts_with("Execution failed:"));
    }

    #[test]
    fn invocations_do_not_share_output() {
        let sandbox = Sandbox::new();
        let first = sandbox.execute(&hello_class(), &request());
        let second = sandbox.execute(&hello_class(), &request());
        assert_eq!(first, second);
        assert_eq!(second, "hello\n");
    }
}
