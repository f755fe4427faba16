//! Output capture for sandboxed executions.
//!
//! The sink stands in for the host environment's standard streams inside the
//! sandbox: both the `out` and `err` streams of the published capture class
//! append to a single ordered buffer, and termination requests are recorded
//! instead of honored. One sink lives exactly as long as one invocation, so
//! output never leaks between runs.

/// An in-memory sink replacing standard output, standard error and process
/// termination inside the sandbox.
///
/// # Examples
///
/// ```rust
/// use classpatch::sandbox::CaptureSink;
///
/// let mut sink = CaptureSink::new();
/// sink.print("pi = ");
/// sink.println_int(3);
/// assert_eq!(sink.snapshot(), "pi = 3\n");
/// ```
#[derive(Debug, Default)]
pub struct CaptureSink {
    buffer: String,
    exit_code: Option<i32>,
}

impl CaptureSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> CaptureSink {
        CaptureSink::default()
    }

    /// Append text without a trailing newline.
    pub fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Append text followed by a newline.
    pub fn println(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Append a decimal integer without a trailing newline.
    pub fn print_int(&mut self, value: i32) {
        self.buffer.push_str(&value.to_string());
    }

    /// Append a decimal integer followed by a newline.
    pub fn println_int(&mut self, value: i32) {
        self.buffer.push_str(&value.to_string());
        self.buffer.push('\n');
    }

    /// Append a single character.
    pub fn print_char(&mut self, value: char) {
        self.buffer.push(value);
    }

    /// Append a bare newline.
    pub fn newline(&mut self) {
        self.buffer.push('\n');
    }

    /// Append one raw byte, as a low-level stream write would.
    pub fn write_byte(&mut self, value: u8) {
        self.buffer.push(char::from(value));
    }

    /// Record a termination request without terminating anything.
    ///
    /// Only the first requested code is kept.
    pub fn exit(&mut self, code: i32) {
        if self.exit_code.is_none() {
            self.exit_code = Some(code);
        }
    }

    /// The first recorded termination code, if any.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Flushing is accepted and ignored; the buffer is always current.
    pub fn flush(&mut self) {}

    /// Discard everything captured so far.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.exit_code = None;
    }

    /// The captured output so far.
    #[must_use]
    pub fn snapshot(&self) -> &str {
        &self.buffer
    }

    /// Consume the sink and release the captured output.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Number of captured characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
