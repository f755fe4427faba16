use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library
/// can potentially return.
///
/// This enum covers everything that can go wrong while parsing a class file,
/// rewriting its constant pool, defining it in a sandbox namespace, or running
/// its entry routine. Each variant provides specific context about the failure
/// mode to enable appropriate error handling.
///
/// # Error Categories
///
/// ## Parsing Errors
/// - [`Error::Truncated`] - A declared length exceeds the remaining bytes
/// - [`Error::BadMagic`] - The header does not carry the class file signature
/// - [`Error::UnknownTag`] - A constant pool tag that cannot be skipped over
/// - [`Error::Malformed`] - Corrupted or structurally invalid class data
///
/// ## Rewriting Errors
/// - [`Error::TargetNotFound`] - No pool entry referenced the target name
///   (only returned by callers that opt into the strict policy; the rewriter
///   itself reports a substitution count instead)
///
/// ## Loading Errors
/// - [`Error::NoEntryPoint`] - The class has no runnable `static main`
/// - [`Error::ClassNotFound`] - A symbolic reference did not resolve inside
///   the throwaway namespace
///
/// ## Execution Errors
/// - [`Error::Thrown`] - The sandboxed code raised a failure it did not handle
/// - [`Error::Timeout`] - The instruction budget or deadline was exhausted
/// - [`Error::RecursionLimit`] - The sandboxed call stack grew past its bound
/// - [`Error::Unsupported`] - The entry routine used a bytecode feature the
///   embedded runtime does not carry
///
/// # Examples
///
/// ```rust
/// use classpatch::{classfile::ClassFile, Error};
///
/// match ClassFile::parse(vec![0xDE, 0xAD, 0xBE, 0xEF]) {
///     Err(Error::BadMagic(magic)) => assert_eq!(magic, 0xDEAD_BEEF),
///     _ => panic!("expected BadMagic"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An out of bound read would have occurred.
    ///
    /// A declared length (pool entry payload, attribute length, code length)
    /// exceeds the bytes remaining in the buffer. This is a safety check to
    /// prevent overruns when parsing damaged or hostile input.
    #[error("Truncated input - a declared length exceeds the remaining bytes")]
    Truncated,

    /// The header does not match the class file signature.
    ///
    /// Class files begin with the 4-byte magic `0xCAFEBABE`. The associated
    /// value is the word that was actually read.
    #[error("Bad magic - expected 0xCAFEBABE, found 0x{0:08X}")]
    BadMagic(u32),

    /// A constant pool tag outside the standard set was encountered.
    ///
    /// Every pool entry's length depends on its tag, so a tag this library
    /// does not recognize cannot be skipped over without corrupting the
    /// offsets of everything behind it. Tags that are merely uninteresting
    /// are preserved as opaque entries instead of rejected.
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownTag {
        /// The unrecognized tag byte
        tag: u8,
        /// The 1-based pool index at which it appeared
        index: u16,
    },

    /// The class data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// No constant pool entry referenced the target name.
    ///
    /// The rewriter treats an absent target as a no-op pass-through and
    /// reports a substitution count of zero; this variant exists for callers
    /// that decide zero substitutions is fatal for their use case.
    #[error("Redirection target '{0}' not referenced by any constant pool entry")]
    TargetNotFound(String),

    /// The class defines no runnable entry routine.
    ///
    /// Entry resolution looks for a `static main` method carrying a `Code`
    /// attribute. The associated value names the class that was searched.
    #[error("No entry point - class '{0}' has no runnable static main")]
    NoEntryPoint(String),

    /// A symbolic reference did not resolve inside the throwaway namespace.
    ///
    /// The namespace only knows the classes defined into it plus the single
    /// published sink class; anything else - including `java/lang/System`
    /// when the redirection left it untouched - fails resolution here.
    #[error("Class '{0}' is not defined in this namespace")]
    ClassNotFound(String),

    /// The sandboxed code raised a failure it did not handle.
    ///
    /// Carries the throwable's internal class name and its message, if one
    /// was attached during construction.
    #[error("{class}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Thrown {
        /// Internal name of the throwable's class
        class: String,
        /// The message passed to the throwable's constructor, if any
        message: Option<String>,
    },

    /// Execution exceeded its instruction budget or wall-clock deadline.
    ///
    /// The invoke step is not natively cancellable, so runaway entry routines
    /// are cut off by the limits configured on the sandbox.
    #[error("Execution exceeded the configured instruction budget or deadline")]
    Timeout,

    /// Reached the maximum sandboxed call depth allowed.
    ///
    /// The associated value shows the limit that was reached.
    #[error("Reached the maximum call depth allowed - {0}")]
    RecursionLimit(usize),

    /// The entry routine used a feature the embedded runtime does not carry.
    ///
    /// The runtime implements the instruction subset a small output-producing
    /// program needs; anything beyond that is reported rather than guessed at.
    #[error("Unsupported - {0}")]
    Unsupported(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading class bytes
    /// from disk.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
