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

pub(crate) use malformed_error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most failures inside a pass are not errors at all: a shape that does not match or a
/// sandbox evaluation that throws is logged and the rewrite is skipped. The variants below
/// cover what cannot be recovered locally.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Parse`] - The source is not valid in the supported grammar
/// - [`Error::Io`] - Filesystem I/O errors
///
/// ## Pipeline Errors
/// - [`Error::UnsupportedOperator`] - Fatal, aborts the run
/// - [`Error::Sandbox`] - A snippet could not be evaluated
/// - [`Error::Malformed`] - A tree invariant was violated
///
/// # Examples
///
/// ```rust
/// use jsdeob::{deobfuscation::DeobfuscationEngine, Error};
///
/// let engine = DeobfuscationEngine::default();
/// match engine.process("var a = ;") {
///     Err(Error::Parse { line, column, .. }) => assert_eq!((line, column), (1, 9)),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input could not be parsed.
    ///
    /// Positions are 1-based; columns count characters, not bytes.
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        /// Description of the offending token
        message: String,
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
    },

    /// Binary folding met an operator it refuses to evaluate on numbers.
    ///
    /// This is the only error that aborts a pipeline run.
    #[error("Unsupported binary operator '{0}' with numeric operands")]
    UnsupportedOperator(String),

    /// The sandbox failed to evaluate a snippet.
    ///
    /// Covers thrown exceptions, runtime limit violations and values that could not be
    /// converted back.
    #[error("Sandbox evaluation failed: {0}")]
    Sandbox(String),

    /// The syntax tree violated an internal invariant.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns true if the error must abort the pipeline.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::UnsupportedOperator(_))
    }
}
