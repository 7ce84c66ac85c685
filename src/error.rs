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

/// The generic Error type, which provides coverage for all recoverable errors this library can
/// return.
///
/// Conditions that must never be recovered from are deliberately absent: a failed lazy
/// initializer goes through [`crate::utils::fatal`] and terminates the process, and misuse of
/// the worklist (handing it stale element handles) is a debug assertion.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::TruncatedInput`] - The buffer ran out before a decode completed
/// - [`Error::InvalidOffset`] - A start offset lies outside the buffer
/// - [`Error::Malformed`] - Structurally invalid data (bad tag, invalid UTF-8, ...)
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Rewriting Errors
/// - [`Error::IterationLimit`] - A rewrite did not reach a fixpoint within its step budget
/// - [`Error::Rewrite`] - A rewrite rule reported a failure
///
/// # Examples
///
/// ```rust
/// use optcore::{Error, Reader};
///
/// let data = [0x01, 0x00];
/// let mut reader = Reader::new(&data);
///
/// match reader.read_next::<u32>() {
///     Err(Error::TruncatedInput { needed, available }) => {
///         assert_eq!((needed, available), (4, 2));
///     }
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Decoding Errors
    /// The input ended before a requested decode could complete.
    ///
    /// Returned by every [`crate::Reader`] operation that needs more bytes than remain. The
    /// cursor is left where it was, so the caller can report the malformed input precisely.
    ///
    /// # Fields
    ///
    /// * `needed` - Number of bytes the decode required
    /// * `available` - Number of bytes that were left in the buffer
    #[error("Truncated input - needed {needed} bytes, {available} available")]
    TruncatedInput {
        /// Bytes required by the failed decode
        needed: usize,
        /// Bytes remaining when the decode was attempted
        available: usize,
    },

    /// Encountered an offset that lies outside the input buffer.
    #[error("Could not retrieve a valid offset!")]
    InvalidOffset,

    /// The input is damaged and could not be decoded.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
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

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening or mapping a serialized module.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    // Rewriting Errors
    /// A rewrite did not reach its fixpoint within the configured number of steps.
    ///
    /// The associated value is the step limit that was reached. This usually means two rules
    /// keep undoing each other's work.
    #[error("Rewrite did not reach a fixpoint within {0} steps")]
    IterationLimit(usize),

    /// A rewrite rule failed while processing an element.
    ///
    /// # Fields
    ///
    /// * `rule` - Name of the failing rule
    /// * `message` - Description provided by the rule
    #[error("Rewrite rule '{rule}' failed: {message}")]
    Rewrite {
        /// Name of the rule that failed
        rule: &'static str,
        /// Failure description
        message: String,
    },

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_macro_records_location() {
        let err = malformed_error!("bad tag {}", 7);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad tag 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn display_messages() {
        let err = Error::TruncatedInput {
            needed: 4,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Truncated input - needed 4 bytes, 2 available"
        );

        assert_eq!(
            Error::IterationLimit(10).to_string(),
            "Rewrite did not reach a fixpoint within 10 steps"
        );

        let err = Error::Rewrite {
            rule: "fold",
            message: "division by zero".to_string(),
        };
        assert_eq!(err.to_string(), "Rewrite rule 'fold' failed: division by zero");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::FileError(_)));
    }
}
