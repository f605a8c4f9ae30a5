//! Error kinds raised by the codecs in this crate.
//!
//! Every fallible operation returns [`anyhow::Result`]. When the failure comes from this crate
//! (rather than from an underlying reader or writer), the wrapped error is an [`Error`],
//! which can be recovered with [`anyhow::Error::downcast_ref`].
//!
//! ```
//! use packints::packed::FixedWidthArray;
//! use packints::Error;
//!
//! let e = FixedWidthArray::new(4, 0).unwrap_err();
//! assert!(matches!(e.downcast_ref::<Error>(), Some(Error::InvalidArgument(_))));
//! ```
use thiserror::Error;

/// Error kinds of the codecs.
///
/// Failures of the underlying byte streams are not wrapped here;
/// they travel as [`std::io::Error`] inside the [`anyhow::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An argument is out of the domain of the operation,
    /// e.g., a width outside `1..=64` or a decreasing Elias-Fano input.
    #[error("{0}")]
    InvalidArgument(String),

    /// The operation is not allowed in the current state,
    /// e.g., appending to a frozen buffer.
    #[error("{0}")]
    IllegalState(String),

    /// Decoded data is inconsistent, e.g., a block header announcing a width over 64.
    #[error("{0}")]
    CorruptData(String),
}

impl Error {
    pub(crate) fn invalid_argument<S: Into<String>>(msg: S) -> anyhow::Error {
        Self::InvalidArgument(msg.into()).into()
    }

    pub(crate) fn illegal_state<S: Into<String>>(msg: S) -> anyhow::Error {
        Self::IllegalState(msg.into()).into()
    }

    pub(crate) fn corrupt_data<S: Into<String>>(msg: S) -> anyhow::Error {
        Self::CorruptData(msg.into()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = Error::invalid_argument("width must be in 1..=64, but got 0.");
        assert_eq!(e.to_string(), "width must be in 1..=64, but got 0.");
        assert_eq!(
            e.downcast_ref::<Error>(),
            Some(&Error::InvalidArgument(
                "width must be in 1..=64, but got 0.".to_string()
            ))
        );
    }

    #[test]
    fn test_io_error_is_not_wrapped() {
        let e: anyhow::Error = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(e.downcast_ref::<Error>().is_none());
        assert_eq!(
            e.downcast_ref::<std::io::Error>().map(|x| x.kind()),
            Some(std::io::ErrorKind::UnexpectedEof)
        );
    }
}
