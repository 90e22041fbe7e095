use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // DNS wire format errors
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("name is not in canonical format (it must end with a .)")]
    ErrNonCanonicalName,
    #[error("character string exceeds maximum length (255)")]
    ErrStringTooLong,
    #[error("parsing/packing of this section has completed")]
    ErrSectionDone,
    #[error("parsing/packing of this type isn't available yet")]
    ErrNotStarted,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("too many Questions")]
    ErrTooManyQuestions,
    #[error("too many Answers")]
    ErrTooManyAnswers,
    #[error("too many Authorities")]
    ErrTooManyAuthorities,
    #[error("too many Additionals")]
    ErrTooManyAdditionals,
    #[error("nil resource body")]
    ErrNilResourceBody,

    // Transport and session errors
    #[error("no multicast-capable interface is available")]
    ErrNoInterface,
    #[error("{family}: failed to join multicast group on any interface")]
    ErrJoinMulticast { family: &'static str },
    #[error("no usable transport: both IPv4 and IPv6 are unavailable")]
    ErrTransportUnavailable,
    #[error("periodic query aborted: backoff exhausted")]
    ErrBackoffExhausted,

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
