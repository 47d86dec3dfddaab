use core::fmt;

#[cfg(debug_assertions)]
mod error_impl {
    use super::{Error, ErrorExt, ErrorKind};

    pub type ErrorInner = alloc::boxed::Box<Chained>;

    #[derive(Clone, Debug)]
    pub struct Chained {
        this: &'static ErrorKind,
        src: Option<Error>,
    }
    impl ErrorExt for Error {
        #[inline]
        fn kind(&self) -> ErrorKind {
            *self.inner.this
        }
        #[inline]
        fn source(&self) -> Option<&Error> {
            self.inner.src.as_ref()
        }
        #[inline]
        fn chain_ctx(self, ctx: &'static ErrorKind) -> Error {
            let position = self.position;
            Error {
                inner: Chained {
                    this: ctx,
                    src: Some(self),
                }
                .into(),
                position,
            }
        }
    }
    impl From<&'static ErrorKind> for Error {
        #[inline]
        fn from(kind: &'static ErrorKind) -> Error {
            Error {
                inner: Chained {
                    this: kind,
                    src: None,
                }
                .into(),
                position: None,
            }
        }
    }
}

#[cfg(not(debug_assertions))]
mod error_impl {
    use super::{Error, ErrorExt, ErrorKind};

    /// In release mode errors are just a thin pointer plus the failing offset.
    pub type ErrorInner = &'static ErrorKind;
    impl ErrorExt for Error {
        #[inline]
        fn kind(&self) -> ErrorKind {
            *self.inner
        }
        #[inline]
        fn source(&self) -> Option<&Error> {
            None
        }
        #[inline]
        fn chain_ctx(self, ctx: &'static ErrorKind) -> Error {
            Error {
                inner: ctx,
                position: self.position,
            }
        }
    }
    impl From<&'static ErrorKind> for Error {
        #[inline]
        fn from(inner: &'static ErrorKind) -> Error {
            Error {
                inner,
                position: None,
            }
        }
    }
}

/// Represents an error while decoding a Standard Midi File.
///
/// This type wraps an `ErrorKind` and includes error chain data in debug mode.
/// In release mode it is a thin wrapper around `ErrorKind`, so the `Error::source` method
/// always returns `None`.
///
/// Errors returned by [`decode`](fn.decode.html) also carry the byte offset into the file at
/// which decoding stopped.
///
/// Every error is fatal to the parse that produced it: nothing that was emitted to the sink before
/// the error should be considered a complete picture of the file.
#[derive(Clone)]
pub struct Error {
    inner: self::error_impl::ErrorInner,
    position: Option<usize>,
}
impl Error {
    /// Create a new error with the given `ErrorKind`.
    #[inline]
    pub fn new(kind: &'static ErrorKind) -> Error {
        Error::from(kind)
    }

    /// More information about the error itself.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        ErrorExt::kind(self)
    }

    /// The underlying cause for this error.
    ///
    /// Note that this method will always return `None` in release mode, since error chains
    /// are not tracked in release.
    #[inline]
    pub fn source(&self) -> Option<&Error> {
        ErrorExt::source(self)
    }

    /// Absolute offset into the file where decoding failed, if known.
    #[inline]
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Attach the failing file offset, unless one is already present.
    pub(crate) fn at(mut self, position: usize) -> Error {
        self.position.get_or_insert(position);
        self
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)?;
        if let Some(pos) = self.position {
            write!(f, " (at byte {})", pos)?;
        }
        Ok(())
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)?;
        let mut maybe_src = self.source();
        while let Some(src) = maybe_src {
            writeln!(f)?;
            write!(f, "  caused by: {}", src.kind())?;
            maybe_src = src.source();
        }
        Ok(())
    }
}
#[cfg(feature = "std")]
impl std::error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

trait ErrorExt {
    fn kind(&self) -> ErrorKind;
    fn source(&self) -> Option<&Error>;
    fn chain_ctx(self, ctx: &'static ErrorKind) -> Error;
}

/// The type of error that occurred while decoding.
///
/// Errors are broadly categorized into 2 classes, and specific error info is provided as a
/// non-normative string literal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// The byte stream violates the Standard Midi File format: it is truncated, has a wrong chunk
    /// magic, inconsistent lengths or an out-of-range field.
    #[error("bad midi file: {0}")]
    BadMidiFile(&'static str),

    /// The file is syntactically valid, but uses something outside of what this decoder supports
    /// (an unknown SMPTE frame rate, a format above 2, an oversized time signature denominator...).
    #[error("unsupported midi: {0}")]
    UnsupportedMidi(&'static str),
}
impl ErrorKind {
    /// Get the informative message on what exact part of the MIDI format was not respected.
    #[inline]
    pub fn message(&self) -> &'static str {
        match *self {
            ErrorKind::BadMidiFile(msg) => msg,
            ErrorKind::UnsupportedMidi(msg) => msg,
        }
    }

    /// Whether the file itself is broken, as opposed to merely unsupported.
    #[inline]
    pub fn is_bad_file(&self) -> bool {
        matches!(self, ErrorKind::BadMidiFile(_))
    }
}

macro_rules! err_bad {
    ($msg:expr) => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::BadMidiFile($msg);
        ERR_KIND
    }};
}
macro_rules! err_unsupported {
    ($msg:expr) => {{
        const ERR_KIND: &'static ErrorKind = &ErrorKind::UnsupportedMidi($msg);
        ERR_KIND
    }};
}

pub(crate) trait ResultExt<T> {
    fn context(self, ctx: &'static ErrorKind) -> StdResult<T, Error>;
}
impl<T> ResultExt<T> for StdResult<T, Error> {
    #[inline]
    fn context(self, ctx: &'static ErrorKind) -> StdResult<T, Error> {
        self.map_err(|err| err.chain_ctx(ctx))
    }
}
impl<T> ResultExt<T> for StdResult<T, &'static ErrorKind> {
    #[inline]
    fn context(self, ctx: &'static ErrorKind) -> StdResult<T, Error> {
        self.map_err(|errkind| Error::from(errkind).chain_ctx(ctx))
    }
}

/// The result type used by the MIDI decoder.
pub type Result<T> = StdResult<T, Error>;
pub(crate) use core::result::Result as StdResult;
