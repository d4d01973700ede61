//! Error types for encoding and decoding.
//!
//! Every failure carries an [`ErrorKind`] plus the structural path (field
//! names, array indices, map keys) from the outermost value to the place
//! where decoding stopped. Generated code prefixes the path as the error
//! bubbles up through nested values.

use crate::wire::WireType;
use std::fmt;
use thiserror::Error;

/// Result type alias for wire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by user-supplied conversions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One step of the path to a failing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A struct field, by wire name.
    Field(&'static str),
    /// An array or slice element.
    Index(usize),
    /// A map entry with a textual key.
    Key(String),
    /// A map entry whose key has no textual form, by ordinal.
    Entry(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{name}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(k) => write!(f, "[{k:?}]"),
            PathSegment::Entry(i) => write!(f, "[#{i}]"),
        }
    }
}

/// Which kind of container tripped a cardinality limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Map,
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Array => f.write_str("array"),
            Container::Map => f.write_str("map"),
        }
    }
}

/// The failure itself, without location.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Input ended before the value was complete.
    #[error("buffer too short: needed {needed} byte(s), {available} available")]
    ShortBuffer { needed: usize, available: usize },

    /// The wire held a different kind of value than the target expects.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: WireType, found: WireType },

    /// A container header announced more elements than allowed.
    #[error("{container} length {count} exceeds limit {limit}")]
    CardinalityLimitExceeded {
        container: Container,
        count: u32,
        limit: u32,
    },

    /// A positional sequence had the wrong number of elements.
    #[error("wrong number of elements: expected {expected}, found {found}")]
    ArityMismatch { expected: u32, found: u32 },

    /// A closed-set discriminator named no known variant.
    #[error("unknown variant {discriminator:?}")]
    UnknownVariant { discriminator: String },

    /// A user conversion (shim, capability trait, interceptor) failed.
    #[error("conversion failed: {0}")]
    Conversion(#[source] BoxError),

    /// A wire integer does not fit the target type.
    #[error("integer {value} overflows {target}")]
    IntOverflow { value: i128, target: &'static str },

    /// A string was not valid UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    /// An extension block had the wrong type or payload.
    #[error("invalid extension: {0}")]
    InvalidExtension(String),

    /// Schema-less decoding hit its nesting ceiling.
    #[error("value nested deeper than {0} levels")]
    DepthExceeded(usize),

    /// Bytes remained after a complete top-level value.
    #[error("{0} trailing byte(s) after value")]
    TrailingBytes(usize),

    /// The underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A located wire error.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    path: Vec<PathSegment>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Path from the outermost value to the failure.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Prepends path segments, outermost first.
    pub fn prefixed<I>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = PathSegment>,
    {
        let mut path: Vec<PathSegment> = segments.into_iter().collect();
        path.append(&mut self.path);
        self.path = path;
        self
    }

    pub fn short_buffer(needed: usize, available: usize) -> Self {
        Self::new(ErrorKind::ShortBuffer { needed, available })
    }

    pub fn type_mismatch(expected: WireType, found: WireType) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, found })
    }

    pub fn limit_exceeded(container: Container, count: u32, limit: u32) -> Self {
        Self::new(ErrorKind::CardinalityLimitExceeded {
            container,
            count,
            limit,
        })
    }

    pub fn arity(expected: u32, found: u32) -> Self {
        Self::new(ErrorKind::ArityMismatch { expected, found })
    }

    pub fn unknown_variant(discriminator: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownVariant {
            discriminator: discriminator.into(),
        })
    }

    pub fn conversion<E: Into<BoxError>>(err: E) -> Self {
        Self::new(ErrorKind::Conversion(err.into()))
    }

    pub fn int_overflow(value: impl Into<i128>, target: &'static str) -> Self {
        Self::new(ErrorKind::IntOverflow {
            value: value.into(),
            target,
        })
    }

    pub fn invalid_extension(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidExtension(message.into()))
    }

    pub fn is_short_buffer(&self) -> bool {
        matches!(self.kind, ErrorKind::ShortBuffer { .. })
    }

    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::CardinalityLimitExceeded { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.kind);
        }
        let mut path = String::new();
        for segment in &self.path {
            path.push_str(&segment.to_string());
        }
        write!(f, "{}: {}", path.trim_start_matches('.'), self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path() {
        let err = Error::type_mismatch(WireType::Str, WireType::Uint)
            .prefixed([PathSegment::Index(2)])
            .prefixed([PathSegment::Field("tags")])
            .prefixed([PathSegment::Field("user")]);
        assert_eq!(
            err.to_string(),
            "user.tags[2]: type mismatch: expected str, found uint"
        );
        assert_eq!(err.path().len(), 3);
    }

    #[test]
    fn display_without_path() {
        let err = Error::arity(3, 2);
        assert_eq!(
            err.to_string(),
            "wrong number of elements: expected 3, found 2"
        );
    }

    #[test]
    fn conversion_keeps_source() {
        let err = Error::conversion("bad celsius");
        assert!(matches!(err.kind(), ErrorKind::Conversion(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
