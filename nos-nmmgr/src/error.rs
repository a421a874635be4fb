//! Error handling for the name manager
//!
//! Lifecycle violations (operating on a registry that is not active) are
//! kernel bugs and panic instead of appearing here.

use core::fmt;

use crate::types::{HandlerType, Version, NAME_MAX};

/// Reasons a pathname cannot be stored in a handler header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Empty pathname
    Empty,
    /// Pathname does not fit in `NAME_MAX - 1` bytes
    TooLong(usize),
    /// Pathname contains an interior NUL byte
    ContainsNul,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "empty pathname"),
            NameError::TooLong(len) => {
                write!(f, "pathname of {} bytes exceeds limit of {}", len, NAME_MAX - 1)
            }
            NameError::ContainsNul => write!(f, "pathname contains a NUL byte"),
        }
    }
}

/// Name manager error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NmmgrError {
    /// No record with that name or identity is registered
    NotFound,
    /// A live record already uses this pathname
    AlreadyExists,
    /// Pathname rejected
    InvalidName(NameError),
    /// Code is not usable as a user handler type
    InvalidType(u32),
    /// Header type does not agree with the payload or the caller's expectation
    TypeMismatch {
        expected: HandlerType,
        found: HandlerType,
    },
    /// Major revision differs from what the consumer supports
    VersionMismatch {
        required: u16,
        found: Version,
    },
    /// `ALIAS` flag set without an alias payload, or the reverse
    AliasMismatch,
    /// Owner-managed record carries `NEEDS_FREE`
    OwnershipMismatch,
    /// Alias target has been dropped
    DanglingAlias,
    /// Alias chain still unresolved after the given number of hops
    AliasDepthExceeded(usize),
}

impl fmt::Display for NmmgrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NmmgrError::NotFound => write!(f, "Not found"),
            NmmgrError::AlreadyExists => write!(f, "Name already registered"),
            NmmgrError::InvalidName(err) => write!(f, "Invalid name: {}", err),
            NmmgrError::InvalidType(code) => write!(f, "Invalid handler type: {:#x}", code),
            NmmgrError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            NmmgrError::VersionMismatch { required, found } => {
                write!(f, "Version mismatch: required major {}, found {}", required, found)
            }
            NmmgrError::AliasMismatch => write!(f, "ALIAS flag does not match payload"),
            NmmgrError::OwnershipMismatch => {
                write!(f, "Owner-managed handler must not carry NEEDS_FREE")
            }
            NmmgrError::DanglingAlias => write!(f, "Alias target no longer exists"),
            NmmgrError::AliasDepthExceeded(depth) => {
                write!(f, "Alias chain deeper than {} hops", depth)
            }
        }
    }
}

impl From<NameError> for NmmgrError {
    fn from(err: NameError) -> Self {
        NmmgrError::InvalidName(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NmmgrError {}

/// Result type for name manager operations
pub type Result<T> = core::result::Result<T, NmmgrError>;
