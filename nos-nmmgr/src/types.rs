//! Handler header field types
//!
//! Type codes, version words and flag bits shared by every registered
//! handler. All three are plain `u32` words in the header layout.

use core::fmt;

use bitflags::bitflags;

use crate::error::{NmmgrError, Result};

/// Size of the pathname field, terminating NUL included
pub const NAME_MAX: usize = 256;

/// Handler interface kind
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HandlerType(u32);

impl HandlerType {
    /// Unknown handler
    pub const UNKNOWN: Self = Self(0x0000);
    /// Mounted file system
    pub const VFS: Self = Self(0x0010);
    /// Block device
    pub const BLOCKDEV: Self = Self(0x0020);
    /// Singleton service (e.g. /dev/irq)
    pub const SINGLETON: Self = Self(0x0030);
    /// Symbol table
    pub const SYMTAB: Self = Self(0x0040);
    /// First user-defined type; everything below is reserved
    pub const SYS_MAX: Self = Self(0x10000);

    /// Create a user-defined type code
    pub const fn user(code: u32) -> Result<Self> {
        if code < Self::SYS_MAX.0 {
            return Err(NmmgrError::InvalidType(code));
        }
        Ok(Self(code))
    }

    /// Reinterpret a raw header word
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_system(self) -> bool {
        self.0 < Self::SYS_MAX.0
    }

    pub const fn is_user(self) -> bool {
        !self.is_system()
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => write!(f, "unknown"),
            Self::VFS => write!(f, "vfs"),
            Self::BLOCKDEV => write!(f, "blockdev"),
            Self::SINGLETON => write!(f, "singleton"),
            Self::SYMTAB => write!(f, "symtab"),
            Self(code) if code >= Self::SYS_MAX.0 => write!(f, "user:{:#x}", code),
            Self(code) => write!(f, "reserved:{:#x}", code),
        }
    }
}

/// Interface revision
///
/// The top 16 bits are the major revision: different majors are totally
/// incompatible. The low 16 bits are the minor revision, which only
/// distinguishes mostly-compatible revisions of the implementing code.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(u32);

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self(((major as u32) << 16) | minor as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn minor(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// Whether this revision can serve a consumer built against `required`
    pub const fn is_compatible_with(self, required: Version) -> bool {
        self.major() == required.major() && self.minor() >= required.minor()
    }

    /// Reject a record whose major revision differs from `major`
    pub fn require_major(self, major: u16) -> Result<()> {
        if self.major() != major {
            return Err(NmmgrError::VersionMismatch { required: major, found: self });
        }
        Ok(())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

bitflags! {
    /// Handler flag bits
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HandlerFlags: u32 {
        /// Record memory is released when it leaves the registry
        const NEEDS_FREE = 0x0000_0001;
        /// Record is exposed under /dev
        const IN_DEV     = 0x0000_0002;
        /// Record is an alias of another handler
        const ALIAS      = 0x0000_0004;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_builtin_types_are_system() {
        for kind in [
            HandlerType::UNKNOWN,
            HandlerType::VFS,
            HandlerType::BLOCKDEV,
            HandlerType::SINGLETON,
            HandlerType::SYMTAB,
        ] {
            assert!(kind.is_system());
            assert!(!kind.is_user());
        }
        assert!(HandlerType::SYS_MAX.is_user());
    }

    #[test]
    fn test_user_type() {
        assert_eq!(HandlerType::user(0x10000).unwrap().raw(), 0x10000);
        assert_eq!(HandlerType::user(0x12345).unwrap().to_string(), "user:0x12345");
        assert_eq!(HandlerType::user(0x30), Err(NmmgrError::InvalidType(0x30)));
        assert_eq!(HandlerType::from_raw(0x50).to_string(), "reserved:0x50");
        assert_eq!(HandlerType::SINGLETON.to_string(), "singleton");
    }

    #[test]
    fn test_version_halves() {
        let v = Version::from_raw(0x0001_0002);
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 2);
        assert_eq!(Version::new(1, 2), v);
        assert_eq!(v.to_string(), "1.2");
    }

    #[test]
    fn test_version_compatibility() {
        let v = Version::new(2, 5);
        assert!(v.is_compatible_with(Version::new(2, 0)));
        assert!(v.is_compatible_with(Version::new(2, 5)));
        assert!(!v.is_compatible_with(Version::new(2, 6)));
        assert!(!v.is_compatible_with(Version::new(1, 0)));

        assert!(v.require_major(2).is_ok());
        assert_eq!(
            v.require_major(3),
            Err(NmmgrError::VersionMismatch { required: 3, found: v })
        );
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(HandlerFlags::NEEDS_FREE.bits(), 1);
        assert_eq!(HandlerFlags::IN_DEV.bits(), 2);
        assert_eq!(HandlerFlags::ALIAS.bits(), 4);
        assert!(HandlerFlags::default().is_empty());
    }
}
