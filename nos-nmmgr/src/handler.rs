//! Handler records
//!
//! Every registered entry starts with a [`HandlerHeader`]. The header layout
//! is the stable common prefix that specialised handler kinds rely on, so it
//! is `repr(C)` and its offsets are checked at compile time. The type-specific
//! remainder of a record is a [`Payload`] variant that the registry never
//! looks into.

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};
use core::any::Any;
use core::fmt;
use core::mem::{offset_of, size_of};

use static_assertions::const_assert_eq;

use crate::error::{NameError, NmmgrError, Result};
use crate::types::{HandlerFlags, HandlerType, Version, NAME_MAX};

/// Common header carried by every handler
#[repr(C)]
#[derive(Clone, PartialEq, Eq)]
pub struct HandlerHeader {
    /// NUL-padded path name
    pathname: [u8; NAME_MAX],
    /// Owning process (0 == static)
    owner_id: i32,
    version: Version,
    flags: HandlerFlags,
    kind: HandlerType,
}

const_assert_eq!(offset_of!(HandlerHeader, pathname), 0);
const_assert_eq!(offset_of!(HandlerHeader, owner_id), NAME_MAX);
const_assert_eq!(offset_of!(HandlerHeader, version), NAME_MAX + 4);
const_assert_eq!(offset_of!(HandlerHeader, flags), NAME_MAX + 8);
const_assert_eq!(offset_of!(HandlerHeader, kind), NAME_MAX + 12);
const_assert_eq!(size_of::<HandlerHeader>(), NAME_MAX + 16);
const_assert_eq!(offset_of!(Handler, header), 0);

/// Check that `name` fits in the header's pathname field
pub fn validate_pathname(name: &str) -> core::result::Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > NAME_MAX - 1 {
        return Err(NameError::TooLong(name.len()));
    }
    if name.as_bytes().contains(&0) {
        return Err(NameError::ContainsNul);
    }
    Ok(())
}

impl HandlerHeader {
    /// Create a static, version 0 header with no flags
    pub fn new(pathname: &str, kind: HandlerType) -> Result<Self> {
        validate_pathname(pathname)?;

        let mut buf = [0u8; NAME_MAX];
        buf[..pathname.len()].copy_from_slice(pathname.as_bytes());

        Ok(Self {
            pathname: buf,
            owner_id: 0,
            version: Version::default(),
            flags: HandlerFlags::empty(),
            kind,
        })
    }

    pub fn with_owner(mut self, owner_id: i32) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_flags(mut self, flags: HandlerFlags) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn set_flags(&mut self, flags: HandlerFlags) {
        self.flags.insert(flags);
    }

    /// Raw pathname bytes without the NUL padding
    pub fn pathname_bytes(&self) -> &[u8] {
        let len = self
            .pathname
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX);
        &self.pathname[..len]
    }

    pub fn pathname(&self) -> &str {
        // Only ever filled from a validated &str.
        core::str::from_utf8(self.pathname_bytes()).unwrap_or_default()
    }

    pub fn owner_id(&self) -> i32 {
        self.owner_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn flags(&self) -> HandlerFlags {
        self.flags
    }

    pub fn kind(&self) -> HandlerType {
        self.kind
    }

    /// Kernel-owned, never freed by an owner exiting
    pub fn is_static(&self) -> bool {
        self.owner_id == 0
    }

    pub fn is_alias(&self) -> bool {
        self.flags.contains(HandlerFlags::ALIAS)
    }

    pub fn in_dev(&self) -> bool {
        self.flags.contains(HandlerFlags::IN_DEV)
    }

    pub fn needs_free(&self) -> bool {
        self.flags.contains(HandlerFlags::NEEDS_FREE)
    }
}

impl fmt::Debug for HandlerHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerHeader")
            .field("pathname", &self.pathname())
            .field("owner_id", &self.owner_id)
            .field("version", &self.version)
            .field("flags", &self.flags)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Opaque interface state owned by a handler
pub type Opaque = Box<dyn Any + Send + Sync>;

/// Type-specific remainder of a handler record
pub enum Payload {
    /// Mounted file system
    Vfs(Opaque),
    /// Block device
    BlockDev(Opaque),
    /// Singleton service
    Singleton(Opaque),
    /// Symbol table
    Symtab(Opaque),
    /// User-defined interface (type code at or above `SYS_MAX`)
    User(Opaque),
    /// Named redirect to another handler; never owns the target
    Alias(Weak<Handler>),
    /// No interface state (`UNKNOWN` handlers)
    None,
}

impl Payload {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Payload::Vfs(_) => "Vfs",
            Payload::BlockDev(_) => "BlockDev",
            Payload::Singleton(_) => "Singleton",
            Payload::Symtab(_) => "Symtab",
            Payload::User(_) => "User",
            Payload::Alias(_) => "Alias",
            Payload::None => "None",
        }
    }

    fn opaque(&self) -> Option<&Opaque> {
        match self {
            Payload::Vfs(p)
            | Payload::BlockDev(p)
            | Payload::Singleton(p)
            | Payload::Symtab(p)
            | Payload::User(p) => Some(p),
            Payload::Alias(_) | Payload::None => None,
        }
    }

    /// Check that the header describes this payload
    fn check(&self, header: &HandlerHeader) -> Result<()> {
        let kind = header.kind();
        let expected = match self {
            Payload::Vfs(_) => Some(HandlerType::VFS),
            Payload::BlockDev(_) => Some(HandlerType::BLOCKDEV),
            Payload::Singleton(_) => Some(HandlerType::SINGLETON),
            Payload::Symtab(_) => Some(HandlerType::SYMTAB),
            Payload::None => Some(HandlerType::UNKNOWN),
            Payload::User(_) => {
                if kind.is_user() {
                    None
                } else {
                    Some(HandlerType::SYS_MAX)
                }
            }
            // An alias takes on whatever kind its target has
            Payload::Alias(_) => None,
        };
        if let Some(expected) = expected {
            if expected != kind {
                return Err(NmmgrError::TypeMismatch { expected, found: kind });
            }
        }

        let is_alias = matches!(self, Payload::Alias(_));
        if is_alias != header.is_alias() {
            return Err(NmmgrError::AliasMismatch);
        }
        Ok(())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant_name())
    }
}

/// A registered handler: common header plus type-specific payload
#[repr(C)]
pub struct Handler {
    header: HandlerHeader,
    payload: Payload,
}

impl Handler {
    /// Build a record, rejecting headers that disagree with the payload
    pub fn new(header: HandlerHeader, payload: Payload) -> Result<Self> {
        payload.check(&header)?;
        Ok(Self { header, payload })
    }

    /// Build an alias record pointing at `target`
    ///
    /// The header's kind is replaced with the target's so consumers that only
    /// inspect the header see the interface they will end up talking to.
    pub fn alias(header: HandlerHeader, target: &Arc<Handler>) -> Result<Self> {
        let flags = header.flags() | HandlerFlags::ALIAS;
        let mut header = header.with_flags(flags);
        header.kind = target.kind();
        Self::new(header, Payload::Alias(Arc::downgrade(target)))
    }

    pub fn header(&self) -> &HandlerHeader {
        &self.header
    }

    pub(crate) fn header_mut(&mut self) -> &mut HandlerHeader {
        &mut self.header
    }

    pub fn pathname(&self) -> &str {
        self.header.pathname()
    }

    pub fn kind(&self) -> HandlerType {
        self.header.kind()
    }

    pub fn version(&self) -> Version {
        self.header.version()
    }

    pub fn flags(&self) -> HandlerFlags {
        self.header.flags()
    }

    pub fn owner_id(&self) -> i32 {
        self.header.owner_id()
    }

    pub fn is_alias(&self) -> bool {
        self.header.is_alias()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Concrete interface state of a non-alias record
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.opaque()?.downcast_ref::<T>()
    }

    /// Follow an alias one level
    ///
    /// Returns `None` for non-alias records and for aliases whose target has
    /// already been dropped.
    pub fn alias_target(&self) -> Option<Arc<Handler>> {
        match &self.payload {
            Payload::Alias(target) => target.upgrade(),
            _ => None,
        }
    }

    /// Follow an alias chain to the real handler
    ///
    /// A non-alias record resolves to itself. At most `max_depth` hops are
    /// taken.
    pub fn resolve(self: &Arc<Self>, max_depth: usize) -> Result<Arc<Handler>> {
        let mut current = Arc::clone(self);
        for _ in 0..max_depth {
            if !current.is_alias() {
                return Ok(current);
            }
            current = current.alias_target().ok_or(NmmgrError::DanglingAlias)?;
        }
        if current.is_alias() {
            return Err(NmmgrError::AliasDepthExceeded(max_depth));
        }
        Ok(current)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    struct IrqService {
        irqs: u32,
    }

    fn irq_handler() -> Handler {
        let header = HandlerHeader::new("/dev/irq", HandlerType::SINGLETON)
            .unwrap()
            .with_version(Version::new(1, 0));
        Handler::new(header, Payload::Singleton(Box::new(IrqService { irqs: 16 }))).unwrap()
    }

    #[test]
    fn test_header_fields() {
        let header = HandlerHeader::new("/pc", HandlerType::VFS)
            .unwrap()
            .with_owner(7)
            .with_version(Version::from_raw(0x0002_0001))
            .with_flags(HandlerFlags::IN_DEV);
        assert_eq!(header.pathname(), "/pc");
        assert_eq!(header.pathname_bytes(), b"/pc");
        assert_eq!(header.owner_id(), 7);
        assert!(!header.is_static());
        assert_eq!(header.version().major(), 2);
        assert!(header.in_dev());
        assert!(!header.is_alias());
        assert!(!header.needs_free());
        assert_eq!(header.kind(), HandlerType::VFS);
    }

    #[test]
    fn test_pathname_limits() {
        assert_eq!(
            HandlerHeader::new("", HandlerType::VFS).unwrap_err(),
            NmmgrError::InvalidName(NameError::Empty)
        );
        assert_eq!(
            HandlerHeader::new("/a\0b", HandlerType::VFS).unwrap_err(),
            NmmgrError::InvalidName(NameError::ContainsNul)
        );

        let longest: String = core::iter::repeat('x').take(NAME_MAX - 1).collect();
        let header = HandlerHeader::new(&longest, HandlerType::VFS).unwrap();
        assert_eq!(header.pathname(), longest);

        let too_long: String = core::iter::repeat('x').take(NAME_MAX).collect();
        assert_eq!(
            HandlerHeader::new(&too_long, HandlerType::VFS).unwrap_err(),
            NmmgrError::InvalidName(NameError::TooLong(NAME_MAX))
        );
    }

    #[test]
    fn test_payload_must_match_kind() {
        let header = HandlerHeader::new("/dev/irq", HandlerType::VFS).unwrap();
        let err = Handler::new(header, Payload::Singleton(Box::new(0u32))).unwrap_err();
        assert_eq!(
            err,
            NmmgrError::TypeMismatch {
                expected: HandlerType::SINGLETON,
                found: HandlerType::VFS,
            }
        );

        let header = HandlerHeader::new("/ext", HandlerType::BLOCKDEV).unwrap();
        assert!(Handler::new(header, Payload::User(Box::new(0u32))).is_err());

        let kind = HandlerType::user(0x10001).unwrap();
        let header = HandlerHeader::new("/ext", kind).unwrap();
        assert!(Handler::new(header, Payload::User(Box::new(0u32))).is_ok());

        let header = HandlerHeader::new("/nothing", HandlerType::UNKNOWN).unwrap();
        assert!(Handler::new(header, Payload::None).is_ok());
    }

    #[test]
    fn test_alias_flag_must_match_payload() {
        let header = HandlerHeader::new("/dev/irq", HandlerType::SINGLETON)
            .unwrap()
            .with_flags(HandlerFlags::ALIAS);
        assert_eq!(
            Handler::new(header, Payload::Singleton(Box::new(0u32))).unwrap_err(),
            NmmgrError::AliasMismatch
        );

        let target = Arc::new(irq_handler());
        let header = HandlerHeader::new("/irq", HandlerType::SINGLETON).unwrap();
        assert_eq!(
            Handler::new(header, Payload::Alias(Arc::downgrade(&target))).unwrap_err(),
            NmmgrError::AliasMismatch
        );
    }

    #[test]
    fn test_header_is_record_prefix() {
        let handler = irq_handler();
        let record = &handler as *const Handler as *const u8;
        let header = handler.header() as *const HandlerHeader as *const u8;
        assert_eq!(record, header);
        assert_eq!(offset_of!(Handler, header), 0);
    }

    #[test]
    fn test_downcast() {
        let handler = irq_handler();
        assert_eq!(handler.downcast_ref::<IrqService>().map(|s| s.irqs), Some(16));
        assert!(handler.downcast_ref::<u64>().is_none());
        assert_eq!(handler.payload().variant_name(), "Singleton");
    }

    #[test]
    fn test_alias_follow() {
        let target = Arc::new(irq_handler());
        let header = HandlerHeader::new("/irq", HandlerType::UNKNOWN).unwrap();
        let alias = Arc::new(Handler::alias(header, &target).unwrap());

        assert!(alias.is_alias());
        assert_eq!(alias.kind(), HandlerType::SINGLETON);
        assert!(alias.downcast_ref::<IrqService>().is_none());
        assert!(Arc::ptr_eq(&alias.alias_target().unwrap(), &target));
        assert!(Arc::ptr_eq(&alias.resolve(1).unwrap(), &target));
        assert!(Arc::ptr_eq(&target.resolve(0).unwrap(), &target));
        assert!(target.alias_target().is_none());
    }

    #[test]
    fn test_alias_chain() {
        let target = Arc::new(irq_handler());
        let first = Arc::new(
            Handler::alias(HandlerHeader::new("/a", HandlerType::UNKNOWN).unwrap(), &target)
                .unwrap(),
        );
        let second = Arc::new(
            Handler::alias(HandlerHeader::new("/b", HandlerType::UNKNOWN).unwrap(), &first)
                .unwrap(),
        );

        assert!(Arc::ptr_eq(&second.resolve(2).unwrap(), &target));
        assert_eq!(second.resolve(1).unwrap_err(), NmmgrError::AliasDepthExceeded(1));
    }

    #[test]
    fn test_dangling_alias() {
        let target = Arc::new(irq_handler());
        let alias = Arc::new(
            Handler::alias(HandlerHeader::new("/irq", HandlerType::UNKNOWN).unwrap(), &target)
                .unwrap(),
        );
        drop(target);

        assert!(alias.alias_target().is_none());
        assert_eq!(alias.resolve(4).unwrap_err(), NmmgrError::DanglingAlias);
    }
}
