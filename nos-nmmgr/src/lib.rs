//! NOS Name Manager
//!
//! This crate provides the kernel's name manager: the directory of which
//! handler answers to which pathname. A "name" is a generic identifier for a
//! module, such as a mounted file system, a block device, a singleton
//! service like `/dev/irq`, or a symbol table.
//!
//! # Architecture
//!
//! - **Types**: handler type codes, version words and flag bits
//! - **Handler**: the `repr(C)` common header and the tagged payload
//! - **Registry**: lookup, add, remove and aliasing under a single lock
//! - **Config**: duplicate-name and alias-target policies
//!
//! The registry never interprets payloads and never follows aliases. Callers
//! check [`HandlerHeader::kind`] and the `ALIAS` flag and act on them.
//!
//! # Usage
//!
//! ```rust
//! use nos_nmmgr::{Handler, HandlerHeader, HandlerType, Payload, Registration, Registry,
//!                 RegistryConfig, Version};
//!
//! struct IrqService;
//!
//! let registry = Registry::new();
//! registry.init(RegistryConfig::default());
//!
//! let header = HandlerHeader::new("/dev/irq", HandlerType::SINGLETON)?
//!     .with_version(Version::new(1, 0));
//! let handler = Handler::new(header, Payload::Singleton(Box::new(IrqService)))?;
//! let id = registry.add(Registration::Owned(handler))?;
//!
//! let found = registry.lookup("/dev/irq").unwrap();
//! assert_eq!(found.kind(), HandlerType::SINGLETON);
//!
//! registry.remove(id)?;
//! assert!(registry.lookup("/dev/irq").is_none());
//! # Ok::<(), nos_nmmgr::NmmgrError>(())
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod logging;

pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod types;

// Re-export commonly used items
pub use config::{AliasTargetPolicy, DuplicatePolicy, RegistryConfig};
pub use error::{NameError, NmmgrError, Result};
pub use handler::{validate_pathname, Handler, HandlerHeader, Opaque, Payload};
pub use registry::{
    HandlerId, Lifecycle, Ownership, Registration, Registry, RegistryStats, ShutdownReport,
};
pub use registry::{init, registry, shutdown};
pub use types::{HandlerFlags, HandlerType, Version, NAME_MAX};
