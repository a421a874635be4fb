//! Name registry
//!
//! This module provides the pathname → handler directory. The registry links
//! records, it does not interpret them: consumers inspect the header's type
//! (and the `ALIAS` flag) to decide what the rest of the record means.
//!
//! All mutation and traversal happen under one `spin::RwLock`. Lookups take
//! the read side; `add`, `remove` and `shutdown` take the write side, so a
//! traversal never observes a half-linked record.

mod arena;

pub use arena::{HandlerId, Ownership};

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use spin::RwLock;

use self::arena::{Arena, Entry};
use crate::config::{AliasTargetPolicy, DuplicatePolicy, RegistryConfig};
use crate::error::{NmmgrError, Result};
use crate::handler::{Handler, HandlerHeader};
use crate::logging::{nm_debug, nm_error, nm_info, nm_trace, nm_warn};
use crate::types::{HandlerFlags, HandlerType};

/// Registry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Declared but `init` has not run
    Uninitialized,
    /// Accepting lookups and registrations
    Active,
    /// Torn down; unusable
    ShutDown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "uninitialized"),
            Lifecycle::Active => write!(f, "active"),
            Lifecycle::ShutDown => write!(f, "shut down"),
        }
    }
}

/// A record handed to [`Registry::add`]
pub enum Registration {
    /// Registry takes ownership and releases the record on removal.
    /// `NEEDS_FREE` is set on the header.
    Owned(Handler),
    /// Owner keeps the record; the registry only links it.
    /// Must not carry `NEEDS_FREE`.
    Shared(Arc<Handler>),
}

impl Registration {
    fn into_entry(self) -> Result<Entry> {
        match self {
            Registration::Owned(mut handler) => {
                handler.header_mut().set_flags(HandlerFlags::NEEDS_FREE);
                Ok(Entry {
                    record: Arc::new(handler),
                    ownership: Ownership::Registry,
                })
            }
            Registration::Shared(handler) => {
                if handler.header().needs_free() {
                    return Err(NmmgrError::OwnershipMismatch);
                }
                Ok(Entry {
                    record: handler,
                    ownership: Ownership::Owner,
                })
            }
        }
    }
}

/// Registry statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Number of linked records
    pub total: usize,
    /// Records with the `ALIAS` flag
    pub aliases: usize,
    /// Records the registry will release
    pub registry_owned: usize,
    /// Records exposed under /dev
    pub in_dev: usize,
    /// Records with a user-defined type code
    pub user_types: usize,
}

/// Outcome of [`Registry::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Registry-owned records released
    pub released: usize,
    /// Owner-managed records handed back to their owners
    pub returned: usize,
}

struct Inner {
    state: Lifecycle,
    config: RegistryConfig,
    arena: Arena,
}

impl Inner {
    #[track_caller]
    fn ensure_active(&self, op: &str) {
        if self.state != Lifecycle::Active {
            lifecycle_violation(op, self.state);
        }
    }

    fn find(&self, name: &str) -> Option<(HandlerId, &Entry)> {
        self.arena
            .iter()
            .find(|(_, entry)| entry.record.header().pathname_bytes() == name.as_bytes())
    }

    fn find_record(&self, record: &Arc<Handler>) -> Option<HandlerId> {
        self.arena
            .iter()
            .find(|(_, entry)| Arc::ptr_eq(&entry.record, record))
            .map(|(id, _)| id)
    }
}

#[track_caller]
fn lifecycle_violation(op: &str, state: Lifecycle) -> ! {
    nm_error!("nmmgr: {} called while registry is {}", op, state);
    panic!("nmmgr: {} called while registry is {}", op, state);
}

/// Drop a record that has been unlinked, outside the registry lock
fn release(entry: Entry) {
    match entry.ownership {
        Ownership::Registry => nm_trace!("nmmgr: releasing '{}'", entry.record.pathname()),
        Ownership::Owner => nm_trace!("nmmgr: returning '{}' to owner", entry.record.pathname()),
    }
    drop(entry);
}

/// Pathname → handler registry
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Create an uninitialized registry
    pub const fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: Lifecycle::Uninitialized,
                config: RegistryConfig::DEFAULT,
                arena: Arena::new(),
            }),
        }
    }

    /// Prepare an empty registry
    ///
    /// # Panics
    ///
    /// If the registry has already been initialized or shut down.
    #[track_caller]
    pub fn init(&self, config: RegistryConfig) {
        let mut inner = self.inner.write();
        if inner.state != Lifecycle::Uninitialized {
            lifecycle_violation("init", inner.state);
        }
        inner.config = config;
        inner.state = Lifecycle::Active;
        nm_info!("nmmgr: registry initialized ({:?})", config);
    }

    /// Unlink every record and make the registry unusable
    ///
    /// Registry-owned records are released; owner-managed records are only
    /// unlinked.
    ///
    /// # Panics
    ///
    /// If the registry is not active.
    #[track_caller]
    pub fn shutdown(&self) -> ShutdownReport {
        let drained = {
            let mut inner = self.inner.write();
            if inner.state != Lifecycle::Active {
                lifecycle_violation("shutdown", inner.state);
            }
            inner.state = Lifecycle::ShutDown;
            inner.arena.drain()
        };

        let mut report = ShutdownReport::default();
        for entry in drained {
            match entry.ownership {
                Ownership::Registry => report.released += 1,
                Ownership::Owner => report.returned += 1,
            }
            release(entry);
        }

        nm_info!(
            "nmmgr: registry shut down ({} released, {} returned)",
            report.released,
            report.returned
        );
        report
    }

    pub fn state(&self) -> Lifecycle {
        self.inner.read().state
    }

    #[track_caller]
    pub fn config(&self) -> RegistryConfig {
        let inner = self.inner.read();
        inner.ensure_active("config");
        inner.config
    }

    /// Find the most recently added record named exactly `name`
    ///
    /// Aliases are returned as they are; following them is up to the caller.
    #[track_caller]
    pub fn lookup(&self, name: &str) -> Option<Arc<Handler>> {
        let inner = self.inner.read();
        inner.ensure_active("lookup");
        inner.find(name).map(|(_, entry)| Arc::clone(&entry.record))
    }

    /// Look up a record and check it speaks the expected interface
    #[track_caller]
    pub fn lookup_as(&self, name: &str, kind: HandlerType, major: u16) -> Result<Arc<Handler>> {
        let record = self.lookup(name).ok_or(NmmgrError::NotFound)?;
        if record.kind() != kind {
            return Err(NmmgrError::TypeMismatch {
                expected: kind,
                found: record.kind(),
            });
        }
        record.version().require_major(major)?;
        Ok(record)
    }

    /// Link a record into the registry
    #[track_caller]
    pub fn add(&self, registration: Registration) -> Result<HandlerId> {
        let entry = registration.into_entry();
        self.link("add", entry, None)
    }

    /// Register `name` as an alias of `target`
    ///
    /// The alias record is registry-owned. It copies the target's type,
    /// version and `IN_DEV` bit and holds only a weak reference to it.
    #[track_caller]
    pub fn add_alias(&self, name: &str, target: &Arc<Handler>) -> Result<HandlerId> {
        let entry = HandlerHeader::new(name, target.kind())
            .map(|header| {
                header
                    .with_version(target.version())
                    .with_flags(target.flags() & HandlerFlags::IN_DEV)
            })
            .and_then(|header| Handler::alias(header, target))
            .and_then(|alias| Registration::Owned(alias).into_entry());
        self.link("add_alias", entry, Some(target))
    }

    #[track_caller]
    fn link(
        &self,
        op: &str,
        entry: Result<Entry>,
        alias_target: Option<&Arc<Handler>>,
    ) -> Result<HandlerId> {
        let mut inner = self.inner.write();
        inner.ensure_active(op);
        let entry = entry?;

        if let Some(target) = alias_target {
            if inner.config.alias_targets == AliasTargetPolicy::Registered
                && inner.find_record(target).is_none()
            {
                return Err(NmmgrError::NotFound);
            }
        }

        let name = entry.record.pathname();
        if inner.find(name).is_some() {
            match inner.config.duplicates {
                DuplicatePolicy::Reject => return Err(NmmgrError::AlreadyExists),
                DuplicatePolicy::Allow => nm_warn!("nmmgr: '{}' shadows an existing handler", name),
            }
        }

        nm_debug!(
            "nmmgr: {} '{}' ({}, v{}, {:?})",
            op,
            name,
            entry.record.kind(),
            entry.record.version(),
            entry.ownership
        );
        Ok(inner.arena.insert(entry))
    }

    /// Unlink the record identified by `id`
    ///
    /// Registry-owned records are released.
    #[track_caller]
    pub fn remove(&self, id: HandlerId) -> Result<()> {
        let entry = {
            let mut inner = self.inner.write();
            inner.ensure_active("remove");
            inner.arena.remove(id)
        };
        let entry = entry.ok_or(NmmgrError::NotFound)?;
        nm_debug!("nmmgr: remove '{}'", entry.record.pathname());
        release(entry);
        Ok(())
    }

    /// Unlink a record by identity rather than by id
    #[track_caller]
    pub fn remove_record(&self, record: &Arc<Handler>) -> Result<()> {
        let entry = {
            let mut inner = self.inner.write();
            inner.ensure_active("remove_record");
            inner
                .find_record(record)
                .and_then(|id| inner.arena.remove(id))
        };
        let entry = entry.ok_or(NmmgrError::NotFound)?;
        nm_debug!("nmmgr: remove '{}'", entry.record.pathname());
        release(entry);
        Ok(())
    }

    /// Unlink every record owned by an exiting process
    ///
    /// Static records (owner 0) are never removed this way.
    #[track_caller]
    pub fn remove_owned_by(&self, owner_id: i32) -> usize {
        let removed: Vec<Entry> = {
            let mut inner = self.inner.write();
            inner.ensure_active("remove_owned_by");
            if owner_id == 0 {
                return 0;
            }
            let ids: Vec<HandlerId> = inner
                .arena
                .iter()
                .filter(|(_, entry)| entry.record.owner_id() == owner_id)
                .map(|(id, _)| id)
                .collect();
            ids.into_iter()
                .filter_map(|id| inner.arena.remove(id))
                .collect()
        };

        let count = removed.len();
        if count > 0 {
            nm_debug!("nmmgr: removed {} handlers owned by {}", count, owner_id);
        }
        removed.into_iter().for_each(release);
        count
    }

    #[track_caller]
    pub fn contains(&self, id: HandlerId) -> bool {
        let inner = self.inner.read();
        inner.ensure_active("contains");
        inner.arena.get(id).is_some()
    }

    #[track_caller]
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.ensure_active("len");
        inner.arena.len()
    }

    #[track_caller]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[track_caller]
    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        inner.ensure_active("stats");

        let mut stats = RegistryStats::default();
        for (_, entry) in inner.arena.iter() {
            let header = entry.record.header();
            stats.total += 1;
            if header.is_alias() {
                stats.aliases += 1;
            }
            if entry.ownership == Ownership::Registry {
                stats.registry_owned += 1;
            }
            if header.in_dev() {
                stats.in_dev += 1;
            }
            if header.kind().is_user() {
                stats.user_types += 1;
            }
        }
        stats
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global name registry
static NMMGR: Registry = Registry::new();

/// Initialize the global name registry and hand out access to it
#[track_caller]
pub fn init(config: RegistryConfig) -> &'static Registry {
    NMMGR.init(config);
    &NMMGR
}

/// Get the global name registry
pub fn registry() -> &'static Registry {
    &NMMGR
}

/// Shut down the global name registry
#[track_caller]
pub fn shutdown() -> ShutdownReport {
    NMMGR.shutdown()
}
