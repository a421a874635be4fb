//! Registry configuration

/// What `add` does when a live record already uses the pathname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Accept the record; it shadows older ones until removed
    #[default]
    Allow,
    /// Fail with `AlreadyExists`
    Reject,
}

/// Which targets `add_alias` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasTargetPolicy {
    /// Any live handler, registered or not
    #[default]
    Any,
    /// Only handlers currently linked into the same registry
    Registered,
}

/// Registry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Duplicate pathname handling
    pub duplicates: DuplicatePolicy,
    /// Alias target handling
    pub alias_targets: AliasTargetPolicy,
}

impl RegistryConfig {
    /// Duplicate-tolerant, any alias target
    pub const DEFAULT: Self = Self {
        duplicates: DuplicatePolicy::Allow,
        alias_targets: AliasTargetPolicy::Any,
    };

    /// Reject duplicate names and aliases of unregistered handlers
    pub const STRICT: Self = Self {
        duplicates: DuplicatePolicy::Reject,
        alias_targets: AliasTargetPolicy::Registered,
    };
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.duplicates, DuplicatePolicy::Allow);
        assert_eq!(config.alias_targets, AliasTargetPolicy::Any);
        assert_eq!(config, RegistryConfig::DEFAULT);

        let strict = RegistryConfig::STRICT;
        assert_eq!(strict.duplicates, DuplicatePolicy::Reject);
        assert_eq!(strict.alias_targets, AliasTargetPolicy::Registered);
    }
}
