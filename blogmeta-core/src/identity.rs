//! Identity types for tenants and managed option keys

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a tenant (a site or blog in the host network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(u64);

impl TenantId {
    /// The host's primary tenant. Its role key is already the host default.
    pub const PRIMARY: TenantId = TenantId(1);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TenantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a configuration option that participates in overlay syncing.
///
/// Implements `Borrow<str>` so registries keyed by `ManagedKey` can be
/// probed with a plain `&str` without allocating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagedKey(String);

impl ManagedKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Borrow<str> for ManagedKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ManagedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ManagedKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ManagedKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ManagedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tenant_id_display_and_primary() {
        assert_eq!(TenantId::new(42).to_string(), "42");
        assert_eq!(TenantId::PRIMARY, TenantId::from(1));
        assert_eq!(TenantId::new(7).get(), 7);
    }

    #[test]
    fn test_managed_key_borrow_lookup() {
        let mut keys = HashSet::new();
        keys.insert(ManagedKey::from("blogname"));
        assert!(keys.contains("blogname"));
        assert!(!keys.contains("siteurl"));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&ManagedKey::from("home")).expect("serialize");
        assert_eq!(json, "\"home\"");
        let tenant: TenantId = serde_json::from_str("3").expect("deserialize");
        assert_eq!(tenant, TenantId::new(3));
    }
}
