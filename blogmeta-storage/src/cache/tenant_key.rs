//! Tenant-scoped overlay key encoding for the LMDB backend.
//!
//! `OverlayKey` cannot be built without a tenant, so every stored payload is
//! addressed by (tenant, option name) and tenants never share a key.

use blogmeta_core::{ManagedKey, TenantId};

/// Separator byte between tenant_id and the option name.
///
/// 0xFF never occurs in UTF-8, so the separator cannot collide with a name.
const SEPARATOR: u8 = 0xFF;

/// Length of the tenant prefix: 8 tenant bytes plus the separator.
const PREFIX_LEN: usize = 9;

/// A store key scoped to a tenant.
///
/// # Binary Format
///
/// - Bytes 0-7: tenant id, big-endian
/// - Byte 8: separator (0xFF)
/// - Bytes 9..: option name, UTF-8
///
/// Big-endian tenant ids keep one tenant's entries contiguous and sorted by
/// tenant, so a prefix scan walks a single tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverlayKey {
    tenant: TenantId,
    key: ManagedKey,
}

impl OverlayKey {
    pub fn new(tenant: TenantId, key: impl Into<ManagedKey>) -> Self {
        Self {
            tenant,
            key: key.into(),
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn key(&self) -> &ManagedKey {
        &self.key
    }

    /// Encode to bytes for LMDB storage.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.key.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(PREFIX_LEN + name.len());
        bytes.extend_from_slice(&Self::tenant_prefix(self.tenant));
        bytes.extend_from_slice(name);
        bytes
    }

    /// Decode a key from bytes.
    ///
    /// Returns `None` if the slice is shorter than the prefix, the separator
    /// is missing, or the name is not UTF-8.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < PREFIX_LEN || bytes[8] != SEPARATOR {
            return None;
        }

        let tenant_bytes: [u8; 8] = bytes[0..8].try_into().ok()?;
        let tenant = TenantId::new(u64::from_be_bytes(tenant_bytes));
        let name = std::str::from_utf8(&bytes[PREFIX_LEN..]).ok()?;

        Some(Self::new(tenant, name))
    }

    /// Prefix shared by every key of a tenant.
    pub fn tenant_prefix(tenant: TenantId) -> [u8; PREFIX_LEN] {
        let mut prefix = [0u8; PREFIX_LEN];
        prefix[0..8].copy_from_slice(&tenant.get().to_be_bytes());
        prefix[8] = SEPARATOR;
        prefix
    }
}
