//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Options mirrored into blog meta out of the box.
pub const DEFAULT_STATIC_KEYS: &[&str] = &[
    "stylesheet",
    "blog_charset",
    "template",
    "WPLANG",
    "blogname",
    "siteurl",
    "post_count",
    "home",
    "allowedthemes",
    "blog_public",
    "blogdescription",
    "db_version",
    "db_upgraded",
    "active_plugins",
    "users_can_register",
    "admin_email",
    "wp_user_roles",
];

/// Options whose values are URLs or URL path bases.
pub const DEFAULT_URL_KEYS: &[&str] = &["siteurl", "home", "category_base", "tag_base"];

/// Sync engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Static managed option names, before the key filter runs.
    pub static_keys: Vec<ManagedKey>,
    /// Managed options that get trailing slashes stripped on overlay hits.
    pub url_keys: Vec<ManagedKey>,
    /// Tenant exempt from derived role keys.
    pub primary_tenant: TenantId,
    /// Base table prefix of the host install.
    pub table_prefix: String,
    /// Suffix appended to a tenant's table prefix to form its role key.
    pub role_key_suffix: String,
    /// Overlay key that records the host schema version per tenant.
    pub version_key: ManagedKey,
    /// Overlay key searched by tenant listing queries.
    pub display_name_key: ManagedKey,
    /// Table holding tenants.
    pub blogs_table: String,
    /// Table holding the overlay entries.
    pub blogmeta_table: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            static_keys: DEFAULT_STATIC_KEYS.iter().map(|k| ManagedKey::from(*k)).collect(),
            url_keys: DEFAULT_URL_KEYS.iter().map(|k| ManagedKey::from(*k)).collect(),
            primary_tenant: TenantId::PRIMARY,
            table_prefix: "wp_".to_string(),
            role_key_suffix: "user_roles".to_string(),
            version_key: ManagedKey::from("wp_db_version"),
            display_name_key: ManagedKey::from("blogname"),
            blogs_table: "wp_blogs".to_string(),
            blogmeta_table: "wp_blogmeta".to_string(),
        }
    }
}

impl SyncConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `BLOGMETA_STATIC_KEYS`: comma separated managed option names
    /// - `BLOGMETA_URL_KEYS`: comma separated URL-like option names
    /// - `BLOGMETA_PRIMARY_TENANT`: primary tenant id (default: 1)
    /// - `BLOGMETA_TABLE_PREFIX`: base table prefix (default: `wp_`)
    /// - `BLOGMETA_VERSION_KEY`: schema version key (default: `wp_db_version`)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`SyncConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let list = |name: &str| {
            lookup(name).map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(ManagedKey::from)
                    .collect::<Vec<_>>()
            })
        };

        Self {
            static_keys: list("BLOGMETA_STATIC_KEYS").unwrap_or(defaults.static_keys),
            url_keys: list("BLOGMETA_URL_KEYS").unwrap_or(defaults.url_keys),
            primary_tenant: lookup("BLOGMETA_PRIMARY_TENANT")
                .and_then(|s| s.parse::<u64>().ok())
                .map(TenantId::new)
                .unwrap_or(defaults.primary_tenant),
            table_prefix: lookup("BLOGMETA_TABLE_PREFIX").unwrap_or(defaults.table_prefix),
            version_key: lookup("BLOGMETA_VERSION_KEY")
                .map(ManagedKey::from)
                .unwrap_or(defaults.version_key),
            ..defaults
        }
    }

    /// Parse and validate a TOML document. Missing fields take defaults.
    pub fn from_toml_str(source: &str) -> MetaResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - at least one static key, none blank, none repeated
    /// - primary_tenant > 0
    /// - table_prefix, role_key_suffix and version_key are non-empty
    pub fn validate(&self) -> MetaResult<()> {
        if self.static_keys.is_empty() {
            return Err(MetaError::Config(ConfigError::MissingRequired {
                field: "static_keys".to_string(),
            }));
        }

        let mut seen = HashSet::new();
        for key in &self.static_keys {
            if key.as_str().trim().is_empty() {
                return Err(MetaError::Config(ConfigError::InvalidValue {
                    field: "static_keys".to_string(),
                    value: format!("{:?}", key.as_str()),
                    reason: "option names must not be blank".to_string(),
                }));
            }
            if !seen.insert(key.as_str()) {
                return Err(MetaError::Config(ConfigError::InvalidValue {
                    field: "static_keys".to_string(),
                    value: key.to_string(),
                    reason: "option listed more than once".to_string(),
                }));
            }
        }

        if self.primary_tenant.get() == 0 {
            return Err(MetaError::Config(ConfigError::InvalidValue {
                field: "primary_tenant".to_string(),
                value: self.primary_tenant.to_string(),
                reason: "primary_tenant must be greater than 0".to_string(),
            }));
        }

        for (field, value) in [
            ("table_prefix", self.table_prefix.as_str()),
            ("role_key_suffix", self.role_key_suffix.as_str()),
            ("version_key", self.version_key.as_str()),
        ] {
            if value.is_empty() {
                return Err(MetaError::Config(ConfigError::MissingRequired {
                    field: field.to_string(),
                }));
            }
        }

        Ok(())
    }

    /// Table prefix the host uses for a tenant's own tables.
    pub fn tenant_table_prefix(&self, tenant: TenantId) -> String {
        if tenant == self.primary_tenant {
            self.table_prefix.clone()
        } else {
            format!("{}{}_", self.table_prefix, tenant)
        }
    }

    /// Per-tenant role option name, e.g. `wp_7_user_roles`.
    pub fn derived_role_key(&self, tenant: TenantId) -> ManagedKey {
        ManagedKey::new(format!(
            "{}{}",
            self.tenant_table_prefix(tenant),
            self.role_key_suffix
        ))
    }

    pub fn is_url_key(&self, key: &str) -> bool {
        self.url_keys.iter().any(|k| k.as_str() == key)
    }
}

// ============================================================================
// LMDB OVERLAY BACKEND
// ============================================================================

/// Settings for the LMDB-backed overlay store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmdbConfig {
    /// Directory holding the LMDB environment.
    pub path: PathBuf,
    /// Map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for LmdbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("blogmeta-overlay"),
            max_size_mb: 64,
        }
    }
}

impl LmdbConfig {
    /// Environment variables:
    /// - `BLOGMETA_LMDB_PATH` (default: `blogmeta-overlay`)
    /// - `BLOGMETA_LMDB_MAX_SIZE_MB` (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            path: std::env::var("BLOGMETA_LMDB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            max_size_mb: std::env::var("BLOGMETA_LMDB_MAX_SIZE_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size_mb),
        }
    }

    pub fn validate(&self) -> MetaResult<()> {
        if self.max_size_mb == 0 {
            return Err(MetaError::Config(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: self.max_size_mb.to_string(),
                reason: "max_size_mb must be greater than 0".to_string(),
            }));
        }
        self.map_size_bytes().map(|_| ())
    }

    /// `max_size_mb` in bytes, as handed to the LMDB environment.
    pub fn map_size_bytes(&self) -> MetaResult<usize> {
        self.max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            MetaError::Config(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: self.max_size_mb.to_string(),
                reason: "map size in bytes overflows usize".to_string(),
            })
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
