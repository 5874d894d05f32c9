//! Read-through interception of managed option reads.
//!
//! A managed read first consults the overlay. A hit is authoritative and the
//! host's own lookup is skipped. A miss hands back a [`PendingPopulation`]
//! that the caller redeems once the host has resolved the value; non-empty
//! values are then written into the overlay so the next read hits.

use blogmeta_core::{
    decode_payload, encode_payload, is_empty_value, untrailing_slash, ManagedKey, MetaResult,
    OptionValue, TenantId,
};

use super::BlogMetaSync;
use crate::cache::OverlayStore;
use crate::context::TenantContext;
use crate::host::{OptionSource, TenantDirectory};

/// Result of [`BlogMetaSync::intercept_read`].
#[derive(Debug, PartialEq)]
pub enum ReadOutcome {
    /// The key is not managed. The host read runs unmodified.
    Declined,
    /// Served from the overlay. The host lookup must be skipped.
    Hit(OptionValue),
    /// Overlay miss. Let the host read run, then redeem the marker.
    Miss(PendingPopulation),
}

impl ReadOutcome {
    pub fn served_from_overlay(&self) -> bool {
        matches!(self, ReadOutcome::Hit(_))
    }
}

/// Marker for one missed read, redeemed at most once.
///
/// Not `Clone`: redeeming it through
/// [`BlogMetaSync::on_underlying_read_resolved`] consumes it, and it only
/// ever belongs to the read that produced it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a missed read populates the overlay only when the marker is redeemed"]
pub struct PendingPopulation {
    tenant: TenantId,
    key: ManagedKey,
}

impl PendingPopulation {
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn key(&self) -> &ManagedKey {
        &self.key
    }
}

impl<O, S, D, C> BlogMetaSync<O, S, D, C>
where
    O: OverlayStore,
    S: OptionSource,
    D: TenantDirectory,
    C: TenantContext,
{
    /// Consult the overlay for a managed option read.
    pub fn intercept_read(&self, tenant: TenantId, key: &str) -> MetaResult<ReadOutcome> {
        if !self.registry.is_managed(key) {
            return Ok(ReadOutcome::Declined);
        }

        match self.overlay.get(tenant, key)? {
            Some(payload) => {
                let mut value = decode_payload(&payload);
                if self.config.is_url_key(key) {
                    value = untrailing_slash(value);
                }
                tracing::debug!(tenant = %tenant, key, "Option served from blog meta");
                Ok(ReadOutcome::Hit(value))
            }
            None => {
                tracing::debug!(tenant = %tenant, key, "Blog meta miss, awaiting option value");
                Ok(ReadOutcome::Miss(PendingPopulation {
                    tenant,
                    key: ManagedKey::from(key),
                }))
            }
        }
    }

    /// Capture the value the host resolved for a missed read.
    ///
    /// Empty values are not cached, so a later read tries again. Returns
    /// whether the overlay was written.
    pub fn on_underlying_read_resolved(
        &self,
        pending: PendingPopulation,
        value: &OptionValue,
    ) -> MetaResult<bool> {
        let PendingPopulation { tenant, key } = pending;
        if !self.registry.is_managed(key.as_str()) || is_empty_value(value) {
            return Ok(false);
        }

        let payload = encode_payload(&key, value)?;
        self.overlay.set(tenant, key.as_str(), &payload, None)?;
        tracing::debug!(tenant = %tenant, key = %key, "Blog meta populated from option read");
        Ok(true)
    }

    /// Full read path around a host lookup.
    ///
    /// `fallback` performs the host's own read and runs only when the overlay
    /// cannot answer.
    pub fn read_through<F>(
        &self,
        tenant: TenantId,
        key: &str,
        fallback: F,
    ) -> MetaResult<Option<OptionValue>>
    where
        F: FnOnce() -> MetaResult<Option<OptionValue>>,
    {
        match self.intercept_read(tenant, key)? {
            ReadOutcome::Declined => fallback(),
            ReadOutcome::Hit(value) => Ok(Some(value)),
            ReadOutcome::Miss(pending) => {
                let resolved = fallback()?;
                if let Some(value) = &resolved {
                    self.on_underlying_read_resolved(pending, value)?;
                }
                Ok(resolved)
            }
        }
    }
}
