//! Blog Meta Core - Shared Types
//!
//! Identity types, the option value codec, the error taxonomy and
//! configuration shared by every blog meta sync crate. No sync logic
//! lives here.

pub mod config;
pub mod error;
pub mod identity;
pub mod value;

pub use config::{LmdbConfig, SyncConfig, DEFAULT_STATIC_KEYS, DEFAULT_URL_KEYS};
pub use error::{CodecError, ConfigError, ContextError, MetaError, MetaResult, StorageError};
pub use identity::{ManagedKey, TenantId};
pub use value::{
    decode_payload, encode_payload, is_empty_value, untrailing_slash, OptionValue, PAYLOAD_MARKER,
};
