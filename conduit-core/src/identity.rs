//! Identity types: primitive keys, wrapped identifiers, id conversion and key providers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::error::KeyError;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn new_entity_id() -> Uuid {
    Uuid::now_v7()
}

// ============================================================================
// PRIMITIVE KEYS
// ============================================================================

/// The scalar form a store uses for point lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    Uuid(Uuid),
    Int(i64),
}

impl KeyValue {
    /// The "unset" form of this key's scalar kind.
    pub fn is_default(&self) -> bool {
        match self {
            KeyValue::Uuid(value) => value.is_nil(),
            KeyValue::Int(value) => *value == 0,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            KeyValue::Uuid(value) => Some(*value),
            KeyValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyValue::Int(value) => Some(*value),
            KeyValue::Uuid(_) => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Uuid(value) => write!(f, "{}", value),
            KeyValue::Int(value) => write!(f, "{}", value),
        }
    }
}

impl From<Uuid> for KeyValue {
    fn from(value: Uuid) -> Self {
        KeyValue::Uuid(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

/// An incoming key before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawKey {
    Uuid(Uuid),
    Int(i64),
    Text(String),
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawKey::Uuid(value) => write!(f, "{}", value),
            RawKey::Int(value) => write!(f, "{}", value),
            RawKey::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<KeyValue> for RawKey {
    fn from(value: KeyValue) -> Self {
        match value {
            KeyValue::Uuid(v) => RawKey::Uuid(v),
            KeyValue::Int(v) => RawKey::Int(v),
        }
    }
}

// ============================================================================
// ENTITY KEYS
// ============================================================================

/// Anything that can key an item query.
///
/// Primitive scalars expose themselves; wrapped identifiers expose the scalar
/// they carry.
pub trait EntityKey: fmt::Debug + Send + Sync + 'static {
    fn raw_key(&self) -> RawKey;
}

impl EntityKey for Uuid {
    fn raw_key(&self) -> RawKey {
        RawKey::Uuid(*self)
    }
}

impl EntityKey for i64 {
    fn raw_key(&self) -> RawKey {
        RawKey::Int(*self)
    }
}

impl EntityKey for i32 {
    fn raw_key(&self) -> RawKey {
        RawKey::Int(i64::from(*self))
    }
}

impl EntityKey for u32 {
    fn raw_key(&self) -> RawKey {
        RawKey::Int(i64::from(*self))
    }
}

impl EntityKey for String {
    fn raw_key(&self) -> RawKey {
        RawKey::Text(self.clone())
    }
}

impl EntityKey for &'static str {
    fn raw_key(&self) -> RawKey {
        RawKey::Text((*self).to_string())
    }
}

impl EntityKey for KeyValue {
    fn raw_key(&self) -> RawKey {
        RawKey::from(*self)
    }
}

impl EntityKey for RawKey {
    fn raw_key(&self) -> RawKey {
        self.clone()
    }
}

/// A strongly-typed identifier wrapping a UUID.
///
/// The nil UUID is the "new entity" sentinel.
pub trait UuidKey: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    const KEY_TYPE: &'static str;

    fn from_uuid(value: Uuid) -> Self;

    fn as_uuid(&self) -> Uuid;

    /// The unset key.
    fn new_entity() -> Self {
        Self::from_uuid(Uuid::nil())
    }
}

// ============================================================================
// ID CONVERSION
// ============================================================================

/// Normalizes an incoming key into the scalar form the store expects.
pub trait IdConverter: Send + Sync {
    /// Returns `None` when no conversion rule matches.
    fn try_convert(&self, key: &RawKey) -> Option<KeyValue>;

    /// The converted key, or the input unchanged when no rule matches.
    fn convert(&self, key: &RawKey) -> RawKey {
        self.try_convert(key)
            .map(RawKey::from)
            .unwrap_or_else(|| key.clone())
    }
}

/// Scalars pass through; text is parsed as an integer, then as a UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdConverter;

impl IdConverter for DefaultIdConverter {
    fn try_convert(&self, key: &RawKey) -> Option<KeyValue> {
        match key {
            RawKey::Int(value) => Some(KeyValue::Int(*value)),
            RawKey::Uuid(value) => Some(KeyValue::Uuid(*value)),
            RawKey::Text(text) => {
                let text = text.trim();
                if let Ok(value) = text.parse::<i64>() {
                    return Some(KeyValue::Int(value));
                }
                Uuid::parse_str(text).ok().map(KeyValue::Uuid)
            }
        }
    }
}

// ============================================================================
// KEY PROVIDERS
// ============================================================================

/// Mints, recognises and converts the keys of one key type.
pub trait KeyProvider<K>: Send + Sync {
    fn new_key(&self) -> K;

    fn is_default(&self, key: &K) -> bool;

    fn to_primitive(&self, key: &K) -> KeyValue;

    fn from_primitive(&self, value: KeyValue) -> Result<K, KeyError>;
}

/// Key provider for UUID-wrapping identifiers, minting UUIDv7 values.
#[derive(Debug)]
pub struct UuidKeyProvider<K> {
    _key: PhantomData<fn() -> K>,
}

impl<K> UuidKeyProvider<K> {
    pub fn new() -> Self {
        Self { _key: PhantomData }
    }
}

impl<K> Default for UuidKeyProvider<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for UuidKeyProvider<K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K: UuidKey> KeyProvider<K> for UuidKeyProvider<K> {
    fn new_key(&self) -> K {
        K::from_uuid(new_entity_id())
    }

    fn is_default(&self, key: &K) -> bool {
        key.as_uuid().is_nil()
    }

    fn to_primitive(&self, key: &K) -> KeyValue {
        KeyValue::Uuid(key.as_uuid())
    }

    fn from_primitive(&self, value: KeyValue) -> Result<K, KeyError> {
        match value {
            KeyValue::Uuid(uuid) => Ok(K::from_uuid(uuid)),
            other => Err(KeyError::InvalidKey {
                key_type: K::KEY_TYPE,
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
