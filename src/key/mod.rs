//! Typed entity keys backed by a `BIGINT` primary key.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};

/// Failure to decode a key from an external representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("empty key")]
    Empty,

    #[error("invalid key text: {0:?}")]
    InvalidText(String),

    #[error("key bytes are not valid UTF-8")]
    InvalidBytes,

    #[error("key {0} is out of range for a 64-bit signed id")]
    OutOfRange(u64),

    #[error("key {0} is negative")]
    Negative(i64),
}

/// Identifier of a row of entity `E`.
///
/// `E` only tags the key; a `Key<Author>` cannot be passed where a
/// `Key<Book>` is expected.
pub struct Key<E> {
    id: i64,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Key<E> {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            _entity: PhantomData,
        }
    }

    pub const fn get(self) -> i64 {
        self.id
    }

    pub fn from_u64(id: u64) -> Result<Self, KeyError> {
        i64::try_from(id)
            .map(Self::new)
            .map_err(|_| KeyError::OutOfRange(id))
    }

    pub fn to_u64(self) -> Result<u64, KeyError> {
        u64::try_from(self.id).map_err(|_| KeyError::Negative(self.id))
    }

    pub fn to_text(self) -> String {
        self.id.to_string()
    }

    /// Decode a key from its decimal text form.
    pub fn parse_text(text: &str) -> Result<Self, KeyError> {
        if text.is_empty() {
            return Err(KeyError::Empty);
        }
        text.parse::<i64>()
            .map(Self::new)
            .map_err(|_| KeyError::InvalidText(text.to_string()))
    }

    /// Decimal ASCII bytes, the same digits as [`Key::to_text`].
    pub fn to_bytes(self) -> Vec<u8> {
        self.to_text().into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let text = std::str::from_utf8(bytes).map_err(|_| KeyError::InvalidBytes)?;
        Self::parse_text(text)
    }

    /// Reinterpret the id as a key of another entity.
    pub const fn cast<F>(self) -> Key<F> {
        Key::new(self.id)
    }
}

// Manual impls so `E` needs none of these traits itself.
impl<E> Clone for Key<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Key<E> {}

impl<E> PartialEq for Key<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for Key<E> {}

impl<E> PartialOrd for Key<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Key<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<E> Hash for Key<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<E> fmt::Debug for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.id)
    }
}

impl<E> fmt::Display for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<E> FromStr for Key<E> {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_text(s)
    }
}

impl<E> From<Key<E>> for i64 {
    fn from(key: Key<E>) -> Self {
        key.id
    }
}

impl<E> From<i64> for Key<E> {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl<E> Serialize for Key<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.id)
    }
}

impl<'de, E> Deserialize<'de> for Key<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

impl<E> sqlx::Type<Postgres> for Key<E> {
    fn type_info() -> PgTypeInfo {
        <i64 as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <i64 as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'q, E> sqlx::Encode<'q, Postgres> for Key<E> {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <i64 as sqlx::Encode<'q, Postgres>>::encode_by_ref(&self.id, buf)
    }
}

impl<'r, E> sqlx::Decode<'r, Postgres> for Key<E> {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        <i64 as sqlx::Decode<'r, Postgres>>::decode(value).map(Self::new)
    }
}
