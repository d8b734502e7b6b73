//! Dynamically typed column values and their typed decoding.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Row, TypeInfo, ValueRef};

use crate::key::Key;

/// Largest integer magnitude an `f64` represents exactly (2^53).
const MAX_EXACT_F64_INT: i64 = 1 << 53;

/// A column value whose type is only known at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PersistValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A value could not be decoded into the requested Rust type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("unsupported column type {type_name} for column {column}")]
    UnsupportedType { column: String, type_name: String },

    #[error("column {column}: {message}")]
    Column { column: String, message: String },
}

impl PersistValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Read `column` from a row, choosing the variant from its Postgres type.
    pub fn from_row(row: &PgRow, column: &str) -> Result<Self, ConversionError> {
        let column_error = |e: sqlx::Error| ConversionError::Column {
            column: column.to_string(),
            message: e.to_string(),
        };

        let raw = row.try_get_raw(column).map_err(column_error)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        let type_name = raw.type_info().name().to_string();

        let value = match type_name.as_str() {
            "BOOL" => Self::Bool(row.try_get(column).map_err(column_error)?),
            "INT2" => Self::Int(row.try_get::<i16, _>(column).map_err(column_error)?.into()),
            "INT4" => Self::Int(row.try_get::<i32, _>(column).map_err(column_error)?.into()),
            "INT8" => Self::Int(row.try_get(column).map_err(column_error)?),
            "FLOAT4" => Self::Double(row.try_get::<f32, _>(column).map_err(column_error)?.into()),
            "FLOAT8" => Self::Double(row.try_get(column).map_err(column_error)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                Self::Text(row.try_get(column).map_err(column_error)?)
            }
            "BYTEA" => Self::Bytes(row.try_get(column).map_err(column_error)?),
            _ => {
                return Err(ConversionError::UnsupportedType {
                    column: column.to_string(),
                    type_name,
                })
            }
        };
        Ok(value)
    }

    pub fn decode<T: FromPersistValue>(self) -> Result<T, ConversionError> {
        T::from_persist_value(self)
    }

    fn mismatch<T>(self, expected: &'static str) -> Result<T, ConversionError> {
        Err(ConversionError::Mismatch {
            expected,
            found: self.kind(),
        })
    }
}

/// Types that can be decoded from a [`PersistValue`].
pub trait FromPersistValue: Sized {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError>;
}

impl FromPersistValue for i64 {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Int(i) => Ok(i),
            PersistValue::Text(s) => s.parse().map_err(|_| ConversionError::Mismatch {
                expected: "integer",
                found: "text",
            }),
            other => other.mismatch("integer"),
        }
    }
}

impl FromPersistValue for i32 {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        let i = i64::from_persist_value(value)?;
        i32::try_from(i).map_err(|_| ConversionError::OutOfRange {
            value: i.to_string(),
            target: "i32",
        })
    }
}

impl FromPersistValue for u64 {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        let i = i64::from_persist_value(value)?;
        u64::try_from(i).map_err(|_| ConversionError::OutOfRange {
            value: i.to_string(),
            target: "u64",
        })
    }
}

/// Integers decode only as `0` (false) and `1` (true).
impl FromPersistValue for bool {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Bool(b) => Ok(b),
            PersistValue::Int(0) => Ok(false),
            PersistValue::Int(1) => Ok(true),
            PersistValue::Int(i) => Err(ConversionError::OutOfRange {
                value: i.to_string(),
                target: "bool",
            }),
            other => other.mismatch("bool"),
        }
    }
}

/// Integers beyond ±2^53 are rejected rather than rounded.
impl FromPersistValue for f64 {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Double(d) => Ok(d),
            PersistValue::Int(i) if i.unsigned_abs() <= MAX_EXACT_F64_INT as u64 => Ok(i as f64),
            PersistValue::Int(i) => Err(ConversionError::OutOfRange {
                value: i.to_string(),
                target: "f64",
            }),
            other => other.mismatch("double"),
        }
    }
}

impl FromPersistValue for String {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Text(s) => Ok(s),
            PersistValue::Bytes(b) => {
                String::from_utf8(b).map_err(|_| ConversionError::Mismatch {
                    expected: "text",
                    found: "non UTF-8 bytes",
                })
            }
            other => other.mismatch("text"),
        }
    }
}

impl FromPersistValue for Vec<u8> {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Bytes(b) => Ok(b),
            PersistValue::Text(s) => Ok(s.into_bytes()),
            other => other.mismatch("bytes"),
        }
    }
}

impl<T: FromPersistValue> FromPersistValue for Option<T> {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Null => Ok(None),
            other => T::from_persist_value(other).map(Some),
        }
    }
}

impl<E> FromPersistValue for Key<E> {
    fn from_persist_value(value: PersistValue) -> Result<Self, ConversionError> {
        match value {
            PersistValue::Bytes(b) => Key::from_bytes(&b).map_err(|_| ConversionError::Mismatch {
                expected: "key",
                found: "bytes",
            }),
            other => i64::from_persist_value(other).map(Key::new),
        }
    }
}

/// Integer held by a value.
pub fn to_int(value: PersistValue) -> Result<i64, ConversionError> {
    value.decode()
}

/// Non-negative integer held by a value.
pub fn to_u64(value: PersistValue) -> Result<u64, ConversionError> {
    value.decode()
}
