//! Canonical entity identifiers.
//!
//! Source exports mix `38718` and `38718.0` for the same team. Both must map to
//! one key or an entity silently splits in two, so every id read from an event
//! goes through [`EntityId::from_value`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// `f` as an `i64` when it has no fractional part and fits.
pub fn integral_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub enum EntityId {
    Int(i64),
    /// Always finite and non-integral.
    Float(f64),
    Text(String),
}

impl EntityId {
    /// Read an id from an event value. Null, booleans, sequences and mappings
    /// are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Some(EntityId::Int(int))
                } else {
                    let float = number.as_f64()?;
                    Some(match integral_i64(float) {
                        Some(int) => EntityId::Int(int),
                        None => EntityId::Float(float),
                    })
                }
            }
            Value::String(text) => Some(EntityId::Text(text.clone())),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Int(int) => Value::from(*int),
            EntityId::Float(float) => Value::from(*float),
            EntityId::Text(text) => Value::from(text.as_str()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EntityId::Int(int) => Some(*int),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            EntityId::Int(_) | EntityId::Float(_) => 0,
            EntityId::Text(_) => 1,
        }
    }
}

impl From<i64> for EntityId {
    fn from(int: i64) -> Self {
        EntityId::Int(int)
    }
}

impl From<&str> for EntityId {
    fn from(text: &str) -> Self {
        EntityId::Text(text.to_string())
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EntityId::Int(a), EntityId::Int(b)) => a == b,
            (EntityId::Float(a), EntityId::Float(b)) => a.to_bits() == b.to_bits(),
            (EntityId::Text(a), EntityId::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            EntityId::Int(int) => {
                state.write_u8(0);
                int.hash(state);
            }
            EntityId::Float(float) => {
                state.write_u8(1);
                float.to_bits().hash(state);
            }
            EntityId::Text(text) => {
                state.write_u8(2);
                text.hash(state);
            }
        }
    }
}

impl Ord for EntityId {
    /// Numbers ascending by value, then text lexicographically.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (EntityId::Int(a), EntityId::Int(b)) => a.cmp(b),
            (EntityId::Float(a), EntityId::Float(b)) => a.total_cmp(b),
            (EntityId::Int(a), EntityId::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (EntityId::Float(a), EntityId::Int(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (EntityId::Text(a), EntityId::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityId::Int(int) => write!(f, "{}", int),
            EntityId::Float(float) => write!(f, "{}", float),
            EntityId::Text(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntityId::Int(int) => serializer.serialize_i64(*int),
            EntityId::Float(float) => serializer.serialize_f64(*float),
            EntityId::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        EntityId::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a number or string id, found {value}"))
        })
    }
}
