//! Vanilla value representation and type system
//!
//! Every runtime datum is a [`Value`]. The discriminant is always available
//! through [`Value::tag`], and narrowing to a concrete variant goes through
//! the checked `as_*` accessors, which fail with
//! [`RuntimeError::TypeMismatch`] instead of reinterpreting the payload.

use derive_more::Display;

use crate::array::ArrayValue;
use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::list::ListValue;
use crate::map::MapValue;
use crate::string::StringValue;

/// Value type tags
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("string")]
    String,
    #[display("boolean")]
    Boolean,
    #[display("list")]
    List,
    #[display("array")]
    Array,
    #[display("map")]
    Map,
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Boolean(bool),
    String(StringValue),
    List(ListValue),
    Array(ArrayValue),
    Map(MapValue),
}

impl Value {
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Int(_) => ValueTag::Int,
            Value::Float(_) => ValueTag::Float,
            Value::Boolean(_) => ValueTag::Boolean,
            Value::String(_) => ValueTag::String,
            Value::List(_) => ValueTag::List,
            Value::Array(_) => ValueTag::Array,
            Value::Map(_) => ValueTag::Map,
        }
    }

    fn mismatch<T>(&self, expected: ValueTag) -> RuntimeResult<T> {
        Err(RuntimeError::type_mismatch(expected, self.tag()))
    }

    pub fn as_int(&self) -> RuntimeResult<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            _ => self.mismatch(ValueTag::Int),
        }
    }

    pub fn as_float(&self) -> RuntimeResult<f64> {
        match self {
            Value::Float(n) => Ok(*n),
            _ => self.mismatch(ValueTag::Float),
        }
    }

    pub fn as_bool(&self) -> RuntimeResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => self.mismatch(ValueTag::Boolean),
        }
    }

    pub fn as_string(&self) -> RuntimeResult<&StringValue> {
        match self {
            Value::String(s) => Ok(s),
            _ => self.mismatch(ValueTag::String),
        }
    }

    pub fn as_list(&self) -> RuntimeResult<&ListValue> {
        match self {
            Value::List(list) => Ok(list),
            _ => self.mismatch(ValueTag::List),
        }
    }

    pub fn as_list_mut(&mut self) -> RuntimeResult<&mut ListValue> {
        match self {
            Value::List(list) => Ok(list),
            _ => self.mismatch(ValueTag::List),
        }
    }

    pub fn as_array(&self) -> RuntimeResult<&ArrayValue> {
        match self {
            Value::Array(array) => Ok(array),
            _ => self.mismatch(ValueTag::Array),
        }
    }

    pub fn as_array_mut(&mut self) -> RuntimeResult<&mut ArrayValue> {
        match self {
            Value::Array(array) => Ok(array),
            _ => self.mismatch(ValueTag::Array),
        }
    }

    pub fn as_map(&self) -> RuntimeResult<&MapValue> {
        match self {
            Value::Map(map) => Ok(map),
            _ => self.mismatch(ValueTag::Map),
        }
    }

    pub fn as_map_mut(&mut self) -> RuntimeResult<&mut MapValue> {
        match self {
            Value::Map(map) => Ok(map),
            _ => self.mismatch(ValueTag::Map),
        }
    }

    /// Handles directly held by this value. Scalars and strings hold none.
    pub fn children(&self) -> Vec<Handle> {
        match self {
            Value::Int(_) | Value::Float(_) | Value::Boolean(_) | Value::String(_) => Vec::new(),
            Value::List(list) => list.items().to_vec(),
            Value::Array(array) => array.items().to_vec(),
            Value::Map(map) => map
                .entries()
                .flat_map(|(key, value)| [key, value])
                .collect(),
        }
    }
}
