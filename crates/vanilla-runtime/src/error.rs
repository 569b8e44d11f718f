//! Error types for the Vanilla runtime

use derive_more::{Display, Error};

use crate::map::KeyKind;
use crate::value::ValueTag;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Recoverable failures raised at the boundary between generated code and
/// the runtime.
///
/// Host allocation failure is deliberately absent: running out of memory
/// aborts the process.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[display("Type error: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueTag, found: ValueTag },

    #[display("Stale handle: value was already reclaimed")]
    StaleHandle,

    #[display("Key discipline violation: {expected} map cannot take a {found} key")]
    KeyDiscipline { expected: KeyKind, found: ValueTag },

    #[display("Malformed UTF-8 at byte offset {offset}")]
    MalformedUtf8 { offset: usize },

    #[display("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[display("String table index {index} out of range for table of size {len}")]
    LiteralIndex { index: usize, len: usize },

    #[display("String table slot {index} is already registered")]
    LiteralAlreadyRegistered { index: usize },

    #[display("String table slot {index} was never registered")]
    LiteralMissing { index: usize },

    #[display("Division by zero")]
    DivisionByZero,

    #[display("Square root of negative number {value}")]
    NegativeSqrt { value: i64 },
}

impl RuntimeError {
    pub(crate) fn type_mismatch(expected: ValueTag, found: ValueTag) -> Self {
        RuntimeError::TypeMismatch { expected, found }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RuntimeError::type_mismatch(ValueTag::Int, ValueTag::String);
        assert_eq!(err.to_string(), "Type error: expected int, found string");

        let err = RuntimeError::KeyDiscipline {
            expected: KeyKind::String,
            found: ValueTag::Int,
        };
        assert_eq!(
            err.to_string(),
            "Key discipline violation: string-keyed map cannot take a int key"
        );

        let err = RuntimeError::MalformedUtf8 { offset: 3 };
        assert_eq!(err.to_string(), "Malformed UTF-8 at byte offset 3");
    }
}
