//! String values and the UTF-8 string builder
//!
//! Strings are stored as decoded Unicode code points together with a content
//! hash computed once at construction. The UTF-8 form used for output is
//! derived on first request and cached.
//!
//! Input bytes come from generated code and are assumed to be valid UTF-8, so
//! the decoder classifies lead bytes without re-validating the whole
//! sequence. It is still bounds-checked: a truncated multi-byte sequence, a
//! stray continuation byte or an impossible lead byte stops decoding with
//! [`RuntimeError::MalformedUtf8`] at the offset of the offending lead byte.

use std::cell::OnceCell;
use std::fmt;

use crate::error::{RuntimeError, RuntimeResult};

/// Multiplier of the polynomial string hash.
pub const HASH_BASE: i32 = 37;

/// An immutable string value.
#[derive(Clone)]
pub struct StringValue {
    points: Box<[u32]>,
    hash: i32,
    utf8: OnceCell<Box<str>>,
}

impl StringValue {
    /// Decode a UTF-8 byte buffer into a string value.
    pub fn from_utf8_bytes(bytes: &[u8]) -> RuntimeResult<Self> {
        Ok(Self::from_code_points(decode_utf8(bytes)?))
    }

    /// Build a string value from a Rust string slice. This cannot fail.
    pub fn from_str_slice(s: &str) -> Self {
        let value = Self::from_code_points(s.chars().map(u32::from).collect());
        // The byte form is already known, keep it.
        let _ = value.utf8.set(s.into());
        value
    }

    pub(crate) fn from_code_points(points: Vec<u32>) -> Self {
        let hash = hash_code_points(&points);
        StringValue {
            points: points.into_boxed_slice(),
            hash,
            utf8: OnceCell::new(),
        }
    }

    /// Length in code points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The content hash, see [`hash_code_points`].
    pub fn hash(&self) -> i32 {
        self.hash
    }

    pub fn code_points(&self) -> &[u32] {
        &self.points
    }

    /// The UTF-8 form, derived on demand.
    ///
    /// Code points that are not Unicode scalar values (surrogates, values past
    /// U+10FFFF) are rendered as U+FFFD.
    pub fn as_str(&self) -> &str {
        self.utf8.get_or_init(|| {
            self.points
                .iter()
                .map(|&cp| char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect::<String>()
                .into_boxed_str()
        })
    }

    /// Content equality: same length, same hash, same code points.
    pub fn content_eq(&self, other: &StringValue) -> bool {
        self.hash == other.hash && self.points == other.points
    }
}

impl fmt::Debug for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "String({:?})", self.as_str())
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polynomial hash over code points, evaluated left to right:
/// `hash = hash * 37 + cp` in 32-bit wrapping arithmetic.
pub fn hash_code_points(points: &[u32]) -> i32 {
    points.iter().fold(0i32, |hash, &cp| {
        hash.wrapping_mul(HASH_BASE).wrapping_add(cp as i32)
    })
}

/// Iterator over the code points of a byte buffer.
///
/// Yields `Err` once on malformed input and then stops.
pub struct CodePoints<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> CodePoints<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        CodePoints {
            bytes,
            offset: 0,
            failed: false,
        }
    }

    fn sequence_len(lead: u8) -> Option<usize> {
        if lead & 0x80 == 0 {
            Some(1)
        } else if lead & 0xE0 == 0xC0 {
            Some(2)
        } else if lead & 0xF0 == 0xE0 {
            Some(3)
        } else if lead & 0xF8 == 0xF0 {
            Some(4)
        } else {
            // Continuation byte or 0xF8..=0xFF
            None
        }
    }
}

impl Iterator for CodePoints<'_> {
    type Item = RuntimeResult<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let start = self.offset;
        let &lead = self.bytes.get(start)?;

        let malformed = |this: &mut Self| {
            this.failed = true;
            Some(Err(RuntimeError::MalformedUtf8 { offset: start }))
        };

        let Some(len) = Self::sequence_len(lead) else {
            return malformed(self);
        };
        let Some(tail) = self.bytes.get(start + 1..start + len) else {
            return malformed(self);
        };
        if tail.iter().any(|b| b & 0xC0 != 0x80) {
            return malformed(self);
        }

        let lead_bits = match len {
            1 => u32::from(lead),
            2 => u32::from(lead & 0x1F),
            3 => u32::from(lead & 0x0F),
            _ => u32::from(lead & 0x07),
        };
        let cp = tail
            .iter()
            .fold(lead_bits, |acc, &b| (acc << 6) | u32::from(b & 0x3F));

        self.offset += len;
        Some(Ok(cp))
    }
}

/// Decode a whole buffer into code points.
pub fn decode_utf8(bytes: &[u8]) -> RuntimeResult<Vec<u32>> {
    CodePoints::new(bytes).collect()
}

/// Encode code points back into UTF-8 bytes.
///
/// Any code point up to 21 bits is encoded structurally, so decoding then
/// encoding reproduces the original buffer for every input the decoder
/// accepts.
pub fn encode_utf8(points: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len());
    for &cp in points {
        match cp {
            0..=0x7F => out.push(cp as u8),
            0x80..=0x7FF => {
                out.push(0xC0 | (cp >> 6) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            0x800..=0xFFFF => {
                out.push(0xE0 | (cp >> 12) as u8);
                out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            _ => {
                out.push(0xF0 | ((cp >> 18) & 0x07) as u8);
                out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
                out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
        }
    }
    out
}
