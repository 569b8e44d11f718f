//! The execution context
//!
//! A [`Context`] owns everything a running program needs from the runtime:
//! the allocation universe, the caches of canonical values and the string
//! table of literals registered by generated code. It is created once per
//! run and passed explicitly to every operation; there is no global state.
//!
//! ## Canonical values
//!
//! The following values are allocated when the context is initialized, are
//! pinned (never reclaimed), and are returned by identity on every request:
//! - integers in `-1023..=1023`
//! - `true` and `false`
//! - the floats `0.0` and `1.0`
//! - the empty string
//! - the 128 single-character ASCII strings
//!
//! Integers outside the cached range share one most-recently-used slot: a
//! request for the value the slot currently holds returns that instance.
//!
//! A context is single-threaded. It is neither `Sync` nor meant to be
//! shared; wrap it in a lock if several threads must use one.

use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::map::DEFAULT_MAP_BUCKETS;
use crate::string::StringValue;
use crate::universe::{Universe, UniverseStats};
use crate::value::Value;

/// Integers with absolute value up to this bound are cached.
pub const INT_CACHE_BOUND: i64 = 1023;

/// Number of cached single-character strings (the ASCII range).
pub const SINGLE_CHAR_COUNT: usize = 128;

/// Construction parameters for a [`Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Number of slots in the literal string table.
    pub string_table_size: usize,
    /// Bucket count of newly created maps.
    pub map_buckets: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            string_table_size: 0,
            map_buckets: DEFAULT_MAP_BUCKETS,
        }
    }
}

pub struct Context {
    pub(crate) universe: Universe,
    pub(crate) config: ContextConfig,
    /// Index `n + INT_CACHE_BOUND` holds the integer `n`.
    ints: Box<[Handle]>,
    mru_int: Handle,
    true_value: Handle,
    false_value: Handle,
    float_zero: Handle,
    float_one: Handle,
    empty_string: Handle,
    single_chars: Box<[Handle]>,
    string_table: Box<[Option<Handle>]>,
}

impl Context {
    /// Create a context with a literal string table of `string_table_size`
    /// empty slots.
    pub fn initialize(string_table_size: usize) -> Self {
        Self::with_config(ContextConfig {
            string_table_size,
            ..ContextConfig::default()
        })
    }

    pub fn with_config(config: ContextConfig) -> Self {
        let mut universe = Universe::new();

        let ints: Box<[Handle]> = (-INT_CACHE_BOUND..=INT_CACHE_BOUND)
            .map(|n| universe.allocate_pinned(Value::Int(n)))
            .collect();
        let false_value = universe.allocate_pinned(Value::Boolean(false));
        let true_value = universe.allocate_pinned(Value::Boolean(true));
        let float_zero = universe.allocate_pinned(Value::Float(0.0));
        let float_one = universe.allocate_pinned(Value::Float(1.0));
        let empty_string =
            universe.allocate_pinned(Value::String(StringValue::from_code_points(Vec::new())));
        let single_chars: Box<[Handle]> = (0..SINGLE_CHAR_COUNT as u32)
            .map(|cp| {
                universe.allocate_pinned(Value::String(StringValue::from_code_points(vec![cp])))
            })
            .collect();
        let string_table = vec![None; config.string_table_size].into_boxed_slice();

        tracing::debug!(
            cached_ints = ints.len(),
            single_chars = single_chars.len(),
            string_table = config.string_table_size,
            universe = universe.len(),
            "initialized context"
        );

        let mru_int = ints[INT_CACHE_BOUND as usize];
        Self {
            universe,
            config,
            ints,
            mru_int,
            true_value,
            false_value,
            float_zero,
            float_one,
            empty_string,
            single_chars,
            string_table,
        }
    }

    /// Create a context whose string table is populated with `literals`,
    /// in order.
    pub fn with_literals(literals: &[&str]) -> RuntimeResult<Self> {
        let mut ctx = Self::initialize(literals.len());
        for (index, literal) in literals.iter().enumerate() {
            ctx.register_literal(index, literal.as_bytes())?;
        }
        Ok(ctx)
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Scalar constructors
    // -------------------------------------------------------------------------

    /// Get the integer value `n`.
    pub fn int(&mut self, n: i64) -> Handle {
        if (-INT_CACHE_BOUND..=INT_CACHE_BOUND).contains(&n) {
            return self.ints[(n + INT_CACHE_BOUND) as usize];
        }

        if matches!(self.universe.get(self.mru_int), Ok(Value::Int(v)) if *v == n) {
            // The caller gets its own anchor on the shared instance
            let _ = self.universe.anchor(self.mru_int);
            return self.mru_int;
        }

        let handle = self.universe.allocate(Value::Int(n));
        self.mru_int = handle;
        handle
    }

    pub fn float(&mut self, value: f64) -> Handle {
        // Bitwise comparison keeps -0.0 distinct from the cached 0.0
        if value.to_bits() == 0.0f64.to_bits() {
            return self.float_zero;
        }
        if value.to_bits() == 1.0f64.to_bits() {
            return self.float_one;
        }
        self.universe.allocate(Value::Float(value))
    }

    pub fn boolean(&self, value: bool) -> Handle {
        if value {
            self.true_value
        } else {
            self.false_value
        }
    }

    // -------------------------------------------------------------------------
    // Strings
    // -------------------------------------------------------------------------

    /// Build a string from UTF-8 bytes produced by generated code.
    ///
    /// The empty input and single ASCII characters return canonical
    /// instances. Anything else is decoded and allocated.
    pub fn string_from_bytes(&mut self, bytes: &[u8]) -> RuntimeResult<Handle> {
        match bytes {
            [] => Ok(self.empty_string),
            [b] if b.is_ascii() => Ok(self.single_chars[*b as usize]),
            _ => {
                let value = StringValue::from_utf8_bytes(bytes)?;
                Ok(self.universe.allocate(Value::String(value)))
            }
        }
    }

    /// Build a string from a Rust string slice.
    pub fn string(&mut self, s: &str) -> Handle {
        match s.as_bytes() {
            [] => self.empty_string,
            [b] if b.is_ascii() => self.single_chars[*b as usize],
            _ => self
                .universe
                .allocate(Value::String(StringValue::from_str_slice(s))),
        }
    }

    // -------------------------------------------------------------------------
    // Literal string table
    // -------------------------------------------------------------------------

    pub fn string_table_len(&self) -> usize {
        self.string_table.len()
    }

    /// Fill slot `index` of the string table. Each slot can be filled once.
    pub fn register_literal(&mut self, index: usize, bytes: &[u8]) -> RuntimeResult<Handle> {
        let len = self.string_table.len();
        match self.string_table.get(index) {
            None => return Err(RuntimeError::LiteralIndex { index, len }),
            Some(Some(_)) => return Err(RuntimeError::LiteralAlreadyRegistered { index }),
            Some(None) => {}
        }

        let handle = self.string_from_bytes(bytes)?;
        self.universe.pin(handle)?;
        self.string_table[index] = Some(handle);
        Ok(handle)
    }

    /// The literal registered at `index`.
    pub fn literal(&self, index: usize) -> RuntimeResult<Handle> {
        match self.string_table.get(index) {
            Some(Some(handle)) => Ok(*handle),
            Some(None) => Err(RuntimeError::LiteralMissing { index }),
            None => Err(RuntimeError::LiteralIndex {
                index,
                len: self.string_table.len(),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Cached constants
    // -------------------------------------------------------------------------

    pub fn zero(&self) -> Handle {
        self.ints[INT_CACHE_BOUND as usize]
    }

    pub fn one(&self) -> Handle {
        self.ints[INT_CACHE_BOUND as usize + 1]
    }

    pub fn true_value(&self) -> Handle {
        self.true_value
    }

    pub fn false_value(&self) -> Handle {
        self.false_value
    }

    pub fn empty_string(&self) -> Handle {
        self.empty_string
    }

    // -------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------

    pub fn value(&self, handle: Handle) -> RuntimeResult<&Value> {
        self.universe.get(handle)
    }

    pub fn int_value(&self, handle: Handle) -> RuntimeResult<i64> {
        self.universe.get(handle)?.as_int()
    }

    pub fn float_value(&self, handle: Handle) -> RuntimeResult<f64> {
        self.universe.get(handle)?.as_float()
    }

    pub fn bool_value(&self, handle: Handle) -> RuntimeResult<bool> {
        self.universe.get(handle)?.as_bool()
    }

    pub fn string_value(&self, handle: Handle) -> RuntimeResult<&StringValue> {
        self.universe.get(handle)?.as_string()
    }

    /// The UTF-8 form of a string value.
    pub fn string_to_utf8(&self, handle: Handle) -> RuntimeResult<&str> {
        Ok(self.string_value(handle)?.as_str())
    }

    // -------------------------------------------------------------------------
    // Lifetime
    // -------------------------------------------------------------------------

    /// Keep a value alive across a later [`Context::release`].
    pub fn anchor(&mut self, handle: Handle) -> RuntimeResult<()> {
        self.universe.anchor(handle)
    }

    /// Give up one anchor on a value.
    pub fn release(&mut self, handle: Handle) -> RuntimeResult<()> {
        self.universe.release(handle)
    }

    pub fn anchors(&self, handle: Handle) -> RuntimeResult<u32> {
        self.universe.anchors(handle)
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn stats(&self) -> UniverseStats {
        self.universe.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueTag;

    #[test]
    fn test_initialize_populates_caches() {
        let ctx = Context::initialize(3);
        // 2047 ints, 2 booleans, 2 floats, empty string, 128 characters
        assert_eq!(ctx.universe().len(), 2047 + 2 + 2 + 1 + 128);
        assert_eq!(ctx.string_table_len(), 3);
        assert_eq!(ctx.int_value(ctx.zero()), Ok(0));
        assert_eq!(ctx.int_value(ctx.one()), Ok(1));
    }

    #[test]
    fn test_small_ints_are_canonical() {
        let mut ctx = Context::initialize(0);
        for n in -INT_CACHE_BOUND..=INT_CACHE_BOUND {
            let a = ctx.int(n);
            let b = ctx.int(n);
            assert_eq!(a, b, "int {n} should be cached");
            assert_eq!(ctx.int_value(a), Ok(n));
        }
        let before = ctx.universe().len();
        ctx.int(-1023);
        ctx.int(1023);
        assert_eq!(ctx.universe().len(), before);
    }

    #[test]
    fn test_mru_int_slot() {
        let mut ctx = Context::initialize(0);
        let a = ctx.int(5000);
        let b = ctx.int(5000);
        assert_eq!(a, b);
        assert_eq!(ctx.anchors(a), Ok(2));

        let c = ctx.int(6000);
        let d = ctx.int(5000);
        assert_ne!(c, a);
        assert_ne!(d, a);
        assert_eq!(ctx.int_value(d), Ok(5000));
    }

    #[test]
    fn test_mru_slot_survives_reclamation() {
        let mut ctx = Context::initialize(0);
        let a = ctx.int(-4096);
        ctx.release(a).unwrap();
        let b = ctx.int(-4096);
        assert_ne!(a, b);
        assert_eq!(ctx.int_value(b), Ok(-4096));
    }

    #[test]
    fn test_booleans_are_singletons() {
        let ctx = Context::initialize(0);
        assert_eq!(ctx.boolean(true), ctx.boolean(true));
        assert_eq!(ctx.boolean(false), ctx.false_value());
        assert_ne!(ctx.boolean(true), ctx.boolean(false));
        assert_eq!(ctx.bool_value(ctx.true_value()), Ok(true));
    }

    #[test]
    fn test_cached_floats() {
        let mut ctx = Context::initialize(0);
        assert_eq!(ctx.float(0.0), ctx.float(0.0));
        assert_eq!(ctx.float(1.0), ctx.float(1.0));
        let negative_zero = ctx.float(-0.0);
        assert_ne!(negative_zero, ctx.float(0.0));
        let half = ctx.float(0.5);
        assert_eq!(ctx.float_value(half), Ok(0.5));
    }

    #[test]
    fn test_canonical_strings() {
        let mut ctx = Context::initialize(0);
        assert_eq!(ctx.string_from_bytes(b""), Ok(ctx.empty_string()));
        assert_eq!(ctx.string(""), ctx.empty_string());

        let a1 = ctx.string_from_bytes(b"a").unwrap();
        let a2 = ctx.string("a");
        assert_eq!(a1, a2);
        assert_eq!(ctx.string_value(a1).unwrap().hash(), 97);

        // Non-ASCII single code points and longer strings are fresh values
        let e1 = ctx.string("\u{e9}");
        let e2 = ctx.string("\u{e9}");
        assert_ne!(e1, e2);
        let ab1 = ctx.string("ab");
        let ab2 = ctx.string_from_bytes(b"ab").unwrap();
        assert_ne!(ab1, ab2);
        assert!(ctx.string_value(ab1).unwrap().content_eq(ctx.string_value(ab2).unwrap()));
    }

    #[test]
    fn test_malformed_string_bytes() {
        let mut ctx = Context::initialize(0);
        let before = ctx.universe().len();
        assert_eq!(
            ctx.string_from_bytes(&[b'x', 0xC3]),
            Err(RuntimeError::MalformedUtf8 { offset: 1 })
        );
        assert_eq!(
            ctx.string_from_bytes(&[0x80]),
            Err(RuntimeError::MalformedUtf8 { offset: 0 })
        );
        assert_eq!(ctx.universe().len(), before);
    }

    #[test]
    fn test_string_table() {
        let mut ctx = Context::initialize(2);
        assert_eq!(ctx.literal(0), Err(RuntimeError::LiteralMissing { index: 0 }));

        let hello = ctx.register_literal(0, b"hello").unwrap();
        assert_eq!(ctx.literal(0), Ok(hello));
        assert_eq!(ctx.string_to_utf8(hello), Ok("hello"));
        assert_eq!(
            ctx.register_literal(0, b"again"),
            Err(RuntimeError::LiteralAlreadyRegistered { index: 0 })
        );
        assert_eq!(
            ctx.register_literal(2, b"nope"),
            Err(RuntimeError::LiteralIndex { index: 2, len: 2 })
        );

        // Literals are pinned
        ctx.release(hello).unwrap();
        assert_eq!(ctx.literal(0), Ok(hello));
        assert!(ctx.universe().contains(hello));
    }

    #[test]
    fn test_with_literals() {
        let ctx = Context::with_literals(&["ok", "nums"]).unwrap();
        assert_eq!(ctx.string_table_len(), 2);
        assert_eq!(ctx.string_to_utf8(ctx.literal(1).unwrap()), Ok("nums"));
    }

    #[test]
    fn test_with_literals_matches_registration() {
        let mut ctx = Context::with_literals(&["x", "", "longer"]).unwrap();

        // Short literals resolve to the canonical instances
        let x = ctx.string("x");
        assert_eq!(ctx.literal(0), Ok(x));
        assert_eq!(ctx.literal(1), Ok(ctx.empty_string()));

        let longer = ctx.literal(2).unwrap();
        assert_eq!(ctx.universe().is_pinned(longer), Ok(true));
        ctx.release(longer).unwrap();
        assert_eq!(ctx.string_to_utf8(longer), Ok("longer"));

        assert_eq!(
            ctx.register_literal(2, b"again"),
            Err(RuntimeError::LiteralAlreadyRegistered { index: 2 })
        );
    }

    #[test]
    fn test_checked_access() {
        let mut ctx = Context::initialize(0);
        let text = ctx.string("text");
        assert_eq!(
            ctx.int_value(text),
            Err(RuntimeError::TypeMismatch {
                expected: ValueTag::Int,
                found: ValueTag::String,
            })
        );
        assert!(ctx.bool_value(ctx.zero()).is_err());
    }

    #[test]
    fn test_singletons_ignore_release() {
        let mut ctx = Context::initialize(0);
        let seven = ctx.int(7);
        let yes = ctx.boolean(true);
        for _ in 0..3 {
            ctx.release(seven).unwrap();
            ctx.release(yes).unwrap();
        }
        assert_eq!(ctx.int(7), seven);
        assert_eq!(ctx.bool_value(yes), Ok(true));
    }
}
