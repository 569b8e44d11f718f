//! Hash maps with chaining
//!
//! A map is created with a fixed [`KeyKind`]:
//!
//! - `KeyKind::String` maps take only string keys and compare them by content
//!   (hash first, then code points);
//! - `KeyKind::Value` maps reject string keys, compare ints, floats and
//!   booleans by payload, and compare containers by identity.
//!
//! The bucket of a key is its 32-bit hash modulo the bucket count. Each bucket
//! is a chain in insertion order. The table doubles once more than three
//! quarters of the bucket count is occupied; rehashing keeps relative chain
//! order, so iteration order is bucket order then chain order.

use derive_more::Display;

use crate::context::Context;
use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::string::hash_code_points;
use crate::value::{Value, ValueTag};

/// Bucket count of a new map.
pub const DEFAULT_MAP_BUCKETS: usize = 16;

/// Key discipline of a map, fixed at creation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    #[display("string-keyed")]
    String,
    #[display("value-keyed")]
    Value,
}

#[derive(Debug, Clone, Copy)]
struct MapEntry {
    hash: i32,
    key: Handle,
    value: Handle,
}

#[derive(Debug, Clone)]
pub struct MapValue {
    kind: KeyKind,
    len: usize,
    buckets: Vec<Vec<MapEntry>>,
}

impl MapValue {
    pub(crate) fn new(kind: KeyKind, buckets: usize) -> Self {
        Self {
            kind,
            len: 0,
            buckets: vec![Vec::new(); buckets.max(1)],
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// All `(key, value)` pairs, in bucket order then chain order.
    pub fn entries(&self) -> impl Iterator<Item = (Handle, Handle)> + '_ {
        self.buckets
            .iter()
            .flatten()
            .map(|entry| (entry.key, entry.value))
    }

    fn bucket_index(hash: i32, buckets: usize) -> usize {
        i64::from(hash).rem_euclid(buckets as i64) as usize
    }

    /// Entries whose stored hash equals `hash`.
    fn candidates(&self, hash: i32) -> impl Iterator<Item = &MapEntry> + '_ {
        self.buckets[Self::bucket_index(hash, self.buckets.len())]
            .iter()
            .filter(move |entry| entry.hash == hash)
    }

    /// Swap the value stored under the exact key handle `key`.
    fn replace_value(&mut self, hash: i32, key: Handle, value: Handle) -> Option<Handle> {
        let index = Self::bucket_index(hash, self.buckets.len());
        self.buckets[index]
            .iter_mut()
            .find(|entry| entry.key == key)
            .map(|entry| std::mem::replace(&mut entry.value, value))
    }

    fn insert_new(&mut self, hash: i32, key: Handle, value: Handle) {
        let index = Self::bucket_index(hash, self.buckets.len());
        self.buckets[index].push(MapEntry { hash, key, value });
        self.len += 1;

        if self.len * 4 > self.buckets.len() * 3 {
            self.grow();
        }
    }

    fn grow(&mut self) {
        let count = self.buckets.len() * 2;
        let mut buckets = vec![Vec::new(); count];
        for entry in self.buckets.drain(..).flatten() {
            buckets[Self::bucket_index(entry.hash, count)].push(entry);
        }
        self.buckets = buckets;
        tracing::trace!(len = self.len, buckets = count, "rehashed map");
    }
}

/// Fold 64 bits into a 32-bit hash.
fn fold_bits(bits: u64) -> i32 {
    (bits ^ (bits >> 32)) as u32 as i32
}

impl Context {
    /// Create an empty map with the given key discipline.
    pub fn map_new(&mut self, kind: KeyKind) -> Handle {
        let buckets = self.config.map_buckets;
        self.universe.allocate(Value::Map(MapValue::new(kind, buckets)))
    }

    /// Hash `key` under `kind`, rejecting keys the discipline does not accept.
    fn key_hash(&self, kind: KeyKind, key: Handle) -> RuntimeResult<i32> {
        let value = self.universe.get(key)?;
        match (kind, value) {
            (KeyKind::String, Value::String(s)) => Ok(s.hash()),
            (KeyKind::Value, Value::Int(n)) => Ok(fold_bits(*n as u64)),
            (KeyKind::Value, Value::Float(f)) => Ok(fold_bits(f.to_bits())),
            (KeyKind::Value, Value::Boolean(b)) => Ok(i32::from(*b)),
            (KeyKind::Value, Value::List(_) | Value::Array(_) | Value::Map(_)) => {
                Ok(fold_bits(key.identity()))
            }
            (KeyKind::String, other) | (KeyKind::Value, other @ Value::String(_)) => {
                Err(RuntimeError::KeyDiscipline {
                    expected: kind,
                    found: other.tag(),
                })
            }
        }
    }

    fn keys_equal(&self, a: Handle, b: Handle) -> RuntimeResult<bool> {
        if a == b {
            return Ok(true);
        }
        Ok(match (self.universe.get(a)?, self.universe.get(b)?) {
            (Value::String(x), Value::String(y)) => x.content_eq(y),
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
            (Value::Boolean(x), Value::Boolean(y)) => x == y,
            // Containers are equal only by identity
            _ => false,
        })
    }

    /// Find the stored `(key, value)` pair equal to `key`, along with its hash.
    fn map_locate(
        &self,
        map: Handle,
        key: Handle,
    ) -> RuntimeResult<(i32, Option<(Handle, Handle)>)> {
        let table = self.universe.get(map)?.as_map()?;
        let hash = self.key_hash(table.kind(), key)?;
        for entry in table.candidates(hash) {
            if self.keys_equal(entry.key, key)? {
                return Ok((hash, Some((entry.key, entry.value))));
            }
        }
        Ok((hash, None))
    }

    /// Insert or update. An existing equal key keeps its original key handle
    /// and has its value replaced.
    pub fn map_set(&mut self, map: Handle, key: Handle, value: Handle) -> RuntimeResult<()> {
        let (hash, found) = self.map_locate(map, key)?;
        self.universe.anchor(value)?;

        match found {
            Some((stored_key, _)) => {
                let previous = self
                    .universe
                    .get_mut(map)?
                    .as_map_mut()?
                    .replace_value(hash, stored_key, value);
                match previous {
                    Some(previous) => self.universe.release(previous),
                    None => Ok(()),
                }
            }
            None => {
                self.universe.anchor(key)?;
                self.universe
                    .get_mut(map)?
                    .as_map_mut()?
                    .insert_new(hash, key, value);
                Ok(())
            }
        }
    }

    /// Build a map from `(key, value)` pairs, applied in order so a later
    /// duplicate key overwrites an earlier one. On failure nothing stays
    /// anchored.
    pub fn map_from_pairs(
        &mut self,
        kind: KeyKind,
        pairs: &[(Handle, Handle)],
    ) -> RuntimeResult<Handle> {
        let map = self.map_new(kind);
        for &(key, value) in pairs {
            if let Err(err) = self.map_set(map, key, value) {
                self.universe.release(map)?;
                return Err(err);
            }
        }
        Ok(map)
    }

    /// Look up `key`. A miss is `Ok(None)`.
    pub fn map_get(&self, map: Handle, key: Handle) -> RuntimeResult<Option<Handle>> {
        Ok(self.map_locate(map, key)?.1.map(|(_, value)| value))
    }

    /// Look up a string key given as a Rust string, without allocating a
    /// runtime string.
    pub fn map_get_str(&self, map: Handle, key: &str) -> RuntimeResult<Option<Handle>> {
        let table = self.universe.get(map)?.as_map()?;
        if table.kind() != KeyKind::String {
            return Err(RuntimeError::KeyDiscipline {
                expected: table.kind(),
                found: ValueTag::String,
            });
        }

        let points: Vec<u32> = key.chars().map(u32::from).collect();
        let hash = hash_code_points(&points);
        for entry in table.candidates(hash) {
            if self.string_value(entry.key)?.code_points() == points.as_slice() {
                return Ok(Some(entry.value));
            }
        }
        Ok(None)
    }

    pub fn map_contains(&self, map: Handle, key: Handle) -> RuntimeResult<bool> {
        Ok(self.map_get(map, key)?.is_some())
    }

    pub fn map_len(&self, map: Handle) -> RuntimeResult<usize> {
        Ok(self.universe.get(map)?.as_map()?.len())
    }

    /// The keys of `map` in iteration order. The returned handles are not
    /// anchored; they stay valid while the map holds them.
    pub fn map_keys(&self, map: Handle) -> RuntimeResult<Vec<Handle>> {
        Ok(self
            .universe
            .get(map)?
            .as_map()?
            .entries()
            .map(|(key, _)| key)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_keys_compare_by_content() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::String);

        let k1 = ctx.string("answer");
        let k2 = ctx.string("answer");
        assert_ne!(k1, k2);

        let first = ctx.int(1);
        let second = ctx.int(2);
        ctx.map_set(map, k1, first).unwrap();
        ctx.map_set(map, k2, second).unwrap();

        assert_eq!(ctx.map_len(map), Ok(1));
        assert_eq!(ctx.map_get(map, k1), Ok(Some(second)));
        assert_eq!(ctx.map_get_str(map, "answer"), Ok(Some(second)));
        assert_eq!(ctx.map_keys(map), Ok(vec![k1]));
    }

    #[test]
    fn test_lookup_miss_is_not_an_error() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::String);
        let key = ctx.string("missing");
        assert_eq!(ctx.map_get(map, key), Ok(None));
        assert_eq!(ctx.map_contains(map, key), Ok(false));
        assert_eq!(ctx.map_get_str(map, "missing"), Ok(None));
    }

    #[test]
    fn test_key_discipline_is_enforced() {
        let mut ctx = Context::initialize(0);
        let by_string = ctx.map_new(KeyKind::String);
        let by_value = ctx.map_new(KeyKind::Value);
        let number = ctx.int(3);
        let text = ctx.string("three");

        assert_eq!(
            ctx.map_set(by_string, number, text),
            Err(RuntimeError::KeyDiscipline {
                expected: KeyKind::String,
                found: ValueTag::Int,
            })
        );
        assert_eq!(
            ctx.map_get(by_value, text),
            Err(RuntimeError::KeyDiscipline {
                expected: KeyKind::Value,
                found: ValueTag::String,
            })
        );
        assert!(ctx.map_get_str(by_value, "three").is_err());
        assert_eq!(ctx.map_len(by_string), Ok(0));
    }

    #[test]
    fn test_value_keys() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::Value);

        // Distinct instances of an uncached int are the same key
        let big1 = ctx.int(123_456);
        let _other = ctx.int(7_000_000);
        let big2 = ctx.int(123_456);
        assert_ne!(big1, big2);

        let yes = ctx.boolean(true);
        let no = ctx.boolean(false);
        ctx.map_set(map, big1, yes).unwrap();
        ctx.map_set(map, big2, no).unwrap();
        assert_eq!(ctx.map_len(map), Ok(1));
        assert_eq!(ctx.map_get(map, big1), Ok(Some(no)));

        // Floats compare by bit pattern, booleans by payload
        let half1 = ctx.float(0.5);
        let half2 = ctx.float(0.5);
        ctx.map_set(map, half1, yes).unwrap();
        assert_eq!(ctx.map_get(map, half2), Ok(Some(yes)));
        let negative_zero = ctx.float(-0.0);
        let zero = ctx.float(0.0);
        ctx.map_set(map, zero, yes).unwrap();
        assert_eq!(ctx.map_get(map, negative_zero), Ok(None));

        ctx.map_set(map, yes, no).unwrap();
        assert_eq!(ctx.map_get(map, ctx.true_value()), Ok(Some(no)));
    }

    #[test]
    fn test_containers_are_keys_by_identity() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::Value);
        let a = ctx.list_new();
        let b = ctx.list_new();
        let one = ctx.int(1);
        ctx.map_set(map, a, one).unwrap();
        assert_eq!(ctx.map_get(map, a), Ok(Some(one)));
        assert_eq!(ctx.map_get(map, b), Ok(None));
    }

    #[test]
    fn test_duplicate_keys_keep_last_write() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::Value);
        let keys = [5, 9, 5, 1, 9, 9, 2048, 5, 2048];
        for (i, &k) in keys.iter().enumerate() {
            let key = ctx.int(k);
            let value = ctx.int(i as i64);
            ctx.map_set(map, key, value).unwrap();
        }

        assert_eq!(ctx.map_len(map), Ok(4));
        for (k, expected) in [(5, 7), (9, 5), (1, 3), (2048, 8)] {
            let key = ctx.int(k);
            let value = ctx.map_get(map, key).unwrap().unwrap();
            assert_eq!(ctx.int_value(value), Ok(expected), "key {k}");
        }
    }

    #[test]
    fn test_growth_preserves_entries() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::String);
        let keys: Vec<String> = (0..200).map(|i| format!("key-{i}")).collect();
        for (i, name) in keys.iter().enumerate() {
            let key = ctx.string(name);
            let value = ctx.int(i as i64);
            ctx.map_set(map, key, value).unwrap();
        }

        let table = ctx.value(map).unwrap().as_map().unwrap();
        assert_eq!(table.len(), 200);
        assert!(table.len() * 4 <= table.bucket_count() * 3);
        assert_eq!(table.bucket_count(), 512);

        for (i, name) in keys.iter().enumerate() {
            let value = ctx.map_get_str(map, name).unwrap().unwrap();
            assert_eq!(ctx.int_value(value), Ok(i as i64));
        }
    }

    #[test]
    fn test_negative_hashes_land_in_range() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::Value);
        for n in [-1, -2, -1_000_000, i64::MIN, i64::MAX] {
            let key = ctx.int(n);
            let value = ctx.int(n);
            ctx.map_set(map, key, value).unwrap();
        }
        assert_eq!(ctx.map_len(map), Ok(5));
        let key = ctx.int(-1_000_000);
        assert!(ctx.map_contains(map, key).unwrap());
    }

    #[test]
    fn test_map_from_pairs() {
        let mut ctx = Context::initialize(0);
        let pairs: Vec<_> = [(1, 10), (2, 20), (1, 30)]
            .into_iter()
            .map(|(k, v)| (ctx.int(k), ctx.int(v)))
            .collect();
        let map = ctx.map_from_pairs(KeyKind::Value, &pairs).unwrap();

        assert_eq!(ctx.map_len(map), Ok(2));
        let one = ctx.int(1);
        let value = ctx.map_get(map, one).unwrap().unwrap();
        assert_eq!(ctx.int_value(value), Ok(30));
    }

    #[test]
    fn test_map_from_pairs_failure_releases_partial_map() {
        let mut ctx = Context::initialize(0);
        let key = ctx.string("first");
        let value = ctx.int(123_456);
        let bad_key = ctx.int(5);

        let live = ctx.universe().len();
        assert_eq!(
            ctx.map_from_pairs(KeyKind::String, &[(key, value), (bad_key, value)]),
            Err(RuntimeError::KeyDiscipline {
                expected: KeyKind::String,
                found: ValueTag::Int,
            })
        );
        assert_eq!(ctx.universe().len(), live);
        assert_eq!(ctx.anchors(key), Ok(1));
        assert_eq!(ctx.anchors(value), Ok(1));
    }

    #[test]
    fn test_replaced_values_are_released() {
        let mut ctx = Context::initialize(0);
        let map = ctx.map_new(KeyKind::String);
        let key = ctx.string("slot");
        let old = ctx.int(90_000);
        ctx.map_set(map, key, old).unwrap();
        ctx.release(old).unwrap();

        let new = ctx.int(91_000);
        ctx.map_set(map, key, new).unwrap();
        assert!(!ctx.universe().contains(old));

        ctx.release(key).unwrap();
        ctx.release(new).unwrap();
        ctx.release(map).unwrap();
        assert!(!ctx.universe().contains(key));
        assert!(!ctx.universe().contains(new));
    }
}
