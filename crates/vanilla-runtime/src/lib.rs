//! Vanilla runtime library.
//!
//! Provides the value substrate that transpiled Vanilla programs run on:
//! - Tagged values (`int`, `float`, `string`, `boolean`, `list`, `array`, `map`)
//!   with checked downcasts
//! - An allocation universe that tracks every live value in a closed ring and
//!   reclaims values by anchor counting
//! - A per-run [`Context`] owning the canonical small ints, booleans, floats,
//!   empty and single-character strings, and the literal string table
//! - UTF-8 decoding and the base-37 string hash
//! - Lists, fixed arrays and chained hash maps with string or value keys
//!
//! Every operation takes the context explicitly. A context is meant for one
//! thread.
//!
//! ```
//! use vanilla_runtime::{Context, KeyKind};
//!
//! let mut ctx = Context::with_literals(&["ok"])?;
//! let result = ctx.map_new(KeyKind::String);
//! let ok = ctx.literal(0)?;
//! ctx.map_set(result, ok, ctx.true_value())?;
//! assert_eq!(ctx.render(result)?, r#"{"ok": true}"#);
//! # Ok::<(), vanilla_runtime::RuntimeError>(())
//! ```

pub mod array;
pub mod context;
pub mod error;
pub mod handle;
pub mod list;
pub mod map;
pub mod numeric;
pub mod render;
pub mod string;
pub mod universe;
pub mod value;

pub use array::ArrayValue;
pub use context::{Context, ContextConfig, INT_CACHE_BOUND, SINGLE_CHAR_COUNT};
pub use error::{RuntimeError, RuntimeResult};
pub use handle::Handle;
pub use list::ListValue;
pub use map::{DEFAULT_MAP_BUCKETS, KeyKind, MapValue};
pub use numeric::{isqrt, safe_mod, safe_mod_f, sqrt};
pub use string::{HASH_BASE, StringValue};
pub use universe::{Universe, UniverseStats};
pub use value::{Value, ValueTag};
