//! Vanilla sample programs.
//!
//! The functions here are written the way the transpiler emits code: every
//! value lives in a [`vanilla_runtime::Context`] and is passed around by
//! handle.

pub mod primes;
