//! Prime search over an integer range
//!
//! `find_primes` returns a string-keyed map `{"ok": true, "nums": [...]}`
//! whose keys come from the context's literal table.

use vanilla_runtime::numeric::{isqrt, safe_mod};
use vanilla_runtime::{Context, Handle, KeyKind, RuntimeResult};

/// Literal table layout expected by [`find_primes`].
pub const LITERALS: [&str; 2] = ["ok", "nums"];
const OK_LITERAL: usize = 0;
const NUMS_LITERAL: usize = 1;

pub fn create_context() -> RuntimeResult<Context> {
    Context::with_literals(&LITERALS)
}

/// Primes in `1..=upper_limit`.
pub fn find_primes(ctx: &mut Context, upper_limit: Handle) -> RuntimeResult<Handle> {
    let lower = ctx.one();
    find_primes_between(ctx, lower, upper_limit)
}

pub fn find_primes_between(
    ctx: &mut Context,
    lower_bound: Handle,
    upper_bound: Handle,
) -> RuntimeResult<Handle> {
    let primes = generate_prime_list(ctx, lower_bound, upper_bound)?;

    let output = ctx.map_new(KeyKind::String);
    let ok = ctx.literal(OK_LITERAL)?;
    let nums = ctx.literal(NUMS_LITERAL)?;
    let yes = ctx.true_value();
    ctx.map_set(output, ok, yes)?;
    ctx.map_set(output, nums, primes)?;

    tracing::debug!(
        count = ctx.list_len(primes)?,
        live = ctx.stats().live(),
        "found primes"
    );
    ctx.release(primes)?;
    Ok(output)
}

/// Every prime between the bounds, both inclusive. The walk runs downwards
/// when `lower_bound` is above `upper_bound`.
pub fn generate_prime_list(
    ctx: &mut Context,
    lower_bound: Handle,
    upper_bound: Handle,
) -> RuntimeResult<Handle> {
    let results = ctx.list_new();
    let lower = ctx.int_value(lower_bound)?;
    let upper = ctx.int_value(upper_bound)?;
    let step = if lower < upper { 1 } else { -1 };

    let mut n = lower;
    loop {
        let value = ctx.int(n);
        let prime = is_prime(ctx, value)?;
        if ctx.bool_value(prime)? {
            ctx.list_add(results, value)?;
        }
        ctx.release(value)?;

        if n == upper {
            break;
        }
        n += step;
    }

    let snapshot = ctx.list_clone(results)?;
    ctx.release(results)?;
    Ok(snapshot)
}

pub fn is_prime(ctx: &mut Context, value: Handle) -> RuntimeResult<Handle> {
    let n = ctx.int_value(value)?;
    if n < 2 {
        return Ok(ctx.false_value());
    }
    if n == 2 {
        return Ok(ctx.true_value());
    }
    if safe_mod(n, 2)? == 0 {
        return Ok(ctx.false_value());
    }

    let max_check = isqrt(n)?;
    let mut div = 3;
    while div <= max_check {
        if safe_mod(n, div)? == 0 {
            return Ok(ctx.false_value());
        }
        div += 2;
    }
    Ok(ctx.true_value())
}
