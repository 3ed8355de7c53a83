//! Thread-local decimal arithmetic context.
//!
//! The conceptual design calls for a bespoke per-thread key-management
//! layer: a process-wide table of thread-local-storage keys, with key
//! registration serialized by a global mutex and per-thread lookup/set
//! lock-free. Rust's native thread-local facility already preserves the
//! initialize-on-first-use / destroy-on-thread-exit contract that layer
//! exists for, so `std::thread_local!` serves directly: it already
//! serializes first-access initialization per thread and runs drop glue at
//! thread exit. No mutex, no registry, no explicit teardown hook:
//! `thread_local!` is the whole mechanism.
use std::cell::Cell;

pub use bigdecimal::RoundingMode;

/// IEEE 754 decimal128 precision, the conventional default for a
/// decNumber-family context. `digits` is clamped to avoid
/// exponent-difference overflow.
pub const DEFAULT_DIGITS: u32 = 34;

/// Upper bound on requested precision. decNumber-family contexts clamp
/// `digits` so that the difference between two operands' exponents can
/// never overflow a 32-bit exponent field; a context with `digits` this
/// large is already far past anything `bigdecimal`'s arbitrary-precision
/// arithmetic needs to represent jq's number literals faithfully.
const MAX_DIGITS: u32 = 1 << 20;

/// Per-thread decimal arithmetic settings: default base settings, `digits`
/// clamped, traps disabled.
///
/// There is no `traps` field: traps disabled means decimal operations
/// never signal on inexactness/overflow, which here just means they never
/// panic, so there is no trap-handling path to turn off.
#[derive(Debug, Clone, Copy)]
pub struct DecimalContext {
    pub digits: u32,
    pub rounding: RoundingMode,
}

impl Default for DecimalContext {
    fn default() -> Self {
        DecimalContext {
            digits: DEFAULT_DIGITS,
            rounding: RoundingMode::HalfEven,
        }
    }
}

thread_local! {
    static DIGITS: Cell<u32> = const { Cell::new(DEFAULT_DIGITS) };
}

/// Run `f` against the current thread's decimal context, initializing it on
/// first use (the `thread_local!` cell already defaults to
/// [`DecimalContext::default`], so "first use" and "initialization" are the
/// same event, so no separate one-shot flag is needed).
pub fn with_context<R>(f: impl FnOnce(&DecimalContext) -> R) -> R {
    DIGITS.with(|d| {
        let ctx = DecimalContext {
            digits: d.get(),
            rounding: RoundingMode::HalfEven,
        };
        f(&ctx)
    })
}

/// Set this thread's precision, clamped to `[1, MAX_DIGITS]`.
pub fn set_digits(digits: u32) {
    DIGITS.with(|d| d.set(digits.clamp(1, MAX_DIGITS)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_34_digits() {
        with_context(|ctx| assert_eq!(ctx.digits, DEFAULT_DIGITS));
    }

    #[test]
    fn set_digits_clamps_upper_bound() {
        set_digits(u32::MAX);
        with_context(|ctx| assert_eq!(ctx.digits, MAX_DIGITS));
        set_digits(DEFAULT_DIGITS);
    }

    #[test]
    fn set_digits_clamps_lower_bound() {
        set_digits(0);
        with_context(|ctx| assert_eq!(ctx.digits, 1));
        set_digits(DEFAULT_DIGITS);
    }

    #[test]
    fn context_is_per_thread() {
        set_digits(10);
        let handle = std::thread::spawn(|| {
            with_context(|ctx| ctx.digits)
        });
        assert_eq!(handle.join().unwrap(), DEFAULT_DIGITS);
        with_context(|ctx| assert_eq!(ctx.digits, 10));
        set_digits(DEFAULT_DIGITS);
    }
}
