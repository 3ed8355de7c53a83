//! Allocation wrapper and growth-size arithmetic.
//!
//! Allocation failure is treated as fatal: Rust's global allocator already
//! aborts the process when an infallible allocation (`Vec::reserve`,
//! `Rc::new`, ...) can't be satisfied, so that much comes for free. What's
//! left to provide is reserving an *exact* amount up front instead of
//! leaving it to the allocator's own amortized growth: string and array
//! payloads grow by specific formulas, not by whatever factor `Vec` would
//! pick on its own.

use std::alloc::{Layout, handle_alloc_error};

/// Reserve exactly `additional` more elements of `T` in `buf`, aborting the
/// process (never returning an error) if the allocator can't satisfy it.
///
/// This makes the "allocation failure is fatal" rule explicit at the call
/// site, rather than relying on `Vec::reserve_exact`'s default abort-on-OOM
/// behavior implicitly.
pub fn reserve_exact_or_abort<T>(buf: &mut Vec<T>, additional: usize) {
    if buf.try_reserve_exact(additional).is_err() {
        let layout = Layout::array::<T>(buf.capacity() + additional)
            .unwrap_or_else(|_| Layout::new::<T>());
        handle_alloc_error(layout);
    }
}

/// Growth target for a doubling buffer (string append): allocate a fresh
/// buffer of size `2*(cur+len)`, minimum 32.
pub fn doubling_capacity(current_len: usize, additional: usize) -> usize {
    (2 * (current_len + additional)).max(32)
}

/// Growth target for a 1.5x-scaled buffer (array set): allocate a new
/// payload of capacity `ceil(1.5 * max(i+1, size))`.
pub fn scaled_capacity(min_needed: usize) -> usize {
    // ceil(1.5 * min_needed) computed without floating point.
    (min_needed * 3).div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_respects_minimum() {
        assert_eq!(doubling_capacity(0, 1), 32);
        assert_eq!(doubling_capacity(10, 5), 30.max(32));
        assert_eq!(doubling_capacity(100, 50), 300);
    }

    #[test]
    fn scaled_rounds_up() {
        assert_eq!(scaled_capacity(1), 2);
        assert_eq!(scaled_capacity(2), 3);
        assert_eq!(scaled_capacity(4), 6);
        assert_eq!(scaled_capacity(5), 8);
    }

    #[test]
    fn reserve_exact_or_abort_grows_capacity() {
        let mut v: Vec<u8> = Vec::new();
        reserve_exact_or_abort(&mut v, 64);
        assert!(v.capacity() >= 64);
    }
}
