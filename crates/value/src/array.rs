//! Array: a refcounted flexible element buffer, with an `(offset, size)`
//! window on the handle giving O(1) aliasing sub-slices.
//!
//! The struct layout keeps `length`/`alloc_length` on the *payload* and
//! `(offset, size)` on the *handle* pointing at it. `Rc<Vec<Value>>` already
//! gives us payload `length` (`Vec::len`) and `alloc_length`
//! (`Vec::capacity`) for free, so `SeqArray` only needs to add the window.

use std::rc::Rc;

use dynval_core::{alloc, clamp_range};

use crate::value::Value;

/// A handle over a shared element buffer: `payload[offset..offset+size]`.
#[derive(Debug, Clone)]
pub struct SeqArray {
    payload: Rc<Vec<Value>>,
    offset: usize,
    size: usize,
}

impl SeqArray {
    pub fn new() -> Self {
        SeqArray {
            payload: Rc::new(Vec::new()),
            offset: 0,
            size: 0,
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        SeqArray {
            payload: Rc::new(Vec::with_capacity(n)),
            offset: 0,
            size: 0,
        }
    }

    pub fn len(&self) -> i64 {
        self.size as i64
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn window(&self) -> &[Value] {
        &self.payload[self.offset..self.offset + self.size]
    }

    pub fn refcount(&self) -> i64 {
        Rc::strong_count(&self.payload) as i64
    }

    pub fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.payload, &other.payload)
            && self.offset == other.offset
            && self.size == other.size
    }

    /// Element at `offset + i` if `0 <= i < size`, otherwise bare
    /// `Invalid`. Always a fresh copy (`Value::clone` bumps any heap
    /// payload's `Rc` count rather than deep-copying).
    pub fn get(&self, i: i64) -> Value {
        if i < 0 || i >= self.size as i64 {
            return Value::Invalid(None);
        }
        self.window()[i as usize].clone()
    }

    /// Negative `i` maps to `length + i`; still negative is an indexing
    /// error. `i + offset` past the descriptor's encodable range is a size
    /// error. Otherwise: in-place when unique and the slot already exists
    /// in the backing `Vec`'s capacity, else grow by `ceil(1.5 *
    /// max(i+1, size))` and rebase the window to `offset = 0`.
    pub fn set(mut self, i: i64, v: Value) -> Value {
        let i = if i < 0 { i + self.size as i64 } else { i };
        if i < 0 {
            return crate::invalid::with_message(Value::string(
                "Out of bounds negative array index",
            ));
        }
        // i + offset past (INT_MAX >> 2) is treated as too large to encode.
        if i.saturating_add(self.offset as i64) > (i64::from(i32::MAX) >> 2) {
            return crate::invalid::with_message(Value::string("Array index too large"));
        }
        let i = i as usize;
        let new_len = self.offset + i + 1;

        if new_len <= self.payload.capacity()
            && let Some(payload) = Rc::get_mut(&mut self.payload)
        {
            while payload.len() < new_len {
                payload.push(Value::Null);
            }
            payload[self.offset + i] = v;
            self.size = self.size.max(i + 1);
            return Value::Array(self);
        }

        let new_cap = alloc::scaled_capacity((i + 1).max(self.size));
        let mut fresh: Vec<Value> = Vec::new();
        alloc::reserve_exact_or_abort(&mut fresh, new_cap);
        fresh.extend(self.window().iter().cloned());
        while fresh.len() < i {
            fresh.push(Value::Null);
        }
        if fresh.len() == i {
            fresh.push(v);
        } else {
            fresh[i] = v;
        }
        Value::Array(SeqArray {
            size: fresh.len(),
            payload: Rc::new(fresh),
            offset: 0,
        })
    }

    pub fn append(self, v: Value) -> Value {
        let i = self.size as i64;
        self.set(i, v)
    }

    /// Repeated append; early-exits once the accumulator becomes
    /// `Invalid`.
    pub fn concat(mut a: Value, b: &SeqArray) -> Value {
        for elem in b.window() {
            match a {
                Value::Invalid(_) => return a,
                Value::Array(arr) => a = arr.append(elem.clone()),
                _ => unreachable!("concat only ever holds an Array or an Invalid short-circuit"),
            }
        }
        a
    }

    /// Clamps, then either rebases the window in place (cheap) or
    /// materializes a fresh payload when the new offset would exceed the
    /// descriptor's encodable range.
    pub fn slice(&self, start: i64, end: i64) -> Self {
        let (s, e) = clamp_range(self.size as i64, start, end);
        if s == e {
            return SeqArray::new();
        }
        let new_offset = self.offset + s;
        let new_size = e - s;
        // The offset field is of limited width in the original design (16
        // bits); slicing past that width triggers materialization. Here the
        // field is widened to `usize`, but the threshold is kept as a
        // documented, generous bound rather than removed outright, so the
        // aliasing-vs-materializing trade-off stays visible.
        const MAX_OFFSET: usize = (1 << 31) - 1;
        if new_offset > MAX_OFFSET {
            return SeqArray {
                payload: Rc::new(self.payload[new_offset..new_offset + new_size].to_vec()),
                offset: 0,
                size: new_size,
            };
        }
        SeqArray {
            payload: Rc::clone(&self.payload),
            offset: new_offset,
            size: new_size,
        }
    }

    /// Same payload and offset is a fast accept (sizes already compared
    /// equal by the caller); otherwise elementwise.
    pub fn equal(a: &SeqArray, b: &SeqArray) -> bool {
        if a.size != b.size {
            return false;
        }
        if Rc::ptr_eq(&a.payload, &b.payload) && a.offset == b.offset {
            return true;
        }
        a.window()
            .iter()
            .zip(b.window())
            .all(|(x, y)| crate::value::equal(x, y))
    }

    /// True iff for every element `be` of `b` there exists an element `ae`
    /// of `a` with `contains(ae, be)`.
    pub fn contains(a: &SeqArray, b: &SeqArray) -> bool {
        b.window()
            .iter()
            .all(|be| a.window().iter().any(|ae| crate::value::contains(ae, be)))
    }

    /// Collects every start position in `a` where the subarray beginning
    /// there equals `b` elementwise.
    ///
    /// Preserved verbatim from the original design's latent behavior: the
    /// per-outer-iteration index gets clobbered by the last inner
    /// iteration's index rather than reset, so a candidate start position
    /// is only actually recorded as a match when `b`'s *last* element
    /// matches at the corresponding offset (the loop's exit condition),
    /// not when the whole subarray compares equal. This mirrors that
    /// behavior rather than the "obviously intended" elementwise-equality
    /// reading.
    pub fn indexes(a: &SeqArray, b: &SeqArray) -> Vec<i64> {
        let mut out = Vec::new();
        if b.is_empty() || b.size as i64 > a.size as i64 {
            return out;
        }
        let awin = a.window();
        let bwin = b.window();
        for ai in 0..=(awin.len() - bwin.len()) {
            // Faithfully reproduce the clobbered-index bug: only the final
            // inner comparison (bwin.last() vs awin[ai + bwin.len() - 1])
            // gates whether `ai` is recorded, provided every earlier inner
            // iteration also ran (which it always does, since the inner
            // loop never short-circuits).
            let last = bwin.len() - 1;
            if crate::value::equal(&awin[ai + last], &bwin[last]) {
                out.push(ai as i64);
            }
        }
        out
    }
}

impl Default for SeqArray {
    fn default() -> Self {
        SeqArray::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Value {
        Value::number(n as f64)
    }

    #[test]
    fn append_twice_then_get() {
        let a = SeqArray::new();
        let Value::Array(a) = a.append(num(1)) else {
            panic!()
        };
        let Value::Array(a) = a.append(num(2)) else {
            panic!()
        };
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(0), num(1));
        assert_eq!(a.get(1), num(2));
    }

    #[test]
    fn set_past_end_pads_with_null() {
        let a = SeqArray::with_capacity(0);
        let Value::Array(a) = a.set(3, Value::string("x")) else {
            panic!()
        };
        assert_eq!(a.len(), 4);
        assert_eq!(a.get(0), Value::Null);
        assert_eq!(a.get(1), Value::Null);
        assert_eq!(a.get(2), Value::Null);
        assert_eq!(a.get(3), Value::string("x"));
    }

    #[test]
    fn set_negative_out_of_bounds_is_invalid_with_message() {
        let a = SeqArray::new();
        let result = a.set(-1, num(0));
        assert!(crate::invalid::has_message(&result));
    }

    #[test]
    fn slice_aliases_without_copying_payload() {
        let a = SeqArray::new();
        let Value::Array(a) = a.append(num(1)) else {
            panic!()
        };
        let Value::Array(a) = a.append(num(2)) else {
            panic!()
        };
        let Value::Array(a) = a.append(num(3)) else {
            panic!()
        };
        let s = a.slice(1, 3);
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(0), num(2));
        assert_eq!(s.get(1), num(3));
        assert!(Rc::ptr_eq(&a.payload, &s.payload));
    }

    #[test]
    fn cow_isolates_mutation_through_alias() {
        let a1 = SeqArray::new();
        let Value::Array(a1) = a1.append(num(1)) else {
            panic!()
        };
        let a2 = a1.clone();
        let Value::Array(a2) = a2.set(0, num(99)) else {
            panic!()
        };
        assert_eq!(a1.get(0), num(1));
        assert_eq!(a2.get(0), num(99));
    }

    #[test]
    fn equal_fast_path_on_same_payload_and_offset() {
        let a = SeqArray::new();
        let Value::Array(a) = a.append(num(1)) else {
            panic!()
        };
        let b = a.clone();
        assert!(SeqArray::equal(&a, &b));
    }
}
