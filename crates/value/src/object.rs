//! Object: a refcounted slot arena plus a power-of-two bucket array,
//! separate-chained by slot index.
//!
//! This hand-rolls the arena/bucket structure directly rather than reaching
//! for `std::collections::HashMap`, because the exact growth mechanics
//! (initial capacity 8, grow-and-rehash on fill, slots never returned to a
//! free list after `delete`) and the property that repeated sets of
//! distinct keys never lose prior bindings across rehash need to be pinned
//! down precisely, which only an explicit slot/bucket model reproduces.

use std::rc::Rc;

use crate::string::SeqValueString;
use crate::value::Value;

const INITIAL_CAPACITY: usize = 8;
/// If a rehash would grow capacity past `INT_MAX >> 2`, report
/// invalid-with-message "Object too big" instead.
const MAX_CAPACITY: usize = (i32::MAX as usize) >> 2;
/// Sentinel returned by `iter_next` at the end of iteration.
pub const ITER_FINISHED: i64 = -2;

#[derive(Debug, Clone)]
struct Slot {
    /// Index of the next slot in this bucket's chain, or `-1`.
    next: i32,
    hash: u32,
    /// `None` marks a deleted slot; it is never reused before the next
    /// rehash.
    key: Option<SeqValueString>,
    value: Value,
}

#[derive(Debug)]
struct ObjectPayload {
    /// Number of slots allocated so far out of `slots.len()`'s capacity;
    /// doubles as "index of the next unused slot".
    next_free: usize,
    slots: Vec<Slot>,
    /// Length `2 * capacity`; bucket `i` holds the head slot index of its
    /// chain, or `-1`.
    buckets: Vec<i32>,
}

impl ObjectPayload {
    fn with_capacity(capacity: usize) -> Self {
        ObjectPayload {
            next_free: 0,
            slots: Vec::with_capacity(capacity),
            buckets: vec![-1; 2 * capacity],
        }
    }

    fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    fn bucket_index(&self, hash: u32) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn find_slot(&self, key: &str, hash: u32) -> Option<usize> {
        let mut idx = self.buckets[self.bucket_index(hash)];
        while idx != -1 {
            let slot = &self.slots[idx as usize];
            if slot.hash == hash && slot.key.as_deref().map(SeqValueString::as_str) == Some(key) {
                return Some(idx as usize);
            }
            idx = slot.next;
        }
        None
    }
}

/// Handle over a shared [`ObjectPayload`].
#[derive(Debug, Clone)]
pub struct SeqObject(Rc<ObjectPayload>);

impl SeqObject {
    pub fn new() -> Self {
        SeqObject(Rc::new(ObjectPayload::with_capacity(INITIAL_CAPACITY)))
    }

    /// Computes the bucket, walks the chain, and returns a copy of the
    /// value, or bare `Invalid` if the key isn't present.
    pub fn get(&self, key: &SeqValueString) -> Value {
        let hash = key.hash();
        match self.0.find_slot(key.as_str(), hash) {
            Some(idx) => self.0.slots[idx].value.clone(),
            None => Value::Invalid(None),
        }
    }

    pub fn has(&self, key: &SeqValueString) -> bool {
        let hash = key.hash();
        self.0.find_slot(key.as_str(), hash).is_some()
    }

    pub fn refcount(&self) -> i64 {
        Rc::strong_count(&self.0) as i64
    }

    pub fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Copy-on-write when shared. Overwrites in place when the key already
    /// exists; otherwise uses the next free slot, or rehashes into double
    /// the capacity when the arena is full.
    pub fn set(mut self, key: SeqValueString, value: Value) -> Value {
        if Rc::strong_count(&self.0) > 1 {
            self = self.deep_copy();
        }
        let hash = key.hash();

        if let Some(idx) = self.0.find_slot(key.as_str(), hash) {
            let payload = Rc::get_mut(&mut self.0).expect("uniqueness ensured above");
            payload.slots[idx].value = value;
            return Value::Object(self);
        }

        if self.0.next_free >= self.0.capacity() {
            match self.rehash() {
                Ok(grown) => return grown.set(key, value),
                Err(msg) => return crate::invalid::with_message(Value::string(msg)),
            }
        }

        let payload = Rc::get_mut(&mut self.0).expect("uniqueness ensured above");
        let slot_idx = payload.next_free;
        let bucket = payload.bucket_index(hash);
        payload.slots.push(Slot {
            next: payload.buckets[bucket],
            hash,
            key: Some(key),
            value,
        });
        payload.buckets[bucket] = slot_idx as i32;
        payload.next_free += 1;
        Value::Object(self)
    }

    /// Allocates a new payload of equal capacity, deep-copies the live
    /// slots, and copies the bucket array verbatim.
    fn deep_copy(&self) -> Self {
        let mut fresh = ObjectPayload::with_capacity(self.0.capacity());
        fresh.slots = self.0.slots.clone();
        fresh.buckets = self.0.buckets.clone();
        fresh.next_free = self.0.next_free;
        SeqObject(Rc::new(fresh))
    }

    /// Allocates a new payload with `C' = 2C`. For each live slot of the old
    /// payload, computes its bucket in the new table and attaches it,
    /// preserving value ownership by moving.
    fn rehash(&self) -> Result<Self, &'static str> {
        let new_capacity = self.0.capacity() * 2;
        if new_capacity > MAX_CAPACITY {
            return Err("Object too big");
        }
        let mut fresh = ObjectPayload::with_capacity(new_capacity);
        for slot in &self.0.slots {
            if slot.key.is_none() {
                continue;
            }
            let slot_idx = fresh.slots.len();
            let bucket = fresh.bucket_index(slot.hash);
            fresh.slots.push(Slot {
                next: fresh.buckets[bucket],
                hash: slot.hash,
                key: slot.key.clone(),
                value: slot.value.clone(),
            });
            fresh.buckets[bucket] = slot_idx as i32;
        }
        fresh.next_free = fresh.slots.len();
        Ok(SeqObject(Rc::new(fresh)))
    }

    /// Copy-on-write if shared. Unlinks the matching slot from its bucket
    /// chain and nulls its key. The slot is *not* returned to a free list.
    pub fn delete(mut self, key: &SeqValueString) -> Self {
        if Rc::strong_count(&self.0) > 1 {
            self = self.deep_copy();
        }
        let hash = key.hash();
        let bucket = self.0.bucket_index(hash);
        let payload = Rc::get_mut(&mut self.0).expect("uniqueness ensured above");

        let mut prev: i32 = -1;
        let mut idx = payload.buckets[bucket];
        while idx != -1 {
            let slot = &payload.slots[idx as usize];
            if slot.hash == hash && slot.key.as_deref().map(SeqValueString::as_str) == Some(key.as_str())
            {
                let next = slot.next;
                if prev == -1 {
                    payload.buckets[bucket] = next;
                } else {
                    payload.slots[prev as usize].next = next;
                }
                let dead = &mut payload.slots[idx as usize];
                dead.key = None;
                dead.value = Value::Null;
                break;
            }
            prev = idx;
            idx = slot.next;
        }
        self
    }

    pub fn len(&self) -> i64 {
        self.0.slots.iter().filter(|s| s.key.is_some()).count() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `set(a, k, v)` for every `(k, v)` in `b`.
    pub fn merge(a: Value, b: &SeqObject) -> Value {
        let mut acc = a;
        for slot in &b.0.slots {
            let Some(key) = &slot.key else { continue };
            acc = match acc {
                Value::Object(o) => o.set(key.clone(), slot.value.clone()),
                other => other,
            };
        }
        acc
    }

    /// Same as `merge`, but recurses when both sides hold an `Object` at a
    /// shared key; otherwise overwrites.
    pub fn merge_recursive(a: Value, b: &SeqObject) -> Value {
        let mut acc = match a {
            Value::Object(o) => o,
            other => return other,
        };
        for slot in &b.0.slots {
            let Some(key) = &slot.key else { continue };
            let merged = match (acc.get(key), &slot.value) {
                (Value::Object(existing), Value::Object(incoming)) => {
                    SeqObject::merge_recursive(Value::Object(existing), incoming)
                }
                _ => slot.value.clone(),
            };
            acc = match acc.set(key.clone(), merged) {
                Value::Object(o) => o,
                invalid => return invalid,
            };
        }
        Value::Object(acc)
    }

    /// True iff for every `(k, v)` in `b`, `contains(get(a, k), v)` holds.
    pub fn contains(a: &SeqObject, b: &SeqObject) -> bool {
        b.0.slots.iter().all(|slot| match &slot.key {
            None => true,
            Some(key) => crate::value::contains(&a.get(key), &slot.value),
        })
    }

    pub fn equal(a: &SeqObject, b: &SeqObject) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.0.slots.iter().all(|slot| match &slot.key {
            None => true,
            Some(key) => crate::value::equal(&b.get(key), &slot.value),
        })
    }

    /// An opaque integer cursor starting at the first non-null slot,
    /// advanced by scanning forward, with terminal sentinel
    /// `ITER_FINISHED = -2`.
    pub fn iter_next(&self, cursor: i64) -> i64 {
        let start = if cursor < 0 { 0 } else { cursor as usize + 1 };
        for (idx, slot) in self.0.slots.iter().enumerate().skip(start) {
            if slot.key.is_some() {
                return idx as i64;
            }
        }
        ITER_FINISHED
    }

    pub fn iter_first(&self) -> i64 {
        self.iter_next(-1)
    }

    pub fn iter_key(&self, cursor: i64) -> Option<SeqValueString> {
        self.0
            .slots
            .get(cursor as usize)
            .and_then(|s| s.key.clone())
    }

    pub fn iter_value(&self, cursor: i64) -> Value {
        self.0
            .slots
            .get(cursor as usize)
            .map(|s| s.value.clone())
            .unwrap_or(Value::Invalid(None))
    }
}

impl Default for SeqObject {
    fn default() -> Self {
        SeqObject::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SeqValueString {
        SeqValueString::from_bytes(s.as_bytes())
    }

    #[test]
    fn set_then_get_round_trips() {
        let o = SeqObject::new();
        let Value::Object(o) = o.set(key("a"), Value::number(1.0)) else {
            panic!()
        };
        assert_eq!(o.get(&key("a")), Value::number(1.0));
    }

    #[test]
    fn delete_removes_key() {
        let o = SeqObject::new();
        let Value::Object(o) = o.set(key("a"), Value::number(1.0)) else {
            panic!()
        };
        let o = o.delete(&key("a"));
        assert!(!o.has(&key("a")));
    }

    #[test]
    fn rehash_preserves_all_nine_keys() {
        let mut v = Value::Object(SeqObject::new());
        for i in 0..9 {
            let Value::Object(o) = v else { panic!() };
            v = o.set(key(&format!("k{i}")), Value::number(i as f64));
        }
        let Value::Object(o) = v else { panic!() };
        assert_eq!(o.len(), 9);
        for i in 0..9 {
            assert_eq!(o.get(&key(&format!("k{i}"))), Value::number(i as f64));
        }
    }

    #[test]
    fn cow_isolates_mutation_through_alias() {
        let o1 = SeqObject::new();
        let Value::Object(o1) = o1.set(key("a"), Value::number(1.0)) else {
            panic!()
        };
        let o2 = o1.clone();
        let Value::Object(o2) = o2.set(key("a"), Value::number(2.0)) else {
            panic!()
        };
        assert_eq!(o1.get(&key("a")), Value::number(1.0));
        assert_eq!(o2.get(&key("a")), Value::number(2.0));
    }

    #[test]
    fn iteration_skips_deleted_slots() {
        let o = SeqObject::new();
        let Value::Object(o) = o.set(key("a"), Value::number(1.0)) else {
            panic!()
        };
        let Value::Object(o) = o.set(key("b"), Value::number(2.0)) else {
            panic!()
        };
        let o = o.delete(&key("a"));
        let first = o.iter_first();
        assert_eq!(o.iter_key(first), Some(key("b")));
        assert_eq!(o.iter_next(first), ITER_FINISHED);
    }
}
