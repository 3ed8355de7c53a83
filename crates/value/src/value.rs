//! Value handle and the top-level operations that work across every kind.
//!
//! The conceptual handle is a fixed-size, bit-copyable C struct: a kind tag
//! plus either an inline primitive or a pointer to a refcounted payload.
//! Rust's tagged-union `enum` *is* that struct: the discriminant is the
//! kind tag, and each variant either holds its primitive inline (`Null`,
//! `False`, `True`) or wraps an `Rc<...>`-backed payload type (`String`,
//! `Array`, `Object`, and `Number`'s decimal form). `#[derive(Clone)]` is
//! `copy()`; `Drop` (free, automatically) is `free()`; both are also
//! exposed below as one-line wrappers under those names.

use std::rc::Rc;

use crate::array::SeqArray;
use crate::invalid;
use crate::kind::Kind;
use crate::number::{self, Number};
use crate::object::SeqObject;
use crate::string::SeqValueString;

/// The JSON-compatible dynamic value handle.
#[derive(Debug, Clone)]
pub enum Value {
    /// Bare when `None`, message-carrying when `Some`.
    Invalid(Option<Rc<Value>>),
    Null,
    False,
    True,
    Number(Number),
    String(SeqValueString),
    Array(SeqArray),
    Object(SeqObject),
}

// ---------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------

impl Value {
    pub fn null() -> Value {
        Value::Null
    }

    /// `true` is a reserved literal keyword in Rust and cannot be used as a
    /// function name (not even via raw-identifier escaping), so the boolean
    /// constructors are named `bool_true`/`bool_false`/`bool` instead.
    pub fn bool_true() -> Value {
        Value::True
    }

    pub fn bool_false() -> Value {
        Value::False
    }

    pub fn bool(x: bool) -> Value {
        if x { Value::True } else { Value::False }
    }

    pub fn invalid() -> Value {
        Value::Invalid(None)
    }

    pub fn invalid_with_message(msg: Value) -> Value {
        invalid::with_message(msg)
    }

    pub fn number(x: f64) -> Value {
        Value::Number(Number::from_double(x))
    }

    pub fn number_with_literal(text: &str) -> Value {
        number::from_literal(text)
    }

    pub fn string(s: &str) -> Value {
        Value::String(SeqValueString::from_bytes(s.as_bytes()))
    }

    pub fn string_sized(buf: &[u8]) -> Value {
        Value::String(SeqValueString::from_bytes(buf))
    }

    pub fn string_empty(cap: usize) -> Value {
        Value::String(SeqValueString::empty(cap))
    }

    pub fn array() -> Value {
        Value::Array(SeqArray::new())
    }

    pub fn array_sized(n: usize) -> Value {
        Value::Array(SeqArray::with_capacity(n))
    }

    pub fn object() -> Value {
        Value::Object(SeqObject::new())
    }
}

// ---------------------------------------------------------------------
// Kind-agnostic queries
// ---------------------------------------------------------------------

impl Value {
    pub fn get_kind(&self) -> Kind {
        match self {
            Value::Invalid(_) => Kind::Invalid,
            Value::Null => Kind::Null,
            Value::False => Kind::False,
            Value::True => Kind::True,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.get_kind().name()
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid(_))
    }

    /// Returns 1 for non-heap handles.
    pub fn get_refcount(&self) -> i64 {
        match self {
            Value::Invalid(Some(rc)) => Rc::strong_count(rc) as i64,
            Value::String(s) => s.refcount(),
            Value::Array(a) => a.refcount(),
            Value::Object(o) => o.refcount(),
            #[cfg(feature = "decimal")]
            Value::Number(Number::Decimal(rc)) => Rc::strong_count(rc) as i64,
            _ => 1,
        }
    }
}

/// Bumps the payload refcount (a plain `Rc`/enum clone); a thin wrapper
/// over `Clone`.
pub fn copy(v: &Value) -> Value {
    v.clone()
}

/// Drops one reference, recursively tearing down nested values when the
/// last reference goes; a thin wrapper over `Drop`.
pub fn free(v: Value) {
    drop(v);
}

// ---------------------------------------------------------------------
// Invalid
// ---------------------------------------------------------------------

impl Value {
    pub fn invalid_has_message(&self) -> bool {
        invalid::has_message(self)
    }

    pub fn invalid_get_message(self) -> Option<Value> {
        invalid::get_message(self)
    }
}

// ---------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------

impl Value {
    fn as_number(&self, op: &str) -> &Number {
        match self {
            Value::Number(n) => n,
            other => panic!("{op}: expected Number, got {}", other.kind_name()),
        }
    }

    pub fn number_has_literal(&self) -> bool {
        number::has_literal(self.as_number("number_has_literal"))
    }

    pub fn number_get_literal(&self) -> Option<Rc<str>> {
        number::literal_text(self.as_number("number_get_literal"))
    }

    pub fn number_is_nan(&self) -> bool {
        number::is_nan(self.as_number("number_is_nan"))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Number(_)) && number::is_integer(self.as_number("is_integer"))
    }

    pub fn value_as_double(&self) -> f64 {
        number::value_as_double(self.as_number("value_as_double"))
    }

    pub fn number_negate(&self) -> Value {
        Value::Number(number::negate(self.as_number("number_negate")))
    }

    pub fn number_abs(&self) -> Value {
        Value::Number(number::abs(self.as_number("number_abs")))
    }

    pub fn number_cmp(&self, other: &Value) -> std::cmp::Ordering {
        number::compare(self.as_number("number_cmp"), other.as_number("number_cmp"))
    }
}

// ---------------------------------------------------------------------
// String
// ---------------------------------------------------------------------

impl Value {
    fn into_string(self, op: &str) -> SeqValueString {
        match self {
            Value::String(s) => s,
            other => panic!("{op}: expected String, got {}", other.kind_name()),
        }
    }

    fn as_string(&self, op: &str) -> &SeqValueString {
        match self {
            Value::String(s) => s,
            other => panic!("{op}: expected String, got {}", other.kind_name()),
        }
    }

    pub fn string_value(&self) -> &str {
        self.as_string("string_value").as_str()
    }

    pub fn string_length_bytes(&self) -> i64 {
        self.as_string("string_length_bytes").length_bytes()
    }

    pub fn string_length_codepoints(&self) -> i64 {
        self.as_string("string_length_codepoints").length_codepoints()
    }

    pub fn string_hash(&self) -> u32 {
        self.as_string("string_hash").hash()
    }

    pub fn string_append(self, buf: &[u8]) -> Value {
        Value::String(self.into_string("string_append").append(buf))
    }

    pub fn string_append_codepoint(self, cp: u32) -> Value {
        Value::String(self.into_string("string_append_codepoint").append_codepoint(cp))
    }

    pub fn string_append_str(self, other: &Value) -> Value {
        let other = other.as_string("string_append_str");
        Value::String(self.into_string("string_append_str").append_str(other))
    }

    pub fn string_append_buf(self, buf: &[u8]) -> Value {
        Value::String(self.into_string("string_append_buf").append_buf(buf))
    }

    pub fn string_concat(self, other: &Value) -> Value {
        let other = other.as_string("string_concat");
        Value::String(self.into_string("string_concat").concat(other))
    }

    pub fn string_slice(&self, start: i64, end: i64) -> Value {
        Value::String(self.as_string("string_slice").slice(start, end))
    }

    pub fn string_indexes(&self, needle: &Value) -> Value {
        let cps = self
            .as_string("string_indexes")
            .indexes(needle.as_string("string_indexes"));
        let mut arr = Value::array();
        for cp in cps {
            arr = arr.array_append(Value::number(cp as f64));
        }
        arr
    }

    pub fn string_split(&self, sep: &Value) -> Vec<Value> {
        self.as_string("string_split")
            .split(sep.as_string("string_split"))
            .into_iter()
            .map(Value::String)
            .collect()
    }

    /// `string_repeat(string("a"), -1)` gives `null`;
    /// `string_repeat(string("ab"), INT_MAX)` gives
    /// `invalid_with_message("Repeat string result too long")`.
    pub fn string_repeat(&self, n: i64) -> Value {
        match self.as_string("string_repeat").repeat_checked(n) {
            Ok(s) => Value::String(s),
            Err(crate::string::RepeatError::Negative) => Value::Null,
            Err(crate::string::RepeatError::TooLong) => {
                invalid::with_message(Value::string("Repeat string result too long"))
            }
        }
    }

    pub fn string_explode(&self) -> Value {
        let cps = self.as_string("string_explode").explode();
        let mut arr = Value::array_sized(cps.len());
        for cp in cps {
            arr = arr.array_append(Value::number(cp as f64));
        }
        arr
    }

    pub fn string_implode(arr: &Value) -> Value {
        let Value::Array(a) = arr else {
            panic!("string_implode: expected Array, got {}", arr.kind_name())
        };
        let cps: Vec<i64> = (0..a.len()).map(|i| a.get(i).value_as_double() as i64).collect();
        Value::String(SeqValueString::implode(&cps))
    }
}

// ---------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------

impl Value {
    fn as_array(&self, op: &str) -> &SeqArray {
        match self {
            Value::Array(a) => a,
            other => panic!("{op}: expected Array, got {}", other.kind_name()),
        }
    }

    pub fn array_length(&self) -> i64 {
        self.as_array("array_length").len()
    }

    pub fn array_get(&self, i: i64) -> Value {
        self.as_array("array_get").get(i)
    }

    pub fn array_set(self, i: i64, v: Value) -> Value {
        match self {
            Value::Array(a) => a.set(i, v),
            other => panic!("array_set: expected Array, got {}", other.kind_name()),
        }
    }

    pub fn array_append(self, v: Value) -> Value {
        match self {
            Value::Array(a) => a.append(v),
            other => panic!("array_append: expected Array, got {}", other.kind_name()),
        }
    }

    pub fn array_concat(self, other: &Value) -> Value {
        let other = other.as_array("array_concat");
        SeqArray::concat(self, other)
    }

    pub fn array_slice(&self, start: i64, end: i64) -> Value {
        Value::Array(self.as_array("array_slice").slice(start, end))
    }

    pub fn array_indexes(&self, other: &Value) -> Value {
        let idxs = SeqArray::indexes(self.as_array("array_indexes"), other.as_array("array_indexes"));
        let mut arr = Value::array();
        for i in idxs {
            arr = arr.array_append(Value::number(i as f64));
        }
        arr
    }
}

// ---------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------

impl Value {
    fn as_object(&self, op: &str) -> &SeqObject {
        match self {
            Value::Object(o) => o,
            other => panic!("{op}: expected Object, got {}", other.kind_name()),
        }
    }

    pub fn object_length(&self) -> i64 {
        self.as_object("object_length").len()
    }

    pub fn object_has(&self, key: &Value) -> bool {
        self.as_object("object_has")
            .has(key.as_string("object_has"))
    }

    pub fn object_get(&self, key: &Value) -> Value {
        self.as_object("object_get").get(key.as_string("object_get"))
    }

    pub fn object_set(self, key: Value, v: Value) -> Value {
        let key = key.into_string("object_set");
        match self {
            Value::Object(o) => o.set(key, v),
            other => panic!("object_set: expected Object, got {}", other.kind_name()),
        }
    }

    pub fn object_delete(self, key: &Value) -> Value {
        let key = key.as_string("object_delete");
        match self {
            Value::Object(o) => Value::Object(o.delete(key)),
            other => panic!("object_delete: expected Object, got {}", other.kind_name()),
        }
    }

    pub fn object_merge(self, other: &Value) -> Value {
        let other = other.as_object("object_merge");
        SeqObject::merge(self, other)
    }

    pub fn object_merge_recursive(self, other: &Value) -> Value {
        let other = other.as_object("object_merge_recursive");
        SeqObject::merge_recursive(self, other)
    }

    pub fn object_iter_first(&self) -> i64 {
        self.as_object("object_iter_first").iter_first()
    }

    pub fn object_iter_next(&self, cursor: i64) -> i64 {
        self.as_object("object_iter_next").iter_next(cursor)
    }

    pub fn object_iter_key(&self, cursor: i64) -> Option<Value> {
        self.as_object("object_iter_key")
            .iter_key(cursor)
            .map(Value::String)
    }

    pub fn object_iter_value(&self, cursor: i64) -> Value {
        self.as_object("object_iter_value").iter_value(cursor)
    }
}

// ---------------------------------------------------------------------
// Top-level operations
// ---------------------------------------------------------------------

/// False if kinds differ; a fast accept if both carry the same heap
/// pointer and the same (offset, size, kind flags); otherwise dispatches
/// to per-kind equality.
///
/// This takes `&Value` rather than consuming both operands: consuming an
/// equality check would be actively un-idiomatic in Rust (nothing else in
/// the ecosystem does this, compare `PartialEq::eq(&self, other: &Self)`),
/// and this crate's `Value` already derives `Clone`, so callers that really
/// do want to consume can do so explicitly. `Value`'s `PartialEq`/`Eq`
/// impls are this function.
pub fn equal(a: &Value, b: &Value) -> bool {
    if a.get_kind() != b.get_kind() {
        return false;
    }
    match (a, b) {
        (Value::Invalid(_), Value::Invalid(_))
        | (Value::Null, Value::Null)
        | (Value::True, Value::True)
        | (Value::False, Value::False) => true,
        (Value::Number(x), Value::Number(y)) => number::compare(x, y) == std::cmp::Ordering::Equal,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => SeqArray::equal(x, y),
        (Value::Object(x), Value::Object(y)) => SeqObject::equal(x, y),
        _ => unreachable!("kinds already compared equal above"),
    }
}

/// All descriptor bits match; for heap values this requires pointer
/// identity (same slice over the same payload).
pub fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Invalid(None), Value::Invalid(None))
        | (Value::Null, Value::Null)
        | (Value::True, Value::True)
        | (Value::False, Value::False) => true,
        (Value::Invalid(Some(x)), Value::Invalid(Some(y))) => Rc::ptr_eq(x, y),
        (Value::Number(Number::Native(x)), Value::Number(Number::Native(y))) => {
            x.to_bits() == y.to_bits()
        }
        #[cfg(feature = "decimal")]
        (Value::Number(Number::Decimal(x)), Value::Number(Number::Decimal(y))) => Rc::ptr_eq(x, y),
        (Value::String(x), Value::String(y)) => x.identical(y),
        (Value::Array(x), Value::Array(y)) => x.identical(y),
        (Value::Object(x), Value::Object(y)) => x.identical(y),
        _ => false,
    }
}

/// Structural per the array/object containment rules; for strings, `b` is
/// a substring of `a` (or `b` is empty); for other kinds, falls back to
/// `equal`.
pub fn contains(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            y.as_bytes().is_empty() || x.as_str().contains(y.as_str())
        }
        (Value::Array(x), Value::Array(y)) => SeqArray::contains(x, y),
        (Value::Object(x), Value::Object(y)) => SeqObject::contains(x, y),
        _ => equal(a, b),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other)
    }
}
impl Eq for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_reflexive_and_symmetric_across_kinds() {
        let values = vec![
            Value::null(),
            Value::bool_true(),
            Value::bool_false(),
            Value::number(1.0),
            Value::string("hi"),
            Value::array(),
            Value::object(),
        ];
        for v in &values {
            assert!(equal(v, v));
        }
        assert!(!equal(&Value::null(), &Value::bool_true()));
        assert!(equal(&Value::string("a"), &Value::string("a")));
    }

    #[test]
    fn contains_string_substring() {
        assert!(contains(&Value::string("hello"), &Value::string("ell")));
        assert!(!contains(&Value::string("hello"), &Value::string("xyz")));
    }

    #[test]
    fn contains_nested_object() {
        let inner = Value::object().object_set(Value::string("c"), Value::number(2.0));
        let a = Value::object()
            .object_set(Value::string("a"), Value::number(1.0))
            .object_set(Value::string("b"), inner.clone());
        let b = Value::object().object_set(Value::string("b"), inner);
        assert!(contains(&a, &b));
    }

    #[test]
    fn array_append_and_index() {
        let a = Value::array().array_append(Value::number(1.0)).array_append(Value::number(2.0));
        assert_eq!(a.array_length(), 2);
        assert_eq!(a.array_get(0), Value::number(1.0));
        assert_eq!(a.array_get(1), Value::number(2.0));
    }

    #[test]
    fn array_set_pads_with_null() {
        let a = Value::array_sized(0).array_set(3, Value::string("x"));
        assert_eq!(a.array_length(), 4);
        assert_eq!(a.array_get(0), Value::null());
        assert_eq!(a.array_get(3), Value::string("x"));
    }

    #[test]
    fn array_set_negative_overflow_message() {
        let a = Value::array().array_set(-1, Value::number(0.0));
        assert!(a.invalid_has_message());
    }

    #[test]
    fn string_repeat_scenarios() {
        assert_eq!(Value::string("ab").string_repeat(3), Value::string("ababab"));
        assert_eq!(Value::string("a").string_repeat(-1), Value::null());
        let too_long = Value::string("ab").string_repeat(i64::from(i32::MAX));
        assert!(too_long.invalid_has_message());
    }

    #[test]
    fn object_insert_nine_keys_survives_rehash() {
        let mut o = Value::object();
        for i in 0..9 {
            o = o.object_set(Value::string(&format!("k{i}")), Value::number(i as f64));
        }
        assert_eq!(o.object_length(), 9);
        for i in 0..9 {
            assert_eq!(o.object_get(&Value::string(&format!("k{i}"))), Value::number(i as f64));
        }
    }

    #[test]
    fn string_split_trailing_separator() {
        let parts = Value::string("a,b,").string_split(&Value::string(","));
        assert_eq!(parts, vec![Value::string("a"), Value::string("b"), Value::string("")]);
    }

    #[test]
    fn copy_on_write_isolation_through_array_alias() {
        let a1 = Value::array().array_append(Value::number(1.0));
        let a2 = copy(&a1);
        let a2 = a2.array_set(0, Value::number(99.0));
        assert_eq!(a1.array_get(0), Value::number(1.0));
        assert_eq!(a2.array_get(0), Value::number(99.0));
    }
}
