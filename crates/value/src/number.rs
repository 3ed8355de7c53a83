//! Number: native `f64`, or (when the `decimal` feature is enabled) an
//! arbitrary-precision decimal literal form.
//!
//! Two representations share one `Kind::Number` tag: a subtype flag gives
//! further discrimination for kinds with multiple representations (native
//! vs. decimal number).

pub mod context;

use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::value::Value;

#[cfg(feature = "decimal")]
use bigdecimal::{BigDecimal, ToPrimitive};
#[cfg(feature = "decimal")]
use std::str::FromStr;

/// The active numeric representation behind `Value::Number`.
#[derive(Debug, Clone)]
pub enum Number {
    /// Inline IEEE 754 binary double.
    Native(f64),
    /// Refcounted arbitrary-precision decimal literal payload. Only
    /// constructible when the `decimal` feature is on.
    #[cfg(feature = "decimal")]
    Decimal(Rc<DecimalPayload>),
}

/// Either a finite arbitrary-precision value or one of the two decimal
/// infinities. jq's decNumber backing can hold `Infinity`/`-Infinity` as a
/// decimal value distinct from a native double infinity; `bigdecimal`'s
/// `BigDecimal` has no such state, so it is modeled explicitly here. NaN is
/// deliberately absent: `from_literal` routes every NaN literal to either a
/// bare `Invalid` or a native NaN `Number` before a decimal payload would be
/// built, so no `Decimal` ever carries NaN.
#[cfg(feature = "decimal")]
#[derive(Debug, Clone, PartialEq)]
enum DecimalRepr {
    Finite(BigDecimal),
    Infinity { negative: bool },
}

/// Decimal-literal payload, caching its derived `double` and text forms.
/// Refcounted via `Rc` so `Number::Decimal` clones are O(1), same as every
/// other heap payload in this crate.
#[cfg(feature = "decimal")]
#[derive(Debug)]
pub struct DecimalPayload {
    repr: DecimalRepr,
    /// Lazily computed, cached after first `value_as_double` call.
    double: Cell<Option<f64>>,
    /// Lazily computed, cached after first `literal_text` call.
    text: std::cell::RefCell<Option<Rc<str>>>,
}

#[cfg(feature = "decimal")]
impl PartialEq for DecimalPayload {
    fn eq(&self, other: &Self) -> bool {
        self.repr == other.repr
    }
}

#[cfg(feature = "decimal")]
impl DecimalPayload {
    fn new(repr: DecimalRepr) -> Self {
        DecimalPayload {
            repr,
            double: Cell::new(None),
            text: std::cell::RefCell::new(None),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Native(a), Number::Native(b)) => a == b,
            #[cfg(feature = "decimal")]
            (Number::Decimal(a), Number::Decimal(b)) => a == b,
            #[cfg(feature = "decimal")]
            _ => value_as_double(self) == value_as_double(other),
        }
    }
}

impl Number {
    pub fn from_double(x: f64) -> Number {
        Number::Native(x)
    }
}

/// Parse `text` under the thread-local decimal context and build the
/// appropriate `Value`.
///
/// 1. Syntax error → bare `Invalid`.
/// 2. NaN with a diagnostic payload (e.g. `"nan123"`) → bare `Invalid`.
/// 3. Plain NaN → native NaN `Number`.
/// 4. Otherwise → a decimal-literal `Number` (or, with the `decimal` feature
///    off, a native `Number` parsed directly as `f64`).
pub fn from_literal(text: &str) -> Value {
    if let Some((negative, payload_digits)) = parse_nan(text) {
        return if payload_digits {
            Value::Invalid(None)
        } else {
            Value::Number(Number::Native(if negative { -f64::NAN } else { f64::NAN }))
        };
    }

    #[cfg(feature = "decimal")]
    {
        if let Some(negative) = parse_infinity(text) {
            let payload = DecimalPayload::new(DecimalRepr::Infinity { negative });
            return Value::Number(Number::Decimal(Rc::new(payload)));
        }
        match BigDecimal::from_str(text) {
            Ok(bd) => {
                let clamped = context::with_context(|ctx| clamp_precision(&bd, ctx.digits));
                let payload = DecimalPayload::new(DecimalRepr::Finite(clamped));
                Value::Number(Number::Decimal(Rc::new(payload)))
            }
            Err(_) => Value::Invalid(None),
        }
    }

    #[cfg(not(feature = "decimal"))]
    {
        match text.trim().parse::<f64>() {
            Ok(x) => Value::Number(Number::Native(x)),
            Err(_) => Value::Invalid(None),
        }
    }
}

/// Recognize a NaN literal (`nan`, `-nan`, `snan`, optionally followed by a
/// diagnostic payload of digits, e.g. `"nan123"`), case-insensitively, with
/// an optional leading sign. Returns `(negative, has_payload_digits)`.
fn parse_nan(text: &str) -> Option<(bool, bool)> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lower = rest.to_ascii_lowercase();
    let body = lower.strip_prefix("nan").or_else(|| lower.strip_prefix("snan"))?;
    Some((negative, !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())))
}

/// Recognize an infinity literal (`inf`, `infinity`), case-insensitively,
/// with an optional leading sign. Returns `Some(negative)` on a match.
#[cfg(feature = "decimal")]
fn parse_infinity(text: &str) -> Option<bool> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lower = rest.to_ascii_lowercase();
    if lower == "inf" || lower == "infinity" {
        Some(negative)
    } else {
        None
    }
}

/// Round `bd` to at most `digits` significant digits, clamped to avoid
/// exponent-difference overflow.
#[cfg(feature = "decimal")]
fn clamp_precision(bd: &BigDecimal, digits: u32) -> BigDecimal {
    if bd.digits() <= u64::from(digits) {
        bd.clone()
    } else {
        bd.with_prec(u64::from(digits))
    }
}

/// Native passes the stored double straight through. Decimal reduces the
/// decimal to the shortest form that round-trips through 64-bit float
/// precision (17 decimal digits), formats it to text, parses that back, and
/// caches the result.
pub fn value_as_double(n: &Number) -> f64 {
    match n {
        Number::Native(x) => *x,
        #[cfg(feature = "decimal")]
        Number::Decimal(payload) => {
            if let Some(cached) = payload.double.get() {
                return cached;
            }
            let computed = match &payload.repr {
                DecimalRepr::Infinity { negative } => {
                    if *negative {
                        f64::NEG_INFINITY
                    } else {
                        f64::INFINITY
                    }
                }
                DecimalRepr::Finite(bd) => {
                    // Round to 17 significant digits (enough to round-trip any
                    // f64), then go through text -> f64 rather than calling
                    // `ToPrimitive` directly.
                    let rounded = if bd.digits() <= 17 {
                        bd.clone()
                    } else {
                        bd.with_prec(17)
                    };
                    rounded
                        .to_string()
                        .parse::<f64>()
                        .unwrap_or_else(|_| rounded.to_f64().unwrap_or(f64::NAN))
                }
            };
            payload.double.set(Some(computed));
            computed
        }
    }
}

/// True iff the kind is Number and the fractional part of `value_as_double`
/// is less than `DBL_EPSILON` in absolute value.
pub fn is_integer(n: &Number) -> bool {
    let d = value_as_double(n);
    d.is_finite() && (d.fract().abs() < f64::EPSILON)
}

pub fn is_nan(n: &Number) -> bool {
    value_as_double(n).is_nan()
}

/// Decimal operations use the thread-local context and allocate a fresh
/// decimal payload.
pub fn negate(n: &Number) -> Number {
    match n {
        Number::Native(x) => Number::Native(-x),
        #[cfg(feature = "decimal")]
        Number::Decimal(payload) => {
            let repr = match &payload.repr {
                DecimalRepr::Finite(bd) => DecimalRepr::Finite(-bd.clone()),
                DecimalRepr::Infinity { negative } => DecimalRepr::Infinity {
                    negative: !negative,
                },
            };
            Number::Decimal(Rc::new(DecimalPayload::new(repr)))
        }
    }
}

pub fn abs(n: &Number) -> Number {
    match n {
        Number::Native(x) => Number::Native(x.abs()),
        #[cfg(feature = "decimal")]
        Number::Decimal(payload) => {
            let repr = match &payload.repr {
                DecimalRepr::Finite(bd) => DecimalRepr::Finite(bd.abs()),
                DecimalRepr::Infinity { .. } => DecimalRepr::Infinity { negative: false },
            };
            Number::Decimal(Rc::new(DecimalPayload::new(repr)))
        }
    }
}

/// If both operands are decimals, compares them as decimals (-1/0/+1).
/// Otherwise compares as doubles (strict `<`/`==`/`>`, producing the
/// `greater` arm on unordered operands; see the comment below).
pub fn compare(a: &Number, b: &Number) -> Ordering {
    #[cfg(feature = "decimal")]
    if let (Number::Decimal(da), Number::Decimal(db)) = (a, b) {
        return match (&da.repr, &db.repr) {
            (DecimalRepr::Finite(x), DecimalRepr::Finite(y)) => x.cmp(y),
            (DecimalRepr::Infinity { negative: true }, DecimalRepr::Infinity { negative: true }) => {
                Ordering::Equal
            }
            (
                DecimalRepr::Infinity { negative: false },
                DecimalRepr::Infinity { negative: false },
            ) => Ordering::Equal,
            (DecimalRepr::Infinity { negative: true }, _) => Ordering::Less,
            (DecimalRepr::Infinity { negative: false }, _) => Ordering::Greater,
            (_, DecimalRepr::Infinity { negative: true }) => Ordering::Greater,
            (_, DecimalRepr::Infinity { negative: false }) => Ordering::Less,
        };
    }

    let (x, y) = (value_as_double(a), value_as_double(b));
    // Double comparison falls to the "greater" arm whenever either operand
    // is NaN (unordered), rather than panicking or picking an arbitrary
    // total order. Preserved verbatim from the original design.
    if x < y {
        Ordering::Less
    } else if x == y {
        Ordering::Equal
    } else {
        Ordering::Greater
    }
}

pub fn has_literal(n: &Number) -> bool {
    match n {
        Number::Native(_) => false,
        #[cfg(feature = "decimal")]
        Number::Decimal(_) => true,
    }
}

/// Returns `None` for native; for decimal returns the cached printable
/// form. Decimals that are NaN would report text `"null"`, and infinities
/// report `None` (caller must normalize).
///
/// No `Decimal` ever holds NaN in this crate (see [`DecimalRepr`]), so the
/// "NaN reports `\"null\"`" clause has no reachable case here; it is kept in
/// the doc comment only as a record of the behavior this mirrors.
pub fn literal_text(n: &Number) -> Option<Rc<str>> {
    match n {
        Number::Native(_) => None,
        #[cfg(feature = "decimal")]
        Number::Decimal(payload) => {
            if let DecimalRepr::Infinity { .. } = payload.repr {
                return None;
            }
            if let Some(cached) = payload.text.borrow().clone() {
                return Some(cached);
            }
            let DecimalRepr::Finite(bd) = &payload.repr else {
                unreachable!("infinity handled above")
            };
            let text: Rc<str> = to_scientific_string(bd).into();
            *payload.text.borrow_mut() = Some(text.clone());
            Some(text)
        }
    }
}

/// Render `bd` in scientific notation per the General Decimal Arithmetic
/// Specification's to-scientific-string conversion (the form decNumber, jq's
/// decimal backend, uses for `tostring`/literal display): one leading
/// digit, a decimal point before any remaining significant digits, and an
/// explicitly signed power-of-ten exponent (e.g. `"1E+20"`).
///
/// This crate always renders in scientific form rather than reproducing
/// decNumber's plain-notation fallback for exponents near zero; the only
/// worked example available (`"100000000000000000000"` to `"1E+20"`) is
/// scientific, and no plain-notation case is specified. A deliberate
/// simplification.
#[cfg(feature = "decimal")]
fn to_scientific_string(bd: &BigDecimal) -> String {
    let (bigint, scale) = bd.as_bigint_and_exponent();
    let raw = bigint.to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", raw),
    };

    if digits == "0" {
        return format!("{sign}0E+0");
    }

    let ndigits = digits.len() as i64;
    let exponent = ndigits - 1 - scale;

    let mantissa = if ndigits == 1 {
        digits
    } else {
        let mut m = format!("{}.{}", &digits[..1], &digits[1..]);
        while m.ends_with('0') {
            m.pop();
        }
        if m.ends_with('.') {
            m.pop();
        }
        m
    };

    let exp_sign = if exponent < 0 { "-" } else { "+" };
    format!("{sign}{mantissa}E{exp_sign}{}", exponent.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_round_trips_double() {
        let n = Number::from_double(2.5);
        assert_eq!(value_as_double(&n), 2.5);
        assert!(!has_literal(&n));
        assert_eq!(literal_text(&n), None);
    }

    #[test]
    fn is_integer_uses_value_as_double() {
        assert!(is_integer(&Number::from_double(4.0)));
        assert!(!is_integer(&Number::from_double(4.5)));
    }

    #[test]
    fn native_compare_unordered_is_greater() {
        let nan = Number::from_double(f64::NAN);
        let one = Number::from_double(1.0);
        assert_eq!(compare(&nan, &one), Ordering::Greater);
        assert_eq!(compare(&one, &nan), Ordering::Greater);
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn from_literal_syntax_error_is_bare_invalid() {
        let v = from_literal("not a number");
        assert_eq!(v, Value::Invalid(None));
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn from_literal_nan_without_payload_is_native_nan() {
        let v = from_literal("nan");
        match v {
            Value::Number(n) => assert!(is_nan(&n) && !has_literal(&n)),
            _ => panic!("expected a Number"),
        }
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn from_literal_nan_with_payload_is_bare_invalid() {
        assert_eq!(from_literal("nan123"), Value::Invalid(None));
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn from_literal_large_integer_prints_scientific() {
        let v = from_literal("100000000000000000000");
        match v {
            Value::Number(n) => {
                assert_eq!(literal_text(&n).as_deref(), Some("1E+20"));
                assert_eq!(value_as_double(&n), 1e20);
            }
            _ => panic!("expected a Number"),
        }
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn from_literal_infinity_text_is_none() {
        let v = from_literal("infinity");
        match v {
            Value::Number(n) => {
                assert_eq!(value_as_double(&n), f64::INFINITY);
                assert_eq!(literal_text(&n), None);
            }
            _ => panic!("expected a Number"),
        }
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn decimal_negate_and_abs() {
        let v = from_literal("3.5");
        let Value::Number(n) = v else { panic!() };
        let negated = negate(&n);
        assert_eq!(value_as_double(&negated), -3.5);
        let absolute = abs(&negated);
        assert_eq!(value_as_double(&absolute), 3.5);
    }
}
