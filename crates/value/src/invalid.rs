//! Invalid-with-message payload.
//!
//! A bare `Invalid` carries no payload at all: it is just the `Kind::Invalid`
//! tag with no heap allocation, same as `Null`/`True`/`False`. Only the
//! message-carrying form needs a payload, and that payload is nothing more
//! than a single owned `Value` (almost always a `String`, but nothing here
//! constrains the message's kind).
//!
//! Rust's enum already gives us the presence bit a tagged invalid needs:
//! `Value::Invalid(None)` is bare, `Value::Invalid(Some(rc))` carries a
//! message. There is no separate `InvalidPayload` struct; an `Rc<Value>` is
//! the payload.

use std::rc::Rc;

use crate::value::Value;

/// Build an `Invalid` value carrying `message` (consumed).
pub fn with_message(message: Value) -> Value {
    Value::Invalid(Some(Rc::new(message)))
}

/// `true` iff `v` is `Invalid` and carries a message payload.
///
/// Peeks; does not consume (matches the other `*_has_*` queries).
pub fn has_message(v: &Value) -> bool {
    matches!(v, Value::Invalid(Some(_)))
}

/// Consume `v` and return its message, or `None` for a bare `Invalid` (or a
/// non-`Invalid` value, which is a programmer error, but we just return
/// `None` rather than panicking: callers only call this after confirming
/// `Kind::Invalid` via `has_message`/`get_kind`).
pub fn get_message(v: Value) -> Option<Value> {
    match v {
        Value::Invalid(Some(rc)) => Some(Rc::unwrap_or_clone(rc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invalid_has_no_message() {
        assert!(!has_message(&Value::Invalid(None)));
        assert_eq!(get_message(Value::Invalid(None)), None);
    }

    #[test]
    fn message_round_trips() {
        let v = with_message(Value::string("bad index"));
        assert!(has_message(&v));
        assert_eq!(get_message(v), Some(Value::string("bad index")));
    }
}
