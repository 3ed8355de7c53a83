//! dynval: a refcounted, copy-on-write dynamic value representation for
//! JSON-shaped data (null, boolean, number, either native or
//! arbitrary-precision decimal, string, array, and object), plus the
//! invalid/error carrier that replaces panics and exceptions throughout.
//!
//! Key design principles:
//! - [`Value`]: the eight-kind handle every operation in this crate passes
//!   around. Cloning it is `Rc` refcount bump, never a deep copy.
//! - Heap-backed kinds (`String`, `Array`, `Object`, and the decimal form of
//!   `Number`) are copy-on-write: mutating a uniquely-held payload mutates in
//!   place; mutating a shared one clones first.
//! - Errors are `Invalid` values, not `Result`/panics, except for kind
//!   contract violations (calling an array operation on a string, etc.),
//!   which panic, matching this crate's ambient "a wrong-kind call is a
//!   programmer bug" convention.

pub mod array;
pub mod invalid;
pub mod kind;
pub mod number;
pub mod object;
pub mod string;
pub mod value;

pub use array::SeqArray;
pub use kind::Kind;
pub use number::Number;
pub use number::context as decimal_context;
pub use object::SeqObject;
pub use string::SeqValueString;
pub use value::{Value, contains, copy, equal, free, identical};
