//! Access layer for record-oriented operations.
//!
//! This module provides the pieces every predicate needs to look at a record:
//!
//! - **Value**: Dynamically typed representation of record contents
//! - **DataType**: The scalar and container kinds a value can have
//! - **compare**: Cross-type ordering with implicit date-string detection
//! - **resolve**: Dotted, wildcard-aware field path lookup
//!
//! Records are never mutated here; every operation borrows the caller's data
//! and returns owned results.

pub mod compare;
pub mod datetime;
pub mod path;
pub mod value;

pub use compare::{compare, equals, equals_cs, same_value, try_compare};
pub use datetime::{is_date_time, parse_time};
pub use path::{resolve, AccessError, AccessResult};
pub use value::{DataType, Value};
