//! Storage layer for remote config state.
//! - One async capability trait, two backends (database and memory).
//! - Typed accessors pair each field with its value type.
//! - Custom signal updates are merged and validated identically everywhere.

pub mod errors;
pub mod storage;
#[cfg(test)]
pub mod test_support;
