//! Testing Utilities Module
//!
//! Helpers for unit and integration tests: a scriptable in-memory
//! [`ChainQuery`](crate::query::ChainQuery) and canned testnet fixtures.
//!
//! ## Submodules
//!
//! - `fixtures` - Known-good addresses and a valid testnet configuration
//! - `mock_query` - Scriptable chain query with per-method call counters

pub mod fixtures;
pub mod mock_query;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_query::*;
