//! EVM Chain Support Module
//!
//! ## Submodules
//!
//! - `contracts` - ERC20 and xReserve bindings using alloy sol! macro
//! - `queries` - Read-only RPC queries (allowance, balance, gas, receipts)

pub mod contracts;
pub mod queries;

// Re-export commonly used items
pub use contracts::{XReserve, ERC20};
pub use queries::{EvmQueryClient, EvmReceipt};
