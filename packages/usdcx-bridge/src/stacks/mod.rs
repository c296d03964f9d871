//! Stacks Chain Support Module
//!
//! ## Submodules
//!
//! - `clarity` - Clarity value and contract-call payload encoding
//! - `post_conditions` - Fungible-token post-conditions
//! - `queries` - Stacks API client for transactions, tip height and balances

pub mod clarity;
pub mod post_conditions;
pub mod queries;

pub use clarity::{ClarityValue, ContractCall};
pub use post_conditions::{FungibleConditionCode, FungiblePostCondition, PostConditionMode};
pub use queries::{StacksQueryClient, StacksTxRecord, StacksTxStatus};
