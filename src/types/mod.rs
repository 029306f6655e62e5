//! Identifier types for acton-chain.
//!
//! - `InvocationId`: one tool invocation attempt (`call_…`)
//! - `ChainId`: one chain run (`chain_…`)

mod ids;

pub use ids::{ChainId, InvalidChainId, InvalidInvocationId, InvocationId};
