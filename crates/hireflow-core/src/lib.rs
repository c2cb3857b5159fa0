//! Core types for hireflow.
//!
//! This crate provides the foundational types used throughout the hireflow services:
//!
//! - **Identifiers**: Strongly-typed IDs for users, documents, agents, conversations and actions
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use hireflow_core::{AgentId, IdentityId, UserId};
//!
//! // Identity IDs come from the identity provider's `sub` claim
//! let identity: IdentityId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//!
//! // The internal user ID is derived from it
//! let user_id = UserId::from_identity(&identity);
//! assert_eq!(user_id, UserId::from_identity(&identity));
//!
//! // Record IDs are random UUIDs
//! let agent_id = AgentId::generate();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;

pub use error::{parse_id, CoreError, Result};
pub use ids::{
    ActionId, AgentId, ChunkId, ConversationId, DocumentId, IdError, IdentityId, MessageId,
    RoleId, UserId,
};
