//! Shared types for the Mesa admin backend
//!
//! Common types used across the server and its observer clients:
//! message bus envelope, table event payloads and pagination types.

pub mod message;
pub mod query;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType, TableAction, TableEventPayload};

// Pagination re-exports
pub use query::{PageQuery, PaginatedResponse};
