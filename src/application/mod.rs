//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! implementations; the dependency bundle is constructed explicitly at
//! process start and handed in, never reached through a global.

pub mod services;

pub use services::{BatchItem, KnowledgeIndex, Responder};
