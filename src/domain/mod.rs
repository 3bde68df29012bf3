//! Domain layer - Core business objects with no external dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (User, Command, OperatorSet)
//! - Traits: Abstractions for infrastructure (Transport)

pub mod entities;
pub mod traits;
