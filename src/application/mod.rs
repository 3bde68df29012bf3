//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors
//! - Gate: Command routing and the authorization wrapper
//! - Handlers: The command surface (/ping, /ip)
//! - Reporter: Failure capture and operator broadcast

pub mod errors;
pub mod gate;
pub mod handlers;
pub mod reporter;
