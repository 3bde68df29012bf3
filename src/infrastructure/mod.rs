//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Resolver: Multi-source public-IP resolution
//! - Adapters: Platform integrations (Telegram, console)

pub mod config;
pub mod resolver;
pub mod adapters;
