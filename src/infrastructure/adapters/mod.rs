//! Platform adapters implementing the Transport trait

pub mod telegram;
pub mod console;
