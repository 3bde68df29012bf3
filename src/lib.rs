//! ipsentry - an operator-gated Telegram bot that reports the host's
//! current public IP address and broadcasts diagnostics on failure.

pub mod domain;
pub mod application;
pub mod infrastructure;
