//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod command;
pub mod operator;

pub use user::User;
pub use command::{ChatContext, Command};
pub use operator::OperatorSet;
