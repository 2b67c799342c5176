mod args;
pub mod command;

pub use args::{Cli, Commands};
