pub mod batch;
pub mod cli;
pub mod compression;
pub mod config;
pub mod database;
pub mod error;
pub mod orchestrator;
pub mod reporter;
pub mod storage;
pub mod table;
pub mod utils;

pub use error::{OpError, OpResult};
