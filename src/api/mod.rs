//! API Module
//!
//! Command line surface of the crate:
//! - cli.rs: argument structure (clap)
//! - commands.rs: handlers
//! - engine_status.rs: status report shared by `status`

pub mod cli;
pub mod commands;
pub mod engine_status;

pub use cli::Cli;
pub use commands::dispatch;
