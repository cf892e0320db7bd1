//! CLI subcommand implementations.

pub mod import;
pub mod pairs;
pub mod similar;
