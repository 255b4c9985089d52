//! CLI layer: the demo binary's argument surface, its sample registry, and
//! terminal output

pub mod args;
pub mod commands;
pub mod output;

pub use args::Cli;
pub use commands::registry;
