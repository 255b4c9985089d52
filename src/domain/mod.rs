//! Domain layer: the command registry
//!
//! Pure data, no I/O: nodes, the action capability and tree rendering.

pub mod command;

pub use command::{visible, Action, Bindings, Cmd, CommandTree, Handler};
