//! Command-dispatch engine for command-line applications.
//!
//! A registry of nested [`Cmd`] nodes is handed to an [`App`], which resolves
//! raw argument tokens to one command, binds its required positional
//! arguments, parses its flags and invokes its action, returning a process
//! exit code.
//!
//! ```
//! use std::collections::BTreeMap;
//! use cmdtree::{App, AppConfig, Bindings, Cmd};
//!
//! let mut cmds = BTreeMap::new();
//! cmds.insert(
//!     "hi".to_string(),
//!     Cmd::new()
//!         .args(["name"])
//!         .action(|_: &(), args: &Bindings| println!("hi {}", args["name"])),
//! );
//! let app = App::new(cmds, AppConfig::new("demo", "1.0"));
//! let tokens = vec!["hi".to_string(), "bob".to_string()];
//! assert_eq!(app.run(&(), &Bindings::new(), &tokens), 0);
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod exitcode;
pub mod options;
pub mod util;

pub use app::{App, Mode, Resolution, Resolved, HELP};
pub use config::AppConfig;
pub use domain::{Action, Bindings, Cmd, Handler};
pub use errors::{DispatchError, DispatchResult, OptionError};
pub use options::{FlagValue, OptionSet};
