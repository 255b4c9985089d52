use thiserror::Error;

use crate::exitcode;

/// Errors raised while parsing flag tokens against an option set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("unexpected flag: {0}")]
    UnknownFlag(String),

    #[error("{message}")]
    Rejected { flag: String, message: String },

    #[error("command takes no flags, got: {0}")]
    NotAccepted(String),
}

/// Errors raised while resolving and dispatching a token sequence.
///
/// None of these are fatal: `App::run` and `App::pre_run` turn them into a
/// message on stderr plus the code from [`DispatchError::exit_code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown command: {path}")]
    UnknownCommand { path: String },

    #[error("command '{command}' requires {expected} argument(s), missing: {}", .missing.join(", "))]
    MissingRequiredArgument {
        command: String,
        expected: usize,
        missing: Vec<String>,
    },

    #[error("command '{command}' is not eligible for pre-run")]
    PreRunIneligible { command: String },

    #[error("command '{command}' has no action defined")]
    NoActionDefined { command: String },

    #[error("command '{command}' requires a subcommand")]
    MissingSubcommand { command: String },

    #[error("invalid flags for '{command}': {source}")]
    InvalidFlag {
        command: String,
        #[source]
        source: OptionError,
    },

    #[error("command '{command}' declares argument '{name}' more than once")]
    DuplicateArgument { command: String, name: String },

    #[error("'{name}' is reserved and cannot be registered")]
    ReservedName { name: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl DispatchError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::UnknownCommand { .. }
            | DispatchError::MissingRequiredArgument { .. }
            | DispatchError::MissingSubcommand { .. }
            | DispatchError::InvalidFlag { .. } => exitcode::USAGE,
            DispatchError::PreRunIneligible { .. } => exitcode::NOPERM,
            DispatchError::NoActionDefined { .. }
            | DispatchError::DuplicateArgument { .. }
            | DispatchError::ReservedName { .. } => exitcode::SOFTWARE,
            DispatchError::Config { .. } => exitcode::CONFIG,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
