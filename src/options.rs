//! Option sets: named flag definitions with shared, interior-mutable storage
//!
//! An [`OptionSet`] is a cheap handle. Cloning it shares the underlying
//! values, so the registry can own one clone while an action keeps another
//! and reads what the dispatcher committed into it.
//!
//! Flags are parsed by a `clap::Command` holding one long `Arg` per flag plus
//! a catch-all positional. Accepted token shapes:
//! - `--name value`, `--name=value`
//! - `--name` for boolean flags (sets `true`), `--name=false` to clear
//! - `--` ends flag parsing, everything after it is positional
//!
//! Parsing never touches the stored values. [`OptionSet::commit`] applies a
//! successful parse, so a rejected invocation leaves no trace.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use clap::builder::BoolishValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{value_parser, Arg, ArgAction, Command};
use tracing::trace;

use crate::errors::OptionError;

const POSITIONAL: &str = "__positional";

/// Typed flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Str(s) => write!(f, "{s:?}"),
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::Int(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Flag {
    default: FlagValue,
    value: Option<FlagValue>,
}

impl Flag {
    fn current(&self) -> &FlagValue {
        self.value.as_ref().unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone)]
struct Inner {
    command: Command,
    flags: BTreeMap<String, Flag>,
}

impl Default for Inner {
    fn default() -> Self {
        let command = Command::new("flags")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(
                Arg::new(POSITIONAL)
                    .num_args(1..)
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(String)),
            );
        Self {
            command,
            flags: BTreeMap::new(),
        }
    }
}

/// Result of parsing tokens against an option set, not yet committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    /// Non-flag tokens in their original order
    pub positional: Vec<String>,
    values: BTreeMap<String, FlagValue>,
}

impl ParsedFlags {
    /// Value given on the command line for `name`, if any.
    pub fn value(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name)
    }
}

/// Named collection of flag definitions bound to one command.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    inner: Arc<RwLock<Inner>>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a string flag.
    pub fn string(self, name: &str, default: &str, usage: &str) -> Self {
        let arg = Arg::new(name.to_string())
            .long(name.to_string())
            .action(ArgAction::Set)
            .value_parser(value_parser!(String));
        self.define(name, arg, FlagValue::Str(default.to_string()), usage)
    }

    /// Define a boolean flag.
    pub fn boolean(self, name: &str, default: bool, usage: &str) -> Self {
        let arg = Arg::new(name.to_string())
            .long(name.to_string())
            .action(ArgAction::Set)
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(BoolishValueParser::new());
        self.define(name, arg, FlagValue::Bool(default), usage)
    }

    /// Define an integer flag.
    pub fn int(self, name: &str, default: i64, usage: &str) -> Self {
        let arg = Arg::new(name.to_string())
            .long(name.to_string())
            .action(ArgAction::Set)
            .allow_negative_numbers(true)
            .value_parser(value_parser!(i64));
        self.define(name, arg, FlagValue::Int(default), usage)
    }

    fn define(self, name: &str, arg: Arg, default: FlagValue, usage: &str) -> Self {
        {
            let mut inner = self.write();
            let arg = arg.help(format!("{usage} (default {default})"));
            let command = mem::take(&mut inner.command);
            inner.command = command.arg(arg);
            inner.flags.insert(
                name.to_string(),
                Flag {
                    default,
                    value: None,
                },
            );
        }
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value of a flag (committed value, else its default).
    pub fn get(&self, name: &str) -> Option<FlagValue> {
        self.read().flags.get(name).map(|f| f.current().clone())
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            FlagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FlagValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FlagValue::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Whether the flag was committed since the last reset.
    pub fn is_set(&self, name: &str) -> bool {
        self.read()
            .flags
            .get(name)
            .is_some_and(|f| f.value.is_some())
    }

    /// Restore every flag to its default.
    pub fn reset(&self) {
        for flag in self.write().flags.values_mut() {
            flag.value = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.read().flags.is_empty()
    }

    /// Flag section of clap's rendered help, one line per row.
    pub fn usage_lines(&self) -> Vec<String> {
        let mut command = self.read().command.clone();
        command
            .render_help()
            .to_string()
            .lines()
            .map(str::trim_end)
            .filter(|line| line.trim_start().starts_with("--"))
            .map(|line| line.trim_start().to_string())
            .collect()
    }

    /// Split `tokens` into flag values and positionals without touching the
    /// stored values.
    pub fn parse(&self, tokens: &[String]) -> Result<ParsedFlags, OptionError> {
        let inner = self.read();
        let matches = inner
            .command
            .clone()
            .try_get_matches_from(tokens)
            .map_err(option_error)?;

        let mut values = BTreeMap::new();
        for (name, flag) in &inner.flags {
            let value = match flag.default {
                FlagValue::Str(_) => matches.get_one::<String>(name).cloned().map(FlagValue::Str),
                FlagValue::Bool(_) => matches.get_one::<bool>(name).copied().map(FlagValue::Bool),
                FlagValue::Int(_) => matches.get_one::<i64>(name).copied().map(FlagValue::Int),
            };
            if let Some(value) = value {
                trace!("flag {} = {}", name, value);
                values.insert(name.clone(), value);
            }
        }
        let positional = matches
            .get_many::<String>(POSITIONAL)
            .map(|v| v.cloned().collect())
            .unwrap_or_default();

        Ok(ParsedFlags { positional, values })
    }

    /// Store the values of a successful parse. Flags absent from it keep
    /// whatever value they already hold.
    pub fn commit(&self, parsed: &ParsedFlags) {
        let mut inner = self.write();
        for (name, value) in &parsed.values {
            if let Some(flag) = inner.flags.get_mut(name) {
                flag.value = Some(value.clone());
            }
        }
    }
}

fn context_string(err: &clap::Error, kind: ContextKind) -> String {
    match err.get(kind) {
        Some(ContextValue::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn option_error(err: clap::Error) -> OptionError {
    let flag = context_string(&err, ContextKind::InvalidArg);
    match err.kind() {
        ErrorKind::UnknownArgument => OptionError::UnknownFlag(flag),
        _ => {
            let rendered = err.render().to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            OptionError::Rejected { flag, message }
        }
    }
}
