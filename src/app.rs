//! Dispatcher: resolves a token sequence against the registry and invokes
//! the resolved command.
//!
//! Resolution walks the tree one token at a time. The first token must name
//! a top-level command; later tokens descend while they match a child, and
//! the first one that does not becomes an argument of the last matched node.
//! The remaining tokens are split into flags (parsed into the node's option
//! set) and positionals (bound to its required argument names, in order).

use std::collections::BTreeMap;

use termtree::Tree;
use tracing::{debug, info, instrument, warn};

use crate::cli::output;
use crate::config::AppConfig;
use crate::domain::{visible, Bindings, Cmd, CommandTree, Handler};
use crate::errors::{DispatchError, DispatchResult, OptionError};
use crate::exitcode;
use crate::options::OptionSet;

/// Reserved command name, always handled before registry lookup.
pub const HELP: &str = "help";

/// Which entry point is dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Any resolved command may run
    Run,
    /// Only commands marked `pre_run` may run
    PreRun,
}

/// Outcome of walking the registry.
#[derive(Debug)]
pub enum Resolution<'a, C> {
    /// Help short-circuit, carrying the tokens after `help`
    Help(Vec<String>),
    Command(Resolved<'a, C>),
}

/// A matched command plus the tokens it did not consume.
#[derive(Debug)]
pub struct Resolved<'a, C> {
    pub path: Vec<String>,
    pub cmd: &'a Cmd<C>,
    pub rest: Vec<String>,
}

impl<C> Resolved<'_, C> {
    pub fn name(&self) -> String {
        self.path.join(" ")
    }
}

/// Command dispatcher, built once per process invocation.
pub struct App<C> {
    cfg: AppConfig,
    cmds: BTreeMap<String, Cmd<C>>,
}

impl<C> App<C> {
    /// Build a dispatcher. A non-empty `cfg.version` adds the `help` command.
    pub fn new(cmds: BTreeMap<String, Cmd<C>>, cfg: AppConfig) -> Self {
        let mut cmds = cmds;
        if !cfg.version.is_empty() {
            let help = Cmd::new()
                .blurb("show available commands")
                .handler(Handler::Help);
            if cmds.insert(HELP.to_string(), help).is_some() {
                warn!("registered '{}' command replaced by the built-in", HELP);
            }
        }
        Self { cfg, cmds }
    }

    /// Top-level commands, including the injected `help`.
    pub fn commands(&self) -> &BTreeMap<String, Cmd<C>> {
        &self.cmds
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    /// Check registry invariants: unique argument names per node and no
    /// caller-registered `help`.
    pub fn validate(&self) -> DispatchResult<()> {
        if let Some(cmd) = self.cmds.get(HELP) {
            if !matches!(cmd.handler, Some(Handler::Help)) {
                return Err(DispatchError::ReservedName {
                    name: HELP.to_string(),
                });
            }
        }
        let mut stack: Vec<(String, &Cmd<C>)> = self
            .cmds
            .iter()
            .map(|(name, cmd)| (name.clone(), cmd))
            .collect();
        while let Some((path, cmd)) = stack.pop() {
            if let Some(name) = cmd.duplicate_arg() {
                return Err(DispatchError::DuplicateArgument {
                    command: path,
                    name: name.to_string(),
                });
            }
            stack.extend(
                cmd.children
                    .iter()
                    .map(|(name, child)| (format!("{path} {name}"), child)),
            );
        }
        Ok(())
    }

    /// Walk the registry along `tokens`.
    pub fn resolve<'a>(&'a self, tokens: &[String]) -> DispatchResult<Resolution<'a, C>> {
        match tokens.first() {
            None => return Ok(Resolution::Help(Vec::new())),
            Some(first) if first == HELP => return Ok(Resolution::Help(tokens[1..].to_vec())),
            Some(_) => {}
        }

        let mut level = &self.cmds;
        let mut path = Vec::new();
        let mut current = None;
        for token in tokens {
            let Some(cmd) = level.get(token) else {
                break;
            };
            debug!("matched '{}' at depth {}", token, path.len());
            path.push(token.clone());
            current = Some(cmd);
            level = &cmd.children;
            if level.is_empty() {
                break;
            }
        }

        let Some(cmd) = current else {
            return Err(DispatchError::UnknownCommand {
                path: tokens[0].clone(),
            });
        };
        let rest = tokens[path.len()..].to_vec();
        Ok(Resolution::Command(Resolved { path, cmd, rest }))
    }

    /// Split the unconsumed tokens, bind required arguments on top of
    /// `extra`, then commit flag values. Nothing is committed on failure.
    pub fn bind(&self, resolved: &Resolved<'_, C>, extra: &Bindings) -> DispatchResult<Bindings> {
        let cmd = resolved.cmd;
        let parsed = match &cmd.options {
            Some(opts) => opts.parse(&resolved.rest),
            None => OptionSet::new().parse(&resolved.rest).map_err(|e| match e {
                OptionError::UnknownFlag(flag) => OptionError::NotAccepted(flag),
                other => other,
            }),
        }
        .map_err(|source| DispatchError::InvalidFlag {
            command: resolved.name(),
            source,
        })?;

        let supplied = parsed.positional.len();
        if supplied < cmd.args.len() {
            return Err(DispatchError::MissingRequiredArgument {
                command: resolved.name(),
                expected: cmd.args.len(),
                missing: cmd.args[supplied..].to_vec(),
            });
        }

        let mut bound = extra.clone();
        bound.extend(cmd.args.iter().cloned().zip(parsed.positional.iter().cloned()));
        if let Some(opts) = &cmd.options {
            opts.commit(&parsed);
        }
        Ok(bound)
    }

    /// Resolve, gate, bind and invoke, returning the typed error on failure.
    pub fn dispatch(
        &self,
        cfg: &C,
        extra: &Bindings,
        tokens: &[String],
        mode: Mode,
    ) -> DispatchResult<()> {
        let resolved = match self.resolve(tokens)? {
            Resolution::Help(path) => {
                self.print_help(&path);
                return Ok(());
            }
            Resolution::Command(resolved) => resolved,
        };

        if mode == Mode::PreRun && !resolved.cmd.pre_run {
            return Err(DispatchError::PreRunIneligible {
                command: resolved.name(),
            });
        }

        let Some(handler) = &resolved.cmd.handler else {
            return Err(self.no_handler(&resolved));
        };

        let args = self.bind(&resolved, extra)?;
        info!("running '{}'", resolved.name());
        match handler {
            Handler::Help => self.print_help(help_scope(&resolved.path)),
            Handler::Custom(action) => action.run(cfg, &args),
        }
        Ok(())
    }

    fn no_handler(&self, resolved: &Resolved<'_, C>) -> DispatchError {
        if resolved.cmd.children.is_empty() {
            return DispatchError::NoActionDefined {
                command: resolved.name(),
            };
        }
        match resolved.rest.iter().find(|t| !t.starts_with('-')) {
            Some(token) => DispatchError::UnknownCommand {
                path: format!("{} {}", resolved.name(), token),
            },
            None => {
                self.print_help(&resolved.path);
                DispatchError::MissingSubcommand {
                    command: resolved.name(),
                }
            }
        }
    }

    /// Run any resolved command with the caller's configuration value.
    #[instrument(level = "debug", skip(self, cfg, extra))]
    pub fn run(&self, cfg: &C, extra: &Bindings, tokens: &[String]) -> i32 {
        exit_code(self.dispatch(cfg, extra, tokens, Mode::Run))
    }

    /// Run only pre-run commands. The configuration is not loaded yet at
    /// this stage, so actions receive `C::default()`.
    #[instrument(level = "debug", skip(self, extra))]
    pub fn pre_run(&self, extra: &Bindings, tokens: &[String]) -> i32
    where
        C: Default,
    {
        exit_code(self.dispatch(&C::default(), extra, tokens, Mode::PreRun))
    }

    /// Help for the command at `path`, or the full listing if `path` is
    /// empty or does not resolve.
    pub fn help_text(&self, path: &[String]) -> String {
        if let Some((cmd, name)) = self.lookup(path) {
            let mut out = String::new();
            if !cmd.description.is_empty() {
                out.push_str(&cmd.description);
                out.push_str("\n\n");
            }
            out.push_str(&cmd.to_tree(&name).to_string());
            if let Some(opts) = cmd.options.as_ref().filter(|o| !o.is_empty()) {
                out.push_str("\nflags:\n");
                for line in opts.usage_lines() {
                    out.push_str(&format!("  {line}\n"));
                }
            }
            return out;
        }

        let mut out = String::new();
        if !self.cfg.name.is_empty() {
            out.push_str(&self.cfg.name);
            if !self.cfg.version.is_empty() {
                out.push_str(&format!(" {}", self.cfg.version));
            }
            out.push('\n');
        }
        if !self.cfg.description.is_empty() {
            out.push_str(&self.cfg.description);
            out.push('\n');
        }
        let leaves: Vec<_> = visible(&self.cmds)
            .map(|(name, cmd)| cmd.to_tree(name))
            .collect();
        out.push_str(&Tree::new("commands:".to_string()).with_leaves(leaves).to_string());
        out
    }

    /// Exact path lookup, no argument consumption.
    fn lookup(&self, path: &[String]) -> Option<(&Cmd<C>, String)> {
        let (first, tail) = path.split_first()?;
        let mut cmd = self.cmds.get(first)?;
        for token in tail {
            cmd = cmd.children.get(token)?;
        }
        Some((cmd, path.join(" ")))
    }

    fn print_help(&self, path: &[String]) {
        if !path.is_empty() && self.lookup(path).is_none() {
            output::warning(&format!("no such command: {}", path.join(" ")));
        }
        output::info(self.help_text(path).trim_end());
    }
}

/// A `help` node lists its siblings: the subtree of its parent path.
fn help_scope(path: &[String]) -> &[String] {
    path.split_last().map_or(path, |(_, parent)| parent)
}

/// Print the error, if any, and convert to a process exit code.
fn exit_code(result: DispatchResult<()>) -> i32 {
    match result {
        Ok(()) => exitcode::OK,
        Err(e) => {
            output::error(&e);
            e.exit_code()
        }
    }
}
