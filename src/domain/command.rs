//! Command nodes: the registry's data shape
//!
//! A registry is a plain owned tree (`BTreeMap<String, Cmd<C>>` at every
//! level). Ownership makes cycles impossible, and the dispatcher only ever
//! holds shared references to it.

use std::collections::BTreeMap;
use std::fmt;

use termtree::Tree;

use crate::options::OptionSet;

/// Bound argument names mapped to their token values.
pub type Bindings = BTreeMap<String, String>;

/// Capability invoked for a resolved command.
///
/// `C` is the caller's configuration value, passed through untouched.
/// Any `Fn(&C, &Bindings)` closure is an action.
pub trait Action<C> {
    fn run(&self, cfg: &C, args: &Bindings);
}

impl<C, F> Action<C> for F
where
    F: Fn(&C, &Bindings),
{
    fn run(&self, cfg: &C, args: &Bindings) {
        self(cfg, args)
    }
}

/// What a command does when it is the resolved node.
pub enum Handler<C> {
    /// Built-in: render the command listing.
    Help,
    /// Caller-supplied action.
    Custom(Box<dyn Action<C>>),
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Help => f.write_str("Help"),
            Handler::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One command or subcommand. Its name is the key under which the parent
/// stores it.
pub struct Cmd<C> {
    /// One-line summary shown in listings
    pub blurb: String,
    /// Longer text shown when this command's own help is requested
    pub description: String,
    /// Resolves and runs normally, omitted from listings
    pub hidden: bool,
    /// Eligible for the pre-run pass
    pub pre_run: bool,
    /// Required positional argument names, bound in order
    pub args: Vec<String>,
    /// Flags accepted by this command, `None` if it takes none
    pub options: Option<OptionSet>,
    pub handler: Option<Handler<C>>,
    pub children: BTreeMap<String, Cmd<C>>,
}

impl<C> Default for Cmd<C> {
    fn default() -> Self {
        Self {
            blurb: String::new(),
            description: String::new(),
            hidden: false,
            pre_run: false,
            args: Vec::new(),
            options: None,
            handler: None,
            children: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for Cmd<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd")
            .field("blurb", &self.blurb)
            .field("hidden", &self.hidden)
            .field("pre_run", &self.pre_run)
            .field("args", &self.args)
            .field("options", &self.options.as_ref().map(OptionSet::usage_lines))
            .field("handler", &self.handler)
            .field("children", &self.children)
            .finish()
    }
}

impl<C> Cmd<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blurb(mut self, blurb: impl Into<String>) -> Self {
        self.blurb = blurb.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn pre_run(mut self, pre_run: bool) -> Self {
        self.pre_run = pre_run;
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn options(mut self, options: OptionSet) -> Self {
        self.options = Some(options);
        self
    }

    pub fn action(mut self, action: impl Action<C> + 'static) -> Self {
        self.handler = Some(Handler::Custom(Box::new(action)));
        self
    }

    pub fn handler(mut self, handler: Handler<C>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn child(mut self, name: impl Into<String>, cmd: Cmd<C>) -> Self {
        self.children.insert(name.into(), cmd);
        self
    }

    /// Children that appear in listings.
    pub fn visible_children(&self) -> impl Iterator<Item = (&String, &Cmd<C>)> {
        visible(&self.children)
    }

    /// First required-argument name declared more than once.
    pub fn duplicate_arg(&self) -> Option<&str> {
        self.args
            .iter()
            .enumerate()
            .find(|(i, a)| self.args[..*i].contains(*a))
            .map(|(_, a)| a.as_str())
    }

    /// Listing label: name, `<arg>` placeholders and blurb.
    fn label(&self, name: &str) -> String {
        let mut label = name.to_string();
        for arg in &self.args {
            label.push_str(&format!(" <{arg}>"));
        }
        if !self.blurb.is_empty() {
            label.push_str(&format!("  {}", self.blurb));
        }
        label
    }
}

/// Non-hidden entries of a command mapping, in name order.
pub fn visible<C>(cmds: &BTreeMap<String, Cmd<C>>) -> impl Iterator<Item = (&String, &Cmd<C>)> {
    cmds.iter().filter(|(_, c)| !c.hidden)
}

/// Render a named command and its visible descendants.
pub trait CommandTree {
    fn to_tree(&self, name: &str) -> Tree<String>;
}

impl<C> CommandTree for Cmd<C> {
    fn to_tree(&self, name: &str) -> Tree<String> {
        let leaves: Vec<_> = self
            .visible_children()
            .map(|(child_name, child)| child.to_tree(child_name))
            .collect();
        Tree::new(self.label(name)).with_leaves(leaves)
    }
}
