//! Sample registry wired into the demo binary

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::cli::output;
use crate::config::AppConfig;
use crate::domain::{Bindings, Cmd};
use crate::options::OptionSet;

/// Commands served by the `cmdtree` binary. Actions receive the loaded
/// [`AppConfig`].
pub fn registry() -> BTreeMap<String, Cmd<AppConfig>> {
    let greet_opts = OptionSet::new()
        .boolean("shout", false, "print in upper case")
        .int("times", 1, "number of greetings");

    let mut cmds = BTreeMap::new();
    cmds.insert(
        "init".to_string(),
        Cmd::new()
            .blurb("check the environment before configuration is loaded")
            .pre_run(true)
            .action(_init),
    );
    cmds.insert(
        "greet".to_string(),
        Cmd::new()
            .blurb("greet someone")
            .args(["name"])
            .options(greet_opts.clone())
            .action(move |cfg: &AppConfig, args: &Bindings| _greet(cfg, args, &greet_opts)),
    );
    cmds.insert(
        "config".to_string(),
        Cmd::new()
            .blurb("inspect configuration")
            .child(
                "show",
                Cmd::new().blurb("print the loaded configuration").action(_config_show),
            )
            .child(
                "get",
                Cmd::new()
                    .blurb("print one configuration key")
                    .args(["key"])
                    .action(_config_get),
            ),
    );
    cmds
}

#[instrument(skip(_cfg))]
fn _init(_cfg: &AppConfig, args: &Bindings) {
    output::action("Ready", &format!("{} binding(s) from the host", args.len()));
}

#[instrument(skip(cfg, opts))]
fn _greet(cfg: &AppConfig, args: &Bindings, opts: &OptionSet) {
    let name = args.get("name").map(String::as_str).unwrap_or_default();
    let times = opts.get_int("times").unwrap_or(1).max(0);
    let mut line = format!("hello {name} from {}", cfg.name);
    if opts.get_bool("shout").unwrap_or(false) {
        line = line.to_uppercase();
    }
    for _ in 0..times {
        output::info(&line);
    }
    opts.reset();
}

#[instrument(skip(cfg))]
fn _config_show(cfg: &AppConfig, _args: &Bindings) {
    match toml::to_string_pretty(cfg) {
        Ok(rendered) => output::info(rendered.trim_end()),
        Err(e) => output::error(&format!("cannot render config: {e}")),
    }
}

#[instrument(skip(cfg))]
fn _config_get(cfg: &AppConfig, args: &Bindings) {
    let key = args.get("key").map(String::as_str).unwrap_or_default();
    debug!("key: {}", key);
    match key {
        "name" => output::info(&cfg.name),
        "version" => output::info(&cfg.version),
        "description" => output::info(&cfg.description),
        other => output::warning(&format!("unknown key: {other}")),
    }
}
