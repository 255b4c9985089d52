//! Dispatcher behaviour: construction, help, resolution, gating, binding, flags

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use rstest::rstest;

use cmdtree::util::testing;
use cmdtree::{exitcode, App, AppConfig, Bindings, Cmd, DispatchError, Mode, OptionSet};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn tokens(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn noop() -> Cmd<AppConfig> {
    Cmd::new().action(|_: &AppConfig, _: &Bindings| {})
}

fn registry(entries: Vec<(&str, Cmd<AppConfig>)>) -> BTreeMap<String, Cmd<AppConfig>> {
    entries
        .into_iter()
        .map(|(name, cmd)| (name.to_string(), cmd))
        .collect()
}

fn run(app: &App<AppConfig>, raw: &[&str]) -> i32 {
    app.run(&AppConfig::default(), &Bindings::new(), &tokens(raw))
}

fn pre_run(app: &App<AppConfig>, raw: &[&str]) -> i32 {
    app.pre_run(&Bindings::new(), &tokens(raw))
}

// ============================================================
// Construction
// ============================================================

#[rstest]
#[case::with_version(AppConfig::new("t", "1"), 1)]
#[case::without_version(AppConfig::default(), 0)]
fn given_empty_registry_when_constructing_then_help_injected_only_with_version(
    #[case] cfg: AppConfig,
    #[case] expected: usize,
) {
    let app: App<AppConfig> = App::new(BTreeMap::new(), cfg);
    assert_eq!(app.commands().len(), expected);
}

#[test]
fn given_populated_registry_when_constructing_with_version_then_one_extra_command() {
    let cmds = registry(vec![("a", noop()), ("b", noop())]);
    let app = App::new(cmds, AppConfig::new("t", "1"));
    assert_eq!(app.commands().len(), 3);
    assert!(app.commands().contains_key("help"));
}

// ============================================================
// Pre-run
// ============================================================

#[rstest]
#[case::help_runs(registry(vec![]), &["help"], true)]
#[case::empty_tokens_show_help(registry(vec![]), &[], true)]
#[case::invalid_command(registry(vec![]), &["asdfasdf"], false)]
#[case::non_prerun_command(registry(vec![("notme", noop())]), &["notme"], false)]
#[case::missing_required_args(
    registry(vec![("hi", noop().pre_run(true).args(["hello", "world"]))]),
    &["hi"],
    false
)]
#[case::required_args_present(
    registry(vec![("hi", noop().pre_run(true).args(["hello", "world"]))]),
    &["hi", "bobhead", "postables"],
    true
)]
#[case::routing_only_intermediates(
    registry(vec![("me", Cmd::new().child("too", Cmd::new().child("wow", noop().pre_run(true))))]),
    &["me", "too", "wow"],
    true
)]
fn given_registry_when_pre_running_then_exit_code_matches(
    #[case] cmds: BTreeMap<String, Cmd<AppConfig>>,
    #[case] raw: &[&str],
    #[case] want_run: bool,
) {
    let app = App::new(cmds, AppConfig::default());
    assert_eq!(pre_run(&app, raw) == exitcode::OK, want_run);
}

#[test]
fn given_non_prerun_command_when_pre_running_then_noperm_but_run_succeeds() {
    let app = App::new(registry(vec![("notme", noop())]), AppConfig::default());
    assert_eq!(pre_run(&app, &["notme"]), exitcode::NOPERM);
    assert_eq!(run(&app, &["notme"]), exitcode::OK);
}

#[test]
fn given_prerun_command_when_pre_running_then_action_gets_default_config_and_extra() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let cmd = Cmd::new()
        .pre_run(true)
        .args(["target"])
        .action(move |cfg: &AppConfig, args: &Bindings| {
            *sink.lock().unwrap() = Some((cfg.clone(), args.clone()));
        });
    let app = App::new(registry(vec![("init", cmd)]), AppConfig::new("t", "1"));

    let mut extra = Bindings::new();
    extra.insert("dbPass".into(), "secret".into());
    assert_eq!(app.pre_run(&extra, &tokens(&["init", "here"])), exitcode::OK);

    let (cfg, args) = seen.lock().unwrap().take().expect("action invoked");
    assert_eq!(cfg, AppConfig::default());
    assert_eq!(args.get("target").map(String::as_str), Some("here"));
    assert_eq!(args.get("dbPass").map(String::as_str), Some("secret"));
}

// ============================================================
// Run
// ============================================================

#[rstest]
#[case::help_runs(registry(vec![]), &["help"], true)]
#[case::invalid_command(registry(vec![]), &["asdfasdf"], false)]
#[case::custom_command(registry(vec![("me", noop())]), &["me"], true)]
#[case::nested_commands(
    registry(vec![("me", noop().child("too", Cmd::new().child("wow", noop())))]),
    &["me", "too", "wow"],
    true
)]
#[case::routing_only_intermediates(
    registry(vec![("me", Cmd::new().child("too", Cmd::new().child("wow", noop())))]),
    &["me", "too", "wow"],
    true
)]
#[case::missing_required_args(
    registry(vec![("hi", noop().args(["hello", "world"]))]),
    &["hi"],
    false
)]
#[case::one_of_two_required_args(
    registry(vec![("hi", noop().args(["hello", "world"]))]),
    &["hi", "bobhead"],
    false
)]
#[case::required_args_present(
    registry(vec![("hi", noop().args(["hello", "world"]))]),
    &["hi", "bobhead", "postables"],
    true
)]
#[case::surplus_args_ignored(
    registry(vec![("hi", noop().args(["hello", "world"]))]),
    &["hi", "a", "b", "c"],
    true
)]
#[case::dead_node(registry(vec![("dead", Cmd::new())]), &["dead"], false)]
#[case::flag_without_option_set(registry(vec![("me", noop())]), &["me", "--x"], false)]
fn given_registry_when_running_then_exit_code_matches(
    #[case] cmds: BTreeMap<String, Cmd<AppConfig>>,
    #[case] raw: &[&str],
    #[case] want_run: bool,
) {
    let app = App::new(cmds, AppConfig::default());
    assert_eq!(run(&app, raw) == exitcode::OK, want_run);
}

#[test]
fn given_nested_chain_when_running_then_only_deepest_action_invoked() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (top, deep) = (calls.clone(), calls.clone());
    let cmds = registry(vec![(
        "me",
        Cmd::new()
            .action(move |_: &AppConfig, _: &Bindings| top.lock().unwrap().push("me"))
            .child(
                "too",
                Cmd::new().child(
                    "wow",
                    Cmd::new()
                        .action(move |_: &AppConfig, _: &Bindings| deep.lock().unwrap().push("wow")),
                ),
            ),
    )]);
    let app = App::new(cmds, AppConfig::default());

    assert_eq!(run(&app, &["me", "too", "wow"]), exitcode::OK);
    assert_eq!(run(&app, &["me"]), exitcode::OK);
    assert_eq!(*calls.lock().unwrap(), vec!["wow", "me"]);
}

#[test]
fn given_required_args_when_running_then_bound_positionally() {
    let seen = Arc::new(Mutex::new(Bindings::new()));
    let sink = seen.clone();
    let cmd = Cmd::new()
        .args(["hello", "world"])
        .action(move |_: &AppConfig, args: &Bindings| *sink.lock().unwrap() = args.clone());
    let app = App::new(registry(vec![("hi", cmd)]), AppConfig::default());

    assert_eq!(run(&app, &["hi", "bobhead", "postables", "extra"]), exitcode::OK);

    let args = seen.lock().unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(args["hello"], "bobhead");
    assert_eq!(args["world"], "postables");
}

#[test]
fn given_config_when_running_then_action_receives_it_unmodified() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let cmd = Cmd::new().action(move |cfg: &AppConfig, _: &Bindings| {
        *sink.lock().unwrap() = Some(cfg.clone());
    });
    let app = App::new(registry(vec![("me", cmd)]), AppConfig::default());
    let cfg = AppConfig::new("host", "2.0").with_description("passed through");

    assert_eq!(app.run(&cfg, &Bindings::new(), &tokens(&["me"])), exitcode::OK);
    assert_eq!(seen.lock().unwrap().as_ref(), Some(&cfg));
}

// ============================================================
// Typed errors
// ============================================================

#[rstest]
#[case::unknown(&["nope"], DispatchError::UnknownCommand { path: "nope".into() })]
#[case::missing(&["hi", "a"], DispatchError::MissingRequiredArgument {
    command: "hi".into(), expected: 2, missing: vec!["world".into()]
})]
#[case::dead(&["dead"], DispatchError::NoActionDefined { command: "dead".into() })]
fn given_bad_tokens_when_dispatching_then_typed_error(
    #[case] raw: &[&str],
    #[case] expected: DispatchError,
) {
    let cmds = registry(vec![
        ("hi", noop().args(["hello", "world"])),
        ("dead", Cmd::new()),
    ]);
    let app = App::new(cmds, AppConfig::default());
    let err = app
        .dispatch(&AppConfig::default(), &Bindings::new(), &tokens(raw), Mode::Run)
        .unwrap_err();
    assert_eq!(err, expected);
    assert_ne!(err.exit_code(), exitcode::OK);
}

#[test]
fn given_non_prerun_command_when_dispatching_pre_run_then_ineligible() {
    let app = App::new(registry(vec![("notme", noop())]), AppConfig::default());
    let err = app
        .dispatch(&AppConfig::default(), &Bindings::new(), &tokens(&["notme"]), Mode::PreRun)
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::PreRunIneligible {
            command: "notme".into()
        }
    );
}

// ============================================================
// Flags
// ============================================================

fn flag_app(observed: Arc<Mutex<Option<String>>>) -> (App<AppConfig>, OptionSet) {
    let fl = OptionSet::new().string("test", "", "flag for testing");
    let handle = fl.clone();
    let cmd = Cmd::new()
        .options(fl.clone())
        .action(move |_: &AppConfig, _: &Bindings| {
            *observed.lock().unwrap() = handle.get_string("test");
            handle.reset();
        });
    (App::new(registry(vec![("hi", cmd)]), AppConfig::default()), fl)
}

#[test]
fn given_flag_on_command_when_running_then_action_sees_value() {
    let observed = Arc::new(Mutex::new(None));
    let (app, _) = flag_app(observed.clone());

    assert_eq!(run(&app, &["hi", "--test", "wow"]), exitcode::OK);
    assert_eq!(observed.lock().unwrap().as_deref(), Some("wow"));
}

#[test]
fn given_missing_flag_on_command_when_running_then_action_sees_default() {
    let observed = Arc::new(Mutex::new(None));
    let (app, fl) = flag_app(observed.clone());

    assert_eq!(run(&app, &["hi"]), exitcode::OK);
    assert_eq!(observed.lock().unwrap().as_deref(), Some(""));
    assert!(!fl.is_set("test"));
}

#[test]
fn given_flags_and_args_interleaved_when_running_then_both_bound() {
    let fl = OptionSet::new().boolean("force", false, "overwrite");
    let handle = fl.clone();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let cmd = Cmd::new()
        .args(["src", "dst"])
        .options(fl)
        .action(move |_: &AppConfig, args: &Bindings| {
            *sink.lock().unwrap() = Some((args.clone(), handle.get_bool("force")));
        });
    let app = App::new(registry(vec![("cp", cmd)]), AppConfig::default());

    assert_eq!(run(&app, &["cp", "a", "--force", "b"]), exitcode::OK);

    let (args, force) = seen.lock().unwrap().take().expect("action invoked");
    assert_eq!(args["src"], "a");
    assert_eq!(args["dst"], "b");
    assert_eq!(force, Some(true));
}

#[test]
fn given_undefined_flag_when_running_then_usage_error() {
    let observed = Arc::new(Mutex::new(None));
    let (app, _) = flag_app(observed.clone());

    assert_eq!(run(&app, &["hi", "--other", "x"]), exitcode::USAGE);
    assert!(observed.lock().unwrap().is_none());
}

#[test]
fn given_failed_binding_when_running_again_then_flags_from_failure_not_seen() {
    let fl = OptionSet::new().boolean("force", false, "overwrite");
    let handle = fl.clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let cmd = Cmd::new()
        .args(["a", "b"])
        .options(fl.clone())
        .action(move |_: &AppConfig, _: &Bindings| {
            sink.borrow_mut().push(handle.get_bool("force"));
        });
    let app = App::new(registry(vec![("cp", cmd)]), AppConfig::default());

    assert_eq!(run(&app, &["cp", "--force", "x"]), exitcode::USAGE);
    assert!(!fl.is_set("force"));
    assert_eq!(run(&app, &["cp", "x", "y"]), exitcode::OK);

    assert_eq!(*seen.borrow(), vec![Some(false)]);
}

#[test]
fn given_bad_flag_after_good_one_when_running_then_nothing_committed() {
    let fl = OptionSet::new().int("count", 1, "repetitions");
    let cmd = Cmd::new()
        .options(fl.clone())
        .action(|_: &AppConfig, _: &Bindings| {});
    let app = App::new(registry(vec![("rep", cmd)]), AppConfig::default());

    assert_eq!(run(&app, &["rep", "--count", "3", "--nope"]), exitcode::USAGE);
    assert_eq!(fl.get_int("count"), Some(1));
    assert!(!fl.is_set("count"));
}

#[test]
fn given_routing_only_chain_when_running_then_deepest_action_invoked() {
    let hit = Rc::new(RefCell::new(false));
    let sink = hit.clone();
    let cmds = registry(vec![(
        "me",
        Cmd::new().child(
            "too",
            Cmd::new().child(
                "wow",
                Cmd::new().action(move |_: &AppConfig, _: &Bindings| *sink.borrow_mut() = true),
            ),
        ),
    )]);
    let app = App::new(cmds, AppConfig::default());

    assert_eq!(run(&app, &["me", "too", "wow"]), exitcode::OK);
    assert!(*hit.borrow());
}
