use std::process;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use cmdtree::cli::{output, registry, Cli};
use cmdtree::{App, AppConfig, Bindings};

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    let mut cfg = match AppConfig::load("cmdtree", cli.config_dir.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            output::error(&e);
            process::exit(e.exit_code());
        }
    };
    if cfg.version.is_empty() {
        cfg.version = env!("CARGO_PKG_VERSION").to_string();
    }

    let mut extra = Bindings::new();
    if let Some(dir) = &cli.config_dir {
        extra.insert("config_dir".to_string(), dir.display().to_string());
    }

    let app = App::new(registry(), cfg.clone());
    if let Err(e) = app.validate() {
        output::error(&e);
        process::exit(e.exit_code());
    }

    let code = if cli.pre_run {
        app.pre_run(&extra, &cli.tokens)
    } else {
        app.run(&cfg, &extra, &cli.tokens)
    };
    process::exit(code);
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
