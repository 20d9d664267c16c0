use std::io::{self, BufRead, Write};

use anyhow::Context;
use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trackerd::config::Config;
use trackerd::ipc;

fn init_logging(config: &Config) {
    // stdout carries the protocol, so logs go to stderr.
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("read configuration")?;
    init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "trackerd starting");

    let mut state = ipc::AppState::default();
    if let Some(path) = config.workspace.as_deref() {
        ipc::open_workspace(&mut state, path)
            .with_context(|| format!("open workspace {}", path.display()))?;
    }
    if let Some(user_id) = config.user_id.as_deref() {
        let today = Local::now().date_naive();
        ipc::open_session(&mut state, user_id, config.school_year.clone(), today)
            .context("open start-up session")?;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // Can't reply to an unparsed id; answer with an empty one.
                warn!(error = %e, "bad request line");
                ipc::err("", "bad_json", e.to_string(), None)
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    info!("stdin closed, exiting");
    Ok(())
}
