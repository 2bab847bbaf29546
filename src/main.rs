mod backup;
mod classes;
mod config;
mod db;
mod error;
mod events;
mod ipc;
mod marks;
mod model;
mod query;
mod registration;
mod report;
mod settings;
mod store;
mod students;
mod summary;
mod users;

use std::io::{self, BufRead, Write};

use summary::{HttpSummaryGenerator, SummaryGenerator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to stderr; stdout carries only protocol lines.
fn setup_logging() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
}

fn main() {
    setup_logging();

    let summarizer = HttpSummaryGenerator::from_env().map(|g| Box::new(g) as Box<dyn SummaryGenerator>);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        summary_configured = summarizer.is_some(),
        "nurseryd started"
    );
    let mut state = ipc::AppState::new(summarizer);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!("dropping malformed request: {}", e);
                write_line(
                    &mut stdout,
                    &serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    }),
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        write_line(&mut stdout, &resp);
        for event in state.drain_events() {
            write_line(&mut stdout, &event);
        }
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed, exiting");
}
