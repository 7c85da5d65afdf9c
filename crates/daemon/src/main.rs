// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ckd: the certification agent

use std::process::ExitCode;
use std::sync::Arc;

use ck_daemon::{autopilot, startup, Config, Listener};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(config: &Config) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.logs_dir)?;
    let appender = tracing_appender::rolling::daily(&config.logs_dir, "ckd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ckd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ckd: cannot set up logging in {}: {e}", config.logs_dir.display());
            return ExitCode::FAILURE;
        }
    };

    let started = match startup(&config).await {
        Ok(started) => started,
        Err(e) => {
            error!("startup failed: {e}");
            eprintln!("ckd: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(session) = &started.autopilot {
        info!(session = %session, "driving silent session");
        tokio::spawn(autopilot::drive(Arc::clone(&started.agent)));
    }

    let listener = Listener::new(started.listener, Arc::clone(&started.agent));
    match listener.local_addr() {
        Ok(addr) => println!("READY {addr}"),
        Err(_) => println!("READY"),
    }

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("cannot install SIGTERM handler: {e}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        _ = listener.run() => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        _ = sigterm.recv() => info!("terminated"),
    }

    // An in-flight job is picked up again by the next agent on resume
    info!("agent stopped");
    ExitCode::SUCCESS
}
