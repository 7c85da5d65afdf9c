// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ck: run certification sessions locally or drive them on a remote agent

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backoff;
mod client;
mod color;
mod commands;
mod controller;
mod env;
mod exit_error;
mod output;
mod prompt;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{control, run, session};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "ck", version, about = "Hardware certification sessions", styles = color::styles())]
struct Cli {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a new session on this machine
    Run(run::RunArgs),
    /// Resume a session stored on this machine
    Resume {
        /// Session ID
        id: String,
    },
    /// List resumable sessions stored on this machine
    List,
    /// Delete sessions stored on this machine
    Delete {
        /// Session IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Drive a session on a remote agent
    Control(control::ControlArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_new(env::log_directives()).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let format = cli.output;
    let result = match cli.command {
        Command::Run(args) => run::handle(args, format).await,
        Command::Resume { id } => run::resume(id, format).await,
        Command::List => session::list(format),
        Command::Delete { ids } => session::delete(ids),
        Command::Control(args) => control::handle(args, format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                eprintln!("ck: {exit}");
                ExitCode::from(u8::try_from(exit.code).unwrap_or(1))
            }
            None => {
                eprintln!("ck: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
