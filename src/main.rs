//! `FormWarden` command-line entry point

use clap::Parser;

use formwarden::cli::args::{Cli, OutputFormat};
use formwarden::cli::commands;
use formwarden::error::ExitCode;
use formwarden::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = match cli.log_format {
            OutputFormat::Human => LogFormat::Human,
            OutputFormat::Json => LogFormat::Json,
        };
        init_logging(format, cli.verbose, cli.color);
    }

    // A second signal forces exit; the first lets running sessions end cleanly.
    tokio::spawn(async {
        wait_for_shutdown().await;
        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
        let code = wait_for_shutdown().await;
        std::process::exit(code);
    });

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Waits for Ctrl+C or SIGTERM and returns the matching exit code.
#[cfg(unix)]
async fn wait_for_shutdown() -> i32 {
    use tokio::signal::unix::{SignalKind, signal};

    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return ExitCode::INTERRUPTED;
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
        _ = sigterm.recv() => ExitCode::TERMINATED,
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> i32 {
    let _ = tokio::signal::ctrl_c().await;
    ExitCode::INTERRUPTED
}
