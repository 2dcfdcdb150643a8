// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - resilient outbound message delivery over a session transport.
//!
//! This is the binary entry point. The delivery layer itself lives in
//! `courier-delivery`; a deployment wires a concrete transport adapter into
//! it and runs the supervisor from here.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Courier - resilient outbound message delivery.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the delivery service.
    Serve,
    /// Show the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match courier_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        service = config.service.name.as_str(),
        session = config.transport.session_name.as_str(),
        "configuration loaded"
    );

    match cli.command {
        Some(Commands::Serve) => {
            // The open-source tree ships no transport adapter; deployments
            // link one in and hand its event channel to the supervisor.
            eprintln!("courier serve: no transport adapter is compiled into this build");
            std::process::exit(1);
        }
        Some(Commands::Config) => {
            println!("[service] name={} log_level={}", config.service.name, config.service.log_level);
            println!(
                "[transport] session={} pairing_retry_limit={} max_reconnect_attempts={} restart_base_delay_ms={}",
                config.transport.session_name,
                config.transport.pairing_retry_limit,
                config.transport.max_reconnect_attempts,
                config.transport.restart_base_delay_ms,
            );
            println!(
                "[delivery] max_message_length={} max_retries={} retry_delay_ms={} queue_stale_after_ms={}",
                config.delivery.max_message_length,
                config.delivery.max_retries,
                config.delivery.retry_delay_ms,
                config.delivery.queue_stale_after_ms,
            );
            println!(
                "[media] max_file_size={} supported_formats={}",
                config.media.max_file_size,
                config.media.supported_formats.join(",")
            );
            println!(
                "[rate_limit] enabled={} per_recipient={} window_ms={}",
                config.rate_limit.enabled,
                config.rate_limit.per_recipient,
                config.rate_limit.window_ms,
            );
        }
        None => {
            println!("courier: use --help for available commands");
        }
    }
}
