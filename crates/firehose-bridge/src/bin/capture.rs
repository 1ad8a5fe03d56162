// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! firehose-capture - Stream RabbitMQ firehose messages to disk.
//!
//! Usage:
//!   firehose-capture
//!   firehose-capture mq.internal /var/firehose
//!   RABBITMQ_HOST=mq.internal firehose-capture --queue FireHose2

use clap::Parser;
use firehose_bridge::{
    recorder::{Recorder, RecorderConfig, DEFAULT_QUEUE},
    AmqpChannel, BridgeConfig, DirectoryStore,
};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "firehose-capture")]
#[command(about = "Capture RabbitMQ firehose messages to JSON files")]
#[command(version)]
struct Args {
    /// Broker host or amqp:// URI [env: RABBITMQ_HOST, default: localhost]
    host: Option<String>,

    /// Output directory [env: RABBITMQ_DIR, default: ./firehose]
    directory: Option<PathBuf>,

    /// Capture queue bound to the trace exchange
    #[arg(long, default_value = DEFAULT_QUEUE)]
    queue: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let settings = BridgeConfig::resolve(args.host, args.directory)?;
    let store = DirectoryStore::create(&settings.directory)?;

    let config = RecorderConfig::new().queue_name(&args.queue);
    let mut recorder = Recorder::new(config, store);

    if !args.quiet {
        info!("Firehose Capture v{}", env!("CARGO_PKG_VERSION"));
        info!("Firehose must be enabled on the broker: rabbitmqctl trace_on");
        info!("Output: {}", settings.directory.display());
        info!("Queue: {}", recorder.config().queue_name);
        info!("Host: {}", settings.host);
    }

    let mut channel = AmqpChannel::connect(&settings.host)?;

    let shutdown = channel.shutdown_handle();
    ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::SeqCst);
    })?;

    recorder.start(&mut channel)?;

    if !args.quiet {
        info!("Capture started. Press Ctrl+C to stop.");
    }

    recorder.run(&mut channel)?;
    channel.close()?;

    let stats = recorder.stats();
    if !args.quiet {
        info!("Capture stopped");
        info!("  Messages: {}", stats.message_count);
        info!("  Write failures: {}", stats.write_failures);
        info!("  Bytes: {}", stats.bytes_written);
    }

    Ok(())
}
