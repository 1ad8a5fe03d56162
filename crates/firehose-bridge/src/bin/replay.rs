// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! firehose-replay - Republish captured firehose records.
//!
//! Usage:
//!   firehose-replay
//!   firehose-replay mq.internal /var/firehose
//!   firehose-replay --dry-run
//!   firehose-replay --delete

use clap::Parser;
use firehose_bridge::{
    player::{Player, PlayerConfig},
    AmqpChannel, BridgeConfig, DirectoryStore, OfflineChannel,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "firehose-replay")]
#[command(about = "Replay captured firehose records into RabbitMQ")]
#[command(version)]
struct Args {
    /// Broker host or amqp:// URI [env: RABBITMQ_HOST, default: localhost]
    host: Option<String>,

    /// Input directory [env: RABBITMQ_DIR, default: ./firehose]
    directory: Option<PathBuf>,

    /// Dry run (don't connect or publish, just route)
    #[arg(long)]
    dry_run: bool,

    /// Delete each record once it has been fully sent
    #[arg(long)]
    delete: bool,

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

    let config = PlayerConfig::new()
        .dry_run(args.dry_run)
        .delete_after_send(args.delete);
    let mut player = Player::new(config, store);

    if !args.quiet {
        info!("Firehose Replay v{}", env!("CARGO_PKG_VERSION"));
        info!("Input: {}", settings.directory.display());
        info!("Host: {}", settings.host);
        if args.dry_run {
            info!("Dry run: nothing will be published");
        }
    }

    if args.dry_run {
        player.replay_all(&mut OfflineChannel)?;
    } else {
        let mut channel = AmqpChannel::connect(&settings.host)?;
        player.replay_all(&mut channel)?;
        channel.close()?;
    }

    let stats = player.stats();
    if !args.quiet {
        info!("Message sending complete.");
        info!("  Records: {}", stats.files_total);
        if args.dry_run {
            info!("  Routed: {}", stats.files_routed);
        } else {
            info!("  Sent: {}", stats.files_sent);
        }
        info!("  Failed: {}", stats.files_failed());
        info!("  Publishes: {}", stats.messages_published);
        if args.delete {
            info!("  Deleted: {}", stats.files_deleted);
        }
    }
    for failure in &stats.failures {
        warn!("  {}: {}", failure.file, failure.reason);
    }

    Ok(())
}
