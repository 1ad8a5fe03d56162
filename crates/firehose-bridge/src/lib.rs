// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Firehose Bridge
//!
//! Capture RabbitMQ firehose traffic to JSON record files and replay those
//! records back into a broker as live publishes.
//!
//! # Quick Start
//!
//! ```bash
//! # Enable tracing on the broker first
//! rabbitmqctl trace_on
//!
//! # Capture everything to ./firehose
//! firehose-capture localhost ./firehose
//!
//! # Replay the captured records (oldest first)
//! firehose-replay localhost ./firehose
//!
//! # Show where each record would go, without publishing
//! firehose-replay localhost ./firehose --dry-run
//! ```
//!
//! # Routing on Replay
//!
//! | `exchange_name` | Action per `routing_keys` entry |
//! |-----------------|----------------------------------|
//! | non-empty | publish to that exchange with the key |
//! | absent / empty | declare queue `key` durable, publish to it |

pub mod amqp;
pub mod config;
pub mod format;
pub mod player;
pub mod recorder;
pub mod store;
pub mod transport;
pub mod value;

pub use amqp::AmqpChannel;
pub use config::BridgeConfig;
pub use format::{decode, encode, FormatError, MessageRecord};
pub use player::{PlaybackStats, Player, PlayerConfig, ReplayError, RoutingDirective};
pub use recorder::{FileCounter, Recorder, RecorderConfig, RecorderError};
pub use store::{DirectoryStore, MemoryStore, RecordStore};
pub use transport::{
    BrokerChannel, Delivery, MockChannel, OfflineChannel, QueueOptions, TransportError,
};
pub use value::{normalize, HeaderMap, Normalize, NormalizedValue};
