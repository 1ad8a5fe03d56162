// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Firehose replay.
//!
//! Reads stored records oldest first and republishes each one. A record's
//! `exchange_name` and `routing_keys` headers decide where it goes:
//!
//! - non-empty `exchange_name`: one publish to that exchange per routing key
//! - otherwise: every routing key names a queue; the queue is declared
//!   durable and the message published to it via the default exchange
//!
//! A failing record never stops the batch.

use crate::format::{decode, FormatError, MessageRecord};
use crate::store::RecordStore;
use crate::transport::{BrokerChannel, QueueOptions, TransportError, DEFAULT_EXCHANGE};
use crate::value::HeaderMap;
use std::fmt;
use thiserror::Error;

/// Header naming the exchange a traced message was published to.
pub const EXCHANGE_HEADER: &str = "exchange_name";

/// Header listing the traced message's routing keys.
pub const ROUTING_KEYS_HEADER: &str = "routing_keys";

/// Where a record is republished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDirective {
    /// Publish once per routing key to an existing exchange.
    FanoutToExchange {
        exchange: String,
        routing_keys: Vec<String>,
    },
    /// Declare each queue durable and publish to it directly.
    FanoutToQueues { queue_names: Vec<String> },
}

impl RoutingDirective {
    /// Derive the directive from normalized headers.
    ///
    /// `routing_keys` must be a non-empty list of strings in both cases.
    /// Queue names must also be non-empty: an empty name is not an
    /// addressable queue.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ReplayError> {
        let routing_keys = headers
            .get(ROUTING_KEYS_HEADER)
            .and_then(|v| v.string_list())
            .filter(|keys| !keys.is_empty())
            .ok_or(ReplayError::MissingRoutingInfo)?;

        let exchange = headers
            .get(EXCHANGE_HEADER)
            .and_then(|v| v.as_str())
            .filter(|e| !e.is_empty());

        Ok(match exchange {
            Some(exchange) => Self::FanoutToExchange {
                exchange: exchange.to_string(),
                routing_keys,
            },
            None if routing_keys.iter().any(|q| q.is_empty()) => {
                return Err(ReplayError::MissingRoutingInfo);
            }
            None => Self::FanoutToQueues {
                queue_names: routing_keys,
            },
        })
    }

    /// Number of publishes this directive issues.
    pub fn target_count(&self) -> usize {
        match self {
            Self::FanoutToExchange { routing_keys, .. } => routing_keys.len(),
            Self::FanoutToQueues { queue_names } => queue_names.len(),
        }
    }
}

impl fmt::Display for RoutingDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FanoutToExchange {
                exchange,
                routing_keys,
            } => write!(f, "exchange '{}' keys {:?}", exchange, routing_keys),
            Self::FanoutToQueues { queue_names } => write!(f, "queues {:?}", queue_names),
        }
    }
}

/// Replay errors. All of them are local to one record.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Malformed(#[from] FormatError),

    #[error("no routing_keys to deliver to")]
    MissingRoutingInfo,

    #[error("delivery to {target} failed after {delivered} publish(es): {source}")]
    Transport {
        target: String,
        delivered: usize,
        #[source]
        source: TransportError,
    },
}

/// Player configuration.
#[derive(Debug, Clone, Default)]
pub struct PlayerConfig {
    /// Route records but issue no broker calls.
    pub dry_run: bool,

    /// Remove a record once its whole fan-out succeeded.
    pub delete_after_send: bool,
}

impl PlayerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable dry run.
    pub fn dry_run(mut self, enable: bool) -> Self {
        self.dry_run = enable;
        self
    }

    /// Delete records after a complete send.
    pub fn delete_after_send(mut self, enable: bool) -> Self {
        self.delete_after_send = enable;
        self
    }
}

/// A record that could not be (fully) replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Record name.
    pub file: String,
    /// Error description.
    pub reason: String,
}

/// Playback statistics.
#[derive(Debug, Clone, Default)]
pub struct PlaybackStats {
    /// Records listed.
    pub files_total: usize,

    /// Records fully delivered.
    pub files_sent: usize,

    /// Records decoded and routed by a dry run.
    pub files_routed: usize,

    /// Records skipped or partially delivered.
    pub failures: Vec<FileFailure>,

    /// Successful publishes across all records.
    pub messages_published: u64,

    /// Records removed after sending.
    pub files_deleted: usize,
}

impl PlaybackStats {
    /// Number of failed records.
    pub fn files_failed(&self) -> usize {
        self.failures.len()
    }
}

/// Firehose replayer.
pub struct Player<S: RecordStore> {
    config: PlayerConfig,
    store: S,
    stats: PlaybackStats,
}

impl<S: RecordStore> Player<S> {
    /// Create a new player reading from `store`.
    pub fn new(config: PlayerConfig, store: S) -> Self {
        Self {
            config,
            store,
            stats: PlaybackStats::default(),
        }
    }

    /// Replay every stored record, oldest first.
    ///
    /// Only a failure to list the store is returned; per-record errors are
    /// logged and collected in the statistics.
    pub fn replay_all<C: BrokerChannel + ?Sized>(
        &mut self,
        channel: &mut C,
    ) -> Result<&PlaybackStats, std::io::Error> {
        let files = self.store.list()?;
        self.stats.files_total += files.len();

        tracing::info!("Replaying {} record(s)", files.len());

        for file in files {
            match self.replay_file(channel, &file) {
                Ok(_) if self.config.dry_run => self.stats.files_routed += 1,
                Ok(_) => {
                    self.stats.files_sent += 1;
                    if self.config.delete_after_send {
                        self.delete(&file);
                    }
                }
                Err(err) => {
                    tracing::warn!("[!] Failed to process file '{}': {}", file, err);
                    self.stats.failures.push(FileFailure {
                        file,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(&self.stats)
    }

    /// Replay a single record. Returns the number of publishes issued.
    pub fn replay_file<C: BrokerChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        file: &str,
    ) -> Result<usize, ReplayError> {
        let text = self.store.get(file)?;
        let record = decode(&text)?;
        let directive = RoutingDirective::from_headers(&record.headers)?;

        if self.config.dry_run {
            tracing::info!("[~] Would send '{}' to {}", file, directive);
            return Ok(0);
        }

        let mut delivered = 0;
        let result = dispatch(channel, &directive, &record, file, &mut delivered);
        self.stats.messages_published += delivered as u64;

        result.map(|()| delivered)
    }

    fn delete(&mut self, file: &str) {
        match self.store.remove(file) {
            Ok(()) => {
                self.stats.files_deleted += 1;
                tracing::debug!("Deleted '{}'", file);
            }
            Err(err) => tracing::warn!("[!] Failed to delete '{}': {}", file, err),
        }
    }

    /// Current statistics.
    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    /// Configuration.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Record store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

// Publishes in list order; the first failure abandons the remaining targets.
fn dispatch<C: BrokerChannel + ?Sized>(
    channel: &mut C,
    directive: &RoutingDirective,
    record: &MessageRecord,
    file: &str,
    delivered: &mut usize,
) -> Result<(), ReplayError> {
    let body = record.body.as_bytes();
    let headers = &record.headers;

    let fail = |target: String, delivered: usize, source: TransportError| {
        ReplayError::Transport {
            target,
            delivered,
            source,
        }
    };

    match directive {
        RoutingDirective::FanoutToExchange {
            exchange,
            routing_keys,
        } => {
            for key in routing_keys {
                channel
                    .publish(exchange, key, headers, body)
                    .map_err(|e| fail(format!("exchange '{}' key '{}'", exchange, key), *delivered, e))?;
                *delivered += 1;
                tracing::info!(
                    "[x] Sent message to exchange '{}' with routing key '{}' from file '{}'",
                    exchange,
                    key,
                    file
                );
            }
        }
        RoutingDirective::FanoutToQueues { queue_names } => {
            for queue in queue_names {
                let target = || format!("queue '{}'", queue);
                channel
                    .declare_queue(queue, QueueOptions::durable())
                    .map_err(|e| fail(target(), *delivered, e))?;
                channel
                    .publish(DEFAULT_EXCHANGE, queue, headers, body)
                    .map_err(|e| fail(target(), *delivered, e))?;
                *delivered += 1;
                tracing::info!("[x] Sent message to queue '{}' from file '{}'", queue, file);
            }
        }
    }

    Ok(())
}
