// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Firehose recorder.
//!
//! Subscribes to a queue bound to the broker's trace exchange and writes
//! every delivery to its own record file.

use crate::format::{encode, record_filename, FormatError, MessageRecord};
use crate::store::RecordStore;
use crate::transport::{BrokerChannel, Delivery, QueueOptions, TransportError};
use crate::value::normalize_headers;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use thiserror::Error;

/// RabbitMQ firehose exchange.
pub const TRACE_EXCHANGE: &str = "amq.rabbitmq.trace";

/// Default capture queue.
pub const DEFAULT_QUEUE: &str = "FireHose";

/// Topic pattern matching every routing key.
pub const CATCH_ALL_PATTERN: &str = "#";

/// Number of distinct filename suffixes.
pub const COUNTER_MODULUS: u8 = 100;

/// Recorder configuration.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Queue the trace exchange is bound to.
    pub queue_name: String,

    /// Exchange mirroring broker traffic.
    pub trace_exchange: String,

    /// Binding pattern.
    pub binding_pattern: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE.to_string(),
            trace_exchange: TRACE_EXCHANGE.to_string(),
            binding_pattern: CATCH_ALL_PATTERN.to_string(),
        }
    }
}

impl RecorderConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set capture queue name.
    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }

    /// Set trace exchange.
    pub fn trace_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.trace_exchange = exchange.into();
        self
    }
}

/// Recorder errors.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),
}

/// Cycling filename suffix in `[0, 100)`.
///
/// Disambiguates records captured within the same millisecond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCounter(u8);

impl FileCounter {
    /// Current value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Move to the next value, wrapping at 100.
    pub fn advance(&mut self) {
        self.0 = (self.0 + 1) % COUNTER_MODULUS;
    }
}

/// Recording statistics.
#[derive(Debug, Clone, Default)]
pub struct RecordingStats {
    /// Records written.
    pub message_count: u64,

    /// Deliveries lost to write failures.
    pub write_failures: u64,

    /// Total bytes written.
    pub bytes_written: u64,
}

/// Firehose recorder.
pub struct Recorder<S: RecordStore> {
    config: RecorderConfig,
    store: S,
    counter: FileCounter,
    stats: RecordingStats,
}

impl<S: RecordStore> Recorder<S> {
    /// Create a new recorder writing into `store`.
    pub fn new(config: RecorderConfig, store: S) -> Self {
        Self {
            config,
            store,
            counter: FileCounter::default(),
            stats: RecordingStats::default(),
        }
    }

    /// Declare the capture queue and bind it to the trace exchange.
    pub fn start<C: BrokerChannel + ?Sized>(&self, channel: &mut C) -> Result<(), TransportError> {
        channel.declare_queue(&self.config.queue_name, QueueOptions::durable())?;
        channel.bind_queue(
            &self.config.queue_name,
            &self.config.trace_exchange,
            &self.config.binding_pattern,
        )?;

        tracing::info!(
            "Queue '{}' bound to '{}' with pattern '{}'",
            self.config.queue_name,
            self.config.trace_exchange,
            self.config.binding_pattern
        );
        Ok(())
    }

    /// Consume the capture queue until the channel shuts down.
    ///
    /// Deliveries are auto-acknowledged, so a failed write loses that
    /// message.
    pub fn run<C: BrokerChannel + ?Sized>(&mut self, channel: &mut C) -> Result<(), TransportError> {
        let queue = self.config.queue_name.clone();
        channel.subscribe(&queue, true, &mut |delivery| self.on_delivery(delivery))
    }

    /// Handle one delivery. Write failures are logged and absorbed.
    pub fn on_delivery(&mut self, delivery: Delivery) {
        if let Err(err) = self.record(&delivery) {
            self.stats.write_failures += 1;
            tracing::warn!("[!] Failed to save message: {}", err);
        }
    }

    /// Write one delivery stamped with the current local time.
    ///
    /// Returns the record filename.
    pub fn record(&mut self, delivery: &Delivery) -> Result<String, RecorderError> {
        self.record_at(delivery, &Local::now())
    }

    /// Write one delivery stamped with `at`.
    pub fn record_at<Tz>(&mut self, delivery: &Delivery, at: &DateTime<Tz>) -> Result<String, RecorderError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let body = String::from_utf8_lossy(&delivery.body);
        let headers = normalize_headers(delivery.headers.as_ref());
        let record = MessageRecord::new(at, body, headers);

        let filename = record_filename(at, self.counter.value());
        let text = encode(&record)?;

        if let Err(err) = self.store.put(&filename, &text) {
            return Err(std::io::Error::new(err.kind(), format!("{}: {}", filename, err)).into());
        }

        self.counter.advance();
        self.stats.message_count += 1;
        self.stats.bytes_written += text.len() as u64;

        tracing::info!("[x] Received and saved message to {}", filename);
        Ok(filename)
    }

    /// Current statistics.
    pub fn stats(&self) -> &RecordingStats {
        &self.stats
    }

    /// Current filename counter.
    pub fn counter(&self) -> FileCounter {
        self.counter
    }

    /// Configuration.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Record store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
