// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Broker transport abstraction.
//!
//! The capture and replay pipelines only need a handful of channel
//! operations. They go through [`BrokerChannel`] so the pipelines can run
//! against a real AMQP broker ([`crate::amqp::AmqpChannel`]) or against
//! [`MockChannel`] in tests.
//!
//! All calls are blocking round-trips.

use crate::value::HeaderMap;
use lapin::types::FieldTable;
use std::collections::VecDeque;
use thiserror::Error;

/// The default (nameless) exchange; routes by queue name.
pub const DEFAULT_EXCHANGE: &str = "";

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}

/// Queue declaration flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueOptions {
    /// Survive broker restart.
    pub durable: bool,
    /// Restricted to the declaring connection.
    pub exclusive: bool,
    /// Deleted when the last consumer goes away.
    pub auto_delete: bool,
}

impl QueueOptions {
    /// Durable, shared, persistent queue.
    pub fn durable() -> Self {
        Self {
            durable: true,
            exclusive: false,
            auto_delete: false,
        }
    }
}

/// A message received from a subscription.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Wire header table, if the message carried one.
    pub headers: Option<FieldTable>,
}

/// Blocking broker channel operations.
pub trait BrokerChannel {
    /// Declare a queue. Idempotent for identical options.
    fn declare_queue(&mut self, name: &str, options: QueueOptions) -> Result<(), TransportError>;

    /// Bind a queue to an exchange with a routing pattern.
    fn bind_queue(&mut self, queue: &str, exchange: &str, pattern: &str)
        -> Result<(), TransportError>;

    /// Publish a message.
    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), TransportError>;

    /// Consume a queue, invoking `on_delivery` for each message.
    ///
    /// Blocks until the channel is shut down. The callback is never
    /// re-entered.
    fn subscribe(
        &mut self,
        queue: &str,
        auto_ack: bool,
        on_delivery: &mut dyn FnMut(Delivery),
    ) -> Result<(), TransportError>;
}

/// Channel for runs that never reach a broker, such as a replay dry run.
///
/// Every operation is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineChannel;

impl OfflineChannel {
    fn reject(operation: &'static str) -> Result<(), TransportError> {
        Err(TransportError::Rejected {
            operation,
            reason: "no broker connection".into(),
        })
    }
}

impl BrokerChannel for OfflineChannel {
    fn declare_queue(&mut self, _name: &str, _options: QueueOptions) -> Result<(), TransportError> {
        Self::reject("queue.declare")
    }

    fn bind_queue(&mut self, _queue: &str, _exchange: &str, _pattern: &str) -> Result<(), TransportError> {
        Self::reject("queue.bind")
    }

    fn publish(
        &mut self,
        _exchange: &str,
        _routing_key: &str,
        _headers: &HeaderMap,
        _body: &[u8],
    ) -> Result<(), TransportError> {
        Self::reject("basic.publish")
    }

    fn subscribe(
        &mut self,
        _queue: &str,
        _auto_ack: bool,
        _on_delivery: &mut dyn FnMut(Delivery),
    ) -> Result<(), TransportError> {
        Self::reject("basic.consume")
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// A call observed by [`MockChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    DeclareQueue {
        name: String,
        options: QueueOptions,
    },
    BindQueue {
        queue: String,
        exchange: String,
        pattern: String,
    },
    Publish {
        exchange: String,
        routing_key: String,
        headers: HeaderMap,
        body: Vec<u8>,
    },
    Subscribe {
        queue: String,
        auto_ack: bool,
    },
}

/// In-memory broker channel that records every call.
#[derive(Debug, Default)]
pub struct MockChannel {
    calls: Vec<BrokerCall>,
    deliveries: VecDeque<Delivery>,
    reject_routing_key: Option<String>,
    reject_queue: Option<String>,
}

impl MockChannel {
    /// Create a new mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a delivery for the next `subscribe`.
    pub fn push_delivery(&mut self, delivery: Delivery) {
        self.deliveries.push_back(delivery);
    }

    /// Fail every publish using this routing key.
    pub fn reject_publishes_to(&mut self, routing_key: impl Into<String>) {
        self.reject_routing_key = Some(routing_key.into());
    }

    /// Fail every declaration of this queue.
    pub fn reject_declares_of(&mut self, queue: impl Into<String>) {
        self.reject_queue = Some(queue.into());
    }

    /// All calls, in order.
    pub fn calls(&self) -> &[BrokerCall] {
        &self.calls
    }

    /// Successful publishes as `(exchange, routing_key)` pairs.
    pub fn published(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BrokerCall::Publish {
                    exchange,
                    routing_key,
                    ..
                } => Some((exchange.clone(), routing_key.clone())),
                _ => None,
            })
            .collect()
    }

    /// Names of successfully declared queues, in order.
    pub fn declared_queues(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BrokerCall::DeclareQueue { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl BrokerChannel for MockChannel {
    fn declare_queue(&mut self, name: &str, options: QueueOptions) -> Result<(), TransportError> {
        if self.reject_queue.as_deref() == Some(name) {
            return Err(TransportError::Rejected {
                operation: "queue.declare",
                reason: format!("queue '{}' refused", name),
            });
        }
        self.calls.push(BrokerCall::DeclareQueue {
            name: name.to_string(),
            options,
        });
        Ok(())
    }

    fn bind_queue(
        &mut self,
        queue: &str,
        exchange: &str,
        pattern: &str,
    ) -> Result<(), TransportError> {
        self.calls.push(BrokerCall::BindQueue {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            pattern: pattern.to_string(),
        });
        Ok(())
    }

    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), TransportError> {
        if self.reject_routing_key.as_deref() == Some(routing_key) {
            return Err(TransportError::Rejected {
                operation: "basic.publish",
                reason: format!("routing key '{}' refused", routing_key),
            });
        }
        tracing::debug!("MockChannel: publish to '{}' / '{}'", exchange, routing_key);
        self.calls.push(BrokerCall::Publish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            headers: headers.clone(),
            body: body.to_vec(),
        });
        Ok(())
    }

    fn subscribe(
        &mut self,
        queue: &str,
        auto_ack: bool,
        on_delivery: &mut dyn FnMut(Delivery),
    ) -> Result<(), TransportError> {
        self.calls.push(BrokerCall::Subscribe {
            queue: queue.to_string(),
            auto_ack,
        });
        while let Some(delivery) = self.deliveries.pop_front() {
            on_delivery(delivery);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_options_durable() {
        let options = QueueOptions::durable();
        assert!(options.durable);
        assert!(!options.exclusive);
        assert!(!options.auto_delete);
    }

    #[test]
    fn test_offline_channel_rejects_everything() {
        let mut channel = OfflineChannel;
        let headers = HeaderMap::new();

        let err = channel
            .publish(DEFAULT_EXCHANGE, "jobs", &headers, b"body")
            .unwrap_err();
        assert!(err.to_string().contains("basic.publish"));
        assert!(channel.declare_queue("jobs", QueueOptions::durable()).is_err());
        assert!(channel.bind_queue("jobs", "amq.rabbitmq.trace", "#").is_err());
        assert!(channel.subscribe("jobs", true, &mut |_| {}).is_err());
    }

    #[test]
    fn test_mock_records_calls() {
        let mut channel = MockChannel::new();
        let headers = HeaderMap::new();

        channel
            .declare_queue("jobs", QueueOptions::durable())
            .expect("declare");
        channel
            .publish(DEFAULT_EXCHANGE, "jobs", &headers, b"body")
            .expect("publish");

        assert_eq!(channel.declared_queues(), vec!["jobs"]);
        assert_eq!(channel.published(), vec![(String::new(), "jobs".to_string())]);
        assert_eq!(channel.calls().len(), 2);
    }

    #[test]
    fn test_mock_rejections() {
        let mut channel = MockChannel::new();
        channel.reject_publishes_to("bad");
        channel.reject_declares_of("locked");

        let headers = HeaderMap::new();
        assert!(channel.publish("x", "bad", &headers, b"").is_err());
        assert!(channel.publish("x", "good", &headers, b"").is_ok());
        assert!(channel
            .declare_queue("locked", QueueOptions::durable())
            .is_err());

        assert_eq!(channel.published().len(), 1);
        assert!(channel.declared_queues().is_empty());
    }

    #[test]
    fn test_mock_subscribe_drains_deliveries() {
        let mut channel = MockChannel::new();
        for body in ["one", "two"] {
            channel.push_delivery(Delivery {
                body: body.as_bytes().to_vec(),
                headers: None,
            });
        }

        let mut seen = Vec::new();
        channel
            .subscribe("FireHose", true, &mut |d| seen.push(d.body))
            .expect("subscribe");

        assert_eq!(seen, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(
            channel.calls(),
            &[BrokerCall::Subscribe {
                queue: "FireHose".into(),
                auto_ack: true
            }]
        );
    }
}
