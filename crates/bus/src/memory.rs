//! In-memory message bus.
//!
//! Channels are partitioned by a hash of the routing key. Each partition is
//! an ordered queue drained by its own delivery worker, so envelopes sharing
//! a key are handled in publish order while envelopes on different partitions
//! interleave freely. Delivery is at-least-once: a retryable handler failure
//! redelivers the same envelope after the policy backoff until the attempt
//! bound is reached.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::dead_letter::{DeadLetter, DeadLetterStore};
use crate::envelope::Envelope;
use crate::error::BusError;
use crate::gateway::{MessageBus, MessageHandler};
use crate::retry::{DeliveryOutcome, RetryPolicy};

const DEFAULT_PARTITIONS: usize = 8;

/// In-memory bus used by the services and their tests.
#[derive(Clone)]
pub struct InMemoryMessageBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    partitions: usize,
    retry_policy: RetryPolicy,
    channels: Mutex<HashMap<String, ChannelState>>,
    dead_letters: DeadLetterStore,
    in_flight: AtomicUsize,
}

struct ChannelState {
    senders: Vec<mpsc::UnboundedSender<Envelope>>,
    // Receivers parked here until a subscriber claims them; publishes made
    // before subscription are buffered in the queues.
    pending: Vec<mpsc::UnboundedReceiver<Envelope>>,
    subscribed: bool,
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageBus {
    /// Creates a bus with the default partition count and retry policy.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_PARTITIONS, RetryPolicy::default())
    }

    /// Creates a bus with an explicit partition count and retry policy.
    pub fn with_config(partitions: usize, retry_policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(BusInner {
                partitions: partitions.max(1),
                retry_policy,
                channels: Mutex::new(HashMap::new()),
                dead_letters: DeadLetterStore::new(),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the dead-letter store.
    pub fn dead_letters(&self) -> DeadLetterStore {
        self.inner.dead_letters.clone()
    }

    /// Number of deliveries published but not yet resolved (including ones
    /// waiting out a retry backoff).
    pub fn pending_deliveries(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until every published envelope has reached a terminal delivery
    /// state, or the timeout elapses. Returns true if the bus went idle.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.pending_deliveries() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn partition_for(&self, routing_key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        routing_key.hash(&mut hasher);
        (hasher.finish() as usize) % self.inner.partitions
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, channel: &str, envelope: Envelope) -> Result<(), BusError> {
        let partition = self.partition_for(&envelope.routing_key);

        let mut channels = self.inner.channels.lock().unwrap();
        let state = channels
            .entry(channel.to_string())
            .or_insert_with(|| new_channel_state(self.inner.partitions));

        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        if state.senders[partition].send(envelope).is_err() {
            self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(BusError::ChannelClosed(channel.to_string()));
        }

        metrics::counter!("bus_messages_published_total").increment(1);
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        let receivers = {
            let mut channels = self.inner.channels.lock().unwrap();
            let state = channels
                .entry(channel.to_string())
                .or_insert_with(|| new_channel_state(self.inner.partitions));

            if state.subscribed {
                return Err(BusError::AlreadySubscribed(channel.to_string()));
            }
            state.subscribed = true;
            std::mem::take(&mut state.pending)
        };

        for mut receiver in receivers {
            let handler = Arc::clone(&handler);
            let channel = channel.to_string();
            let inner = Arc::clone(&self.inner);

            tokio::spawn(async move {
                while let Some(envelope) = receiver.recv().await {
                    let outcome =
                        deliver(handler.as_ref(), &channel, &envelope, inner.retry_policy).await;
                    if let DeliveryOutcome::DeadLettered { attempts, reason } = outcome {
                        inner.dead_letters.push(DeadLetter {
                            channel: channel.clone(),
                            envelope,
                            reason,
                            attempts,
                        });
                    }
                    inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }

        Ok(())
    }
}

fn new_channel_state(partitions: usize) -> ChannelState {
    let mut senders = Vec::with_capacity(partitions);
    let mut pending = Vec::with_capacity(partitions);
    for _ in 0..partitions {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.push(tx);
        pending.push(rx);
    }
    ChannelState {
        senders,
        pending,
        subscribed: false,
    }
}

/// Runs one envelope through the delivery state machine:
/// delivered -> handling -> succeeded | retry-scheduled | dead-lettered.
async fn deliver(
    handler: &dyn MessageHandler,
    channel: &str,
    envelope: &Envelope,
    policy: RetryPolicy,
) -> DeliveryOutcome {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match handler.handle(channel, envelope).await {
            Ok(()) => return DeliveryOutcome::Succeeded { attempts: attempt },
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                metrics::counter!("bus_deliveries_retried_total").increment(1);
                tracing::warn!(
                    channel,
                    message_type = %envelope.message_type,
                    attempt,
                    error = %err,
                    "delivery failed, retry scheduled"
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(err) => {
                return DeliveryOutcome::DeadLettered {
                    attempts: attempt,
                    reason: err.to_string(),
                };
            }
        }
    }
}
