//! Settlement gateway trait and in-memory implementation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{Money, PaymentId};

use crate::error::SettlementError;

/// One outbound call to the external settlement processor.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Settles the given amount, returning the processor's payment id.
    async fn settle(&self, amount: Money) -> Result<PaymentId, SettlementError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    scripted: VecDeque<Result<PaymentId, SettlementError>>,
    settled: Vec<Money>,
}

/// In-memory gateway for tests and local runs.
///
/// Outcomes can be scripted in advance; once the script is exhausted every
/// call settles with a fresh payment id.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettlementGateway {
    state: Arc<Mutex<InMemoryGatewayState>>,
}

impl InMemorySettlementGateway {
    /// Creates a gateway that settles every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outcome for a future `settle` call.
    pub fn enqueue(&self, outcome: Result<PaymentId, SettlementError>) {
        self.state.lock().unwrap().scripted.push_back(outcome);
    }

    /// Queues `count` retryable failures.
    pub fn enqueue_retryable_failures(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            state
                .scripted
                .push_back(Err(SettlementError::Unreachable(
                    "connection refused".to_string(),
                )));
        }
    }

    /// Queues a permanent rejection.
    pub fn enqueue_rejection(&self, reason: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .scripted
            .push_back(Err(SettlementError::Rejected(reason.into())));
    }

    /// Number of amounts actually settled.
    pub fn settled_count(&self) -> usize {
        self.state.lock().unwrap().settled.len()
    }

    /// Amounts settled, in call order.
    pub fn settled_amounts(&self) -> Vec<Money> {
        self.state.lock().unwrap().settled.clone()
    }
}

#[async_trait]
impl SettlementGateway for InMemorySettlementGateway {
    async fn settle(&self, amount: Money) -> Result<PaymentId, SettlementError> {
        let mut state = self.state.lock().unwrap();
        match state.scripted.pop_front() {
            Some(Err(err)) => Err(err),
            Some(Ok(payment_id)) => {
                state.settled.push(amount);
                Ok(payment_id)
            }
            None => {
                state.settled.push(amount);
                Ok(PaymentId::new())
            }
        }
    }
}
