// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sequence tracking and gap recovery.
//!
//! Publish responses are evaluated on the processing queue against a
//! per-subscription cursor holding the last sequence number consumed:
//!
//! ```text
//!  seq <= expected ──▶ accept: advance cursor, queue acks, deliver
//!
//!  seq >  expected ──▶ pause processing + delivery
//!                      push response back to head of processing
//!                      Republish expected ..= seq-1  ──fail──▶ Read every item
//!                      cursor = seq-1                          │
//!                      resume ◀────────────────────────────────┘
//! ```
//!
//! A keep-alive carries the sequence number the next data message will use,
//! so accepting one leaves the cursor at `seq - 1`.
//!
//! After shutdown a running recovery issues no further
//! Republish or Read requests; it drops its pause guards and leaves the
//! cursor untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::client::{AttributeStore, SessionClient};
use crate::error::{SequenceError, SubscriptionError, UaError, UaResult};
use crate::execution_queue::{ExecutionQueue, PauseGuard};
use crate::messages::{NotificationMessage, PublishResponse, SubscriptionAcknowledgement};
use crate::types::StatusCode;

use super::dispatch::Dispatcher;
use super::manager::SubscriptionManagerStats;
use super::publish::PendingAcknowledgements;
use super::registry::SubscriptionRegistry;

const HALF_RANGE: u32 = u32::MAX / 2;

// =============================================================================
// Sequence arithmetic
// =============================================================================

/// Sequence number following `sequence_number`. After `u32::MAX` comes 1; 0
/// is never used.
pub fn next_sequence_number(sequence_number: u32) -> u32 {
    if sequence_number == u32::MAX {
        1
    } else {
        sequence_number + 1
    }
}

/// Sequence number preceding `sequence_number`, the inverse of
/// [`next_sequence_number`].
pub fn previous_sequence_number(sequence_number: u32) -> u32 {
    if sequence_number <= 1 {
        u32::MAX
    } else {
        sequence_number - 1
    }
}

/// Returns `true` if `s1` comes after `s2`, allowing for wraparound.
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= HALF_RANGE)) || ((s1 < s2) && (s2 - s1 > HALF_RANGE))
}

/// Outcome of evaluating a sequence number against a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Accept,
    Gap { expected: u32 },
}

/// Evaluates `sequence_number` against the last consumed number.
pub(crate) fn evaluate(cursor: Option<u32>, sequence_number: u32) -> Verdict {
    let Some(last) = cursor else {
        return Verdict::Accept;
    };

    let expected = next_sequence_number(last);
    if sequence_number != expected && sequence_greater_than(sequence_number, expected) {
        Verdict::Gap { expected }
    } else {
        Verdict::Accept
    }
}

// =============================================================================
// SequenceCursors
// =============================================================================

/// Last consumed sequence number per subscription.
#[derive(Debug, Default)]
pub(crate) struct SequenceCursors {
    cursors: Mutex<HashMap<u32, u32>>,
}

impl SequenceCursors {
    pub(crate) fn get(&self, subscription_id: u32) -> Option<u32> {
        self.cursors.lock().get(&subscription_id).copied()
    }

    pub(crate) fn set(&self, subscription_id: u32, last: u32) {
        self.cursors.lock().insert(subscription_id, last);
    }

    /// Moves the cursor to `candidate` unless it is already past it.
    pub(crate) fn advance(&self, subscription_id: u32, candidate: u32) {
        let mut cursors = self.cursors.lock();
        match cursors.get_mut(&subscription_id) {
            Some(last) if !sequence_greater_than(candidate, *last) => {}
            Some(last) => *last = candidate,
            None => {
                cursors.insert(subscription_id, candidate);
            }
        }
    }

    pub(crate) fn remove(&self, subscription_id: u32) {
        self.cursors.lock().remove(&subscription_id);
    }
}

// =============================================================================
// Sequencer
// =============================================================================

struct RecoveryGuards {
    _processing: PauseGuard,
    _delivery: PauseGuard,
}

/// Validates publish responses and recovers from sequence gaps.
pub(crate) struct Sequencer {
    client: Arc<SessionClient>,
    store: Arc<dyn AttributeStore>,
    registry: Arc<SubscriptionRegistry>,
    acknowledgements: Arc<PendingAcknowledgements>,
    processing: Arc<ExecutionQueue>,
    delivery: Arc<ExecutionQueue>,
    dispatcher: Arc<Dispatcher>,
    cursors: SequenceCursors,
    shut_down: AtomicBool,
    stats: Arc<SubscriptionManagerStats>,
}

impl Sequencer {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        client: Arc<SessionClient>,
        store: Arc<dyn AttributeStore>,
        registry: Arc<SubscriptionRegistry>,
        acknowledgements: Arc<PendingAcknowledgements>,
        processing: Arc<ExecutionQueue>,
        delivery: Arc<ExecutionQueue>,
        dispatcher: Arc<Dispatcher>,
        stats: Arc<SubscriptionManagerStats>,
    ) -> Self {
        Self {
            client,
            store,
            registry,
            acknowledgements,
            processing,
            delivery,
            dispatcher,
            cursors: SequenceCursors::default(),
            shut_down: AtomicBool::new(false),
            stats,
        }
    }

    /// Last consumed sequence number of `subscription_id`.
    pub(crate) fn cursor(&self, subscription_id: u32) -> Option<u32> {
        self.cursors.get(subscription_id)
    }

    /// Stops recoveries from issuing further requests.
    pub(crate) fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    fn ensure_running(&self) -> UaResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(UaError::subscription(SubscriptionError::ManagerShutdown))
        } else {
            Ok(())
        }
    }

    /// Drops the cursor of a deleted subscription.
    pub(crate) fn forget(&self, subscription_id: u32) {
        self.cursors.remove(subscription_id);
    }

    /// Evaluates one publish response. Runs on the processing queue.
    pub(crate) fn process(self: &Arc<Self>, response: PublishResponse) {
        let subscription_id = response.subscription_id;
        let sequence_number = response.notification_message.sequence_number;

        if !self.registry.contains(subscription_id) {
            debug!(
                subscription_id,
                sequence_number, "Publish response for unknown subscription dropped"
            );
            return;
        }

        match evaluate(self.cursors.get(subscription_id), sequence_number) {
            Verdict::Accept => self.accept(response),
            Verdict::Gap { expected } => self.begin_recovery(response, expected),
        }
    }

    fn accept(&self, response: PublishResponse) {
        let PublishResponse {
            subscription_id,
            available_sequence_numbers,
            notification_message,
            results,
            ..
        } = response;
        let sequence_number = notification_message.sequence_number;

        let consumed = if notification_message.is_keep_alive() {
            previous_sequence_number(sequence_number)
        } else {
            sequence_number
        };
        self.cursors.advance(subscription_id, consumed);

        log_acknowledgement_results(&results);

        self.acknowledgements.extend(
            available_sequence_numbers
                .iter()
                .map(|&available| SubscriptionAcknowledgement::new(subscription_id, available)),
        );

        self.deliver(subscription_id, notification_message);
    }

    fn deliver(&self, subscription_id: u32, message: NotificationMessage) {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.delivery
            .submit(move || dispatcher.dispatch(subscription_id, &message));
    }

    fn begin_recovery(self: &Arc<Self>, response: PublishResponse, expected: u32) {
        let subscription_id = response.subscription_id;
        let received = response.notification_message.sequence_number;

        warn!(
            subscription_id,
            expected, received, "Sequence gap detected, calling Republish"
        );
        self.stats.record_gap();

        let guards = RecoveryGuards {
            _processing: self.processing.pause_guard(),
            _delivery: self.delivery.pause_guard(),
        };

        let requeued = Arc::clone(self);
        self.processing
            .submit_to_head(move || requeued.process(response));

        let sequencer = Arc::clone(self);
        tokio::spawn(async move {
            sequencer.recover(subscription_id, expected, received).await;
            drop(guards);
        });
    }

    async fn recover(&self, subscription_id: u32, expected: u32, received: u32) {
        match self.republish_range(subscription_id, expected, received).await {
            Ok(count) => info!(subscription_id, count, "Missing notifications republished"),
            Err(_) if self.ensure_running().is_err() => {
                debug!(subscription_id, "Recovery abandoned after shutdown");
                return;
            }
            Err(e) => {
                e.log("Republish");
                warn!(subscription_id, "Republish failed, reading current values");
                self.stats.record_recovery_fallback();
                self.read_current_values(subscription_id).await;
            }
        }

        if self.ensure_running().is_ok() && self.registry.contains(subscription_id) {
            self.cursors
                .set(subscription_id, previous_sequence_number(received));
        }
    }

    /// Republishes `from` up to but excluding `to`, one at a time.
    async fn republish_range(&self, subscription_id: u32, from: u32, to: u32) -> UaResult<u32> {
        let mut sequence_number = from;
        let mut count = 0;

        while sequence_number != to {
            self.ensure_running()?;
            let response = self
                .client
                .republish(subscription_id, sequence_number)
                .await?;

            let message = response.notification_message;
            if message.sequence_number != sequence_number {
                return Err(UaError::sequence(SequenceError::mismatch(
                    subscription_id,
                    sequence_number,
                    message.sequence_number,
                )));
            }

            self.stats.record_republished();
            self.deliver(subscription_id, message);

            sequence_number = next_sequence_number(sequence_number);
            count += 1;
        }

        Ok(count)
    }

    /// Reads every value item of the subscription and queues the values for
    /// delivery. Event items have no current value to read.
    async fn read_current_values(&self, subscription_id: u32) {
        let Some(subscription) = self.registry.get(subscription_id) else {
            return;
        };

        for item in subscription.items() {
            if item.is_event_item() {
                continue;
            }
            if self.ensure_running().is_err() {
                debug!(subscription_id, "Fallback reads abandoned after shutdown");
                return;
            }
            self.stats.record_fallback_read();
            match self.store.read_value(item.read_value_id().clone()).await {
                Ok(value) => {
                    self.delivery.submit(move || item.deliver_value(value));
                }
                Err(e) => {
                    e.log("Read");
                    debug!(
                        subscription_id,
                        client_handle = item.client_handle(),
                        "Item keeps its last value"
                    );
                }
            }
        }
    }
}

fn log_acknowledgement_results(results: &[StatusCode]) {
    for (index, status) in results.iter().enumerate() {
        if status.is_bad() {
            debug!(index, status = %status, "Acknowledgement rejected by server");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
