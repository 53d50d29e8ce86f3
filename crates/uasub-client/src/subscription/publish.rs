// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Publish loop.
//!
//! Keeps up to `pipeline_depth × subscriptions` Publish requests outstanding
//! so the server always holds a request it can answer. Every completion
//! decrements the in-flight count and re-arms the loop.
//!
//! ```text
//!  maybe_send_publish ──▶ in_flight + 1 > max_pending? ──yes──▶ undo, stop
//!          ▲                        │ no
//!          │                        ▼
//!          │              drain acknowledgements
//!          │              Publish(acks)  [spawned]
//!          │                        │
//!          │        ┌───────ok──────┴──────err──────┐
//!          │        ▼                               ▼
//!          │  processing queue              drop acks, backoff
//!          └────────┴───────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::client::SessionClient;
use crate::error::{SubscriptionError, UaError};
use crate::execution_queue::ExecutionQueue;
use crate::messages::SubscriptionAcknowledgement;
use crate::types::StatusCode;

use super::manager::SubscriptionManagerStats;
use super::registry::SubscriptionRegistry;
use super::sequencing::Sequencer;

/// Margin applied to the longest expected keep-alive wait.
const TIMEOUT_HINT_MARGIN: f64 = 1.25;

// =============================================================================
// PendingAcknowledgements
// =============================================================================

/// Acknowledgements waiting to ride on the next Publish request.
#[derive(Debug, Default)]
pub(crate) struct PendingAcknowledgements {
    pending: Mutex<BTreeSet<SubscriptionAcknowledgement>>,
}

impl PendingAcknowledgements {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend<I>(&self, acknowledgements: I)
    where
        I: IntoIterator<Item = SubscriptionAcknowledgement>,
    {
        self.pending.lock().extend(acknowledgements);
    }

    /// Takes every pending acknowledgement, leaving the set empty.
    pub(crate) fn drain(&self) -> Vec<SubscriptionAcknowledgement> {
        std::mem::take(&mut *self.pending.lock())
            .into_iter()
            .collect()
    }

    /// Drops the acknowledgements of a deleted subscription.
    pub(crate) fn discard_subscription(&self, subscription_id: u32) {
        self.pending
            .lock()
            .retain(|ack| ack.subscription_id != subscription_id);
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

// =============================================================================
// Publisher
// =============================================================================

pub(crate) struct Publisher {
    client: Arc<SessionClient>,
    registry: Arc<SubscriptionRegistry>,
    sequencer: Arc<Sequencer>,
    processing: Arc<ExecutionQueue>,
    acknowledgements: Arc<PendingAcknowledgements>,
    stats: Arc<SubscriptionManagerStats>,
    in_flight: AtomicUsize,
    pipeline_depth: usize,
    failure_backoff: Duration,
    shutdown: watch::Sender<bool>,
}

impl Publisher {
    pub(crate) fn new(
        client: Arc<SessionClient>,
        registry: Arc<SubscriptionRegistry>,
        sequencer: Arc<Sequencer>,
        processing: Arc<ExecutionQueue>,
        acknowledgements: Arc<PendingAcknowledgements>,
        stats: Arc<SubscriptionManagerStats>,
    ) -> Self {
        let config = client.config();
        let pipeline_depth = config.publish_pipeline_depth as usize;
        let failure_backoff = config.publish_failure_backoff;
        let (shutdown, _) = watch::channel(false);

        Self {
            client,
            registry,
            sequencer,
            processing,
            acknowledgements,
            stats,
            in_flight: AtomicUsize::new(0),
            pipeline_depth,
            failure_backoff,
            shutdown,
        }
    }

    /// Publish requests currently outstanding.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Upper bound on outstanding Publish requests.
    pub(crate) fn max_pending(&self) -> usize {
        self.pipeline_depth * self.registry.len()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stops re-arming and fails outstanding requests.
    pub(crate) fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Arms Publish requests until the pipeline is full.
    pub(crate) fn maybe_send_publish(self: &Arc<Self>) {
        while !self.is_shut_down() {
            let max_pending = self.max_pending();
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            if in_flight > max_pending {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                trace!(in_flight = in_flight - 1, max_pending, "Publish pipeline full");
                return;
            }

            let acknowledgements = self.acknowledgements.drain();
            let timeout_hint = self.timeout_hint(max_pending);

            let publisher = Arc::clone(self);
            tokio::spawn(async move {
                publisher.publish(acknowledgements, timeout_hint).await;
            });
        }
    }

    /// `max_pending × shortest keep-alive period × 1.25`, or the request
    /// timeout without subscriptions.
    fn timeout_hint(&self, max_pending: usize) -> Duration {
        match self.registry.min_keep_alive_period_ms() {
            Some(period_ms) if max_pending > 0 => {
                let hint_ms = max_pending as f64 * period_ms * TIMEOUT_HINT_MARGIN;
                Duration::try_from_secs_f64(hint_ms / 1000.0)
                    .unwrap_or(self.client.config().request_timeout)
            }
            _ => self.client.config().request_timeout,
        }
    }

    async fn publish(
        self: Arc<Self>,
        acknowledgements: Vec<SubscriptionAcknowledgement>,
        timeout_hint: Duration,
    ) {
        let acknowledged = acknowledgements.len();
        self.stats.record_publish_request(acknowledged);
        debug!(
            acknowledgements = acknowledged,
            timeout_hint_ms = timeout_hint.as_millis() as u64,
            "Publish"
        );

        let mut shutdown = self.shutdown.subscribe();
        let result = tokio::select! {
            result = self.client.publish(acknowledgements, timeout_hint) => result,
            _ = wait_for_shutdown(&mut shutdown) => {
                Err(UaError::subscription(SubscriptionError::ManagerShutdown))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.stats.record_publish_response();
                trace!(
                    subscription_id = response.subscription_id,
                    sequence_number = response.notification_message.sequence_number,
                    "Publish response"
                );
                let sequencer = Arc::clone(&self.sequencer);
                self.processing.submit(move || sequencer.process(response));
                self.maybe_send_publish();
            }
            Err(e) => {
                self.stats.record_publish_failure(acknowledged);
                if acknowledged > 0 {
                    debug!(count = acknowledged, "Acknowledgements of failed Publish dropped");
                }

                if self.is_shut_down() {
                    return;
                }

                // The server answers one of the outstanding requests instead.
                if e.status_code() == StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS
                    && self.in_flight() > 0
                {
                    debug!(in_flight = self.in_flight(), "Server publish queue full");
                    return;
                }

                e.log("Publish");
                self.backoff().await;
                self.maybe_send_publish();
            }
        }
    }

    async fn backoff(&self) {
        if self.failure_backoff.is_zero() {
            return;
        }

        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(self.failure_backoff) => {}
            _ = wait_for_shutdown(&mut shutdown) => {}
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}
