// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A scriptable in-memory server behind [`UaTransport`], plus recording
//! observers.
//!
//! ## Design Principles
//!
//! - Publish requests are parked until the test answers them
//! - Every request is recorded for verification
//! - Error injection per service

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

use uasub_client::messages::{
    ActivateSessionResponse, CloseSessionResponse, CreateMonitoredItemsResponse,
    CreateSessionResponse, CreateSubscriptionResponse, DeleteMonitoredItemsResponse,
    DeleteSubscriptionsResponse, ModifySubscriptionResponse, MonitoredItemCreateResult,
    NotificationMessage, PublishRequest, PublishResponse, ReadResponse, RepublishResponse,
    RequestMessage, ResponseHeader, ResponseMessage, SetPublishingModeResponse,
    SubscriptionAcknowledgement, WriteResponse,
};
use uasub_client::{
    DataValue, EndpointDescription, NodeId, SecurityPolicy, StatusCode, SubscriptionListener,
    TransportError, UaError, UaResult, UaSubscription, UaTransport,
};

use super::fixtures::EndpointFixtures;

// =============================================================================
// Mock Transport
// =============================================================================

struct ParkedPublish {
    request: PublishRequest,
    responder: oneshot::Sender<UaResult<ResponseMessage>>,
}

/// Server revision applied to CreateSubscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionRevision {
    /// Revised publishing interval.
    pub publishing_interval: f64,
    /// Revised lifetime count.
    pub lifetime_count: u32,
    /// Revised max keep-alive count.
    pub max_keep_alive_count: u32,
}

/// In-memory server answering every service the client uses.
pub struct MockTransport {
    endpoint: EndpointDescription,
    certificate_available: bool,

    requests: Mutex<Vec<RequestMessage>>,
    request_counts: Mutex<HashMap<&'static str, usize>>,

    fail_create: AtomicBool,
    fail_activate: AtomicBool,
    create_gate: Mutex<Option<Arc<Notify>>>,
    next_session: AtomicU32,

    next_subscription_id: AtomicU32,
    subscriptions: Mutex<HashSet<u32>>,
    revision: Mutex<Option<SubscriptionRevision>>,

    next_monitored_item_id: AtomicU32,
    rejected_nodes: Mutex<Vec<NodeId>>,

    publishes: Mutex<VecDeque<ParkedPublish>>,
    max_outstanding_publishes: AtomicUsize,
    publish_acknowledgements: Mutex<Vec<Vec<SubscriptionAcknowledgement>>>,

    retransmission: Mutex<HashMap<(u32, u32), NotificationMessage>>,
    republished: Mutex<Vec<(u32, u32)>>,
    republish_gate: Mutex<Option<Arc<Notify>>>,

    read_value: Mutex<DataValue>,
    fail_reads: AtomicBool,
    next_read_status: Mutex<Option<StatusCode>>,
}

impl MockTransport {
    /// Creates a mock server with no security.
    pub fn new() -> Self {
        Self::with_endpoint(EndpointFixtures::direct(SecurityPolicy::None))
    }

    /// Creates a mock server behind `endpoint`.
    pub fn with_endpoint(endpoint: EndpointDescription) -> Self {
        Self {
            endpoint,
            certificate_available: true,
            requests: Mutex::new(Vec::new()),
            request_counts: Mutex::new(HashMap::new()),
            fail_create: AtomicBool::new(false),
            fail_activate: AtomicBool::new(false),
            create_gate: Mutex::new(None),
            next_session: AtomicU32::new(1),
            next_subscription_id: AtomicU32::new(100),
            subscriptions: Mutex::new(HashSet::new()),
            revision: Mutex::new(None),
            next_monitored_item_id: AtomicU32::new(5000),
            rejected_nodes: Mutex::new(Vec::new()),
            publishes: Mutex::new(VecDeque::new()),
            max_outstanding_publishes: AtomicUsize::new(0),
            publish_acknowledgements: Mutex::new(Vec::new()),
            retransmission: Mutex::new(HashMap::new()),
            republished: Mutex::new(Vec::new()),
            republish_gate: Mutex::new(None),
            read_value: Mutex::new(DataValue::new(-1i32)),
            fail_reads: AtomicBool::new(false),
            next_read_status: Mutex::new(None),
        }
    }

    /// Creates a mock server using `policy`.
    pub fn with_policy(policy: SecurityPolicy) -> Self {
        Self::with_endpoint(EndpointFixtures::direct(policy))
    }

    /// Makes the local certificate unavailable.
    pub fn without_certificate(mut self) -> Self {
        self.certificate_available = false;
        self
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Fails every CreateSession with `BadCommunicationError` while set.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Fails every ActivateSession while set.
    pub fn set_fail_activate(&self, fail: bool) {
        self.fail_activate.store(fail, Ordering::SeqCst);
    }

    /// Parks CreateSession until [`release_create`](Self::release_create).
    pub fn hold_create(&self) {
        *self.create_gate.lock() = Some(Arc::new(Notify::new()));
    }

    /// Releases a parked CreateSession.
    pub fn release_create(&self) {
        if let Some(gate) = self.create_gate.lock().take() {
            gate.notify_one();
        }
    }

    /// Parks the next Republish until [`release_republish`](Self::release_republish).
    pub fn hold_republish(&self) {
        *self.republish_gate.lock() = Some(Arc::new(Notify::new()));
    }

    /// Releases a parked Republish.
    pub fn release_republish(&self) {
        if let Some(gate) = self.republish_gate.lock().take() {
            gate.notify_one();
        }
    }

    /// Revision applied to subsequent CreateSubscription requests.
    pub fn set_subscription_revision(&self, revision: SubscriptionRevision) {
        *self.revision.lock() = Some(revision);
    }

    /// Rejects monitored items on `node_id` with `BadNodeIdUnknown`.
    pub fn reject_node(&self, node_id: NodeId) {
        self.rejected_nodes.lock().push(node_id);
    }

    /// Makes `message` available to Republish.
    pub fn retain_for_republish(&self, subscription_id: u32, message: NotificationMessage) {
        self.retransmission
            .lock()
            .insert((subscription_id, message.sequence_number), message);
    }

    /// Stores a message under a different sequence number than it carries.
    pub fn retain_mismatched(
        &self,
        subscription_id: u32,
        requested: u32,
        message: NotificationMessage,
    ) {
        self.retransmission
            .lock()
            .insert((subscription_id, requested), message);
    }

    /// Value returned for every Read.
    pub fn set_read_value(&self, value: DataValue) {
        *self.read_value.lock() = value;
    }

    /// Fails every Read at the transport level while set.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Answers the next Read with `status` as its service result.
    pub fn fail_next_read_with(&self, status: StatusCode) {
        *self.next_read_status.lock() = Some(status);
    }

    // =========================================================================
    // Publish control
    // =========================================================================

    /// Answers the oldest outstanding Publish. Returns `false` if none is
    /// outstanding.
    pub fn respond_publish(&self, response: PublishResponse) -> bool {
        let Some(parked) = self.publishes.lock().pop_front() else {
            return false;
        };
        let handle = parked.request.request_header.request_handle;
        let response = PublishResponse {
            response_header: ResponseHeader::with_status(
                handle,
                response.response_header.service_result,
            ),
            ..response
        };
        let _ = parked.responder.send(Ok(response.into()));
        true
    }

    /// Fails the oldest outstanding Publish with `error`.
    pub fn fail_publish(&self, error: UaError) -> bool {
        let Some(parked) = self.publishes.lock().pop_front() else {
            return false;
        };
        let _ = parked.responder.send(Err(error));
        true
    }

    /// Fails the newest outstanding Publish with `error`.
    pub fn fail_newest_publish(&self, error: UaError) -> bool {
        let Some(parked) = self.publishes.lock().pop_back() else {
            return false;
        };
        let _ = parked.responder.send(Err(error));
        true
    }

    /// Answers the oldest outstanding Publish with `status` as its service
    /// result.
    pub fn reject_publish(&self, status: StatusCode) -> bool {
        let Some(parked) = self.publishes.lock().pop_front() else {
            return false;
        };
        let handle = parked.request.request_header.request_handle;
        let response = PublishResponse {
            response_header: ResponseHeader::with_status(handle, status),
            subscription_id: 0,
            available_sequence_numbers: Vec::new(),
            more_notifications: false,
            notification_message: NotificationMessage::keep_alive(0),
            results: Vec::new(),
        };
        let _ = parked.responder.send(Ok(response.into()));
        true
    }

    /// Publish requests parked on the server.
    pub fn outstanding_publishes(&self) -> usize {
        self.publishes.lock().len()
    }

    /// Highest number of Publish requests parked at once.
    pub fn max_outstanding_publishes(&self) -> usize {
        self.max_outstanding_publishes.load(Ordering::SeqCst)
    }

    /// Acknowledgements carried by each Publish, in arrival order.
    pub fn publish_acknowledgements(&self) -> Vec<Vec<SubscriptionAcknowledgement>> {
        self.publish_acknowledgements.lock().clone()
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Number of requests received for `service`.
    pub fn request_count(&self, service: &str) -> usize {
        self.request_counts
            .lock()
            .get(service)
            .copied()
            .unwrap_or(0)
    }

    /// All requests received, in arrival order.
    pub fn requests(&self) -> Vec<RequestMessage> {
        self.requests.lock().clone()
    }

    /// Republish requests as `(subscription_id, sequence_number)`.
    pub fn republished(&self) -> Vec<(u32, u32)> {
        self.republished.lock().clone()
    }

    // =========================================================================
    // Service handlers
    // =========================================================================

    fn record(&self, request: &RequestMessage) {
        *self
            .request_counts
            .lock()
            .entry(request.service_name())
            .or_insert(0) += 1;
        self.requests.lock().push(request.clone());
    }

    async fn create_session(&self, handle: u32) -> UaResult<ResponseMessage> {
        let gate = self.create_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_create.load(Ordering::SeqCst) {
            return Ok(CreateSessionResponse {
                response_header: ResponseHeader::with_status(
                    handle,
                    StatusCode::BAD_COMMUNICATION_ERROR,
                ),
                session_id: NodeId::null(),
                authentication_token: NodeId::null(),
                revised_session_timeout: 0.0,
                server_nonce: Vec::new(),
                server_certificate: Vec::new(),
                server_endpoints: Vec::new(),
                max_request_message_size: 0,
            }
            .into());
        }

        let n = self.next_session.fetch_add(1, Ordering::SeqCst);
        Ok(CreateSessionResponse {
            response_header: ResponseHeader::good(handle),
            session_id: NodeId::numeric(1, n),
            authentication_token: NodeId::numeric(0, 9000 + n),
            revised_session_timeout: 60_000.0,
            server_nonce: vec![7; 32],
            server_certificate: Vec::new(),
            server_endpoints: vec![self.endpoint.clone()],
            max_request_message_size: 0,
        }
        .into())
    }

    async fn publish(&self, request: PublishRequest) -> UaResult<ResponseMessage> {
        let (responder, response) = oneshot::channel();
        {
            let mut publishes = self.publishes.lock();
            self.publish_acknowledgements
                .lock()
                .push(request.subscription_acknowledgements.clone());
            publishes.push_back(ParkedPublish { request, responder });
            self.max_outstanding_publishes
                .fetch_max(publishes.len(), Ordering::SeqCst);
        }

        response
            .await
            .unwrap_or_else(|_| Err(UaError::transport(TransportError::Closed)))
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UaTransport for MockTransport {
    async fn send_request(&self, request: RequestMessage) -> UaResult<ResponseMessage> {
        self.record(&request);
        let handle = request.request_header().request_handle;

        match request {
            RequestMessage::CreateSession(_) => self.create_session(handle).await,
            RequestMessage::ActivateSession(_) => {
                let status = if self.fail_activate.load(Ordering::SeqCst) {
                    StatusCode::BAD_INVALID_ARGUMENT
                } else {
                    StatusCode::GOOD
                };
                Ok(ActivateSessionResponse {
                    response_header: ResponseHeader::with_status(handle, status),
                    server_nonce: vec![8; 32],
                    results: Vec::new(),
                }
                .into())
            }
            RequestMessage::CloseSession(_) => Ok(CloseSessionResponse {
                response_header: ResponseHeader::good(handle),
            }
            .into()),
            RequestMessage::Read(request) => {
                if self.fail_reads.load(Ordering::SeqCst) {
                    return Err(UaError::transport(TransportError::send_failed(
                        "read refused by mock",
                    )));
                }
                let status = self.next_read_status.lock().take().unwrap_or(StatusCode::GOOD);
                let value = self.read_value.lock().clone();
                Ok(ReadResponse {
                    response_header: ResponseHeader::with_status(handle, status),
                    results: request.nodes_to_read.iter().map(|_| value.clone()).collect(),
                }
                .into())
            }
            RequestMessage::Write(request) => Ok(WriteResponse {
                response_header: ResponseHeader::good(handle),
                results: vec![StatusCode::GOOD; request.nodes_to_write.len()],
            }
            .into()),
            RequestMessage::CreateSubscription(request) => {
                let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
                self.subscriptions.lock().insert(subscription_id);
                let revision = (*self.revision.lock()).unwrap_or(SubscriptionRevision {
                    publishing_interval: request.requested_publishing_interval,
                    lifetime_count: request.requested_lifetime_count,
                    max_keep_alive_count: request.requested_max_keep_alive_count,
                });
                Ok(CreateSubscriptionResponse {
                    response_header: ResponseHeader::good(handle),
                    subscription_id,
                    revised_publishing_interval: revision.publishing_interval,
                    revised_lifetime_count: revision.lifetime_count,
                    revised_max_keep_alive_count: revision.max_keep_alive_count,
                }
                .into())
            }
            RequestMessage::ModifySubscription(request) => Ok(ModifySubscriptionResponse {
                response_header: ResponseHeader::good(handle),
                revised_publishing_interval: request.requested_publishing_interval,
                revised_lifetime_count: request.requested_lifetime_count,
                revised_max_keep_alive_count: request.requested_max_keep_alive_count,
            }
            .into()),
            RequestMessage::SetPublishingMode(request) => Ok(SetPublishingModeResponse {
                response_header: ResponseHeader::good(handle),
                results: vec![StatusCode::GOOD; request.subscription_ids.len()],
            }
            .into()),
            RequestMessage::DeleteSubscriptions(request) => {
                let mut subscriptions = self.subscriptions.lock();
                let results = request
                    .subscription_ids
                    .iter()
                    .map(|id| {
                        if subscriptions.remove(id) {
                            StatusCode::GOOD
                        } else {
                            StatusCode::BAD_SUBSCRIPTION_ID_INVALID
                        }
                    })
                    .collect();
                Ok(DeleteSubscriptionsResponse {
                    response_header: ResponseHeader::good(handle),
                    results,
                }
                .into())
            }
            RequestMessage::CreateMonitoredItems(request) => {
                let rejected = self.rejected_nodes.lock().clone();
                let results = request
                    .items_to_create
                    .iter()
                    .map(|item| {
                        if rejected.contains(&item.item_to_monitor.node_id) {
                            MonitoredItemCreateResult {
                                status_code: StatusCode::BAD_NODE_ID_UNKNOWN,
                                monitored_item_id: 0,
                                revised_sampling_interval: 0.0,
                                revised_queue_size: 0,
                            }
                        } else {
                            let sampling = item.requested_parameters.sampling_interval;
                            MonitoredItemCreateResult {
                                status_code: StatusCode::GOOD,
                                monitored_item_id: self
                                    .next_monitored_item_id
                                    .fetch_add(1, Ordering::SeqCst),
                                revised_sampling_interval: if sampling < 0.0 {
                                    100.0
                                } else {
                                    sampling
                                },
                                revised_queue_size: item.requested_parameters.queue_size.max(1),
                            }
                        }
                    })
                    .collect();
                Ok(CreateMonitoredItemsResponse {
                    response_header: ResponseHeader::good(handle),
                    results,
                }
                .into())
            }
            RequestMessage::DeleteMonitoredItems(request) => Ok(DeleteMonitoredItemsResponse {
                response_header: ResponseHeader::good(handle),
                results: vec![StatusCode::GOOD; request.monitored_item_ids.len()],
            }
            .into()),
            RequestMessage::Publish(request) => self.publish(request).await,
            RequestMessage::Republish(request) => {
                let key = (request.subscription_id, request.retransmit_sequence_number);
                self.republished.lock().push(key);
                let gate = self.republish_gate.lock().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                let retained = self.retransmission.lock().get(&key).cloned();
                let (status, message) = match retained {
                    Some(message) => (StatusCode::GOOD, message),
                    None => (
                        StatusCode::BAD_MESSAGE_NOT_AVAILABLE,
                        NotificationMessage::keep_alive(0),
                    ),
                };
                Ok(RepublishResponse {
                    response_header: ResponseHeader::with_status(handle, status),
                    notification_message: message,
                }
                .into())
            }
        }
    }

    fn security_policy(&self) -> SecurityPolicy {
        self.endpoint.security_policy
    }

    fn local_certificate(&self) -> UaResult<Vec<u8>> {
        if self.certificate_available {
            Ok(vec![0x30, 0x82, 0x01, 0x0A])
        } else {
            Err(UaError::transport(TransportError::certificate_unavailable(
                "no certificate in mock store",
            )))
        }
    }

    fn endpoint(&self) -> EndpointDescription {
        self.endpoint.clone()
    }
}

// =============================================================================
// Recording Listener
// =============================================================================

/// Records every subscription-level callback.
#[derive(Debug, Default)]
pub struct RecordingListener {
    keep_alives: Mutex<Vec<(u32, DateTime<Utc>)>>,
    status_changes: Mutex<Vec<(u32, StatusCode)>>,
    messages: Mutex<Vec<(u32, u32)>>,
}

impl RecordingListener {
    /// Creates an empty listener.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Keep-alives seen, per subscription id.
    pub fn keep_alive_count(&self, subscription_id: u32) -> usize {
        self.keep_alives
            .lock()
            .iter()
            .filter(|(id, _)| *id == subscription_id)
            .count()
    }

    /// Status changes seen.
    pub fn status_changes(&self) -> Vec<(u32, StatusCode)> {
        self.status_changes.lock().clone()
    }

    /// Dispatched sequence numbers for `subscription_id`, in dispatch order.
    pub fn sequence_numbers(&self, subscription_id: u32) -> Vec<u32> {
        self.messages
            .lock()
            .iter()
            .filter(|(id, _)| *id == subscription_id)
            .map(|(_, sequence_number)| *sequence_number)
            .collect()
    }
}

impl SubscriptionListener for RecordingListener {
    fn on_keep_alive(&self, subscription: &UaSubscription, publish_time: DateTime<Utc>) {
        self.keep_alives
            .lock()
            .push((subscription.subscription_id(), publish_time));
    }

    fn on_status_changed(&self, subscription: &UaSubscription, status: StatusCode) {
        self.status_changes
            .lock()
            .push((subscription.subscription_id(), status));
    }

    fn on_notification_message(&self, subscription: &UaSubscription, sequence_number: u32) {
        self.messages
            .lock()
            .push((subscription.subscription_id(), sequence_number));
    }
}
