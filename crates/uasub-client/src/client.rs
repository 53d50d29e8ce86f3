// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service client and application facade.
//!
//! [`SessionClient`] issues service requests on behalf of the active
//! session: it waits for the session, stamps the request header and reports
//! session-level faults back to the state machine. [`UaClient`] bundles the
//! session client with a [`SubscriptionManager`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use uasub_client::{ClientConfig, UaClient, UaTransport};
//!
//! # async fn example(transport: Arc<dyn UaTransport>) -> uasub_client::UaResult<()> {
//! let config = ClientConfig::builder()
//!     .application_name("line-3 monitor")
//!     .build()?;
//!
//! let client = UaClient::connect(transport, config).await?;
//! let subscription = client
//!     .subscription_manager()
//!     .create_subscription_with_interval(1000.0)
//!     .await?;
//! println!("subscription {}", subscription.subscription_id());
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{SessionError, UaError, UaResult};
use crate::messages::{
    timeout_hint_millis, PublishRequest, PublishResponse, ReadRequest, RepublishRequest,
    RepublishResponse, RequestHandles, RequestHeader, ServiceRequest,
    SubscriptionAcknowledgement, WriteRequest,
};
use crate::session::{SessionFsm, UaSession};
use crate::subscription::SubscriptionManager;
use crate::transport::{TransportExt, UaTransport};
use crate::types::{
    AttributeId, DataValue, NodeId, ReadValueId, StatusCode, TimestampsToReturn, WriteValue,
};

// =============================================================================
// AttributeStore
// =============================================================================

/// Read/write access to node attributes.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Reads `nodes_to_read`, returning one value per node in request order.
    async fn read(
        &self,
        nodes_to_read: Vec<ReadValueId>,
        max_age: f64,
        timestamps_to_return: TimestampsToReturn,
    ) -> UaResult<Vec<DataValue>>;

    /// Writes `nodes_to_write`, returning one status per write in request order.
    async fn write(&self, nodes_to_write: Vec<WriteValue>) -> UaResult<Vec<StatusCode>>;

    /// Reads the current value of a single target, bypassing server caches.
    async fn read_value(&self, node: ReadValueId) -> UaResult<DataValue> {
        let mut values = self.read(vec![node], 0.0, TimestampsToReturn::Both).await?;
        values
            .pop()
            .ok_or_else(|| UaError::bad_status("Read", StatusCode::BAD_UNKNOWN_RESPONSE))
    }

    /// Reads one attribute of a node.
    async fn read_attribute(&self, node_id: NodeId, attribute_id: AttributeId) -> UaResult<DataValue> {
        self.read_value(ReadValueId::new(node_id, attribute_id)).await
    }

    /// Writes one attribute of a node.
    async fn write_attribute(
        &self,
        node_id: NodeId,
        attribute_id: AttributeId,
        value: DataValue,
    ) -> UaResult<StatusCode> {
        let write = WriteValue {
            node_id,
            attribute_id,
            index_range: None,
            value,
        };
        let mut results = self.write(vec![write]).await?;
        results
            .pop()
            .ok_or_else(|| UaError::bad_status("Write", StatusCode::BAD_UNKNOWN_RESPONSE))
    }
}

// =============================================================================
// SessionClient
// =============================================================================

/// Issues service requests on the active session.
pub struct SessionClient {
    transport: Arc<dyn UaTransport>,
    config: Arc<ClientConfig>,
    handles: Arc<RequestHandles>,
    fsm: SessionFsm,
    disconnected: AtomicBool,
}

impl SessionClient {
    /// Creates a client. No session is established until one is requested.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(transport: Arc<dyn UaTransport>, config: ClientConfig) -> UaResult<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let handles = Arc::new(RequestHandles::new());
        let fsm = SessionFsm::new(
            Arc::clone(&transport),
            Arc::clone(&config),
            Arc::clone(&handles),
        );

        Ok(Self {
            transport,
            config,
            handles,
            fsm,
            disconnected: AtomicBool::new(false),
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Transport port.
    pub fn transport(&self) -> &Arc<dyn UaTransport> {
        &self.transport
    }

    /// Session state machine.
    pub fn session_fsm(&self) -> &SessionFsm {
        &self.fsm
    }

    /// Returns the active session, establishing one if necessary.
    ///
    /// Fails with [`SessionError::ClientShutdown`] after
    /// [`disconnect`](Self::disconnect).
    pub async fn session(&self) -> UaResult<Arc<UaSession>> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(SessionError::ClientShutdown.into());
        }
        Ok(self.fsm.session().await?)
    }

    /// Closes the active session. A later request opens a new one.
    pub async fn close(&self) {
        self.fsm.close().await;
    }

    /// Closes the active session and refuses to open another.
    pub async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.fsm.close().await;
    }

    /// Returns `true` once [`disconnect`](Self::disconnect) has run.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Returns a fresh request handle.
    pub fn next_request_handle(&self) -> u32 {
        self.handles.next()
    }

    /// Builds a request header for `session`.
    pub fn request_header(&self, session: &UaSession, timeout_hint: Duration) -> RequestHeader {
        RequestHeader::new(
            session.authentication_token().clone(),
            self.next_request_handle(),
            timeout_hint_millis(timeout_hint),
        )
    }

    /// Sends the request produced by `build` on the active session.
    ///
    /// The request is bounded by the configured request timeout.
    pub async fn call<R, F>(&self, build: F) -> UaResult<R::Response>
    where
        R: ServiceRequest,
        F: FnOnce(RequestHeader) -> R + Send,
    {
        let session = self.session().await?;
        let timeout = self.config.request_timeout;
        let request = build(self.request_header(&session, timeout));

        let result = self.transport.send_with_timeout(request, timeout).await;
        self.check_session_fault(&session, result)
    }

    /// Sends a Publish request.
    ///
    /// `timeout_hint` is advisory for the server; the client does not cancel
    /// the request. It resolves when the server responds or the transport
    /// fails it.
    pub async fn publish(
        &self,
        subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
        timeout_hint: Duration,
    ) -> UaResult<PublishResponse> {
        let session = self.session().await?;
        let request = PublishRequest {
            request_header: self.request_header(&session, timeout_hint),
            subscription_acknowledgements,
        };

        let result = self.transport.send(request).await;
        self.check_session_fault(&session, result)
    }

    /// Requests retransmission of one notification message.
    pub async fn republish(
        &self,
        subscription_id: u32,
        retransmit_sequence_number: u32,
    ) -> UaResult<RepublishResponse> {
        debug!(subscription_id, retransmit_sequence_number, "Republish");
        self.call(|request_header| RepublishRequest {
            request_header,
            subscription_id,
            retransmit_sequence_number,
        })
        .await
    }

    fn check_session_fault<T>(&self, session: &Arc<UaSession>, result: UaResult<T>) -> UaResult<T> {
        if let Err(UaError::Service(fault)) = &result {
            if matches!(
                fault.status,
                StatusCode::BAD_SESSION_ID_INVALID | StatusCode::BAD_SESSION_CLOSED
            ) {
                info!(
                    service = fault.service,
                    status = %fault.status,
                    "Server rejected the session"
                );
                self.fsm
                    .invalidate(session, SessionError::invalidated(fault.status.to_string()));
            }
        }
        result
    }
}

#[async_trait]
impl AttributeStore for SessionClient {
    async fn read(
        &self,
        nodes_to_read: Vec<ReadValueId>,
        max_age: f64,
        timestamps_to_return: TimestampsToReturn,
    ) -> UaResult<Vec<DataValue>> {
        let response = self
            .call(move |request_header| ReadRequest {
                request_header,
                max_age,
                timestamps_to_return,
                nodes_to_read,
            })
            .await?;
        Ok(response.results)
    }

    async fn write(&self, nodes_to_write: Vec<WriteValue>) -> UaResult<Vec<StatusCode>> {
        let response = self
            .call(move |request_header| WriteRequest {
                request_header,
                nodes_to_write,
            })
            .await?;
        Ok(response.results)
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("endpoint", &self.transport.endpoint().endpoint_url)
            .field("session", &self.fsm)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

// =============================================================================
// UaClient
// =============================================================================

/// Session client plus subscription manager.
pub struct UaClient {
    client: Arc<SessionClient>,
    subscriptions: Arc<SubscriptionManager>,
}

impl UaClient {
    /// Creates a client and establishes a session.
    pub async fn connect(transport: Arc<dyn UaTransport>, config: ClientConfig) -> UaResult<Self> {
        let client = Arc::new(SessionClient::new(transport, config)?);
        let session = client.session().await?;
        info!(
            session_id = %session.session_id(),
            endpoint = %client.transport().endpoint().endpoint_url,
            "Connected"
        );

        let subscriptions = Arc::new(SubscriptionManager::new(Arc::clone(&client)));
        Ok(Self {
            client,
            subscriptions,
        })
    }

    /// Returns the active session, establishing a new one if necessary.
    pub async fn session(&self) -> UaResult<Arc<UaSession>> {
        self.client.session().await
    }

    /// Service client.
    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    /// Subscription manager.
    pub fn subscription_manager(&self) -> &Arc<SubscriptionManager> {
        &self.subscriptions
    }

    /// Stops publishing and closes the session. No session is opened
    /// afterwards.
    pub async fn disconnect(&self) {
        self.subscriptions.shutdown();
        self.client.disconnect().await;
        info!("Disconnected");
    }
}

impl std::fmt::Debug for UaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaClient")
            .field("client", &self.client)
            .field("subscriptions", &self.subscriptions.subscription_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{
        ActivateSessionResponse, CreateSessionResponse, ReadResponse, RequestMessage,
        ResponseHeader, ResponseMessage, WriteResponse,
    };
    use crate::session::SessionStateKind;
    use crate::types::{EndpointDescription, SecurityPolicy, Variant};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct AttributeTransport {
        read_status: Option<StatusCode>,
        reads: Mutex<Vec<ReadRequest>>,
    }

    #[async_trait]
    impl UaTransport for AttributeTransport {
        async fn send_request(&self, request: RequestMessage) -> UaResult<ResponseMessage> {
            let handle = request.request_header().request_handle;
            let response: ResponseMessage = match request {
                RequestMessage::CreateSession(_) => CreateSessionResponse {
                    response_header: ResponseHeader::good(handle),
                    session_id: NodeId::numeric(1, 5),
                    authentication_token: NodeId::numeric(0, 77),
                    revised_session_timeout: 60_000.0,
                    server_nonce: Vec::new(),
                    server_certificate: Vec::new(),
                    server_endpoints: Vec::new(),
                    max_request_message_size: 0,
                }
                .into(),
                RequestMessage::ActivateSession(_) => ActivateSessionResponse {
                    response_header: ResponseHeader::good(handle),
                    server_nonce: Vec::new(),
                    results: Vec::new(),
                }
                .into(),
                RequestMessage::Read(read) => {
                    let status = self.read_status.unwrap_or(StatusCode::GOOD);
                    let results = read
                        .nodes_to_read
                        .iter()
                        .map(|_| DataValue::new(42i32))
                        .collect();
                    self.reads.lock().push(read);
                    ReadResponse {
                        response_header: ResponseHeader::with_status(handle, status),
                        results,
                    }
                    .into()
                }
                RequestMessage::Write(write) => WriteResponse {
                    response_header: ResponseHeader::good(handle),
                    results: write.nodes_to_write.iter().map(|_| StatusCode::GOOD).collect(),
                }
                .into(),
                other => return Err(UaError::send_failed(other.service_name())),
            };
            Ok(response)
        }

        fn security_policy(&self) -> SecurityPolicy {
            SecurityPolicy::None
        }

        fn local_certificate(&self) -> UaResult<Vec<u8>> {
            Ok(Vec::new())
        }

        fn endpoint(&self) -> EndpointDescription {
            EndpointDescription::default()
        }
    }

    #[tokio::test]
    async fn test_read_value_uses_session_token() {
        let transport = Arc::new(AttributeTransport::default());
        let client = SessionClient::new(transport.clone(), ClientConfig::default()).unwrap();

        let value = client
            .read_attribute(NodeId::numeric(2, 10), AttributeId::Value)
            .await
            .unwrap();
        assert_eq!(value.value, Variant::Int32(42));

        let reads = transport.reads.lock();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].max_age, 0.0);
        assert_eq!(reads[0].timestamps_to_return, TimestampsToReturn::Both);
        assert_eq!(
            reads[0].request_header.authentication_token,
            NodeId::numeric(0, 77)
        );
    }

    #[tokio::test]
    async fn test_write_attribute() {
        let transport = Arc::new(AttributeTransport::default());
        let client = SessionClient::new(transport, ClientConfig::default()).unwrap();

        let status = client
            .write_attribute(NodeId::numeric(2, 10), AttributeId::Value, DataValue::new(1.5f64))
            .await
            .unwrap();
        assert!(status.is_good());
    }

    #[tokio::test]
    async fn test_session_fault_invalidates_session() {
        let transport = Arc::new(AttributeTransport {
            read_status: Some(StatusCode::BAD_SESSION_ID_INVALID),
            ..Default::default()
        });
        let client = SessionClient::new(transport, ClientConfig::default()).unwrap();
        let session = client.session().await.unwrap();

        let error = client
            .read_attribute(NodeId::numeric(2, 10), AttributeId::Value)
            .await
            .unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_SESSION_ID_INVALID);

        let mut state = client.session_fsm().watch_state();
        tokio::time::timeout(
            Duration::from_secs(1),
            state.wait_for(|kind| *kind == SessionStateKind::Inactive),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!session.is_valid());
    }

    #[tokio::test]
    async fn test_disconnect_refuses_new_session() {
        let transport = Arc::new(AttributeTransport::default());
        let client = SessionClient::new(transport, ClientConfig::default()).unwrap();
        let session = client.session().await.unwrap();

        client.disconnect().await;

        assert!(!session.is_valid());
        assert!(client.is_disconnected());
        let error = client
            .read_attribute(NodeId::numeric(2, 10), AttributeId::Value)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            UaError::Session(SessionError::ClientShutdown)
        ));
        assert_eq!(client.session_fsm().state(), SessionStateKind::Inactive);
        assert_eq!(client.session_fsm().stats().creations(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ClientConfig {
            publish_pipeline_depth: 0,
            ..Default::default()
        };
        let result = SessionClient::new(Arc::new(AttributeTransport::default()), config);
        assert!(matches!(result, Err(UaError::Configuration(_))));
    }
}
