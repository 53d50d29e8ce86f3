// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport port.
//!
//! The secure channel, message encoding and certificate handling live
//! outside this crate. The runtime only needs to send a typed request and
//! await the typed response, so the port is a single async method plus a
//! few accessors for negotiated channel metadata.
//!
//! ```text
//! SessionFsm / SubscriptionManager
//!              │  TransportExt::send::<R>(request)
//!              ▼
//! ┌──────────────────────────────────┐
//! │        dyn UaTransport           │
//! │  send_request(RequestMessage)    │
//! └──────────────────────────────────┘
//!              │
//!              ▼
//!      secure channel (external)
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{TimeoutError, UaError, UaResult};
use crate::messages::{RequestMessage, ResponseMessage, ServiceRequest};
use crate::types::{EndpointDescription, SecurityPolicy};

/// Request/response primitive over a secure channel.
///
/// Implementations must be safe to call concurrently; many publish
/// requests are outstanding at once.
#[async_trait]
pub trait UaTransport: Send + Sync + 'static {
    /// Sends a request and waits for its response.
    ///
    /// Fails only for transport-level problems. A response whose service
    /// result is bad is returned as `Ok`; [`TransportExt::send`] turns it
    /// into an error.
    async fn send_request(&self, request: RequestMessage) -> UaResult<ResponseMessage>;

    /// Security policy negotiated for the channel.
    fn security_policy(&self) -> SecurityPolicy;

    /// Local application instance certificate (DER).
    fn local_certificate(&self) -> UaResult<Vec<u8>>;

    /// Endpoint the channel is connected to.
    fn endpoint(&self) -> EndpointDescription;
}

/// Typed sending on top of [`UaTransport`].
#[async_trait]
pub trait TransportExt: UaTransport {
    /// Sends `request` and returns its matching response.
    ///
    /// A bad service result in the response header becomes
    /// [`UaError::Service`].
    async fn send<R: ServiceRequest>(&self, request: R) -> UaResult<R::Response> {
        let response = self.send_request(request.into_message()).await?;

        let status = response.response_header().service_result;
        if status.is_bad() {
            return Err(UaError::bad_status(R::SERVICE, status));
        }

        R::response_from(response)
    }

    /// Sends `request`, failing with [`UaError::Timeout`] if no response
    /// arrives within `timeout`.
    async fn send_with_timeout<R: ServiceRequest>(
        &self,
        request: R,
        timeout: Duration,
    ) -> UaResult<R::Response> {
        match tokio::time::timeout(timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(UaError::timeout(TimeoutError::request(R::SERVICE, timeout))),
        }
    }
}

impl<T: UaTransport + ?Sized> TransportExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::messages::{
        CloseSessionRequest, CloseSessionResponse, ReadRequest, RequestHeader, ResponseHeader,
    };
    use crate::types::{NodeId, StatusCode};
    use std::sync::Arc;

    struct FixedTransport {
        status: StatusCode,
    }

    #[async_trait]
    impl UaTransport for FixedTransport {
        async fn send_request(&self, request: RequestMessage) -> UaResult<ResponseMessage> {
            let handle = request.request_header().request_handle;
            match request {
                RequestMessage::CloseSession(_) => Ok(CloseSessionResponse {
                    response_header: ResponseHeader::with_status(handle, self.status),
                }
                .into()),
                _ => Err(UaError::transport(TransportError::NotConnected)),
            }
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

    fn close_request() -> CloseSessionRequest {
        CloseSessionRequest {
            request_header: RequestHeader::new(NodeId::null(), 3, 0),
            delete_subscriptions: true,
        }
    }

    #[tokio::test]
    async fn test_send_typed_response() {
        let transport: Arc<dyn UaTransport> = Arc::new(FixedTransport {
            status: StatusCode::GOOD,
        });

        let response = transport.send(close_request()).await.unwrap();
        assert_eq!(response.response_header.request_handle, 3);
    }

    #[tokio::test]
    async fn test_send_bad_service_result() {
        let transport = FixedTransport {
            status: StatusCode::BAD_SESSION_ID_INVALID,
        };

        let error = transport.send(close_request()).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_SESSION_ID_INVALID);
        assert_eq!(error.category(), "service");
    }

    #[tokio::test]
    async fn test_send_transport_failure() {
        let transport = FixedTransport {
            status: StatusCode::GOOD,
        };

        let request = ReadRequest {
            request_header: RequestHeader::new(NodeId::null(), 4, 0),
            max_age: 0.0,
            timestamps_to_return: Default::default(),
            nodes_to_read: Vec::new(),
        };
        let error = transport.send(request).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_NOT_CONNECTED);
    }

    struct StalledTransport;

    #[async_trait]
    impl UaTransport for StalledTransport {
        async fn send_request(&self, _request: RequestMessage) -> UaResult<ResponseMessage> {
            std::future::pending().await
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

    #[tokio::test(start_paused = true)]
    async fn test_send_with_timeout_elapses() {
        let error = StalledTransport
            .send_with_timeout(close_request(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(error.status_code(), StatusCode::BAD_TIMEOUT);
        assert!(error.to_string().contains("CloseSession"));
    }
}
