// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built configurations, endpoints and notification messages.

use std::time::Duration;

use uasub_client::messages::{
    MonitoredItemNotification, NotificationData, NotificationMessage, PublishResponse,
    ResponseHeader,
};
use uasub_client::{
    ApplicationDescription, ClientConfig, DataValue, EndpointDescription, SecurityMode,
    SecurityPolicy, StatusCode, Variant,
};

// =============================================================================
// Configuration Fixtures
// =============================================================================

/// Pre-built client configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Default test configuration with a short request timeout.
    pub fn client() -> ClientConfig {
        ClientConfig::builder()
            .application_name("uasub test client")
            .application_uri("urn:uasub:test:client")
            .session_name("integration")
            .request_timeout(Duration::from_secs(5))
            .build()
            .expect("valid test configuration")
    }

    /// Configuration with the given publish pipeline depth.
    pub fn with_pipeline_depth(depth: u32) -> ClientConfig {
        ClientConfig {
            publish_pipeline_depth: depth,
            ..Self::client()
        }
    }

    /// Configuration with a publish failure backoff.
    pub fn with_publish_backoff(backoff: Duration) -> ClientConfig {
        ClientConfig {
            publish_failure_backoff: backoff,
            ..Self::client()
        }
    }
}

// =============================================================================
// Endpoint Fixtures
// =============================================================================

/// Pre-built endpoint descriptions.
pub struct EndpointFixtures;

impl EndpointFixtures {
    /// Direct endpoint without a gateway.
    pub fn direct(policy: SecurityPolicy) -> EndpointDescription {
        EndpointDescription {
            endpoint_url: "opc.tcp://plc-01:4840".to_string(),
            server: ApplicationDescription {
                application_uri: "urn:plc-01:server".to_string(),
                application_name: "PLC 01".to_string(),
                ..Default::default()
            },
            server_certificate: Vec::new(),
            security_mode: if policy == SecurityPolicy::None {
                SecurityMode::None
            } else {
                SecurityMode::SignAndEncrypt
            },
            security_policy: policy,
        }
    }

    /// Endpoint reached through a gateway server.
    pub fn through_gateway() -> EndpointDescription {
        let mut endpoint = Self::direct(SecurityPolicy::None);
        endpoint.server.gateway_server_uri = Some("urn:gateway:server".to_string());
        endpoint
    }
}

// =============================================================================
// Notification Fixtures
// =============================================================================

/// Builders for notification messages and publish responses.
pub struct NotificationFixtures;

impl NotificationFixtures {
    /// Data change for one item carrying `value`.
    pub fn data_change(sequence_number: u32, client_handle: u32, value: i32) -> NotificationMessage {
        Self::data_changes(sequence_number, &[client_handle], value)
    }

    /// Data change for several items, all carrying `value`.
    pub fn data_changes(
        sequence_number: u32,
        client_handles: &[u32],
        value: i32,
    ) -> NotificationMessage {
        NotificationMessage::new(
            sequence_number,
            vec![NotificationData::DataChange(
                client_handles
                    .iter()
                    .map(|&client_handle| MonitoredItemNotification {
                        client_handle,
                        value: DataValue::new(value),
                    })
                    .collect(),
            )],
        )
    }

    /// Status change message.
    pub fn status_change(sequence_number: u32, status: StatusCode) -> NotificationMessage {
        NotificationMessage::new(sequence_number, vec![NotificationData::StatusChange(status)])
    }

    /// Publish response for `subscription_id` with `available` sequence numbers.
    pub fn publish_response(
        subscription_id: u32,
        message: NotificationMessage,
        available: Vec<u32>,
    ) -> PublishResponse {
        PublishResponse {
            response_header: ResponseHeader::good(0),
            subscription_id,
            available_sequence_numbers: available,
            more_notifications: false,
            notification_message: message,
            results: Vec::new(),
        }
    }

    /// Publish response whose only available sequence number is the message's own.
    pub fn publish(subscription_id: u32, message: NotificationMessage) -> PublishResponse {
        let available = if message.is_keep_alive() {
            Vec::new()
        } else {
            vec![message.sequence_number]
        };
        Self::publish_response(subscription_id, message, available)
    }
}

/// Extracts `Int32` values, ignoring other variants.
pub fn int_values(values: &[Variant]) -> Vec<i32> {
    values
        .iter()
        .filter_map(|value| match value {
            Variant::Int32(v) => Some(*v),
            _ => None,
        })
        .collect()
}
