// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the session and subscription runtime.
//!
//! Every failure raised by this crate is a [`UaError`]. The hierarchy is
//! organized by the layer that produced the failure:
//!
//! ```text
//! UaError
//! ├── Transport     - Channel-level send/receive failures
//! ├── Service       - Bad status code returned by a service call
//! ├── Session       - Session lifecycle failures
//! ├── Subscription  - Subscription and monitored item failures
//! ├── Sequence      - Notification sequencing and republish failures
//! ├── Configuration - Invalid settings
//! └── Timeout       - Client-side request timeouts
//! ```
//!
//! All error types are `Clone` so that a single failure can complete every
//! waiter of a shared session future.
//!
//! # Examples
//!
//! ```
//! use uasub_client::error::{UaError, SequenceError};
//! use uasub_client::types::StatusCode;
//!
//! let error = UaError::sequence(SequenceError::mismatch(1, 5, 6));
//! assert_eq!(error.status_code(), StatusCode::BAD_SEQUENCE_NUMBER_INVALID);
//! assert!(!error.is_retryable());
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::types::StatusCode;

/// Result alias used throughout the crate.
pub type UaResult<T> = Result<T, UaError>;

// =============================================================================
// UaError - Main Error Type
// =============================================================================

/// The main error type for session and subscription operations.
#[derive(Debug, Clone, Error)]
pub enum UaError {
    /// Transport failures.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Service faults reported by the server.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Session lifecycle errors.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Subscription errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Sequencing errors.
    #[error("{0}")]
    Sequence(#[from] SequenceError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Timeout errors.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),
}

impl UaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a transport error.
    #[inline]
    pub fn transport(error: TransportError) -> Self {
        Self::Transport(error)
    }

    /// Creates a service error.
    #[inline]
    pub fn service(error: ServiceError) -> Self {
        Self::Service(error)
    }

    /// Creates a session error.
    #[inline]
    pub fn session(error: SessionError) -> Self {
        Self::Session(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a sequence error.
    #[inline]
    pub fn sequence(error: SequenceError) -> Self {
        Self::Sequence(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(error: TimeoutError) -> Self {
        Self::Timeout(error)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a bad-status service fault.
    pub fn bad_status(service: &'static str, status: StatusCode) -> Self {
        Self::Service(ServiceError::fault(service, status))
    }

    /// Creates a send failure.
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::Transport(TransportError::send_failed(message))
    }

    /// Creates a session creation failure.
    pub fn session_failed(message: impl Into<String>) -> Self {
        Self::Session(SessionError::creation_failed(message))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns the status code that best describes this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(e) => e.status_code(),
            Self::Service(e) => e.status,
            Self::Session(e) => e.status_code(),
            Self::Subscription(e) => e.status_code(),
            Self::Sequence(e) => e.status_code(),
            Self::Configuration(_) => StatusCode::BAD_CONFIGURATION_ERROR,
            Self::Timeout(_) => StatusCode::BAD_TIMEOUT,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Service(e) => e.is_retryable(),
            Self::Session(e) => e.is_retryable(),
            Self::Subscription(_) => false,
            Self::Sequence(_) => false,
            Self::Configuration(_) => false,
            Self::Timeout(_) => true,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Transport(_) => ErrorSeverity::Warning,
            Self::Service(e) => e.severity(),
            Self::Session(e) => e.severity(),
            Self::Subscription(_) => ErrorSeverity::Error,
            Self::Sequence(_) => ErrorSeverity::Warning,
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Timeout(_) => ErrorSeverity::Warning,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Service(_) => "service",
            Self::Session(_) => "session",
            Self::Subscription(_) => "subscription",
            Self::Sequence(_) => "sequence",
            Self::Configuration(_) => "configuration",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Transport(e) => e.error_code(),
            Self::Service(_) => ErrorCode::new(2, 1),
            Self::Session(e) => e.error_code(),
            Self::Subscription(e) => e.error_code(),
            Self::Sequence(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
            Self::Timeout(_) => ErrorCode::new(7, 1),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();
        let status = self.status_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                status = %status,
                category = self.category(),
                context = context,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                status = %status,
                category = self.category(),
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                status = %status,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Failures raised by the transport port.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// No secure channel is available.
    #[error("Transport not connected")]
    NotConnected,

    /// The request could not be sent or the response was lost.
    #[error("Send failed: {message}")]
    SendFailed {
        /// Failure description.
        message: String,
    },

    /// The transport was closed while the request was outstanding.
    #[error("Transport closed")]
    Closed,

    /// The response did not match the request type.
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// Expected response type.
        expected: &'static str,
        /// Actual response type.
        actual: &'static str,
    },

    /// The local certificate could not be loaded.
    #[error("Local certificate unavailable: {reason}")]
    CertificateUnavailable {
        /// Failure description.
        reason: String,
    },
}

impl TransportError {
    /// Creates a send failure.
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed {
            message: message.into(),
        }
    }

    /// Creates an unexpected response error.
    pub fn unexpected_response(expected: &'static str, actual: &'static str) -> Self {
        Self::UnexpectedResponse { expected, actual }
    }

    /// Creates a certificate unavailable error.
    pub fn certificate_unavailable(reason: impl Into<String>) -> Self {
        Self::CertificateUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotConnected | Self::SendFailed { .. })
    }

    /// Returns the status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConnected | Self::Closed => StatusCode::BAD_NOT_CONNECTED,
            Self::SendFailed { .. } => StatusCode::BAD_COMMUNICATION_ERROR,
            Self::UnexpectedResponse { .. } => StatusCode::BAD_UNKNOWN_RESPONSE,
            Self::CertificateUnavailable { .. } => StatusCode::BAD_CERTIFICATE_INVALID,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::new(1, 1),
            Self::SendFailed { .. } => ErrorCode::new(1, 2),
            Self::Closed => ErrorCode::new(1, 3),
            Self::UnexpectedResponse { .. } => ErrorCode::new(1, 4),
            Self::CertificateUnavailable { .. } => ErrorCode::new(1, 5),
        }
    }
}

// =============================================================================
// ServiceError
// =============================================================================

/// A service call completed with a bad service result.
#[derive(Debug, Clone, Error)]
#[error("{service} failed: {status}")]
pub struct ServiceError {
    /// Name of the service.
    pub service: &'static str,

    /// Service result.
    pub status: StatusCode,
}

impl ServiceError {
    /// Creates a service fault.
    pub fn fault(service: &'static str, status: StatusCode) -> Self {
        Self { service, status }
    }

    /// Returns `true` if the fault is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status,
            StatusCode::BAD_TIMEOUT
                | StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS
                | StatusCode::BAD_COMMUNICATION_ERROR
        )
    }

    /// Returns the severity of the fault.
    pub fn severity(&self) -> ErrorSeverity {
        match self.status {
            StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS | StatusCode::BAD_NO_SUBSCRIPTION => {
                ErrorSeverity::Info
            }
            StatusCode::BAD_SESSION_ID_INVALID | StatusCode::BAD_SESSION_CLOSED => {
                ErrorSeverity::Error
            }
            _ => ErrorSeverity::Warning,
        }
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Session lifecycle errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// CreateSession failed.
    #[error("Failed to create session: {message}")]
    CreationFailed {
        /// Failure description.
        message: String,
        /// Status returned by the server, if any.
        status: Option<StatusCode>,
    },

    /// ActivateSession failed.
    #[error("Failed to activate session: {message}")]
    ActivationFailed {
        /// Failure description.
        message: String,
        /// Status returned by the server, if any.
        status: Option<StatusCode>,
    },

    /// The session was closed.
    #[error("Session closed")]
    Closed,

    /// The session was invalidated by a fatal failure.
    #[error("Session invalidated: {reason}")]
    Invalidated {
        /// Reason for invalidation.
        reason: String,
    },

    /// The client has been shut down.
    #[error("Client shut down")]
    ClientShutdown,
}

impl SessionError {
    /// Creates a session creation failed error.
    pub fn creation_failed(message: impl Into<String>) -> Self {
        Self::CreationFailed {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a session creation failed error from an underlying failure.
    pub fn creation_failed_with(error: &UaError) -> Self {
        Self::CreationFailed {
            message: error.to_string(),
            status: Some(error.status_code()),
        }
    }

    /// Creates a session activation failed error.
    pub fn activation_failed(message: impl Into<String>) -> Self {
        Self::ActivationFailed {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a session activation failed error from an underlying failure.
    pub fn activation_failed_with(error: &UaError) -> Self {
        Self::ActivationFailed {
            message: error.to_string(),
            status: Some(error.status_code()),
        }
    }

    /// Creates a session invalidated error.
    pub fn invalidated(reason: impl Into<String>) -> Self {
        Self::Invalidated {
            reason: reason.into(),
        }
    }

    /// Returns `true` if a new establishment attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CreationFailed { .. } | Self::ActivationFailed { .. } | Self::Invalidated { .. }
        )
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Closed | Self::ClientShutdown => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::CreationFailed { status, .. } | Self::ActivationFailed { status, .. } => {
                status.unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR)
            }
            Self::Closed | Self::ClientShutdown => StatusCode::BAD_SESSION_CLOSED,
            Self::Invalidated { .. } => StatusCode::BAD_SESSION_ID_INVALID,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CreationFailed { .. } => ErrorCode::new(3, 1),
            Self::ActivationFailed { .. } => ErrorCode::new(3, 2),
            Self::Closed => ErrorCode::new(3, 3),
            Self::Invalidated { .. } => ErrorCode::new(3, 4),
            Self::ClientShutdown => ErrorCode::new(3, 5),
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription and monitored item errors.
#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    /// The subscription is not registered.
    #[error("Subscription not found: {subscription_id}")]
    NotFound {
        /// Subscription ID.
        subscription_id: u32,
    },

    /// Invalid subscription parameters.
    #[error("Invalid subscription parameters: {message}")]
    InvalidParameters {
        /// Description.
        message: String,
    },

    /// A monitored item could not be created.
    #[error("Monitored item creation failed for {node_id}: {status}")]
    MonitoredItemFailed {
        /// Target node.
        node_id: String,
        /// Status returned by the server.
        status: StatusCode,
    },

    /// The subscription manager has been shut down.
    #[error("Subscription manager shut down")]
    ManagerShutdown,
}

impl SubscriptionError {
    /// Creates a not found error.
    pub fn not_found(subscription_id: u32) -> Self {
        Self::NotFound { subscription_id }
    }

    /// Creates an invalid parameters error.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Creates a monitored item failure.
    pub fn monitored_item_failed(node_id: impl Into<String>, status: StatusCode) -> Self {
        Self::MonitoredItemFailed {
            node_id: node_id.into(),
            status,
        }
    }

    /// Returns the status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::BAD_SUBSCRIPTION_ID_INVALID,
            Self::InvalidParameters { .. } => StatusCode::BAD_INVALID_ARGUMENT,
            Self::MonitoredItemFailed { status, .. } => *status,
            Self::ManagerShutdown => StatusCode::BAD_SHUTDOWN,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::new(4, 1),
            Self::InvalidParameters { .. } => ErrorCode::new(4, 2),
            Self::MonitoredItemFailed { .. } => ErrorCode::new(4, 3),
            Self::ManagerShutdown => ErrorCode::new(4, 4),
        }
    }
}

// =============================================================================
// SequenceError
// =============================================================================

/// Notification sequencing errors.
#[derive(Debug, Clone, Error)]
pub enum SequenceError {
    /// A republished message carried a different sequence number than requested.
    #[error(
        "Republish sequence mismatch on subscription {subscription_id}: requested {requested}, received {received}"
    )]
    Mismatch {
        /// Subscription ID.
        subscription_id: u32,
        /// Requested sequence number.
        requested: u32,
        /// Received sequence number.
        received: u32,
    },

    /// Recovery of a sequence gap failed.
    #[error("Recovery failed on subscription {subscription_id}: {message}")]
    RecoveryFailed {
        /// Subscription ID.
        subscription_id: u32,
        /// Description.
        message: String,
    },
}

impl SequenceError {
    /// Creates a mismatch error.
    pub fn mismatch(subscription_id: u32, requested: u32, received: u32) -> Self {
        Self::Mismatch {
            subscription_id,
            requested,
            received,
        }
    }

    /// Creates a recovery failure.
    pub fn recovery_failed(subscription_id: u32, message: impl Into<String>) -> Self {
        Self::RecoveryFailed {
            subscription_id,
            message: message.into(),
        }
    }

    /// Returns the status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Mismatch { .. } => StatusCode::BAD_SEQUENCE_NUMBER_INVALID,
            Self::RecoveryFailed { .. } => StatusCode::BAD_MESSAGE_NOT_AVAILABLE,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Mismatch { .. } => ErrorCode::new(5, 1),
            Self::RecoveryFailed { .. } => ErrorCode::new(5, 2),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// A required field is missing.
    #[error("Missing required configuration field: {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A field has an invalid value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Reason.
        reason: String,
    },

    /// A NodeId string could not be parsed.
    #[error("Invalid NodeId '{input}': {reason}")]
    InvalidNodeId {
        /// Input string.
        input: String,
        /// Reason.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates a missing field error.
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an invalid NodeId error.
    pub fn invalid_node_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::new(6, 1),
            Self::InvalidValue { .. } => ErrorCode::new(6, 2),
            Self::InvalidNodeId { .. } => ErrorCode::new(6, 3),
        }
    }
}

// =============================================================================
// TimeoutError
// =============================================================================

/// A request did not complete within the client-side deadline.
#[derive(Debug, Clone, Error)]
#[error("{service} timed out after {duration:?}")]
pub struct TimeoutError {
    /// Name of the service.
    pub service: &'static str,

    /// Elapsed deadline.
    pub duration: Duration,
}

impl TimeoutError {
    /// Creates a request timeout.
    pub fn request(service: &'static str, duration: Duration) -> Self {
        Self { service, duration }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - recovered locally.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::DEBUG,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Transport
/// - 2: Service
/// - 3: Session
/// - 4: Subscription
/// - 5: Sequence
/// - 6: Configuration
/// - 7: Timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-7).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================
