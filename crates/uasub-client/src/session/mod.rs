// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle.
//!
//! A session is established by an event-driven state machine:
//!
//! ```text
//!            SessionRequested
//!  Inactive ─────────────────▶ Creating
//!     ▲  ▲                        │ CreateSessionSucceeded
//!     │  │ CreateSessionFailed    ▼
//!     │  └──────────────────── Activating
//!     │    ActivateSessionFailed  │ ActivateSessionSucceeded
//!     │                           ▼
//!     │  SessionInvalidated    Active
//!     ├───────────────────────────┤ CloseRequested
//!     │                           ▼
//!     └─────────────────────── Closing
//!            CloseCompleted
//! ```
//!
//! [`SessionState::transition`] is a pure function of the current state and
//! an event. [`SessionFsm`] owns the current state on a single task, runs
//! each state's entry action, and resolves the session future of the
//! current attempt exactly once.

mod fsm;
mod state;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::messages::{ActivateSessionResponse, CreateSessionResponse};
use crate::types::NodeId;

pub use fsm::SessionFsm;
pub use state::{SessionEvent, SessionState, SessionStateKind};

// =============================================================================
// UaSession
// =============================================================================

/// An activated session.
///
/// Shared read-mostly once the state machine reaches Active. A session is
/// invalidated when it is closed or found to be unusable; request issuing
/// code checks [`is_valid`](Self::is_valid) before use.
pub struct UaSession {
    session_id: NodeId,
    authentication_token: NodeId,
    revised_session_timeout: Duration,
    max_request_message_size: u32,
    server_nonce: Vec<u8>,
    server_certificate: Vec<u8>,
    activated_at: DateTime<Utc>,
    valid: AtomicBool,
}

impl UaSession {
    /// Builds a session from the create and activate results.
    pub fn new(created: &CreateSessionResponse, activated: &ActivateSessionResponse) -> Self {
        let timeout_ms = created.revised_session_timeout.max(0.0);
        Self {
            session_id: created.session_id.clone(),
            authentication_token: created.authentication_token.clone(),
            revised_session_timeout: Duration::from_secs_f64(timeout_ms / 1000.0),
            max_request_message_size: created.max_request_message_size,
            server_nonce: activated.server_nonce.clone(),
            server_certificate: created.server_certificate.clone(),
            activated_at: Utc::now(),
            valid: AtomicBool::new(true),
        }
    }

    /// Server-assigned session id.
    pub fn session_id(&self) -> &NodeId {
        &self.session_id
    }

    /// Token placed in every request header.
    pub fn authentication_token(&self) -> &NodeId {
        &self.authentication_token
    }

    /// Session timeout revised by the server.
    pub fn revised_session_timeout(&self) -> Duration {
        self.revised_session_timeout
    }

    /// Largest request the server accepts, 0 for no limit.
    pub fn max_request_message_size(&self) -> u32 {
        self.max_request_message_size
    }

    /// Most recent server nonce.
    pub fn server_nonce(&self) -> &[u8] {
        &self.server_nonce
    }

    /// Server certificate.
    pub fn server_certificate(&self) -> &[u8] {
        &self.server_certificate
    }

    /// Activation time.
    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// Returns `true` until the session is closed or invalidated.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl fmt::Debug for UaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaSession")
            .field("session_id", &self.session_id)
            .field("revised_session_timeout", &self.revised_session_timeout)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Counters for session lifecycle operations.
#[derive(Debug, Default)]
pub struct SessionStats {
    creations: AtomicU64,
    activations: AtomicU64,
    failures: AtomicU64,
    closes: AtomicU64,
}

impl SessionStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful CreateSession.
    pub fn record_creation(&self) {
        self.creations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session reaching Active.
    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a session future completing with a failure.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a closed session.
    pub fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }

    /// Successful CreateSession exchanges.
    pub fn creations(&self) -> u64 {
        self.creations.load(Ordering::Relaxed)
    }

    /// Sessions that reached Active.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Session futures completed with a failure.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Sessions closed.
    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ResponseHeader;

    pub(crate) fn create_response() -> CreateSessionResponse {
        CreateSessionResponse {
            response_header: ResponseHeader::good(1),
            session_id: NodeId::numeric(1, 1001),
            authentication_token: NodeId::opaque(0, vec![9u8; 16]),
            revised_session_timeout: 30_000.0,
            server_nonce: vec![1; 32],
            server_certificate: vec![0x30, 0x82],
            server_endpoints: Vec::new(),
            max_request_message_size: 4_194_304,
        }
    }

    #[test]
    fn test_session_from_responses() {
        let activated = ActivateSessionResponse {
            response_header: ResponseHeader::good(2),
            server_nonce: vec![7; 32],
            results: Vec::new(),
        };
        let session = UaSession::new(&create_response(), &activated);

        assert_eq!(session.session_id(), &NodeId::numeric(1, 1001));
        assert_eq!(session.revised_session_timeout(), Duration::from_secs(30));
        assert_eq!(session.server_nonce(), &[7u8; 32][..]);
        assert_eq!(session.max_request_message_size(), 4_194_304);
        assert!(session.is_valid());

        session.invalidate();
        assert!(!session.is_valid());
    }

    #[test]
    fn test_session_stats() {
        let stats = SessionStats::new();
        stats.record_creation();
        stats.record_activation();
        stats.record_failure();
        stats.record_failure();

        assert_eq!(stats.creations(), 1);
        assert_eq!(stats.activations(), 1);
        assert_eq!(stats.failures(), 2);
        assert_eq!(stats.closes(), 0);
    }
}
