// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::messages::CreateSessionResponse;

use super::UaSession;

// =============================================================================
// SessionEvent
// =============================================================================

/// Input to the session state machine.
///
/// Completion events carry the result of the side effect that produced
/// them, so states never share mutable fields.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A caller needs a session.
    SessionRequested,

    /// CreateSession completed.
    CreateSessionSucceeded(Arc<CreateSessionResponse>),

    /// CreateSession failed.
    CreateSessionFailed(SessionError),

    /// ActivateSession completed.
    ActivateSessionSucceeded(Arc<UaSession>),

    /// ActivateSession failed.
    ActivateSessionFailed(SessionError),

    /// The application asked to close the session.
    CloseRequested,

    /// CloseSession finished, successfully or not.
    CloseCompleted,

    /// The active session was found to be unusable.
    SessionInvalidated(SessionError),
}

impl SessionEvent {
    /// Event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionRequested => "SessionRequested",
            Self::CreateSessionSucceeded(_) => "CreateSessionSucceeded",
            Self::CreateSessionFailed(_) => "CreateSessionFailed",
            Self::ActivateSessionSucceeded(_) => "ActivateSessionSucceeded",
            Self::ActivateSessionFailed(_) => "ActivateSessionFailed",
            Self::CloseRequested => "CloseRequested",
            Self::CloseCompleted => "CloseCompleted",
            Self::SessionInvalidated(_) => "SessionInvalidated",
        }
    }

    /// Failure to report to waiters when this event leads to Inactive.
    pub(crate) fn failure(&self) -> SessionError {
        match self {
            Self::CreateSessionFailed(e)
            | Self::ActivateSessionFailed(e)
            | Self::SessionInvalidated(e) => e.clone(),
            _ => SessionError::Closed,
        }
    }
}

// =============================================================================
// SessionState
// =============================================================================

/// Session lifecycle state.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session and no attempt in progress.
    #[default]
    Inactive,

    /// CreateSession is outstanding.
    Creating,

    /// ActivateSession is outstanding for the created session.
    Activating(Arc<CreateSessionResponse>),

    /// The session is usable.
    Active(Arc<UaSession>),

    /// CloseSession is outstanding.
    Closing(Arc<UaSession>),
}

impl SessionState {
    /// Returns the next state for `event`, or `None` if the event is ignored here.
    pub fn transition(&self, event: &SessionEvent) -> Option<SessionState> {
        use SessionEvent as E;

        match (self, event) {
            (Self::Inactive, E::SessionRequested) => Some(Self::Creating),

            (Self::Creating, E::CreateSessionSucceeded(created)) => {
                Some(Self::Activating(Arc::clone(created)))
            }
            (Self::Creating, E::CreateSessionFailed(_)) => Some(Self::Inactive),

            (Self::Activating(_), E::ActivateSessionSucceeded(session)) => {
                Some(Self::Active(Arc::clone(session)))
            }
            (Self::Activating(_), E::ActivateSessionFailed(_)) => Some(Self::Inactive),

            // Abandon an attempt in progress.
            (Self::Creating | Self::Activating(_), E::CloseRequested) => Some(Self::Inactive),

            (Self::Active(session), E::CloseRequested) => Some(Self::Closing(Arc::clone(session))),
            (Self::Active(_), E::SessionInvalidated(_)) => Some(Self::Inactive),

            (Self::Closing(_), E::CloseCompleted) => Some(Self::Inactive),

            _ => None,
        }
    }

    /// Returns the state discriminant.
    pub fn kind(&self) -> SessionStateKind {
        match self {
            Self::Inactive => SessionStateKind::Inactive,
            Self::Creating => SessionStateKind::Creating,
            Self::Activating(_) => SessionStateKind::Activating,
            Self::Active(_) => SessionStateKind::Active,
            Self::Closing(_) => SessionStateKind::Closing,
        }
    }

    /// The session held by this state, if any.
    pub fn session(&self) -> Option<&Arc<UaSession>> {
        match self {
            Self::Active(session) | Self::Closing(session) => Some(session),
            _ => None,
        }
    }
}

// =============================================================================
// SessionStateKind
// =============================================================================

/// Payload-free view of [`SessionState`] for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStateKind {
    /// No session.
    #[default]
    Inactive,
    /// Creating.
    Creating,
    /// Activating.
    Activating,
    /// Active.
    Active,
    /// Closing.
    Closing,
}

impl SessionStateKind {
    /// Returns `true` if the session is usable.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` while an exchange is outstanding.
    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Creating | Self::Activating | Self::Closing)
    }
}

impl fmt::Display for SessionStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "Inactive"),
            Self::Creating => write!(f, "Creating"),
            Self::Activating => write!(f, "Activating"),
            Self::Active => write!(f, "Active"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ActivateSessionResponse, ResponseHeader};
    use crate::session::tests::create_response;

    fn session() -> Arc<UaSession> {
        let activated = ActivateSessionResponse {
            response_header: ResponseHeader::good(2),
            server_nonce: Vec::new(),
            results: Vec::new(),
        };
        Arc::new(UaSession::new(&create_response(), &activated))
    }

    fn failed() -> SessionError {
        SessionError::creation_failed("BadTimeout")
    }

    #[test]
    fn test_happy_path() {
        let created = Arc::new(create_response());
        let session = session();

        let state = SessionState::Inactive
            .transition(&SessionEvent::SessionRequested)
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::Creating);

        let state = state
            .transition(&SessionEvent::CreateSessionSucceeded(created))
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::Activating);

        let state = state
            .transition(&SessionEvent::ActivateSessionSucceeded(Arc::clone(&session)))
            .unwrap();
        assert_eq!(state.kind(), SessionStateKind::Active);
        assert!(Arc::ptr_eq(state.session().unwrap(), &session));
    }

    #[test]
    fn test_failure_edges() {
        let next = SessionState::Creating
            .transition(&SessionEvent::CreateSessionFailed(failed()))
            .unwrap();
        assert_eq!(next.kind(), SessionStateKind::Inactive);

        let activating = SessionState::Activating(Arc::new(create_response()));
        let next = activating
            .transition(&SessionEvent::ActivateSessionFailed(failed()))
            .unwrap();
        assert_eq!(next.kind(), SessionStateKind::Inactive);

        let active = SessionState::Active(session());
        let next = active
            .transition(&SessionEvent::SessionInvalidated(SessionError::invalidated("x")))
            .unwrap();
        assert_eq!(next.kind(), SessionStateKind::Inactive);
    }

    #[test]
    fn test_close_path() {
        let active = SessionState::Active(session());
        let closing = active.transition(&SessionEvent::CloseRequested).unwrap();
        assert_eq!(closing.kind(), SessionStateKind::Closing);
        assert!(closing.session().is_some());

        let inactive = closing.transition(&SessionEvent::CloseCompleted).unwrap();
        assert_eq!(inactive.kind(), SessionStateKind::Inactive);
    }

    #[test]
    fn test_unhandled_events_ignored() {
        let inactive = SessionState::Inactive;
        assert!(inactive
            .transition(&SessionEvent::CreateSessionFailed(failed()))
            .is_none());
        assert!(inactive.transition(&SessionEvent::CloseRequested).is_none());
        assert!(inactive.transition(&SessionEvent::CloseCompleted).is_none());

        assert!(SessionState::Creating
            .transition(&SessionEvent::SessionRequested)
            .is_none());
        assert!(SessionState::Creating
            .transition(&SessionEvent::ActivateSessionSucceeded(session()))
            .is_none());

        let active = SessionState::Active(session());
        assert!(active.transition(&SessionEvent::SessionRequested).is_none());
        assert!(active
            .transition(&SessionEvent::CreateSessionFailed(failed()))
            .is_none());
    }

    #[test]
    fn test_event_failure_payload() {
        let event = SessionEvent::CreateSessionFailed(failed());
        assert!(matches!(event.failure(), SessionError::CreationFailed { .. }));
        assert!(matches!(
            SessionEvent::CloseCompleted.failure(),
            SessionError::Closed
        ));
        assert_eq!(event.name(), "CreateSessionFailed");
    }

    #[test]
    fn test_state_kind_display() {
        assert_eq!(SessionStateKind::Activating.to_string(), "Activating");
        assert!(SessionStateKind::Active.is_active());
        assert!(SessionStateKind::Closing.is_transitioning());
        assert!(!SessionStateKind::Inactive.is_transitioning());
    }
}
