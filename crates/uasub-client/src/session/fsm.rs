// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session state machine driver.
//!
//! ```text
//!   session() / close() / handle_event()
//!              │ Command
//!              ▼
//!   ┌─────────────────────────┐  spawn   ┌──────────────────────┐
//!   │ driver task             │─────────▶│ side effect          │
//!   │  state, epoch, promise  │          │ Create/Activate/Close│
//!   │  transition + enter     │◀─────────│ exchange             │
//!   └─────────────────────────┘  event   └──────────────────────┘
//!              │ watch
//!              ▼
//!        SessionStateKind
//! ```
//!
//! Every state entry bumps an epoch. Completion events from side effects
//! carry the epoch they were spawned in; events from an earlier epoch are
//! dropped so an abandoned attempt cannot drive the current one.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::RngCore;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{SessionError, UaResult};
use crate::messages::{
    timeout_hint_millis, ActivateSessionRequest, CloseSessionRequest, CreateSessionRequest,
    CreateSessionResponse, RequestHandles, RequestHeader,
};
use crate::transport::{TransportExt, UaTransport};
use crate::types::{NodeId, SecurityPolicy};

use super::{SessionEvent, SessionState, SessionStateKind, SessionStats, UaSession};

type SessionOutcome = Option<Result<Arc<UaSession>, SessionError>>;

// =============================================================================
// SessionPromise
// =============================================================================

/// Session future of one establishment attempt. Completes at most once.
struct SessionPromise {
    tx: watch::Sender<SessionOutcome>,
}

impl SessionPromise {
    fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    fn subscribe(&self) -> watch::Receiver<SessionOutcome> {
        self.tx.subscribe()
    }

    /// Returns `true` if this call completed the promise.
    fn complete(&self, outcome: Result<Arc<UaSession>, SessionError>) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    /// Returns `true` while some caller is waiting on this promise.
    fn has_waiters(&self) -> bool {
        self.tx.borrow().is_none() && self.tx.receiver_count() > 0
    }

    fn resolved_session(&self) -> Option<Arc<UaSession>> {
        match &*self.tx.borrow() {
            Some(Ok(session)) if session.is_valid() => Some(Arc::clone(session)),
            _ => None,
        }
    }
}

enum Command {
    Event {
        epoch: Option<u64>,
        event: SessionEvent,
    },
    Close(oneshot::Sender<()>),
    Shutdown,
}

// =============================================================================
// SessionFsm
// =============================================================================

/// Handle to the session state machine.
///
/// Dropping the handle stops the driver and fails any pending session
/// future with [`SessionError::ClientShutdown`].
pub struct SessionFsm {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionStateKind>,
    promise: Arc<Mutex<SessionPromise>>,
    stats: Arc<SessionStats>,
}

impl SessionFsm {
    /// Creates the state machine in Inactive and spawns its driver.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        transport: Arc<dyn UaTransport>,
        config: Arc<ClientConfig>,
        handles: Arc<RequestHandles>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SessionStateKind::Inactive);
        let promise = Arc::new(Mutex::new(SessionPromise::new()));
        let stats = Arc::new(SessionStats::new());

        let driver = Driver {
            state: SessionState::Inactive,
            epoch: 0,
            effects: EffectContext {
                transport,
                config,
                handles,
            },
            commands: commands.clone(),
            promise: Arc::clone(&promise),
            close_waiters: Vec::new(),
            state_tx,
            stats: Arc::clone(&stats),
        };
        tokio::spawn(driver.run(rx));

        Self {
            commands,
            state,
            promise,
            stats,
        }
    }

    /// Returns the active session, establishing one if necessary.
    ///
    /// Concurrent callers share the same attempt. A failed attempt fails all
    /// of its waiters; the next call starts a new attempt. Callers arriving
    /// while the session is closing wait for the attempt that follows.
    pub async fn session(&self) -> Result<Arc<UaSession>, SessionError> {
        loop {
            let mut outcome = self.promise.lock().subscribe();

            if self.send(None, SessionEvent::SessionRequested).is_err() {
                return Err(SessionError::ClientShutdown);
            }

            let result = match &*outcome
                .wait_for(Option::is_some)
                .await
                .map_err(|_| SessionError::ClientShutdown)?
            {
                Some(result) => result.clone(),
                None => Err(SessionError::ClientShutdown),
            };

            match result {
                Ok(session) if !session.is_valid() => {
                    // Invalidated but not yet replaced; wait for the driver
                    // to retire this promise.
                    trace!(
                        session_id = %session.session_id(),
                        "Resolved session already invalid"
                    );
                    let _ = outcome.changed().await;
                }
                result => return result,
            }
        }
    }

    /// Returns the active session without starting an attempt.
    pub fn current_session(&self) -> Option<Arc<UaSession>> {
        if !self.state().is_active() {
            return None;
        }
        self.promise.lock().resolved_session()
    }

    /// Feeds an event to the state machine.
    pub fn handle_event(&self, event: SessionEvent) {
        if self.send(None, event).is_err() {
            trace!("Session event dropped after shutdown");
        }
    }

    /// Reports that `session` can no longer be used.
    ///
    /// The session stops being handed out immediately. Ignored if `session`
    /// is not the current active session.
    pub fn invalidate(&self, session: &Arc<UaSession>, error: SessionError) {
        let current = self.current_session();
        if current.is_some_and(|current| Arc::ptr_eq(&current, session)) {
            session.invalidate();
            self.handle_event(SessionEvent::SessionInvalidated(error));
        }
    }

    /// Closes the active session and waits until it has reached Inactive.
    ///
    /// An attempt in progress is abandoned. Returns immediately if there is
    /// nothing to close.
    pub async fn close(&self) {
        let (done, closed) = oneshot::channel();
        if self.commands.send(Command::Close(done)).is_err() {
            return;
        }
        let _ = closed.await;
    }

    /// Current state.
    pub fn state(&self) -> SessionStateKind {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<SessionStateKind> {
        self.state.clone()
    }

    /// Lifecycle counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    fn send(&self, epoch: Option<u64>, event: SessionEvent) -> Result<(), ()> {
        self.commands
            .send(Command::Event { epoch, event })
            .map_err(|_| ())
    }
}

impl Drop for SessionFsm {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl std::fmt::Debug for SessionFsm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFsm")
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Driver
// =============================================================================

struct Driver {
    state: SessionState,
    epoch: u64,
    effects: EffectContext,
    commands: mpsc::UnboundedSender<Command>,
    promise: Arc<Mutex<SessionPromise>>,
    close_waiters: Vec<oneshot::Sender<()>>,
    state_tx: watch::Sender<SessionStateKind>,
    stats: Arc<SessionStats>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Event { epoch, event } => self.handle(epoch, event),
                Command::Close(done) => {
                    self.close_waiters.push(done);
                    self.handle(None, SessionEvent::CloseRequested);
                    if matches!(self.state, SessionState::Inactive) {
                        self.release_close_waiters();
                    }
                }
                Command::Shutdown => break,
            }
        }

        self.shutdown();
    }

    fn handle(&mut self, epoch: Option<u64>, event: SessionEvent) {
        if epoch.is_some_and(|epoch| epoch != self.epoch) {
            trace!(event = event.name(), "Stale session event dropped");
            return;
        }

        let Some(next) = self.state.transition(&event) else {
            trace!(
                state = %self.state.kind(),
                event = event.name(),
                "Session event ignored"
            );
            return;
        };

        let previous = std::mem::replace(&mut self.state, next);
        self.epoch = self.epoch.wrapping_add(1);
        self.state_tx.send_replace(self.state.kind());

        debug!(
            from = %previous.kind(),
            to = %self.state.kind(),
            event = event.name(),
            "Session state transition"
        );

        self.enter(previous, event);
    }

    fn enter(&mut self, previous: SessionState, event: SessionEvent) {
        match self.state.clone() {
            SessionState::Inactive => self.enter_inactive(&previous, &event),
            SessionState::Creating => {
                let effects = self.effects.clone();
                self.spawn_effect(async move { effects.create_session().await });
            }
            SessionState::Activating(created) => {
                self.stats.record_creation();
                let effects = self.effects.clone();
                self.spawn_effect(async move { effects.activate_session(created).await });
            }
            SessionState::Active(session) => {
                self.stats.record_activation();
                info!(
                    session_id = %session.session_id(),
                    revised_timeout_ms = session.revised_session_timeout().as_millis() as u64,
                    "Session activated"
                );
                self.promise.lock().complete(Ok(session));
            }
            SessionState::Closing(session) => {
                // Callers arriving while closing wait on this promise and are
                // carried over to the next attempt.
                *self.promise.lock() = SessionPromise::new();
                let effects = self.effects.clone();
                self.spawn_effect(async move { effects.close_session(session).await });
            }
        }
    }

    fn enter_inactive(&mut self, previous: &SessionState, event: &SessionEvent) {
        if let Some(session) = previous.session() {
            session.invalidate();
        }
        self.release_close_waiters();

        if matches!(previous, SessionState::Closing(_)) {
            self.stats.record_close();
            info!("Session closed");

            if self.promise.lock().has_waiters() {
                debug!("Session requested while closing, opening a new one");
                let _ = self.commands.send(Command::Event {
                    epoch: None,
                    event: SessionEvent::SessionRequested,
                });
                return;
            }
        }

        let failure = event.failure();
        let old = std::mem::replace(&mut *self.promise.lock(), SessionPromise::new());
        if old.complete(Err(failure.clone())) && !matches!(failure, SessionError::Closed) {
            self.stats.record_failure();
            warn!(event = event.name(), error = %failure, "Session attempt failed");
        }
    }

    fn release_close_waiters(&mut self) {
        for done in self.close_waiters.drain(..) {
            let _ = done.send(());
        }
    }

    fn spawn_effect<F>(&self, effect: F)
    where
        F: Future<Output = SessionEvent> + Send + 'static,
    {
        let commands = self.commands.clone();
        let epoch = Some(self.epoch);
        tokio::spawn(async move {
            let event = effect.await;
            let _ = commands.send(Command::Event { epoch, event });
        });
    }

    fn shutdown(&mut self) {
        if let Some(session) = self.state.session() {
            session.invalidate();
        }
        self.state = SessionState::Inactive;
        self.state_tx.send_replace(SessionStateKind::Inactive);
        self.release_close_waiters();

        let failed = SessionPromise::new();
        failed.complete(Err(SessionError::ClientShutdown));
        let old = std::mem::replace(&mut *self.promise.lock(), failed);
        old.complete(Err(SessionError::ClientShutdown));

        debug!("Session state machine stopped");
    }
}

// =============================================================================
// Side effects
// =============================================================================

#[derive(Clone)]
struct EffectContext {
    transport: Arc<dyn UaTransport>,
    config: Arc<ClientConfig>,
    handles: Arc<RequestHandles>,
}

impl EffectContext {
    fn header(&self, authentication_token: NodeId) -> RequestHeader {
        RequestHeader::new(
            authentication_token,
            self.handles.next(),
            timeout_hint_millis(self.config.request_timeout),
        )
    }

    async fn create_session(self) -> SessionEvent {
        match self.send_create_session().await {
            Ok(created) => {
                debug!(session_id = %created.session_id, "Session created");
                SessionEvent::CreateSessionSucceeded(Arc::new(created))
            }
            Err(e) => {
                e.log("CreateSession");
                SessionEvent::CreateSessionFailed(SessionError::creation_failed_with(&e))
            }
        }
    }

    async fn send_create_session(&self) -> UaResult<CreateSessionResponse> {
        let endpoint = self.transport.endpoint();
        let client_certificate = self.transport.local_certificate().unwrap_or_else(|e| {
            debug!(error = %e, "No local certificate, sending an empty one");
            Vec::new()
        });
        let server_uri = endpoint
            .server
            .has_gateway()
            .then(|| endpoint.server.application_uri.clone());

        let request = CreateSessionRequest {
            request_header: self.header(NodeId::null()),
            client_description: self.config.application_description(),
            server_uri,
            endpoint_url: endpoint.endpoint_url,
            session_name: self.config.effective_session_name(),
            client_nonce: client_nonce(self.transport.security_policy()),
            client_certificate,
            requested_session_timeout: self.config.session_timeout.as_secs_f64() * 1000.0,
            max_response_message_size: self.config.max_response_message_size,
        };

        self.transport
            .send_with_timeout(request, self.config.request_timeout)
            .await
    }

    async fn activate_session(self, created: Arc<CreateSessionResponse>) -> SessionEvent {
        let request = ActivateSessionRequest {
            request_header: self.header(created.authentication_token.clone()),
            locale_ids: self.config.locale_ids.clone(),
            user_identity_token: self.config.user_identity.clone(),
        };

        match self
            .transport
            .send_with_timeout(request, self.config.request_timeout)
            .await
        {
            Ok(activated) => {
                SessionEvent::ActivateSessionSucceeded(Arc::new(UaSession::new(&created, &activated)))
            }
            Err(e) => {
                e.log("ActivateSession");
                SessionEvent::ActivateSessionFailed(SessionError::activation_failed_with(&e))
            }
        }
    }

    async fn close_session(self, session: Arc<UaSession>) -> SessionEvent {
        let request = CloseSessionRequest {
            request_header: self.header(session.authentication_token().clone()),
            delete_subscriptions: true,
        };

        if let Err(e) = self
            .transport
            .send_with_timeout(request, self.config.request_timeout)
            .await
        {
            e.log("CloseSession");
        }

        session.invalidate();
        SessionEvent::CloseCompleted
    }
}

/// Fresh client nonce sized for the channel's security policy.
fn client_nonce(policy: SecurityPolicy) -> Vec<u8> {
    let mut nonce = vec![0u8; policy.nonce_length()];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UaError;
    use crate::messages::{
        ActivateSessionResponse, CloseSessionResponse, RequestMessage, ResponseHeader,
        ResponseMessage,
    };
    use crate::types::{EndpointDescription, StatusCode};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct ScriptedTransport {
        fail_create: bool,
        close_gate: Option<Arc<Notify>>,
        creates: AtomicUsize,
        closes: AtomicUsize,
        requests: Mutex<Vec<RequestMessage>>,
    }

    #[async_trait]
    impl UaTransport for ScriptedTransport {
        async fn send_request(&self, request: RequestMessage) -> UaResult<ResponseMessage> {
            let handle = request.request_header().request_handle;
            self.requests.lock().push(request.clone());
            match request {
                RequestMessage::CreateSession(_) => {
                    self.creates.fetch_add(1, Ordering::SeqCst);
                    if self.fail_create {
                        return Err(UaError::send_failed("connection reset"));
                    }
                    let mut created = crate::session::tests::create_response();
                    created.response_header = ResponseHeader::good(handle);
                    Ok(created.into())
                }
                RequestMessage::ActivateSession(_) => Ok(ActivateSessionResponse {
                    response_header: ResponseHeader::good(handle),
                    server_nonce: vec![3; 32],
                    results: Vec::new(),
                }
                .into()),
                RequestMessage::CloseSession(_) => {
                    self.closes.fetch_add(1, Ordering::SeqCst);
                    if let Some(gate) = &self.close_gate {
                        gate.notified().await;
                    }
                    Ok(CloseSessionResponse {
                        response_header: ResponseHeader::good(handle),
                    }
                    .into())
                }
                _ => Ok(CloseSessionResponse {
                    response_header: ResponseHeader::with_status(
                        handle,
                        StatusCode::BAD_NOTHING_TO_DO,
                    ),
                }
                .into()),
            }
        }

        fn security_policy(&self) -> SecurityPolicy {
            SecurityPolicy::Basic128Rsa15
        }

        fn local_certificate(&self) -> UaResult<Vec<u8>> {
            Err(UaError::transport(
                crate::error::TransportError::certificate_unavailable("no store"),
            ))
        }

        fn endpoint(&self) -> EndpointDescription {
            EndpointDescription {
                endpoint_url: "opc.tcp://localhost:4840".to_string(),
                ..Default::default()
            }
        }
    }

    fn fsm(transport: Arc<ScriptedTransport>) -> SessionFsm {
        SessionFsm::new(
            transport,
            Arc::new(ClientConfig::default()),
            Arc::new(RequestHandles::new()),
        )
    }

    #[tokio::test]
    async fn test_session_reaches_active() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(Arc::clone(&transport));

        let session = fsm.session().await.unwrap();
        assert!(session.is_valid());
        assert_eq!(fsm.state(), SessionStateKind::Active);
        assert_eq!(fsm.stats().creations(), 1);
        assert_eq!(fsm.stats().activations(), 1);

        let again = fsm.session().await.unwrap();
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(transport.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_request_contents() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(Arc::clone(&transport));
        fsm.session().await.unwrap();

        let requests = transport.requests.lock();
        let RequestMessage::CreateSession(create) = &requests[0] else {
            panic!("first request was {}", requests[0].service_name());
        };
        assert_eq!(create.client_nonce.len(), 16);
        assert!(create.client_certificate.is_empty());
        assert!(create.server_uri.is_none());
        assert_eq!(create.endpoint_url, "opc.tcp://localhost:4840");

        let RequestMessage::ActivateSession(activate) = &requests[1] else {
            panic!("second request was {}", requests[1].service_name());
        };
        assert_eq!(
            activate.request_header.authentication_token,
            NodeId::opaque(0, vec![9u8; 16])
        );
    }

    #[tokio::test]
    async fn test_create_failure_fails_waiters() {
        let transport = Arc::new(ScriptedTransport {
            fail_create: true,
            ..Default::default()
        });
        let fsm = fsm(Arc::clone(&transport));

        let (a, b) = tokio::join!(fsm.session(), fsm.session());
        assert!(matches!(a, Err(SessionError::CreationFailed { .. })));
        assert!(matches!(b, Err(SessionError::CreationFailed { .. })));
        assert_eq!(fsm.state(), SessionStateKind::Inactive);
        assert_eq!(fsm.stats().failures(), 1);
        assert_eq!(transport.creates.load(Ordering::SeqCst), 1);

        // Not retried automatically; the next call makes a new attempt.
        let _ = fsm.session().await;
        assert_eq!(transport.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_close_invalidates_session() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(Arc::clone(&transport));
        let session = fsm.session().await.unwrap();

        fsm.close().await;

        assert_eq!(fsm.state(), SessionStateKind::Inactive);
        assert!(!session.is_valid());
        assert!(fsm.current_session().is_none());
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
        assert_eq!(fsm.stats().closes(), 1);
        assert_eq!(fsm.stats().failures(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_returns_to_inactive() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(Arc::clone(&transport));
        let session = fsm.session().await.unwrap();

        fsm.invalidate(&session, SessionError::invalidated("BadSessionIdInvalid"));
        let mut state = fsm.watch_state();
        tokio::time::timeout(
            Duration::from_secs(1),
            state.wait_for(|kind| *kind == SessionStateKind::Inactive),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!session.is_valid());

        let next = fsm.session().await.unwrap();
        assert!(!Arc::ptr_eq(&session, &next));
    }

    #[tokio::test]
    async fn test_invalidated_session_not_handed_out() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(Arc::clone(&transport));
        let session = fsm.session().await.unwrap();

        fsm.invalidate(&session, SessionError::invalidated("BadSessionIdInvalid"));
        assert!(!session.is_valid());
        assert!(fsm.current_session().is_none());

        let next = fsm.session().await.unwrap();
        assert!(next.is_valid());
        assert!(!Arc::ptr_eq(&session, &next));
        assert_eq!(transport.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_session_requested_while_closing_opens_next() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport {
            close_gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let fsm = Arc::new(fsm(Arc::clone(&transport)));
        let first = fsm.session().await.unwrap();

        let closing = tokio::spawn({
            let fsm = Arc::clone(&fsm);
            async move { fsm.close().await }
        });
        let mut state = fsm.watch_state();
        tokio::time::timeout(
            Duration::from_secs(1),
            state.wait_for(|kind| *kind == SessionStateKind::Closing),
        )
        .await
        .unwrap()
        .unwrap();

        let waiter = tokio::spawn({
            let fsm = Arc::clone(&fsm);
            async move { fsm.session().await }
        });
        tokio::time::timeout(Duration::from_secs(1), async {
            while !fsm.promise.lock().has_waiters() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        gate.notify_one();
        closing.await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(!first.is_valid());
        assert!(next.is_valid());
        assert!(!Arc::ptr_eq(&first, &next));
        assert_eq!(fsm.state(), SessionStateKind::Active);
        assert_eq!(transport.creates.load(Ordering::SeqCst), 2);
        assert_eq!(fsm.stats().closes(), 1);
        assert_eq!(fsm.stats().failures(), 0);
    }

    #[tokio::test]
    async fn test_close_when_inactive_returns() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(Arc::clone(&transport));

        tokio::time::timeout(Duration::from_secs(1), fsm.close())
            .await
            .unwrap();

        assert_eq!(fsm.state(), SessionStateKind::Inactive);
        assert_eq!(transport.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_fails_pending_waiters() {
        let transport = Arc::new(ScriptedTransport::default());
        let fsm = fsm(transport);
        let mut outcome = fsm.promise.lock().subscribe();

        drop(fsm);

        let resolved = tokio::time::timeout(Duration::from_secs(1), outcome.wait_for(Option::is_some))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            &*resolved,
            Some(Err(SessionError::ClientShutdown))
        ));
    }

    #[test]
    fn test_client_nonce_length() {
        assert!(client_nonce(SecurityPolicy::None).is_empty());
        assert_eq!(client_nonce(SecurityPolicy::Basic128Rsa15).len(), 16);
        assert_eq!(client_nonce(SecurityPolicy::Basic256Sha256).len(), 32);
    }
}
