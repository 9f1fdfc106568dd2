// Session state machine
// Unauthenticated -> AwaitingToken -> Authenticated, with AwaitingToken -> Unauthenticated on failure

use super::protocol::{self, ClientInfo, HandshakeError, Session};
use super::traits::{RequestId, Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AwaitingToken { request: RequestId },
    Authenticated(Session),
}

/// What a handshake completion did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Authenticated,
    Rejected(HandshakeError),
    /// The request never produced a protocol answer; scrobbling stays enabled
    Unreachable(HandshakeError),
    /// Not the outstanding handshake
    Stale,
}

pub struct SessionManager {
    client: ClientInfo,
    state: SessionState,
}

impl SessionManager {
    pub fn new(client: ClientInfo) -> Self {
        Self {
            client,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The active session, if authenticated
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_awaiting_token(&self) -> bool {
        matches!(self.state, SessionState::AwaitingToken { .. })
    }

    /// Send a handshake unless one is already outstanding.
    ///
    /// Re-handshaking from Authenticated drops the current session until the
    /// new one arrives.
    pub fn start_handshake<T: Transport>(
        &mut self,
        transport: &mut T,
        username: &str,
        password: &str,
        now: i64,
    ) -> Option<RequestId> {
        if let SessionState::AwaitingToken { request } = self.state {
            log::debug!("Handshake {} already in flight", request);
            return None;
        }

        let request = protocol::handshake_request(&self.client, username, password, now);
        log::info!("Logging in to {} as {}", self.client.handshake_url, username);

        let id = transport.dispatch(request);
        self.state = SessionState::AwaitingToken { request: id };
        Some(id)
    }

    /// Apply the completion of handshake `id`
    pub fn on_handshake_response(
        &mut self,
        id: RequestId,
        outcome: Result<String, TransportError>,
    ) -> HandshakeOutcome {
        match self.state {
            SessionState::AwaitingToken { request } if request == id => {}
            _ => {
                log::debug!("Ignoring stale handshake reply {}", id);
                return HandshakeOutcome::Stale;
            }
        }

        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Handshake request failed: {}", e);
                self.state = SessionState::Unauthenticated;
                return HandshakeOutcome::Unreachable(HandshakeError::Transport(e.to_string()));
            }
        };

        match protocol::parse_handshake(&body) {
            Ok(session) => {
                log::info!("Authenticated, session {}", session.id);
                log::debug!(
                    "Now playing endpoint: {}, submission endpoint: {}",
                    session.now_playing_url,
                    session.submission_url
                );
                self.state = SessionState::Authenticated(session);
                HandshakeOutcome::Authenticated
            }
            Err(e) => {
                log::error!("Authentication problem: {}", e);
                self.state = SessionState::Unauthenticated;
                HandshakeOutcome::Rejected(e)
            }
        }
    }

    /// Forget the session and any outstanding handshake
    pub fn reset(&mut self) {
        self.state = SessionState::Unauthenticated;
    }
}
