//! The session state machine.
//!
//! `SessionState::transition` is the only place a state is derived from the
//! previous one. Every `(state, event)` pair it does not list is rejected and
//! leaves the state untouched.

use std::fmt;

use thiserror::Error;

use crate::models::{Credential, Identity, Role};

/// Identity and credential that passed validation. Holding one means both
/// are present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Identity,
    credential: Credential,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session field '{0}' is empty")]
pub struct InvalidSession(pub &'static str);

impl Session {
    pub fn new(identity: Identity, credential: Credential) -> Result<Self, InvalidSession> {
        let required = [
            ("id", identity.id.as_str()),
            ("username", identity.username.as_str()),
            ("auth_token", credential.access_token.as_str()),
            ("refresh_token", credential.refresh_token.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(InvalidSession(field));
        }
        Ok(Self {
            identity,
            credential,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn access_token(&self) -> &str {
        &self.credential.access_token
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not yet restored from storage.
    #[default]
    Unknown,
    /// A login or register call is in flight.
    Authenticating,
    Authenticated(Session),
    Anonymous,
}

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Startup restore finished, with the stored session if one was valid.
    Restored(Option<Session>),
    AttemptStarted,
    AttemptSucceeded(Session),
    AttemptFailed,
    LoggedOut,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Restored(_) => "restore",
            SessionEvent::AttemptStarted => "sign-in attempt",
            SessionEvent::AttemptSucceeded(_) => "sign-in success",
            SessionEvent::AttemptFailed => "sign-in failure",
            SessionEvent::LoggedOut => "logout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event} while the session is {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Anonymous => "anonymous",
        }
    }

    pub fn transition(&self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::Unknown, E::Restored(Some(session))) => Ok(S::Authenticated(session)),
            (S::Unknown, E::Restored(None)) => Ok(S::Anonymous),
            (S::Anonymous, E::AttemptStarted) => Ok(S::Authenticating),
            (S::Authenticating, E::AttemptSucceeded(session)) => Ok(S::Authenticated(session)),
            (S::Authenticating, E::AttemptFailed) => Ok(S::Anonymous),
            (_, E::LoggedOut) => Ok(S::Anonymous),
            (state, event) => Err(TransitionError {
                state: state.name(),
                event: event.name(),
            }),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_admin(&self) -> bool {
        self.session().map(|s| s.role() == Role::Admin).unwrap_or(false)
    }

    /// Transient states a consumer should show as loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Unknown | SessionState::Authenticating)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Authenticated(session) => write!(
                f,
                "signed in as {} ({})",
                session.identity().username,
                session.role()
            ),
            other => f.write_str(other.name()),
        }
    }
}
