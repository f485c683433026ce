//! The session store: single owner of the current session.
//!
//! Mutating operations take `&mut self`, so one store can never run two
//! transitions at once. Consumers that only need to watch the session use
//! `subscribe`.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, Identity, LoginRequest, RegisterRequest};
use crate::storage::KeyValueStore;

use super::credentials;
use super::session::{InvalidSession, Session, SessionEvent, SessionState, TransitionError};

/// The backend calls a session store depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    async fn sign_up(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// Token to attach to subsequent requests, or none.
    fn set_access_token(&self, token: Option<&str>);
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn sign_in(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.login(request).await
    }

    async fn sign_up(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.register(request).await
    }

    fn set_access_token(&self, token: Option<&str>) {
        self.set_token(token.map(str::to_string));
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Server returned an incomplete session: {0}")]
    InvalidSession(#[from] InvalidSession),

    #[error("Failed to save session: {0:#}")]
    Storage(anyhow::Error),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl SessionError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SessionError::Api(e) => Some(e),
            _ => None,
        }
    }
}

pub struct SessionStore<S, A> {
    storage: S,
    auth: A,
    state: watch::Sender<SessionState>,
}

impl<S: KeyValueStore, A: AuthBackend> SessionStore<S, A> {
    /// A store in the `Unknown` state. Call `restore` before use.
    pub fn new(storage: S, auth: A) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            storage,
            auth,
            state,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    // =========================================================================
    // Projections
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().session().map(|s| s.identity().clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.access_token().to_string())
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn apply(&mut self, event: SessionEvent) -> Result<(), TransitionError> {
        let next = self.state.borrow().transition(event)?;
        debug!(from = self.state.borrow().name(), to = next.name(), "Session transition");

        self.auth
            .set_access_token(next.session().map(|s| s.access_token()));
        self.state.send_replace(next);
        Ok(())
    }

    /// Resolve the startup state from storage. Only acts while `Unknown`.
    pub fn restore(&mut self) {
        if !matches!(*self.state.borrow(), SessionState::Unknown) {
            debug!("Session already restored");
            return;
        }

        let stored = match credentials::load(&self.storage) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored session");
                None
            }
        };

        if stored.is_none() {
            // Leftovers from a partial write must not survive into the next run
            if let Err(e) = credentials::clear(&self.storage) {
                warn!(error = %e, "Failed to clear stored session");
            }
        }

        match &stored {
            Some(session) => info!(
                user_id = %session.identity().id,
                role = %session.role(),
                "Restored session"
            ),
            None => debug!("No stored session"),
        }

        if let Err(e) = self.apply(SessionEvent::Restored(stored)) {
            warn!(error = %e, "Restore rejected");
        }
    }

    pub async fn login(&mut self, request: &LoginRequest) -> Result<Identity, SessionError> {
        if let Some(field) = request.missing_field() {
            return Err(SessionError::MissingField(field));
        }

        self.apply(SessionEvent::AttemptStarted)?;
        debug!(email = %request.email, "Signing in");
        let result = self.auth.sign_in(request).await;
        self.complete_attempt(result)
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<Identity, SessionError> {
        if let Some(field) = request.missing_field() {
            return Err(SessionError::MissingField(field));
        }

        self.apply(SessionEvent::AttemptStarted)?;
        debug!(username = %request.username, "Registering");
        let result = self.auth.sign_up(request).await;
        self.complete_attempt(result)
    }

    fn complete_attempt(&mut self, result: Result<AuthResponse, ApiError>) -> Result<Identity, SessionError> {
        let outcome = result
            .map_err(SessionError::from)
            .and_then(|resp| Session::new(resp.user, resp.token).map_err(SessionError::from))
            .and_then(|session| {
                credentials::save(&self.storage, &session).map_err(SessionError::Storage)?;
                Ok(session)
            });

        match outcome {
            Ok(session) => {
                let identity = session.identity().clone();
                self.apply(SessionEvent::AttemptSucceeded(session))?;
                info!(user_id = %identity.id, role = %identity.role, "Signed in");
                Ok(identity)
            }
            Err(e) => {
                if matches!(e, SessionError::Storage(_)) {
                    if let Err(clear_err) = credentials::clear(&self.storage) {
                        warn!(error = %clear_err, "Failed to clear partially saved session");
                    }
                }
                self.apply(SessionEvent::AttemptFailed)?;
                warn!(error = %e, "Sign-in failed");
                Err(e)
            }
        }
    }

    /// Clear stored data and become `Anonymous`, whatever the current state.
    pub fn logout(&mut self) {
        if let Err(e) = credentials::clear(&self.storage) {
            warn!(error = %e, "Failed to clear stored session");
        }
        if let Err(e) = self.apply(SessionEvent::LoggedOut) {
            warn!(error = %e, "Logout rejected");
        }
        info!("Signed out");
    }

    /// Log out if `err` says the token was rejected. Returns whether it did.
    ///
    /// Nothing calls this automatically; consumers opt in per request.
    pub fn handle_api_error(&mut self, err: &ApiError) -> bool {
        if err.is_unauthorized() && self.is_authenticated() {
            warn!("Access token rejected, signing out");
            self.logout();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use super::*;
    use crate::auth::credentials::{ACCESS_TOKEN_KEY, IDENTITY_KEY, REFRESH_TOKEN_KEY};
    use crate::models::{Credential, Role};
    use crate::storage::{FileStore, MemoryStore};

    /// Replays queued responses and records the token it was handed.
    #[derive(Default)]
    struct FakeBackend {
        responses: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
        token: Mutex<Option<String>>,
        calls: Mutex<usize>,
    }

    impl FakeBackend {
        fn replying(response: Result<AuthResponse, ApiError>) -> Self {
            let backend = Self::default();
            backend.responses.lock().unwrap().push_back(response);
            backend
        }

        fn token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn next(&self) -> Result<AuthResponse, ApiError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no response queued")
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn sign_in(&self, _request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            self.next()
        }

        async fn sign_up(&self, _request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            self.next()
        }

        fn set_access_token(&self, token: Option<&str>) {
            *self.token.lock().unwrap() = token.map(str::to_string);
        }
    }

    fn auth_response(role: Role) -> AuthResponse {
        AuthResponse {
            token: Credential {
                access_token: "T".to_string(),
                refresh_token: "R".to_string(),
            },
            user: Identity {
                id: "1".to_string(),
                username: "u".to_string(),
                role,
                email: None,
            },
        }
    }

    fn credentials() -> LoginRequest {
        LoginRequest::new("u@x.com", "p")
    }

    fn restored(
        storage: MemoryStore,
        backend: FakeBackend,
    ) -> SessionStore<MemoryStore, FakeBackend> {
        let mut store = SessionStore::new(storage, backend);
        store.restore();
        store
    }

    #[test]
    fn test_restore_without_entries_is_anonymous() {
        let store = restored(MemoryStore::new(), FakeBackend::default());
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!store.is_authenticated());
        assert!(!store.is_loading());
        assert_eq!(store.auth().token(), None);
    }

    #[test]
    fn test_restore_with_entries_is_authenticated() {
        let storage = MemoryStore::new();
        storage.set(ACCESS_TOKEN_KEY, "T").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "R").unwrap();
        storage
            .set(IDENTITY_KEY, r#"{"_id":"1","username":"u","role":"admin"}"#)
            .unwrap();

        let store = restored(storage, FakeBackend::default());
        assert!(store.is_authenticated());
        assert!(store.is_admin());
        assert_eq!(store.access_token().as_deref(), Some("T"));
        assert_eq!(store.identity().unwrap().id, "1");
        assert_eq!(store.auth().token().as_deref(), Some("T"));
    }

    #[test]
    fn test_restore_with_partial_entries_clears_them() {
        let storage = MemoryStore::new();
        storage.set(ACCESS_TOKEN_KEY, "T").unwrap();

        let store = restored(storage.clone(), FakeBackend::default());
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_restore_runs_once() {
        let storage = MemoryStore::new();
        let mut store = restored(storage.clone(), FakeBackend::default());

        // Entries appearing later are not picked up
        storage.set(ACCESS_TOKEN_KEY, "T").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "R").unwrap();
        storage
            .set(IDENTITY_KEY, r#"{"_id":"1","username":"u","role":"user"}"#)
            .unwrap();
        store.restore();
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_success_persists_and_authenticates() {
        let storage = MemoryStore::new();
        let mut store = restored(
            storage.clone(),
            FakeBackend::replying(Ok(auth_response(Role::User))),
        );

        let identity = store.login(&credentials()).await.unwrap();
        assert_eq!(identity.username, "u");
        assert!(store.is_authenticated());
        assert!(!store.is_admin());
        assert_eq!(
            store.identity(),
            Some(Identity {
                id: "1".to_string(),
                username: "u".to_string(),
                role: Role::User,
                email: None,
            })
        );
        assert_eq!(store.access_token().as_deref(), Some("T"));
        assert_eq!(store.auth().token().as_deref(), Some("T"));

        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("T"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R"));
        assert_eq!(
            storage.get(IDENTITY_KEY).unwrap().as_deref(),
            Some(r#"{"_id":"1","username":"u","role":"user"}"#)
        );
    }

    #[tokio::test]
    async fn test_login_failure_persists_nothing() {
        let storage = MemoryStore::new();
        let mut store = restored(
            storage.clone(),
            FakeBackend::replying(Err(ApiError::from_status(
                StatusCode::UNAUTHORIZED,
                r#"{"message":"Invalid credentials"}"#,
            ))),
        );

        let err = store.login(&credentials()).await.unwrap_err();
        assert!(err.api_error().map(ApiError::is_unauthorized).unwrap_or(false));
        assert_eq!(err.to_string(), "Unauthorized: Invalid credentials");
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(storage.is_empty());
        assert_eq!(store.auth().token(), None);
    }

    #[tokio::test]
    async fn test_register_failure_persists_nothing() {
        let storage = MemoryStore::new();
        let mut store = restored(
            storage.clone(),
            FakeBackend::replying(Err(ApiError::from_status(
                StatusCode::BAD_REQUEST,
                r#"{"message":"Email already registered"}"#,
            ))),
        );

        let request = RegisterRequest {
            username: "u".to_string(),
            email: "u@x.com".to_string(),
            password: "p".to_string(),
            role: None,
        };
        let err = store.register(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(storage.is_empty());
        assert_eq!(store.auth().token(), None);
    }

    #[tokio::test]
    async fn test_corrupt_session_file_does_not_block_login() {
        let path = std::env::temp_dir()
            .join(format!("libris-test-{}", std::process::id()))
            .join("store_corrupt")
            .join("session.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{truncated").unwrap();

        let mut store = SessionStore::new(
            FileStore::new(&path),
            FakeBackend::replying(Ok(auth_response(Role::User))),
        );
        store.restore();
        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(!path.exists());

        store.login(&credentials()).await.unwrap();
        assert!(store.is_authenticated());

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("T"));

        store.logout();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_login_with_incomplete_session_fails() {
        let mut response = auth_response(Role::User);
        response.token.access_token.clear();

        let storage = MemoryStore::new();
        let mut store = restored(storage.clone(), FakeBackend::replying(Ok(response)));

        let err = store.login(&credentials()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidSession(_)));
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_missing_field_skips_backend() {
        let mut store = restored(MemoryStore::new(), FakeBackend::default());
        let err = store
            .login(&LoginRequest::new("u@x.com", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingField("password")));
        assert_eq!(store.auth().calls(), 0);
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_before_restore_rejected() {
        let mut store = SessionStore::new(
            MemoryStore::new(),
            FakeBackend::replying(Ok(auth_response(Role::User))),
        );
        let err = store.login(&credentials()).await.unwrap_err();
        assert!(matches!(err, SessionError::Transition(_)));
        assert_eq!(store.state(), SessionState::Unknown);
        assert!(store.is_loading());
    }

    #[tokio::test]
    async fn test_register_admin() {
        let storage = MemoryStore::new();
        let mut store = restored(
            storage.clone(),
            FakeBackend::replying(Ok(auth_response(Role::Admin))),
        );

        let request = RegisterRequest {
            username: "u".to_string(),
            email: "u@x.com".to_string(),
            password: "p".to_string(),
            role: Some(Role::Admin),
        };
        store.register(&request).await.unwrap();
        assert!(store.is_admin());
        assert_eq!(storage.len(), 3);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let storage = MemoryStore::new();
        let mut store = restored(
            storage.clone(),
            FakeBackend::replying(Ok(auth_response(Role::Admin))),
        );
        store.login(&credentials()).await.unwrap();

        store.logout();
        assert!(!store.is_authenticated());
        assert!(!store.is_admin());
        assert!(storage.is_empty());
        assert_eq!(store.auth().token(), None);

        // Idempotent
        store.logout();
        assert_eq!(store.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_relogin_requires_logout() {
        let backend = FakeBackend::replying(Ok(auth_response(Role::User)));
        backend
            .responses
            .lock()
            .unwrap()
            .push_back(Ok(auth_response(Role::Admin)));
        let mut store = restored(MemoryStore::new(), backend);

        store.login(&credentials()).await.unwrap();
        assert!(matches!(
            store.login(&credentials()).await,
            Err(SessionError::Transition(_))
        ));
        assert!(!store.is_admin());

        store.logout();
        store.login(&credentials()).await.unwrap();
        assert!(store.is_admin());
    }

    #[tokio::test]
    async fn test_unauthorized_error_forces_logout() {
        let storage = MemoryStore::new();
        let mut store = restored(
            storage.clone(),
            FakeBackend::replying(Ok(auth_response(Role::User))),
        );
        store.login(&credentials()).await.unwrap();

        let forbidden = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert!(!store.handle_api_error(&forbidden));
        assert!(store.is_authenticated());

        let unauthorized = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(store.handle_api_error(&unauthorized));
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());

        assert!(!store.handle_api_error(&unauthorized));
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let mut store = restored(
            MemoryStore::new(),
            FakeBackend::replying(Ok(auth_response(Role::User))),
        );
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);

        store.login(&credentials()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());
    }
}
