//! The current user's identity and token.
//!
//! [`SessionStore`] is an explicit object handed to whatever needs the
//! session. Its state sits in a `watch` channel, so any number of
//! consumers can observe changes without polling.

mod backend;
mod joined;

use std::sync::Arc;

use tokio::sync::watch;

pub use self::backend::SessionBackend;
pub use self::joined::JoinedCommunities;

use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, UserId};
use crate::storage::{PersistedSession, PersistenceBridge};

/// Username shown when the login response omits one.
pub const UNKNOWN_USERNAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user_id: Option<UserId>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    /// A held token wins over `loading`, so refreshing a signed-in session
    /// still reads as authenticated.
    pub fn phase(&self) -> SessionPhase {
        if self.token.is_some() {
            SessionPhase::Authenticated
        } else if self.loading {
            SessionPhase::Authenticating
        } else {
            SessionPhase::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    bridge: PersistenceBridge,
    joined: JoinedCommunities,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new<B>(backend: B, bridge: PersistenceBridge) -> Self
    where
        B: SessionBackend + 'static,
    {
        let (tx, _) = watch::channel(SessionState::default());
        Self {
            backend: Arc::new(backend),
            joined: JoinedCommunities::persisted(bridge.clone()),
            bridge,
            state: Arc::new(tx),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.state.borrow().user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn bridge(&self) -> &PersistenceBridge {
        &self.bridge
    }

    /// Communities this user has joined, persisted through the bridge.
    pub fn joined(&self) -> &JoinedCommunities {
        &self.joined
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn fail(&self, error: &ApiError) {
        let message = error.message();
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
    }

    /// Authenticate and persist the session. The response must carry both
    /// a token and a user.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionState> {
        self.begin();

        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = match self.backend.login(&credentials).await {
            Ok(response) => accept_login(response, email),
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                if let Some(token) = &session.token {
                    self.backend.set_token(token);
                }
                self.bridge.persist(&session);
                self.state.send_replace(SessionState {
                    user_id: session.user_id,
                    token: session.token,
                    username: session.username,
                    email: session.email,
                    loading: false,
                    error: None,
                });
                tracing::info!("Logged in as user {:?}", self.user_id());
                Ok(self.state())
            }
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<ApiResponse<AuthResponse>> {
        self.begin();

        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.backend.register(&request).await {
            Ok(response) => {
                self.state.send_modify(|s| s.loading = false);
                Ok(response)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Populate from persisted storage. Silent: absence leaves the session
    /// anonymous without recording an error.
    pub fn restore(&self) -> SessionPhase {
        match self.bridge.restore() {
            Some(session) if session.token.is_some() => {
                if let Some(token) = &session.token {
                    self.backend.set_token(token);
                }
                self.state.send_replace(SessionState {
                    user_id: session.user_id,
                    token: session.token,
                    username: session.username,
                    email: session.email,
                    loading: false,
                    error: None,
                });
                tracing::debug!("Restored session for user {:?}", self.user_id());
            }
            _ => {
                self.backend.clear_token();
                self.state.send_replace(SessionState::default());
                tracing::debug!("No persisted session");
            }
        }
        self.state.borrow().phase()
    }

    /// Re-fetch the current user and update id and username. The token is
    /// never touched, and a failure leaves the identity as it was.
    pub async fn refresh_profile(&self) -> ApiResult<SessionState> {
        if self.token().is_none() {
            let e = ApiError::Unauthenticated;
            self.fail(&e);
            return Err(e);
        }

        self.begin();
        match self.backend.current_user().await {
            Ok(profile) => {
                let username = Some(profile.username).filter(|u| !u.is_empty());
                if let Some(username) = &username {
                    self.bridge.persist_username(username);
                }
                self.state.send_modify(|s| {
                    s.user_id = Some(profile.id);
                    if username.is_some() {
                        s.username = username;
                    }
                    if profile.email.is_some() {
                        s.email = profile.email;
                    }
                    s.loading = false;
                });
                Ok(self.state())
            }
            Err(e) => {
                tracing::warn!("Profile refresh failed: {}", e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Log out locally whatever the server says.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            tracing::warn!("Remote logout failed: {}", e);
        }
        self.backend.clear_token();
        self.bridge.clear();
        self.joined.clear();
        self.state.send_replace(SessionState::default());
        tracing::info!("Logged out");
    }
}

fn accept_login(response: AuthResponse, credential_email: &str) -> ApiResult<PersistedSession> {
    let token = response.token.filter(|t| !t.is_empty());
    match (token, response.user) {
        (Some(token), Some(user)) => Ok(PersistedSession {
            user_id: Some(user.id),
            token: Some(token),
            username: Some(
                user.username
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| UNKNOWN_USERNAME.to_string()),
            ),
            email: Some(
                user.email
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| credential_email.to_string()),
            ),
        }),
        _ => Err(ApiError::Decode(
            response
                .message
                .unwrap_or_else(|| "Invalid login response".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthUser, UserProfile};
    use async_trait::async_trait;
    use std::sync::{Mutex, RwLock};
    use tokio::sync::Notify;

    struct FakeBackend {
        login: ApiResult<AuthResponse>,
        me: ApiResult<UserProfile>,
        me_gate: Option<Arc<Notify>>,
        logout: ApiResult<()>,
        token: Arc<RwLock<Option<String>>>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                login: Ok(AuthResponse {
                    token: Some("t1".into()),
                    user: Some(AuthUser {
                        id: 7,
                        username: Some("alice".into()),
                        email: Some("a@x.com".into()),
                    }),
                    message: None,
                }),
                me: Ok(UserProfile {
                    id: 7,
                    username: "alice2".into(),
                    ..Default::default()
                }),
                me_gate: None,
                logout: Ok(()),
                token: Arc::default(),
                calls: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl SessionBackend for FakeBackend {
        async fn login(&self, _: &LoginRequest) -> ApiResult<AuthResponse> {
            self.calls.lock().unwrap().push("login");
            self.login.clone()
        }

        async fn register(&self, _: &RegisterRequest) -> ApiResult<ApiResponse<AuthResponse>> {
            self.calls.lock().unwrap().push("register");
            Ok(ApiResponse {
                success: true,
                message: Some("Registered".into()),
                data: None,
            })
        }

        async fn current_user(&self) -> ApiResult<UserProfile> {
            self.calls.lock().unwrap().push("me");
            if let Some(gate) = &self.me_gate {
                gate.notified().await;
            }
            self.me.clone()
        }

        async fn logout(&self) -> ApiResult<()> {
            self.calls.lock().unwrap().push("logout");
            self.logout.clone()
        }

        fn set_token(&self, token: &str) {
            *self.token.write().unwrap() = Some(token.to_string());
        }

        fn clear_token(&self) {
            *self.token.write().unwrap() = None;
        }
    }

    #[tokio::test]
    async fn login_sets_state_token_and_storage() {
        let backend = FakeBackend::new();
        let token = backend.token.clone();
        let bridge = PersistenceBridge::in_memory();
        let store = SessionStore::new(backend, bridge.clone());

        let state = store.login("a@x.com", "pw").await.unwrap();
        assert_eq!(state.user_id, Some(7));
        assert_eq!(state.token.as_deref(), Some("t1"));
        assert_eq!(state.username.as_deref(), Some("alice"));
        assert_eq!(state.email.as_deref(), Some("a@x.com"));
        assert_eq!(state.phase(), SessionPhase::Authenticated);
        assert_eq!(token.read().unwrap().as_deref(), Some("t1"));

        let persisted = bridge.restore().unwrap();
        assert_eq!(persisted.user_id, Some(7));
        assert_eq!(persisted.token.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn login_falls_back_to_unknown_username_and_credential_email() {
        let mut backend = FakeBackend::new();
        backend.login = Ok(AuthResponse {
            token: Some("t2".into()),
            user: Some(AuthUser {
                id: 9,
                username: None,
                email: None,
            }),
            message: None,
        });
        let store = SessionStore::new(backend, PersistenceBridge::in_memory());

        let state = store.login("bob@x.com", "pw").await.unwrap();
        assert_eq!(state.username.as_deref(), Some(UNKNOWN_USERNAME));
        assert_eq!(state.email.as_deref(), Some("bob@x.com"));
    }

    #[tokio::test]
    async fn login_without_token_records_error() {
        let mut backend = FakeBackend::new();
        backend.login = Ok(AuthResponse {
            message: Some("Bad credentials".into()),
            ..Default::default()
        });
        let store = SessionStore::new(backend, PersistenceBridge::in_memory());

        let err = store.login("a@x.com", "nope").await.unwrap_err();
        assert_eq!(err.message(), "Bad credentials");

        let state = store.state();
        assert_eq!(state.phase(), SessionPhase::Anonymous);
        assert_eq!(state.error.as_deref(), Some("Bad credentials"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn subscribers_see_login() {
        let store = SessionStore::new(FakeBackend::new(), PersistenceBridge::in_memory());
        let mut rx = store.subscribe();

        store.login("a@x.com", "pw").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn restore_logout_restore_is_anonymous() {
        let bridge = PersistenceBridge::in_memory();
        let first = SessionStore::new(FakeBackend::new(), bridge.clone());
        first.login("a@x.com", "pw").await.unwrap();

        let store = SessionStore::new(FakeBackend::new(), bridge.clone());
        assert_eq!(store.restore(), SessionPhase::Authenticated);
        assert_eq!(store.state().username.as_deref(), Some("alice"));

        store.logout().await;
        assert_eq!(store.restore(), SessionPhase::Anonymous);
        assert_eq!(store.state(), SessionState::default());
    }

    #[tokio::test]
    async fn logout_clears_locally_when_remote_fails() {
        let mut backend = FakeBackend::new();
        backend.logout = Err(ApiError::Transport("connection refused".into()));
        let token = backend.token.clone();
        let bridge = PersistenceBridge::in_memory();
        let store = SessionStore::new(backend, bridge.clone());

        store.login("a@x.com", "pw").await.unwrap();
        store.logout().await;

        assert_eq!(store.state().phase(), SessionPhase::Anonymous);
        assert_eq!(*token.read().unwrap(), None);
        assert!(bridge.restore().is_none());
    }

    #[tokio::test]
    async fn refresh_requires_token() {
        let backend = FakeBackend::new();
        let calls = backend.calls.clone();
        let store = SessionStore::new(backend, PersistenceBridge::in_memory());

        let err = store.refresh_profile().await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated);
        assert_eq!(store.state().error.as_deref(), Some("Not authenticated"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_updates_username_but_not_token_or_missing_email() {
        let bridge = PersistenceBridge::in_memory();
        let store = SessionStore::new(FakeBackend::new(), bridge.clone());
        store.login("a@x.com", "pw").await.unwrap();

        let state = store.refresh_profile().await.unwrap();
        assert_eq!(state.username.as_deref(), Some("alice2"));
        assert_eq!(state.token.as_deref(), Some("t1"));
        assert_eq!(state.email.as_deref(), Some("a@x.com"));
        assert_eq!(
            bridge.restore().and_then(|s| s.username).as_deref(),
            Some("alice2")
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_identity() {
        let mut backend = FakeBackend::new();
        backend.me = Err(ApiError::Status {
            status: 500,
            message: "Internal Server Error".into(),
        });
        let store = SessionStore::new(backend, PersistenceBridge::in_memory());
        store.login("a@x.com", "pw").await.unwrap();

        assert!(store.refresh_profile().await.is_err());
        let state = store.state();
        assert_eq!(state.username.as_deref(), Some("alice"));
        assert_eq!(state.user_id, Some(7));
        assert_eq!(state.error.as_deref(), Some("Internal Server Error"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn refresh_is_loading_while_pending_but_stays_authenticated() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeBackend::new();
        backend.me_gate = Some(gate.clone());
        let store = SessionStore::new(backend, PersistenceBridge::in_memory());
        store.login("a@x.com", "pw").await.unwrap();
        let mut rx = store.subscribe();

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_profile().await }
        });

        let during = rx.wait_for(|s| s.loading).await.unwrap().clone();
        assert_eq!(during.phase(), SessionPhase::Authenticated);
        assert_eq!(during.error, None);

        gate.notify_one();
        let state = pending.await.unwrap().unwrap();
        assert!(!state.loading);
        assert_eq!(state.username.as_deref(), Some("alice2"));
    }

    #[tokio::test]
    async fn logout_forgets_joined_communities() {
        let bridge = PersistenceBridge::in_memory();
        let store = SessionStore::new(FakeBackend::new(), bridge.clone());
        store.login("a@x.com", "pw").await.unwrap();
        store.joined().join("budget");
        assert!(bridge.joined_communities().contains("budget"));

        store.logout().await;

        assert!(!store.joined().contains("budget"));
        let next = SessionStore::new(FakeBackend::new(), bridge);
        assert!(next.joined().snapshot().is_empty());
    }

    #[tokio::test]
    async fn register_does_not_log_in() {
        let bridge = PersistenceBridge::in_memory();
        let store = SessionStore::new(FakeBackend::new(), bridge.clone());

        let response = store.register("carol", "c@x.com", "pw").await.unwrap();
        assert!(response.success);
        assert_eq!(store.state().phase(), SessionPhase::Anonymous);
        assert!(bridge.restore().is_none());
    }
}
