//! Session manager: the only writer of session state.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use logiflow_core::traits::{SessionCache, TokenProvider};
use logiflow_entity::user::{User, UserRole};

use super::login::{LoginGrant, parse_login_body};
use super::state::{Session, SessionState};
use crate::api::{AuthApi, LoginRequest, RefreshRequest};
use crate::error::AuthError;
use crate::store::{REFRESH_TOKEN_KEY, StoreWrite, TOKEN_KEY, TokenStore, USER_KEY};
use crate::token::{TokenClaims, decode_unverified};
use crate::validation::RegistrationForm;

/// Orchestrates login, refresh, logout and hydration.
///
/// Mutations are serialized; every change is persisted to the
/// [`TokenStore`] before it becomes visible through [`watch`](Self::watch).
pub struct SessionManager {
    /// Auth service transport.
    api: Arc<dyn AuthApi>,
    /// Durable key/value storage.
    store: Arc<dyn TokenStore>,
    /// Published state.
    state: watch::Sender<SessionState>,
    /// Serializes init/login/refresh/logout.
    mutation: Mutex<()>,
    /// Caches emptied whenever the signed-in user changes.
    caches: Vec<Arc<dyn SessionCache>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SessionManager")
            .field("authenticated", &state.is_authenticated())
            .field("loading", &state.loading)
            .field("caches", &self.caches.len())
            .finish()
    }
}

impl SessionManager {
    /// Creates a manager in the loading state. Call [`init`](Self::init)
    /// before reading the session.
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            api,
            store,
            state,
            mutation: Mutex::new(()),
            caches: Vec::new(),
        }
    }

    /// Registers a cache to be emptied on login and logout.
    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.caches.push(cache);
        self
    }

    /// Hydrates the session from storage.
    ///
    /// A stored token with a parseable user yields an authenticated session.
    /// Anything else (partial keys, corrupt user JSON) clears storage and
    /// leaves the session empty. Never fails.
    pub async fn init(&self) {
        let _guard = self.mutation.lock().await;
        self.set_loading(true);

        let session = self.hydrate().await;
        if let Some(user) = &session.user {
            info!(cedula = %user.cedula, role = %user.role, "Session restored");
        }
        self.state.send_replace(SessionState::ready(session));
    }

    async fn hydrate(&self) -> Session {
        let token = self.read_key(TOKEN_KEY).await;
        let refresh_token = self.read_key(REFRESH_TOKEN_KEY).await;
        let user_json = self.read_key(USER_KEY).await;

        match (token, user_json) {
            (Some(token), Some(user_json)) if !token.trim().is_empty() => {
                match serde_json::from_str::<User>(&user_json) {
                    Ok(user) => {
                        return Session {
                            access_token: Some(token),
                            refresh_token,
                            user: Some(user),
                        };
                    }
                    Err(e) => warn!(error = %e, "Stored user is corrupt, clearing session"),
                }
            }
            (None, None) if refresh_token.is_none() => return Session::default(),
            _ => warn!("Stored session is incomplete, clearing"),
        }

        if let Err(e) = self.store.clear().await {
            error!(error = %e, "Failed to clear stored session");
        }
        Session::default()
    }

    async fn read_key(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Token store read failed, treating as absent");
                None
            }
        }
    }

    /// Signs in with a cédula and password.
    ///
    /// On success all three storage keys are written in one batch, registered
    /// caches are emptied and the session becomes authenticated. On failure the
    /// session and caches are unchanged.
    pub async fn login(&self, identity: &str, secret: &str) -> Result<User, AuthError> {
        let _guard = self.mutation.lock().await;
        self.set_loading(true);

        match self.perform_login(identity, secret).await {
            Ok(grant) => {
                let user = grant.user.clone();
                info!(cedula = %user.cedula, role = %user.role, "Login successful");
                self.invalidate_caches().await;
                self.state.send_replace(SessionState::ready(Session {
                    access_token: Some(grant.access_token),
                    refresh_token: grant.refresh_token,
                    user: Some(grant.user),
                }));
                Ok(user)
            }
            Err(e) => {
                warn!(cedula = %identity, error = %e, "Login failed");
                self.set_loading(false);
                Err(e)
            }
        }
    }

    async fn perform_login(&self, identity: &str, secret: &str) -> Result<LoginGrant, AuthError> {
        let body = self
            .api
            .login(&LoginRequest {
                username: identity.to_string(),
                password: secret.to_string(),
            })
            .await?;

        let grant = parse_login_body(identity, &body)?;
        let user_json = serde_json::to_string(&grant.user)
            .map_err(|e| AuthError::Persistence(e.to_string()))?;

        let refresh_write = match &grant.refresh_token {
            Some(token) => StoreWrite::Set(REFRESH_TOKEN_KEY, token.clone()),
            None => StoreWrite::Remove(REFRESH_TOKEN_KEY),
        };
        self.store
            .apply(vec![
                StoreWrite::Set(TOKEN_KEY, grant.access_token.clone()),
                refresh_write,
                StoreWrite::Set(USER_KEY, user_json),
            ])
            .await
            .map_err(|e| AuthError::Persistence(e.to_string()))?;

        Ok(grant)
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// The user and refresh token are kept.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self.mutation.lock().await;

        let refresh_token = {
            let state = self.state.borrow();
            if !state.is_authenticated() {
                return Err(AuthError::NotAuthenticated);
            }
            state.session.refresh_token.clone()
        }
        .ok_or(AuthError::NotAuthenticated)?;

        let response = self.api.refresh(&RefreshRequest { refresh_token }).await?;
        if response.access_token.trim().is_empty() {
            return Err(AuthError::MalformedResponse("empty access token".into()));
        }

        self.store
            .apply(vec![StoreWrite::Set(TOKEN_KEY, response.access_token.clone())])
            .await
            .map_err(|e| AuthError::Persistence(e.to_string()))?;

        self.state.send_modify(|state| {
            state.session.access_token = Some(response.access_token);
        });
        debug!("Access token refreshed");
        Ok(())
    }

    /// Signs out: clears memory and storage, then empties registered caches.
    ///
    /// Idempotent. A storage failure is logged and does not keep the session
    /// alive.
    pub async fn logout(&self) {
        let _guard = self.mutation.lock().await;

        let cedula = self.state.borrow().user().map(|u| u.cedula.clone());
        if let Err(e) = self.store.clear().await {
            error!(error = %e, "Failed to clear stored session during logout");
        }
        self.state.send_replace(SessionState::ready(Session::default()));
        self.invalidate_caches().await;

        match cedula {
            Some(cedula) => info!(cedula = %cedula, "Logout completed"),
            None => debug!("Logout with no active session"),
        }
    }

    /// Validates the form locally, then creates the account.
    ///
    /// Does not sign in.
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), AuthError> {
        form.check()?;
        self.api.register(&form.to_request()).await?;
        info!(cedula = %form.cedula, role = %form.rol, "Registration accepted");
        Ok(())
    }

    /// False when unauthenticated, otherwise whether the user's role is listed.
    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        self.state.borrow().has_role(roles)
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether hydration or a login is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Whether a token and user are present.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// The signed-in user.
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().session.user.clone()
    }

    /// Claims of the current access token, decoded without verification.
    pub fn claims(&self) -> Option<TokenClaims> {
        let state = self.state.borrow();
        state.session.access_token.as_deref().and_then(decode_unverified)
    }

    async fn invalidate_caches(&self) {
        for cache in &self.caches {
            cache.invalidate_all().await;
        }
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }
}

impl TokenProvider for SessionManager {
    fn access_token(&self) -> Option<String> {
        self.state.borrow().session.access_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RefreshResponse, RegisterRequest};
    use crate::store::MemoryTokenStore;
    use crate::token::decoder::encode_for_test;
    use async_trait::async_trait;
    use logiflow_core::AppResult;
    use logiflow_core::error::AppError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug)]
    struct FakeAuthApi {
        login: Result<String, AuthError>,
        refresh: Result<RefreshResponse, AuthError>,
        gate: Option<Arc<Notify>>,
        registered: std::sync::Mutex<Vec<RegisterRequest>>,
        calls: AtomicUsize,
    }

    impl FakeAuthApi {
        fn answering(login: Result<String, AuthError>) -> Self {
            Self {
                login,
                refresh: Ok(RefreshResponse {
                    access_token: "fresh".into(),
                    token_type: Some("Bearer".into()),
                }),
                gate: None,
                registered: std::sync::Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuthApi {
        async fn login(&self, _request: &LoginRequest) -> Result<String, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.login.clone()
        }

        async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, AuthError> {
            assert_eq!(request.refresh_token, "r1");
            self.refresh.clone()
        }

        async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError> {
            self.registered.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct ReadOnlyStore;

    #[async_trait]
    impl TokenStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        async fn apply(&self, _writes: Vec<StoreWrite>) -> AppResult<()> {
            Err(AppError::storage("read-only"))
        }
    }

    #[derive(Debug, Default)]
    struct CountingCache(AtomicUsize);

    #[async_trait]
    impl SessionCache for CountingCache {
        async fn invalidate_all(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client_body() -> Result<String, AuthError> {
        Ok(r#"{"access_token":"abc","refresh_token":"r1","role":"CLIENTE"}"#.into())
    }

    async fn ready_manager(
        api: FakeAuthApi,
        store: Arc<dyn TokenStore>,
    ) -> SessionManager {
        let manager = SessionManager::new(Arc::new(api), store);
        manager.init().await;
        manager
    }

    #[tokio::test]
    async fn test_login_populates_session_and_store() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = ready_manager(FakeAuthApi::answering(client_body()), store.clone()).await;

        let user = manager.login("1709473852", "password123").await.unwrap();

        assert_eq!(user.role, UserRole::Client);
        assert_eq!(user.email, "cliente@logiflow.com");
        assert!(manager.is_authenticated());
        assert!(!manager.is_loading());
        assert!(manager.has_role(&[UserRole::Client]));
        assert!(!manager.has_role(&[UserRole::Manager]));
        assert_eq!(manager.access_token().as_deref(), Some("abc"));

        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("abc"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("r1"));
        let stored: User =
            serde_json::from_str(&store.get(USER_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, user);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_unchanged() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = ready_manager(
            FakeAuthApi::answering(Err(AuthError::InvalidCredentials("Credenciales inválidas".into()))),
            store.clone(),
        )
        .await;

        let err = manager.login("1709473852", "nope").await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials("Credenciales inválidas".into()));
        assert!(!manager.is_authenticated());
        assert!(!manager.is_loading());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        let manager =
            ready_manager(FakeAuthApi::answering(client_body()), Arc::new(ReadOnlyStore)).await;

        let err = manager.login("1709473852", "password123").await.unwrap_err();

        assert!(matches!(err, AuthError::Persistence(_)));
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_loading_while_login_in_flight() {
        let gate = Arc::new(Notify::new());
        let mut api = FakeAuthApi::answering(client_body());
        api.gate = Some(gate.clone());
        let manager =
            Arc::new(ready_manager(api, Arc::new(MemoryTokenStore::new())).await);
        assert!(!manager.is_loading());

        let mut rx = manager.watch();
        let task = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.login("1709473852", "password123").await })
        };

        rx.wait_for(|s| s.loading).await.unwrap();
        gate.notify_one();
        task.await.unwrap().unwrap();

        assert!(!manager.is_loading());
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_bare_token_role_from_payload() {
        let token = encode_for_test(&json!({"sub": "0102030405", "role": "REPARTIDOR"}));
        let manager = ready_manager(
            FakeAuthApi::answering(Ok(token.clone())),
            Arc::new(MemoryTokenStore::new()),
        )
        .await;

        let user = manager.login("0102030405", "x").await.unwrap();
        assert_eq!(user.role, UserRole::Courier);
        assert_eq!(manager.claims().unwrap().sub.as_deref(), Some("0102030405"));
    }

    #[tokio::test]
    async fn test_init_restores_stored_session() {
        let user = User::synthesize("1709473852", UserRole::Manager, None);
        let store = Arc::new(MemoryTokenStore::with_entries([
            (TOKEN_KEY, "abc".to_string()),
            (REFRESH_TOKEN_KEY, "r1".to_string()),
            (USER_KEY, serde_json::to_string(&user).unwrap()),
        ]));
        let manager = SessionManager::new(
            Arc::new(FakeAuthApi::answering(client_body())),
            store,
        );
        assert!(manager.is_loading());

        manager.init().await;

        assert!(!manager.is_loading());
        assert_eq!(manager.current_user(), Some(user));
        assert!(manager.has_role(&[UserRole::Manager, UserRole::Admin]));
    }

    #[tokio::test]
    async fn test_init_clears_corrupt_or_partial_storage() {
        for entries in [
            vec![(TOKEN_KEY, "abc"), (USER_KEY, "{not json")],
            vec![(TOKEN_KEY, "abc")],
            vec![(USER_KEY, "{}")],
            vec![(REFRESH_TOKEN_KEY, "r1")],
        ] {
            let store = Arc::new(MemoryTokenStore::with_entries(entries));
            let manager =
                ready_manager(FakeAuthApi::answering(client_body()), store.clone()).await;

            assert!(!manager.is_authenticated());
            assert!(!manager.is_loading());
            assert!(store.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_logout_clears_everything_and_is_idempotent() {
        let store = Arc::new(MemoryTokenStore::new());
        let cache = Arc::new(CountingCache::default());
        let manager = SessionManager::new(
            Arc::new(FakeAuthApi::answering(client_body())),
            store.clone(),
        )
        .with_cache(cache.clone());
        manager.init().await;
        manager.login("1709473852", "password123").await.unwrap();

        manager.logout().await;
        manager.logout().await;

        assert!(!manager.is_authenticated());
        assert!(!manager.has_role(&UserRole::ALL));
        assert_eq!(manager.access_token(), None);
        assert!(store.is_empty().await);
        // Once for the login, twice for the logouts.
        assert_eq!(cache.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_login_empties_caches_only_on_success() {
        let cache = Arc::new(CountingCache::default());
        let manager = SessionManager::new(
            Arc::new(FakeAuthApi::answering(client_body())),
            Arc::new(MemoryTokenStore::new()),
        )
        .with_cache(cache.clone());
        manager.init().await;

        manager.login("1709473852", "password123").await.unwrap();
        manager.login("1709473852", "password123").await.unwrap();
        assert_eq!(cache.0.load(Ordering::SeqCst), 2);

        let rejected = SessionManager::new(
            Arc::new(FakeAuthApi::answering(Err(AuthError::InvalidCredentials("no".into())))),
            Arc::new(MemoryTokenStore::new()),
        )
        .with_cache(cache.clone());
        rejected.init().await;
        assert!(rejected.login("1709473852", "nope").await.is_err());
        assert_eq!(cache.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_access_token_only() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = ready_manager(FakeAuthApi::answering(client_body()), store.clone()).await;

        assert_eq!(manager.refresh().await, Err(AuthError::NotAuthenticated));

        let user = manager.login("1709473852", "password123").await.unwrap();
        manager.refresh().await.unwrap();

        let state = manager.state();
        assert_eq!(state.session.access_token.as_deref(), Some("fresh"));
        assert_eq!(state.session.refresh_token.as_deref(), Some("r1"));
        assert_eq!(state.session.user, Some(user));
        assert_eq!(store.get(TOKEN_KEY).await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_register_validates_before_sending() {
        let api = Arc::new(FakeAuthApi::answering(client_body()));
        let manager = SessionManager::new(api.clone(), Arc::new(MemoryTokenStore::new()));

        let mut form = RegistrationForm {
            cedula: "1709473853".into(),
            nombre: "Ana".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            rol: UserRole::Client,
        };
        let err = manager.register(&form).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(api.registered.lock().unwrap().is_empty());

        form.cedula = "1709473852".into();
        manager.register(&form).await.unwrap();
        assert_eq!(api.registered.lock().unwrap().len(), 1);
        assert!(!manager.is_authenticated());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }
}
