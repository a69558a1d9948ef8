use std::collections::HashMap;
use std::sync::Arc;

use gatehouse_auth::{
    AuthResult, AuthorizationGate, HttpProviderClient, JwtService, LoginService,
    OAuthProviderClient, OAuthState,
};
use gatehouse_identity::{
    EmailConflictPolicy, IdentityStore, MemoryIdentityStore, Reconciler, SqliteIdentityStore,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::{DatabaseTarget, ServerConfig};

/// Shared application state.
pub struct AppState {
    pub store: Arc<dyn IdentityStore>,
    pub gate: AuthorizationGate,
    pub login: LoginService,
    pub providers: HashMap<String, Arc<dyn OAuthProviderClient>>,
    pending: RwLock<HashMap<String, OAuthState>>,
}

impl AppState {
    /// Wire the store, token service and providers together.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        tokens: JwtService,
        email_policy: EmailConflictPolicy,
        providers: Vec<Arc<dyn OAuthProviderClient>>,
    ) -> Self {
        let tokens = Arc::new(tokens);
        let reconciler = Reconciler::new(store.clone(), email_policy);

        Self {
            gate: AuthorizationGate::new(tokens.clone(), store.clone()),
            login: LoginService::new(reconciler, tokens),
            store,
            providers: providers
                .into_iter()
                .map(|p| (p.descriptor().name.clone(), p))
                .collect(),
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Build state from server configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn IdentityStore> = match &config.database {
            DatabaseTarget::Memory => {
                info!("Using in-memory user store");
                Arc::new(MemoryIdentityStore::new())
            }
            DatabaseTarget::Sqlite(url) => {
                info!(database = %url, "Using SQLite user store");
                Arc::new(SqliteIdentityStore::open(url)?)
            }
        };

        let tokens = JwtService::new(config.jwt.clone())?;

        let providers = config
            .providers
            .iter()
            .cloned()
            .map(|d| HttpProviderClient::new(d).map(|c| Arc::new(c) as Arc<dyn OAuthProviderClient>))
            .collect::<AuthResult<Vec<_>>>()?;

        Ok(Self::new(store, tokens, config.email_policy, providers))
    }

    /// Look up a provider by route name.
    pub fn provider(&self, name: &str) -> Option<&Arc<dyn OAuthProviderClient>> {
        self.providers.get(name)
    }

    /// Remember a state handed out with an authorization redirect.
    pub async fn remember_state(&self, state: OAuthState) {
        let mut pending = self.pending.write().await;
        pending.retain(|_, s| !s.is_expired());
        pending.insert(state.state.clone(), state);
    }

    /// Consume a pending state; each value is accepted at most once.
    pub async fn take_state(&self, value: &str) -> Option<OAuthState> {
        self.pending
            .write()
            .await
            .remove(value)
            .filter(|s| !s.is_expired())
    }
}
