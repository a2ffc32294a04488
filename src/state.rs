use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::RemoteStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RemoteStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(RemoteStore::new(&config.supabase)?);
        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    pub fn from_parts(store: Arc<RemoteStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }
}

#[cfg(test)]
pub(crate) fn test_state(store_url: &str) -> AppState {
    use crate::config::{Environment, JwtConfig, SupabaseConfig};

    let config = AppConfig {
        supabase: SupabaseConfig {
            url: store_url.to_string(),
            api_key: "test-key".into(),
        },
        jwt: JwtConfig {
            secret: "test-secret".into(),
            ttl_minutes: 5,
        },
        environment: Environment::Development,
    };
    AppState::new(config).expect("test state builds")
}
