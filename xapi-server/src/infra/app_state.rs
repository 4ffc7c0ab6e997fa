use std::{fmt, sync::Arc};

use xapi_config::Config;
use xapi_core::StoreContext;

use crate::gate::AccessGate;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreContext,
    pub config: Arc<Config>,
    pub gate: Arc<AccessGate>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("environment", &self.config.auth.environment)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(store: StoreContext, config: Arc<Config>) -> Self {
        let gate = Arc::new(AccessGate::from_config(&config.auth));
        Self {
            store,
            config,
            gate,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
