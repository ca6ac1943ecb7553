use crate::config::ServerConfig;
use alertstore_common::types::{GetAlertsQuery, SaveAlertsOutcome, SignedInUser};
use alertstore_storage::AlertStore;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AlertStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Opens the configured database (running migrations) and wires the store.
    pub async fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        if config.database.is_sqlite() {
            std::fs::create_dir_all(Path::new(&config.database.data_dir)).with_context(|| {
                format!("Failed to create data dir '{}'", config.database.data_dir)
            })?;
        }
        let db_url = config.database.connection_url();
        let store = AlertStore::connect(&db_url)
            .await
            .with_context(|| format!("Failed to open alert store at '{db_url}'"))?;
        Ok(Self::new(store, config))
    }

    pub fn new(store: AlertStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    /// Search query carrying the configured standalone-rule visibility.
    pub fn search_query(&self, org_id: i64, user: SignedInUser) -> GetAlertsQuery {
        let mut query = GetAlertsQuery::new(org_id, user);
        query.standalone_alerts_enabled = self.config.alerting.standalone_alerts_enabled;
        query
    }

    /// Reconciles every dashboard in a seed file, one transaction per dashboard.
    /// Stops at the first dashboard that fails; earlier ones stay committed.
    pub async fn apply_dashboard_seed(&self, path: &str) -> anyhow::Result<SaveAlertsOutcome> {
        let seed = crate::config::DashboardSeedFile::load(path)?;
        let mut total = SaveAlertsOutcome::default();
        for cmd in &seed.dashboards {
            let outcome = self
                .store
                .save_alerts(cmd)
                .await
                .with_context(|| format!("Failed to save alerts of dashboard {}", cmd.dashboard_id))?;
            total.inserted += outcome.inserted;
            total.updated += outcome.updated;
            total.unchanged += outcome.unchanged;
            total.deleted += outcome.deleted;
        }
        Ok(total)
    }
}
