use alertstore_common::clock::{Clock, SystemClock};
use chrono::{DateTime, FixedOffset};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;

use crate::error::Result;
use crate::permission::{DashboardAclFilter, DashboardPermissionFilter};

pub mod alert;
pub mod delete;
pub mod notification;
pub mod reconcile;
pub mod search;
pub mod state;
pub mod tags;

/// Alert rule store: every command and query over alert rules.
///
/// Multi-row mutations each run inside one database transaction that is
/// committed only when every step succeeded; dropping an uncommitted
/// transaction rolls it back. Reads go straight to the connection.
pub struct AlertStore {
    pub(crate) db: DatabaseConnection,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) permissions: Arc<dyn DashboardPermissionFilter>,
}

impl AlertStore {
    /// Connects to `db_url`, switches SQLite to WAL and runs pending
    /// migrations. Uses the system clock and the `dashboard_acl` filter.
    ///
    /// `db_url` example: `sqlite:///var/lib/alertstore/alert.db?mode=rwc`
    pub async fn connect(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized alert store");

        Ok(Self::new(
            db,
            Arc::new(SystemClock),
            Arc::new(DashboardAclFilter),
        ))
    }

    /// Builds a store over an already-migrated connection.
    pub fn new(
        db: DatabaseConnection,
        clock: Arc<dyn Clock>,
        permissions: Arc<dyn DashboardPermissionFilter>,
    ) -> Self {
        Self {
            db,
            clock,
            permissions,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn DashboardPermissionFilter>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Current time in the column representation.
    pub(crate) fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().fixed_offset()
    }
}
