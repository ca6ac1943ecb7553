use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_alerting_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // dashboard / alert_notification / annotation / alert_notification_state
        // are owned by other subsystems; created here so the store can run standalone.
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS dashboard (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    uid TEXT NOT NULL,
    slug TEXT NOT NULL,
    title TEXT NOT NULL,
    UNIQUE(org_id, uid)
);

CREATE TABLE IF NOT EXISTS dashboard_acl (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    dashboard_id INTEGER NOT NULL,
    user_id INTEGER,
    role TEXT,
    permission INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dashboard_acl_dashboard_id ON dashboard_acl(dashboard_id);
CREATE INDEX IF NOT EXISTS idx_dashboard_acl_user_id ON dashboard_acl(user_id);

CREATE TABLE IF NOT EXISTS alert (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    dashboard_id INTEGER NOT NULL DEFAULT 0,
    panel_id INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL,
    execution_error TEXT NOT NULL DEFAULT '',
    frequency INTEGER NOT NULL,
    for_duration_ms INTEGER NOT NULL DEFAULT 0,
    eval_data TEXT,
    new_state_date TEXT NOT NULL,
    state_changes INTEGER NOT NULL DEFAULT 0,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    settings TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_org_id ON alert(org_id);
CREATE INDEX IF NOT EXISTS idx_alert_state ON alert(state);
CREATE INDEX IF NOT EXISTS idx_alert_dashboard_id ON alert(dashboard_id);
CREATE UNIQUE INDEX IF NOT EXISTS uq_alert_dashboard_panel ON alert(dashboard_id, panel_id)
    WHERE dashboard_id <> 0;

CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    UNIQUE(key, value)
);

CREATE TABLE IF NOT EXISTS alert_rule_tag (
    alert_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (alert_id, tag_id)
);

CREATE TABLE IF NOT EXISTS alert_notification (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    uid TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    UNIQUE(org_id, uid)
);

CREATE TABLE IF NOT EXISTS alert_rule_notification (
    alert_id INTEGER NOT NULL,
    alert_notification_id INTEGER NOT NULL,
    PRIMARY KEY (alert_id, alert_notification_id)
);

CREATE TABLE IF NOT EXISTS annotation (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    alert_id INTEGER NOT NULL DEFAULT 0,
    dashboard_id INTEGER NOT NULL DEFAULT 0,
    panel_id INTEGER NOT NULL DEFAULT 0,
    text TEXT NOT NULL DEFAULT '',
    epoch INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_annotation_alert_id ON annotation(alert_id);

CREATE TABLE IF NOT EXISTS alert_notification_state (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    org_id INTEGER NOT NULL,
    alert_id INTEGER NOT NULL,
    notifier_id INTEGER NOT NULL,
    state TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL,
    UNIQUE(org_id, alert_id, notifier_id)
);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alert_notification_state;
DROP TABLE IF EXISTS annotation;
DROP TABLE IF EXISTS alert_rule_notification;
DROP TABLE IF EXISTS alert_notification;
DROP TABLE IF EXISTS alert_rule_tag;
DROP TABLE IF EXISTS tag;
DROP TABLE IF EXISTS alert;
DROP TABLE IF EXISTS dashboard_acl;
DROP TABLE IF EXISTS dashboard;
";
