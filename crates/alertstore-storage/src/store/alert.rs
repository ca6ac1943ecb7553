use alertstore_common::duration::{duration_from_millis, duration_to_millis, parse_for_duration};
use alertstore_common::types::{
    normalize_execution_error, AlertRule, AlertState, AlertStateInfo, CreateAlertCommand,
    UpdateAlertCommand,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{Set, Unchanged},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::entities::alert::{self, Column, Entity};
use crate::error::{AlertError, Result};
use crate::store::notification::replace_notifications_in;
use crate::store::tags::replace_tags_in;
use crate::store::AlertStore;

pub(crate) fn parse_state(id: i64, raw: &str) -> Result<AlertState> {
    raw.parse::<AlertState>()
        .map_err(|e| AlertError::Storage(DbErr::Type(format!("alert {id}: {e}"))))
}

pub(crate) fn parse_eval_data(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(Some(serde_json::from_str(s)?)),
        _ => Ok(None),
    }
}

pub(crate) fn encode_eval_data(value: Option<&serde_json::Value>) -> Result<Option<String>> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

pub(crate) fn to_rule(m: alert::Model) -> Result<AlertRule> {
    Ok(AlertRule {
        state: parse_state(m.id, &m.state)?,
        eval_data: parse_eval_data(m.eval_data.as_deref())?,
        settings: serde_json::from_str(&m.settings)?,
        id: m.id,
        org_id: m.org_id,
        dashboard_id: m.dashboard_id,
        panel_id: m.panel_id,
        name: m.name,
        message: m.message,
        frequency: m.frequency,
        for_duration: duration_from_millis(m.for_duration_ms),
        execution_error: normalize_execution_error(m.execution_error),
        new_state_date: m.new_state_date.with_timezone(&Utc),
        state_changes: m.state_changes,
        created: m.created.with_timezone(&Utc),
        updated: m.updated.with_timezone(&Utc),
    })
}

/// Loads a rule inside `conn`, treating a rule of another org as absent.
pub(crate) async fn find_in_org<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    org_id: i64,
) -> Result<alert::Model> {
    match Entity::find_by_id(id).one(conn).await? {
        Some(m) if m.org_id == org_id => Ok(m),
        _ => Err(AlertError::NotFound { id }),
    }
}

pub(crate) async fn find_by_dashboard<C: ConnectionTrait>(
    conn: &C,
    dashboard_id: i64,
) -> Result<Vec<alert::Model>> {
    Ok(Entity::find()
        .filter(Column::DashboardId.eq(dashboard_id))
        .all(conn)
        .await?)
}

impl AlertStore {
    pub async fn get_alert_by_id(&self, id: i64) -> Result<AlertRule> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or(AlertError::NotFound { id })?;
        to_rule(model)
    }

    pub async fn get_all_alerts(&self) -> Result<Vec<AlertRule>> {
        let rows = Entity::find()
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_rule).collect()
    }

    /// Rules of one dashboard, ordered by panel.
    pub async fn get_alerts_for_dashboard(
        &self,
        org_id: i64,
        dashboard_id: i64,
    ) -> Result<Vec<AlertRule>> {
        let rows = Entity::find()
            .filter(Column::OrgId.eq(org_id))
            .filter(Column::DashboardId.eq(dashboard_id))
            .order_by_asc(Column::PanelId)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_rule).collect()
    }

    pub async fn get_alert_states_for_dashboard(
        &self,
        org_id: i64,
        dashboard_id: i64,
    ) -> Result<Vec<AlertStateInfo>> {
        let rows = Entity::find()
            .filter(Column::OrgId.eq(org_id))
            .filter(Column::DashboardId.eq(dashboard_id))
            .order_by_asc(Column::PanelId)
            .all(self.db())
            .await?;
        rows.into_iter()
            .map(|m| {
                Ok(AlertStateInfo {
                    state: parse_state(m.id, &m.state)?,
                    id: m.id,
                    dashboard_id: m.dashboard_id,
                    panel_id: m.panel_id,
                    new_state_date: m.new_state_date.with_timezone(&Utc),
                })
            })
            .collect()
    }

    /// Creates a standalone rule (no dashboard, no panel) in state `unknown`
    /// together with its tag and notification links.
    pub async fn create_alert(&self, cmd: &CreateAlertCommand) -> Result<AlertRule> {
        if cmd.org_id == 0 {
            return Err(AlertError::Validation("alert requires an org".to_string()));
        }
        let for_duration = parse_for_duration(&cmd.for_duration)?;
        let settings = cmd.settings();

        let txn = self.db().begin().await?;
        let now = self.now();
        let am = alert::ActiveModel {
            org_id: Set(cmd.org_id),
            dashboard_id: Set(0),
            panel_id: Set(0),
            name: Set(cmd.name.clone()),
            message: Set(String::new()),
            state: Set(AlertState::Unknown.to_string()),
            execution_error: Set(String::new()),
            frequency: Set(cmd.frequency),
            for_duration_ms: Set(duration_to_millis(for_duration)),
            eval_data: Set(None),
            new_state_date: Set(now),
            state_changes: Set(0),
            created: Set(now),
            updated: Set(now),
            settings: Set(serde_json::to_string(&settings)?),
            ..Default::default()
        };
        let model = am.insert(&txn).await?;
        tracing::debug!(alert_id = model.id, name = %model.name, "Alert inserted");

        replace_tags_in(&txn, model.id, &settings.tags()).await?;
        replace_notifications_in(&txn, model.id, cmd.org_id, &settings.notification_uids())
            .await?;

        txn.commit().await?;
        to_rule(model)
    }

    /// Rewrites name, frequency, `for` and settings of an existing rule and
    /// regenerates its links.
    ///
    /// The command carries no message, so the stored message is kept rather
    /// than cleared; a dashboard rule edited through here keeps the text its
    /// dashboard gave it. State is never written.
    pub async fn update_alert(&self, cmd: &UpdateAlertCommand) -> Result<AlertRule> {
        let for_duration = parse_for_duration(&cmd.for_duration)?;
        let settings = cmd.settings();

        let txn = self.db().begin().await?;
        let existing = find_in_org(&txn, cmd.id, cmd.org_id).await?;

        let am = alert::ActiveModel {
            id: Unchanged(existing.id),
            name: Set(cmd.name.clone()),
            frequency: Set(cmd.frequency),
            for_duration_ms: Set(duration_to_millis(for_duration)),
            settings: Set(serde_json::to_string(&settings)?),
            updated: Set(self.now()),
            ..Default::default()
        };
        let model = am.update(&txn).await?;
        tracing::debug!(alert_id = model.id, name = %model.name, "Alert updated");

        replace_tags_in(&txn, model.id, &settings.tags()).await?;
        replace_notifications_in(&txn, model.id, model.org_id, &settings.notification_uids())
            .await?;

        txn.commit().await?;
        to_rule(model)
    }
}
