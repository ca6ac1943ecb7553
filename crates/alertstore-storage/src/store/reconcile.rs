use alertstore_common::duration::duration_to_millis;
use alertstore_common::types::{
    AlertState, DashboardAlert, SaveAlertsCommand, SaveAlertsOutcome,
};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{Set, Unchanged},
    ConnectionTrait, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

use crate::entities::alert;
use crate::error::{AlertError, Result};
use crate::store::alert::{find_by_dashboard, to_rule};
use crate::store::delete::{delete_alert_cascade, REASON_REMOVED};
use crate::store::notification::replace_notifications_in;
use crate::store::tags::replace_tags_in;
use crate::store::AlertStore;

enum Applied {
    Inserted,
    Updated,
    Unchanged,
}

fn validate(cmd: &SaveAlertsCommand) -> Result<()> {
    if cmd.org_id == 0 || cmd.dashboard_id == 0 {
        return Err(AlertError::Validation(format!(
            "dashboard alerts require org and dashboard (org={}, dashboard={})",
            cmd.org_id, cmd.dashboard_id
        )));
    }
    let mut panels = HashSet::with_capacity(cmd.alerts.len());
    for desired in &cmd.alerts {
        if desired.panel_id == 0 {
            return Err(AlertError::Validation(format!(
                "alert '{}' on dashboard {} has no panel",
                desired.name, cmd.dashboard_id
            )));
        }
        if !panels.insert(desired.panel_id) {
            return Err(AlertError::Validation(format!(
                "panel {} appears twice on dashboard {}",
                desired.panel_id, cmd.dashboard_id
            )));
        }
    }
    Ok(())
}

impl AlertStore {
    /// Reconciles the persisted rules of a dashboard with `cmd.alerts`.
    ///
    /// Rules are matched by panel id. A matched rule keeps its id, state and
    /// creation time and is rewritten only when its content changed; an
    /// unmatched desired rule is inserted as `unknown`; a persisted rule
    /// whose panel is gone is deleted with its dependent rows. Tag and
    /// notification links are regenerated for every desired rule. The whole
    /// dashboard is one transaction.
    pub async fn save_alerts(&self, cmd: &SaveAlertsCommand) -> Result<SaveAlertsOutcome> {
        validate(cmd)?;

        let txn = self.db().begin().await?;
        let existing = find_by_dashboard(&txn, cmd.dashboard_id).await?;
        let mut by_panel: HashMap<i64, alert::Model> =
            existing.into_iter().map(|m| (m.panel_id, m)).collect();

        let mut outcome = SaveAlertsOutcome::default();
        for desired in &cmd.alerts {
            let persisted = by_panel.remove(&desired.panel_id);
            let (alert_id, applied) = self.upsert_alert(&txn, cmd, desired, persisted).await?;
            match applied {
                Applied::Inserted => outcome.inserted += 1,
                Applied::Updated => outcome.updated += 1,
                Applied::Unchanged => outcome.unchanged += 1,
            }

            replace_tags_in(&txn, alert_id, &desired.settings.tags()).await?;
            replace_notifications_in(
                &txn,
                alert_id,
                cmd.org_id,
                &desired.settings.notification_uids(),
            )
            .await?;
        }

        // whatever is left in by_panel no longer has a panel on the dashboard
        for missing in by_panel.into_values() {
            delete_alert_cascade(&txn, missing.id, REASON_REMOVED).await?;
            outcome.deleted += 1;
        }

        txn.commit().await?;
        tracing::info!(
            dashboard_id = cmd.dashboard_id,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            deleted = outcome.deleted,
            "Dashboard alerts saved"
        );
        Ok(outcome)
    }

    async fn upsert_alert<C: ConnectionTrait>(
        &self,
        conn: &C,
        cmd: &SaveAlertsCommand,
        desired: &DashboardAlert,
        persisted: Option<alert::Model>,
    ) -> Result<(i64, Applied)> {
        let settings = serde_json::to_string(&desired.settings)?;
        let now = self.now();

        let Some(persisted) = persisted else {
            let am = alert::ActiveModel {
                org_id: Set(cmd.org_id),
                dashboard_id: Set(cmd.dashboard_id),
                panel_id: Set(desired.panel_id),
                name: Set(desired.name.clone()),
                message: Set(desired.message.clone()),
                state: Set(AlertState::Unknown.to_string()),
                execution_error: Set(String::new()),
                frequency: Set(desired.frequency),
                for_duration_ms: Set(duration_to_millis(desired.for_duration)),
                eval_data: Set(None),
                new_state_date: Set(now),
                state_changes: Set(0),
                created: Set(now),
                updated: Set(now),
                settings: Set(settings),
                ..Default::default()
            };
            let model = am.insert(conn).await?;
            tracing::debug!(alert_id = model.id, name = %model.name, "Alert inserted");
            return Ok((model.id, Applied::Inserted));
        };

        let alert_id = persisted.id;
        if !desired.differs_from(&to_rule(persisted)?) {
            return Ok((alert_id, Applied::Unchanged));
        }

        // message and for are always written so clearing them sticks
        let am = alert::ActiveModel {
            id: Unchanged(alert_id),
            name: Set(desired.name.clone()),
            message: Set(desired.message.clone()),
            frequency: Set(desired.frequency),
            for_duration_ms: Set(duration_to_millis(desired.for_duration)),
            settings: Set(settings),
            updated: Set(now),
            ..Default::default()
        };
        am.update(conn).await?;
        tracing::debug!(alert_id, name = %desired.name, "Alert updated");
        Ok((alert_id, Applied::Updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertstore_common::types::AlertSettings;
    use std::time::Duration;

    fn panel(panel_id: i64) -> DashboardAlert {
        DashboardAlert {
            panel_id,
            name: format!("panel {panel_id}"),
            message: String::new(),
            frequency: 60,
            for_duration: Duration::ZERO,
            settings: AlertSettings::default(),
        }
    }

    fn command(alerts: Vec<DashboardAlert>) -> SaveAlertsCommand {
        SaveAlertsCommand {
            dashboard_id: 10,
            org_id: 1,
            user_id: 1,
            alerts,
        }
    }

    #[test]
    fn validate_rejects_missing_identity() {
        let mut cmd = command(vec![panel(1)]);
        cmd.org_id = 0;
        assert!(matches!(validate(&cmd), Err(AlertError::Validation(_))));

        let cmd = command(vec![panel(0)]);
        assert!(matches!(validate(&cmd), Err(AlertError::Validation(_))));
    }

    #[test]
    fn validate_rejects_duplicate_panels() {
        let cmd = command(vec![panel(1), panel(2), panel(1)]);
        let err = validate(&cmd).unwrap_err();
        assert!(err.to_string().contains("panel 1"));
    }

    #[test]
    fn validate_accepts_empty_set() {
        assert!(validate(&command(vec![])).is_ok());
    }
}
