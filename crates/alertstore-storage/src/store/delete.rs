use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait};

use crate::entities::{
    alert, alert_notification_state, alert_rule_notification, alert_rule_tag, annotation,
};
use crate::error::{AlertError, Result};
use crate::store::alert::find_by_dashboard;
use crate::store::AlertStore;

pub(crate) const REASON_API: &str = "Alert deletion requested from the API";
pub(crate) const REASON_REMOVED: &str = "Removed from dashboard";
pub(crate) const REASON_DASHBOARD_DELETED: &str = "Dashboard deleted";

/// Deletes a rule and every row that hangs off it. Returns whether the rule
/// itself existed.
pub(crate) async fn delete_alert_cascade<C: ConnectionTrait>(
    conn: &C,
    alert_id: i64,
    reason: &str,
) -> Result<bool> {
    tracing::debug!(alert_id, reason, "Deleting alert");

    let res = alert::Entity::delete_by_id(alert_id).exec(conn).await?;

    annotation::Entity::delete_many()
        .filter(annotation::Column::AlertId.eq(alert_id))
        .exec(conn)
        .await?;
    alert_notification_state::Entity::delete_many()
        .filter(alert_notification_state::Column::AlertId.eq(alert_id))
        .exec(conn)
        .await?;
    alert_rule_tag::Entity::delete_many()
        .filter(alert_rule_tag::Column::AlertId.eq(alert_id))
        .exec(conn)
        .await?;
    alert_rule_notification::Entity::delete_many()
        .filter(alert_rule_notification::Column::AlertId.eq(alert_id))
        .exec(conn)
        .await?;

    Ok(res.rows_affected > 0)
}

impl AlertStore {
    /// Deletes a rule with its annotations, notification states, tag links
    /// and notification links. Deleting an absent id is not an error.
    pub async fn delete_alert(&self, alert_id: i64) -> Result<bool> {
        let txn = self.db().begin().await?;
        let existed = delete_alert_cascade(&txn, alert_id, REASON_API).await?;
        txn.commit().await?;
        Ok(existed)
    }

    /// Deletes every rule of a dashboard that is itself being deleted.
    /// Returns the number of rules removed.
    pub async fn delete_dashboard_alerts(&self, dashboard_id: i64) -> Result<usize> {
        if dashboard_id == 0 {
            return Err(AlertError::Validation(
                "dashboard id 0 addresses standalone rules".to_string(),
            ));
        }
        let txn = self.db().begin().await?;
        let existing = find_by_dashboard(&txn, dashboard_id).await?;
        for rule in &existing {
            delete_alert_cascade(&txn, rule.id, REASON_DASHBOARD_DELETED).await?;
        }
        txn.commit().await?;
        tracing::info!(dashboard_id, deleted = existing.len(), "Dashboard alerts deleted");
        Ok(existing.len())
    }
}
