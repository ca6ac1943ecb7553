use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use std::collections::BTreeSet;

use crate::entities::{alert_notification, alert_rule_notification};
use crate::error::Result;
use crate::store::AlertStore;

/// Drops every notification link of `alert_id` and links it to the channels
/// `uids` resolve to within `org_id`. Unknown uids are skipped.
pub(crate) async fn replace_notifications_in<C: ConnectionTrait>(
    conn: &C,
    alert_id: i64,
    org_id: i64,
    uids: &[String],
) -> Result<()> {
    alert_rule_notification::Entity::delete_many()
        .filter(alert_rule_notification::Column::AlertId.eq(alert_id))
        .exec(conn)
        .await?;

    let mut channel_ids = BTreeSet::new();
    for uid in uids {
        let channel = alert_notification::Entity::find()
            .filter(alert_notification::Column::OrgId.eq(org_id))
            .filter(alert_notification::Column::Uid.eq(uid.as_str()))
            .one(conn)
            .await?;
        match channel {
            Some(ch) => {
                channel_ids.insert(ch.id);
            }
            None => {
                tracing::warn!(alert_id, org_id, uid = %uid, "Skipping unknown notification channel");
            }
        }
    }

    if channel_ids.is_empty() {
        return Ok(());
    }

    let links = channel_ids
        .into_iter()
        .map(|channel_id| alert_rule_notification::ActiveModel {
            alert_id: Set(alert_id),
            alert_notification_id: Set(channel_id),
        });
    alert_rule_notification::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

impl AlertStore {
    /// Replaces the notification targets of a rule wholesale.
    pub async fn replace_notifications(
        &self,
        alert_id: i64,
        org_id: i64,
        channel_uids: &[String],
    ) -> Result<()> {
        let txn = self.db().begin().await?;
        replace_notifications_in(&txn, alert_id, org_id, channel_uids).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Internal channel ids a rule notifies, ascending.
    pub async fn get_alert_notification_ids(&self, alert_id: i64) -> Result<Vec<i64>> {
        let ids = alert_rule_notification::Entity::find()
            .select_only()
            .column(alert_rule_notification::Column::AlertNotificationId)
            .filter(alert_rule_notification::Column::AlertId.eq(alert_id))
            .order_by_asc(alert_rule_notification::Column::AlertNotificationId)
            .into_tuple::<i64>()
            .all(self.db())
            .await?;
        Ok(ids)
    }
}
