use alertstore_common::types::Tag;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use std::collections::BTreeSet;

use crate::entities::{alert_rule_tag, tag};
use crate::error::Result;
use crate::store::AlertStore;

/// Returns the persisted identity of every proposed tag, creating the
/// `(key, value)` rows that do not exist yet. Duplicates collapse to one.
pub(crate) async fn ensure_tags_exist<C: ConnectionTrait>(
    conn: &C,
    proposed: &[Tag],
) -> Result<Vec<Tag>> {
    let wanted: BTreeSet<(&str, &str)> = proposed
        .iter()
        .map(|t| (t.key.as_str(), t.value.as_str()))
        .collect();

    let mut tags = Vec::with_capacity(wanted.len());
    for (key, value) in wanted {
        let existing = tag::Entity::find()
            .filter(tag::Column::Key.eq(key))
            .filter(tag::Column::Value.eq(value))
            .one(conn)
            .await?;
        let model = match existing {
            Some(m) => m,
            None => {
                tag::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                    ..Default::default()
                }
                .insert(conn)
                .await?
            }
        };
        tags.push(Tag {
            id: model.id,
            key: model.key,
            value: model.value,
        });
    }
    Ok(tags)
}

/// Drops every tag link of `alert_id` and links it to `tags` instead.
pub(crate) async fn replace_tags_in<C: ConnectionTrait>(
    conn: &C,
    alert_id: i64,
    tags: &[Tag],
) -> Result<()> {
    alert_rule_tag::Entity::delete_many()
        .filter(alert_rule_tag::Column::AlertId.eq(alert_id))
        .exec(conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    let persisted = ensure_tags_exist(conn, tags).await?;
    let links = persisted.iter().map(|t| alert_rule_tag::ActiveModel {
        alert_id: Set(alert_id),
        tag_id: Set(t.id),
    });
    alert_rule_tag::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

impl AlertStore {
    /// Create-or-fetch for a batch of tags; safe to call repeatedly.
    pub async fn ensure_tags(&self, proposed: &[Tag]) -> Result<Vec<Tag>> {
        let txn = self.db().begin().await?;
        let tags = ensure_tags_exist(&txn, proposed).await?;
        txn.commit().await?;
        Ok(tags)
    }

    /// Replaces the tag set of a rule wholesale.
    pub async fn replace_tags(&self, alert_id: i64, tags: &[Tag]) -> Result<()> {
        let txn = self.db().begin().await?;
        replace_tags_in(&txn, alert_id, tags).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Tags currently linked to a rule, ordered by key then value.
    pub async fn get_alert_tags(&self, alert_id: i64) -> Result<Vec<Tag>> {
        let rows = tag::Entity::find()
            .join(JoinType::InnerJoin, alert_rule_tag::Relation::Tag.def().rev())
            .filter(alert_rule_tag::Column::AlertId.eq(alert_id))
            .order_by_asc(tag::Column::Key)
            .order_by_asc(tag::Column::Value)
            .all(self.db())
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| Tag {
                id: m.id,
                key: m.key,
                value: m.value,
            })
            .collect())
    }
}
