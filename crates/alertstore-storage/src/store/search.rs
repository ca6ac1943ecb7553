use alertstore_common::types::{
    normalize_execution_error, AlertListItem, GetAlertsQuery, OrgRole, PermissionLevel,
    STATE_FILTER_ALL, STATE_FILTER_NOT_PREFIX,
};
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select,
};

use crate::entities::{alert, dashboard};
use crate::error::Result;
use crate::permission::DashboardPermissionFilter;
use crate::store::alert::{parse_eval_data, parse_state};
use crate::store::AlertStore;

#[derive(Debug, FromQueryResult)]
struct AlertListRow {
    id: i64,
    dashboard_id: i64,
    panel_id: i64,
    name: String,
    state: String,
    new_state_date: DateTimeWithTimeZone,
    eval_data: Option<String>,
    execution_error: String,
    dashboard_uid: Option<String>,
    dashboard_slug: Option<String>,
}

/// OR of the state tokens, or `None` when state filtering is off.
fn state_condition(tokens: &[String]) -> Option<Condition> {
    if tokens.is_empty() || tokens.iter().any(|t| t == STATE_FILTER_ALL) {
        return None;
    }
    let mut any = Condition::any();
    for token in tokens {
        any = match token.strip_prefix(STATE_FILTER_NOT_PREFIX) {
            Some(state) => any.add(alert::Column::State.ne(state)),
            None => any.add(alert::Column::State.eq(token.as_str())),
        };
    }
    Some(any)
}

/// Builds the search statement. Control flow only decides which clauses and
/// which join are present; every user-supplied value is a bound parameter.
pub(crate) fn build_search(
    query: &GetAlertsQuery,
    permissions: &dyn DashboardPermissionFilter,
) -> Select<alert::Entity> {
    let join = if query.standalone_alerts_enabled {
        JoinType::LeftJoin
    } else {
        JoinType::InnerJoin
    };

    let mut select = alert::Entity::find()
        .select_only()
        .columns([
            alert::Column::Id,
            alert::Column::DashboardId,
            alert::Column::PanelId,
            alert::Column::Name,
            alert::Column::State,
            alert::Column::NewStateDate,
            alert::Column::EvalData,
            alert::Column::ExecutionError,
        ])
        .column_as(dashboard::Column::Uid, "dashboard_uid")
        .column_as(dashboard::Column::Slug, "dashboard_slug")
        .join(join, alert::Relation::Dashboard.def())
        .filter(alert::Column::OrgId.eq(query.org_id));

    let text = query.query.trim();
    if !text.is_empty() {
        select = select.filter(alert::Column::Name.contains(text));
    }
    if !query.dashboard_ids.is_empty() {
        select = select.filter(alert::Column::DashboardId.is_in(query.dashboard_ids.iter().copied()));
    }
    if query.panel_id != 0 {
        select = select.filter(alert::Column::PanelId.eq(query.panel_id));
    }
    if let Some(states) = state_condition(&query.state) {
        select = select.filter(states);
    }
    if query.user.org_role != OrgRole::Admin {
        select = select.filter(permissions.condition(&query.user, PermissionLevel::View));
    }

    select = select.order_by_asc(alert::Column::Name);
    if query.limit > 0 {
        select = select.limit(query.limit);
    }
    select
}

impl AlertStore {
    /// Lists rules matching `query`, ordered by name.
    pub async fn search_alerts(&self, query: &GetAlertsQuery) -> Result<Vec<AlertListItem>> {
        let rows = build_search(query, self.permissions.as_ref())
            .into_model::<AlertListRow>()
            .all(self.db())
            .await?;

        rows.into_iter()
            .map(|r| {
                Ok(AlertListItem {
                    state: parse_state(r.id, &r.state)?,
                    eval_data: parse_eval_data(r.eval_data.as_deref())?,
                    id: r.id,
                    dashboard_id: r.dashboard_id,
                    dashboard_uid: r.dashboard_uid.unwrap_or_default(),
                    dashboard_slug: r.dashboard_slug.unwrap_or_default(),
                    panel_id: r.panel_id,
                    name: r.name,
                    new_state_date: r.new_state_date.with_timezone(&Utc),
                    execution_error: normalize_execution_error(r.execution_error),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::DashboardAclFilter;
    use alertstore_common::types::SignedInUser;
    use sea_orm::{DbBackend, QueryTrait};

    fn viewer() -> SignedInUser {
        SignedInUser {
            user_id: 5,
            org_id: 1,
            org_role: OrgRole::Viewer,
        }
    }

    fn sql_of(query: &GetAlertsQuery) -> (String, String) {
        let stmt = build_search(query, &DashboardAclFilter).build(DbBackend::Sqlite);
        (stmt.sql, format!("{:?}", stmt.values))
    }

    #[test]
    fn state_tokens_are_or_combined_and_negatable() {
        let cond = state_condition(&["ok".to_string(), "not_paused".to_string()]);
        assert!(cond.is_some());
        assert!(state_condition(&["ok".to_string(), "all".to_string()]).is_none());
        assert!(state_condition(&[]).is_none());

        let mut query = GetAlertsQuery::new(1, viewer());
        query.state = vec!["alerting".to_string(), "not_ok".to_string()];
        let (sql, values) = sql_of(&query);
        assert!(sql.contains(r#""alert"."state" = ? OR "alert"."state" <> ?"#));
        assert!(values.contains("alerting"));
        assert!(values.contains("\"ok\""));
    }

    #[test]
    fn user_text_is_bound_not_interpolated() {
        let mut query = GetAlertsQuery::new(1, viewer());
        query.query = "x' OR 1=1 --".to_string();
        query.dashboard_ids = vec![101, 202];
        query.panel_id = 303;
        let (sql, values) = sql_of(&query);

        assert!(!sql.contains("1=1"));
        assert!(!sql.contains("101"));
        assert!(!sql.contains("303"));
        assert!(sql.contains("LIKE ?"));
        assert!(values.contains("1=1"));
        assert!(values.contains("202"));
    }

    #[test]
    fn join_and_permission_follow_query_flags() {
        let mut query = GetAlertsQuery::new(1, viewer());
        let (sql, _) = sql_of(&query);
        assert!(sql.contains("INNER JOIN \"dashboard\""));
        assert!(sql.contains("dashboard_acl"));
        assert!(sql.ends_with(r#"ORDER BY "alert"."name" ASC"#));

        query.standalone_alerts_enabled = true;
        query.user.org_role = OrgRole::Admin;
        query.limit = 20;
        let (sql, _) = sql_of(&query);
        assert!(sql.contains("LEFT JOIN \"dashboard\""));
        assert!(!sql.contains("dashboard_acl"));
        assert!(sql.contains("LIMIT ?"));
    }
}
