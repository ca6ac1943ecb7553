use alertstore_common::types::{PermissionLevel, SignedInUser};
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, Condition};

use crate::entities::{dashboard, dashboard_acl};

/// Injects the dashboard-visibility predicate into alert searches.
///
/// The returned [`Condition`] is applied to a query that already joins
/// `dashboard`; every value in it must be a bound parameter. Users whose
/// role bypasses dashboard permissions never reach this filter.
pub trait DashboardPermissionFilter: Send + Sync {
    fn condition(&self, user: &SignedInUser, required: PermissionLevel) -> Condition;
}

/// Visibility from the `dashboard_acl` table: a dashboard is visible when a
/// grant of at least `required` exists for the user or for the user's role.
#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardAclFilter;

impl DashboardPermissionFilter for DashboardAclFilter {
    fn condition(&self, user: &SignedInUser, required: PermissionLevel) -> Condition {
        let granted = Query::select()
            .column(dashboard_acl::Column::DashboardId)
            .from(dashboard_acl::Entity)
            .cond_where(
                Condition::all()
                    .add(
                        Condition::any()
                            .add(dashboard_acl::Column::UserId.eq(user.user_id))
                            .add(dashboard_acl::Column::Role.eq(user.org_role.as_str())),
                    )
                    .add(dashboard_acl::Column::Permission.gte(required.as_i32())),
            )
            .to_owned();

        Condition::all().add(dashboard::Column::Id.in_subquery(granted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertstore_common::types::OrgRole;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    #[test]
    fn acl_condition_binds_every_value() {
        let user = SignedInUser {
            user_id: 31337,
            org_id: 1,
            org_role: OrgRole::Viewer,
        };
        let stmt = dashboard::Entity::find()
            .filter(DashboardAclFilter.condition(&user, PermissionLevel::Edit))
            .build(DbBackend::Sqlite);

        assert!(stmt.sql.contains("IN (SELECT"));
        assert!(stmt.sql.contains("dashboard_acl"));
        assert!(!stmt.sql.contains("31337"));
        assert!(!stmt.sql.contains("Viewer"));
        let values = format!("{:?}", stmt.values);
        assert!(values.contains("31337"));
        assert!(values.contains("Viewer"));
    }
}
