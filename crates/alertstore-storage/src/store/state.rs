use alertstore_common::types::{AlertRule, AlertState, PauseAlertCommand, SetAlertStateCommand};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{Set, Unchanged},
    ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};

use crate::entities::alert::{self, Column, Entity};
use crate::error::{AlertError, Result};
use crate::store::alert::{encode_eval_data, find_in_org, parse_state, to_rule};
use crate::store::AlertStore;

fn pause_target(paused: bool) -> AlertState {
    if paused {
        AlertState::Paused
    } else {
        AlertState::Unknown
    }
}

impl AlertStore {
    /// Records an evaluation outcome.
    ///
    /// Paused rules reject every change (`InvalidTransition`) and a change to
    /// the current state is rejected (`NoOpTransition`). Otherwise state,
    /// `state_changes`, `new_state_date`, eval data and execution error are
    /// written together; an empty error is written as empty.
    pub async fn set_alert_state(&self, cmd: &SetAlertStateCommand) -> Result<AlertRule> {
        let txn = self.db().begin().await?;
        let current = find_in_org(&txn, cmd.alert_id, cmd.org_id).await?;
        let current_state = parse_state(current.id, &current.state)?;

        if current_state == AlertState::Paused {
            return Err(AlertError::InvalidTransition { id: current.id });
        }
        if !current_state.should_update_to(cmd.state) {
            return Err(AlertError::NoOpTransition {
                id: current.id,
                state: current_state,
            });
        }

        let am = alert::ActiveModel {
            id: Unchanged(current.id),
            state: Set(cmd.state.to_string()),
            state_changes: Set(current.state_changes + 1),
            new_state_date: Set(self.now()),
            eval_data: Set(encode_eval_data(cmd.eval_data.as_ref())?),
            execution_error: Set(cmd.error.clone()),
            ..Default::default()
        };
        let model = am.update(&txn).await?;
        txn.commit().await?;

        tracing::debug!(
            alert_id = model.id,
            from = %current_state,
            to = %cmd.state,
            "Alert state changed"
        );
        to_rule(model)
    }

    /// Moves the given rules of `cmd.org_id` to `paused`, or back to
    /// `unknown`, regardless of their current state. Absent ids and rules of
    /// other orgs are ignored. Returns rows affected.
    pub async fn pause_alert(&self, cmd: &PauseAlertCommand) -> Result<u64> {
        if cmd.alert_ids.is_empty() {
            return Err(AlertError::Validation(
                "command contains no alert ids".to_string(),
            ));
        }
        let target = pause_target(cmd.paused);

        let txn = self.db().begin().await?;
        let res = Entity::update_many()
            .col_expr(Column::State, Expr::value(target.to_string()))
            .col_expr(Column::NewStateDate, Expr::value(self.now()))
            .filter(Column::OrgId.eq(cmd.org_id))
            .filter(Column::Id.is_in(cmd.alert_ids.iter().copied()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(
            org_id = cmd.org_id,
            state = %target,
            requested = cmd.alert_ids.len(),
            affected = res.rows_affected,
            "Alerts pause toggled"
        );
        Ok(res.rows_affected)
    }

    /// Pauses or unpauses every rule in the store.
    pub async fn pause_all_alerts(&self, paused: bool) -> Result<u64> {
        let target = pause_target(paused);

        let txn = self.db().begin().await?;
        let res = Entity::update_many()
            .col_expr(Column::State, Expr::value(target.to_string()))
            .col_expr(Column::NewStateDate, Expr::value(self.now()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(state = %target, affected = res.rows_affected, "All alerts pause toggled");
        Ok(res.rows_affected)
    }
}
