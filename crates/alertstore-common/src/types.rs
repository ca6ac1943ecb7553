use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Runtime state of an alert rule.
///
/// Rules start in [`AlertState::Unknown`]. There is no terminal state;
/// [`AlertState::Paused`] can only be left through the pause operation.
///
/// # Examples
///
/// ```
/// use alertstore_common::types::AlertState;
///
/// let state: AlertState = "no_data".parse().unwrap();
/// assert_eq!(state, AlertState::NoData);
/// assert_eq!(state.to_string(), "no_data");
/// assert!("firing".parse::<AlertState>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    NoData,
    Paused,
    Alerting,
    Ok,
    Pending,
    Unknown,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::NoData => "no_data",
            AlertState::Paused => "paused",
            AlertState::Alerting => "alerting",
            AlertState::Ok => "ok",
            AlertState::Pending => "pending",
            AlertState::Unknown => "unknown",
        }
    }

    /// Returns true when moving to `new_state` would be an actual change.
    pub fn should_update_to(&self, new_state: AlertState) -> bool {
        *self != new_state
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_data" => Ok(AlertState::NoData),
            "paused" => Ok(AlertState::Paused),
            "alerting" => Ok(AlertState::Alerting),
            "ok" => Ok(AlertState::Ok),
            "pending" => Ok(AlertState::Pending),
            "unknown" => Ok(AlertState::Unknown),
            _ => Err(format!("unknown alert state: {s}")),
        }
    }
}

/// What the evaluator should do when a query returns no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataOption {
    Ok,
    #[default]
    NoData,
    KeepState,
    Alerting,
}

impl NoDataOption {
    /// State the rule moves to, or `None` for [`NoDataOption::KeepState`].
    pub fn to_alert_state(&self) -> Option<AlertState> {
        match self {
            NoDataOption::Ok => Some(AlertState::Ok),
            NoDataOption::NoData => Some(AlertState::NoData),
            NoDataOption::Alerting => Some(AlertState::Alerting),
            NoDataOption::KeepState => None,
        }
    }
}

/// What the evaluator should do when evaluation itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorOption {
    #[default]
    Alerting,
    KeepState,
}

impl ExecutionErrorOption {
    pub fn to_alert_state(&self) -> Option<AlertState> {
        match self {
            ExecutionErrorOption::Alerting => Some(AlertState::Alerting),
            ExecutionErrorOption::KeepState => None,
        }
    }
}

/// A `(key, value)` label. Deduplicated globally in the `tag` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: i64,
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: 0,
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluator {
    #[serde(default)]
    pub params: Vec<f64>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Operator {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionQuery {
    #[serde(default)]
    pub datasource_id: i64,
    /// Datasource-specific query body; never interpreted by the store.
    #[serde(default)]
    pub model: serde_json::Value,
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reducer {
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One condition of a rule, evaluated by the external alerting engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertCondition {
    #[serde(default)]
    pub evaluator: Evaluator,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub query: ConditionQuery,
    #[serde(default)]
    pub reducer: Reducer,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Reference to a notification channel by its external uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRef {
    pub uid: String,
}

/// Declarative configuration of a rule.
///
/// Tag links and notification links are derived from this document every
/// time the rule is written, so it is the single source of truth for both.
///
/// # Examples
///
/// ```
/// use alertstore_common::types::AlertSettings;
///
/// let settings: AlertSettings = serde_json::from_str(r#"{
///     "alertRuleTags": {"team": "db", "severity": "high"},
///     "notifications": [{"uid": "pager"}, {"uid": "pager"}, {"uid": "mail"}]
/// }"#).unwrap();
/// assert_eq!(settings.tags().len(), 2);
/// assert_eq!(settings.notification_uids(), vec!["mail", "pager"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    #[serde(default)]
    pub conditions: Vec<AlertCondition>,
    #[serde(default)]
    pub alert_rule_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub notifications: Vec<NotificationRef>,
    #[serde(default)]
    pub no_data_state: NoDataOption,
    #[serde(default)]
    pub execution_error_state: ExecutionErrorOption,
    #[serde(default)]
    pub handler: i64,
}

impl AlertSettings {
    /// Tags declared by the rule, one per distinct key.
    pub fn tags(&self) -> Vec<Tag> {
        self.alert_rule_tags
            .iter()
            .map(|(k, v)| Tag::new(k.clone(), v.clone()))
            .collect()
    }

    /// Distinct notification channel uids, sorted. Blank uids are dropped.
    pub fn notification_uids(&self) -> Vec<String> {
        self.notifications
            .iter()
            .map(|n| n.uid.trim())
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// A persisted alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: i64,
    pub org_id: i64,
    /// 0 for standalone rules.
    pub dashboard_id: i64,
    /// 0 for standalone rules; unique within a dashboard otherwise.
    pub panel_id: i64,
    pub name: String,
    pub message: String,
    /// Evaluation interval in seconds.
    pub frequency: i64,
    #[serde(rename = "for", with = "humantime_serde")]
    pub for_duration: Duration,
    pub state: AlertState,
    /// Empty when the last evaluation succeeded.
    pub execution_error: String,
    pub eval_data: Option<serde_json::Value>,
    pub new_state_date: DateTime<Utc>,
    pub state_changes: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub settings: AlertSettings,
}

impl AlertRule {
    /// Dashboard rules need an org, a dashboard and a panel to be stored.
    pub fn valid_to_save(&self) -> bool {
        self.dashboard_id != 0 && self.org_id != 0 && self.panel_id != 0
    }
}

/// Desired definition of the alert attached to one dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlert {
    pub panel_id: i64,
    pub name: String,
    #[serde(default)]
    pub message: String,
    pub frequency: i64,
    #[serde(rename = "for", default, with = "humantime_serde")]
    pub for_duration: Duration,
    #[serde(default)]
    pub settings: AlertSettings,
}

impl DashboardAlert {
    /// True when persisting `self` over `existing` would change something
    /// a user can see. State is never part of the comparison.
    pub fn differs_from(&self, existing: &AlertRule) -> bool {
        self.name != existing.name
            || self.message != existing.message
            || self.frequency != existing.frequency
            || self.for_duration != existing.for_duration
            || self.settings != existing.settings
    }
}

/// Replace the full alert set of a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAlertsCommand {
    pub dashboard_id: i64,
    pub org_id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub alerts: Vec<DashboardAlert>,
}

/// Counts reported by a dashboard reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveAlertsOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

/// Create a standalone rule (no dashboard).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertCommand {
    #[serde(skip)]
    pub org_id: i64,
    pub name: String,
    pub frequency: i64,
    /// Raw `for` text, e.g. `"5m"`.
    #[serde(rename = "for", default)]
    pub for_duration: String,
    #[serde(default)]
    pub conditions: Vec<AlertCondition>,
    #[serde(default)]
    pub alert_rule_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub notifications: Vec<NotificationRef>,
    #[serde(default)]
    pub no_data_state: NoDataOption,
    #[serde(default)]
    pub execution_error_state: ExecutionErrorOption,
    #[serde(default)]
    pub handler: i64,
}

impl CreateAlertCommand {
    pub fn settings(&self) -> AlertSettings {
        AlertSettings {
            conditions: self.conditions.clone(),
            alert_rule_tags: self.alert_rule_tags.clone(),
            notifications: self.notifications.clone(),
            no_data_state: self.no_data_state,
            execution_error_state: self.execution_error_state,
            handler: self.handler,
        }
    }
}

/// Update the descriptive and configuration fields of an existing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertCommand {
    pub id: i64,
    #[serde(skip)]
    pub org_id: i64,
    pub name: String,
    pub frequency: i64,
    #[serde(rename = "for", default)]
    pub for_duration: String,
    #[serde(default)]
    pub conditions: Vec<AlertCondition>,
    #[serde(default)]
    pub alert_rule_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub notifications: Vec<NotificationRef>,
    #[serde(default)]
    pub no_data_state: NoDataOption,
    #[serde(default)]
    pub execution_error_state: ExecutionErrorOption,
    #[serde(default)]
    pub handler: i64,
}

impl UpdateAlertCommand {
    pub fn settings(&self) -> AlertSettings {
        AlertSettings {
            conditions: self.conditions.clone(),
            alert_rule_tags: self.alert_rule_tags.clone(),
            notifications: self.notifications.clone(),
            no_data_state: self.no_data_state,
            execution_error_state: self.execution_error_state,
            handler: self.handler,
        }
    }
}

/// Record the outcome of an evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAlertStateCommand {
    pub alert_id: i64,
    pub org_id: i64,
    pub state: AlertState,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub eval_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseAlertCommand {
    pub org_id: i64,
    pub alert_ids: Vec<i64>,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Viewer,
    Editor,
    Admin,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Viewer => "Viewer",
            OrgRole::Editor => "Editor",
            OrgRole::Admin => "Admin",
        }
    }
}

/// Dashboard permission levels, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    View = 1,
    Edit = 2,
    Admin = 4,
}

impl PermissionLevel {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: i64,
    pub org_role: OrgRole,
}

/// State filter token that disables state filtering.
pub const STATE_FILTER_ALL: &str = "all";

/// Prefix turning a state filter token into "state is not X".
pub const STATE_FILTER_NOT_PREFIX: &str = "not_";

/// Search over alert rules.
#[derive(Debug, Clone)]
pub struct GetAlertsQuery {
    pub org_id: i64,
    /// Substring of the rule name; blank means no name filter.
    pub query: String,
    pub dashboard_ids: Vec<i64>,
    /// 0 means any panel.
    pub panel_id: i64,
    /// State tokens, OR-combined. `not_<state>` negates; `all` disables.
    pub state: Vec<String>,
    pub user: SignedInUser,
    /// 0 means unlimited.
    pub limit: u64,
    /// List rules that are not attached to any dashboard as well.
    pub standalone_alerts_enabled: bool,
}

impl GetAlertsQuery {
    pub fn new(org_id: i64, user: SignedInUser) -> Self {
        Self {
            org_id,
            query: String::new(),
            dashboard_ids: Vec::new(),
            panel_id: 0,
            state: Vec::new(),
            user,
            limit: 0,
            standalone_alerts_enabled: false,
        }
    }
}

/// Row returned by an alert search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListItem {
    pub id: i64,
    pub dashboard_id: i64,
    pub dashboard_uid: String,
    pub dashboard_slug: String,
    pub panel_id: i64,
    pub name: String,
    pub state: AlertState,
    pub new_state_date: DateTime<Utc>,
    pub eval_data: Option<serde_json::Value>,
    pub execution_error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStateInfo {
    pub id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub state: AlertState,
    pub new_state_date: DateTime<Utc>,
}

/// Older rows carry a single space where the evaluator reported no error.
///
/// # Examples
///
/// ```
/// use alertstore_common::types::normalize_execution_error;
///
/// assert_eq!(normalize_execution_error(" ".to_string()), "");
/// assert_eq!(normalize_execution_error("timeout".to_string()), "timeout");
/// ```
pub fn normalize_execution_error(raw: String) -> String {
    if raw == " " {
        String::new()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_state_round_trips_through_text() {
        for state in [
            AlertState::NoData,
            AlertState::Paused,
            AlertState::Alerting,
            AlertState::Ok,
            AlertState::Pending,
            AlertState::Unknown,
        ] {
            assert_eq!(state.as_str().parse::<AlertState>(), Ok(state));
        }
        assert!(AlertState::Ok.should_update_to(AlertState::Alerting));
        assert!(!AlertState::Ok.should_update_to(AlertState::Ok));
    }

    #[test]
    fn option_enums_map_to_states() {
        assert_eq!(NoDataOption::KeepState.to_alert_state(), None);
        assert_eq!(NoDataOption::Ok.to_alert_state(), Some(AlertState::Ok));
        assert_eq!(
            ExecutionErrorOption::Alerting.to_alert_state(),
            Some(AlertState::Alerting)
        );
        let parsed: NoDataOption = serde_json::from_str("\"keep_state\"").unwrap();
        assert_eq!(parsed, NoDataOption::KeepState);
    }

    #[test]
    fn settings_parse_dashboard_json() {
        let settings: AlertSettings = serde_json::from_value(serde_json::json!({
            "conditions": [{
                "evaluator": {"params": [80.0], "type": "gt"},
                "operator": {"type": "and"},
                "query": {"datasourceId": 1, "model": {"expr": "up"}, "params": ["A", "5m", "now"]},
                "reducer": {"params": [], "type": "avg"},
                "type": "query"
            }],
            "alertRuleTags": {"env": "prod"},
            "notifications": [{"uid": "ops"}, {"uid": "  "}],
            "noDataState": "alerting",
            "executionErrorState": "keep_state"
        }))
        .unwrap();

        assert_eq!(settings.conditions.len(), 1);
        assert_eq!(settings.conditions[0].evaluator.kind, "gt");
        assert_eq!(settings.tags(), vec![Tag::new("env", "prod")]);
        assert_eq!(settings.notification_uids(), vec!["ops".to_string()]);
        assert_eq!(settings.no_data_state, NoDataOption::Alerting);
    }

    #[test]
    fn dashboard_alert_change_detection_ignores_state() {
        let now = Utc::now();
        let existing = AlertRule {
            id: 7,
            org_id: 1,
            dashboard_id: 2,
            panel_id: 3,
            name: "cpu".into(),
            message: String::new(),
            frequency: 60,
            for_duration: Duration::from_secs(300),
            state: AlertState::Alerting,
            execution_error: String::new(),
            eval_data: None,
            new_state_date: now,
            state_changes: 4,
            created: now,
            updated: now,
            settings: AlertSettings::default(),
        };
        let mut desired = DashboardAlert {
            panel_id: 3,
            name: "cpu".into(),
            message: String::new(),
            frequency: 60,
            for_duration: Duration::from_secs(300),
            settings: AlertSettings::default(),
        };
        assert!(!desired.differs_from(&existing));

        desired.message = "check the load".into();
        assert!(desired.differs_from(&existing));

        desired.message.clear();
        desired.settings.alert_rule_tags.insert("a".into(), "b".into());
        assert!(desired.differs_from(&existing));
    }

    #[test]
    fn validity_requires_org_dashboard_and_panel() {
        let now = Utc::now();
        let mut rule = AlertRule {
            id: 0,
            org_id: 1,
            dashboard_id: 1,
            panel_id: 1,
            name: "x".into(),
            message: String::new(),
            frequency: 10,
            for_duration: Duration::ZERO,
            state: AlertState::Unknown,
            execution_error: String::new(),
            eval_data: None,
            new_state_date: now,
            state_changes: 0,
            created: now,
            updated: now,
            settings: AlertSettings::default(),
        };
        assert!(rule.valid_to_save());
        rule.panel_id = 0;
        assert!(!rule.valid_to_save());
    }
}
