pub mod alert;
pub mod alert_notification;
pub mod alert_notification_state;
pub mod alert_rule_notification;
pub mod alert_rule_tag;
pub mod annotation;
pub mod dashboard;
pub mod dashboard_acl;
pub mod tag;
