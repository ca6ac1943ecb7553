//! Persistence and consistency engine for alert rules.
//!
//! [`AlertStore`] owns every command and query over the `alert` table and
//! the link tables derived from each rule's settings (`alert_rule_tag`,
//! `alert_rule_notification`). Dashboard saves are reconciled against the
//! persisted rule set by panel id inside a single transaction; runtime state
//! changes go through a guard that refuses changes on paused rules.
//!
//! Storage is SeaORM over SQLite; the schema lives in the `migration` crate.

pub mod entities;
pub mod error;
pub mod permission;
pub mod store;


pub use error::{AlertError, Result};
pub use permission::{DashboardAclFilter, DashboardPermissionFilter};
pub use store::AlertStore;
