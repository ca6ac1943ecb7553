use anyhow::{Context, Result};
use alertstore_common::types::{OrgRole, SignedInUser};
use tracing_subscriber::EnvFilter;

use alertstore_server::config::ServerConfig;
use alertstore_server::state::AppState;

const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  alertstore migrate [config.toml]                          Create or upgrade the schema");
    eprintln!("  alertstore save-alerts <config.toml> <dashboards.json>    Reconcile dashboard alerts from a seed file");
    eprintln!("  alertstore pause-all <config.toml>                        Pause every alert rule");
    eprintln!("  alertstore unpause-all <config.toml>                      Unpause every alert rule");
    eprintln!("  alertstore search <config.toml> <org_id> [text]           List alert rules of an org");
    eprintln!("  alertstore delete-dashboard <config.toml> <dashboard_id>  Delete every alert rule of a dashboard");
}

fn init_tracing(config: &ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log.directive().parse()?))
        .init();
    Ok(())
}

async fn open(config_path: &str) -> Result<AppState> {
    let config = ServerConfig::load(config_path)?;
    init_tracing(&config)?;
    AppState::from_config(config).await
}

fn required<'a>(args: &'a [String], idx: usize, what: &str) -> Result<&'a str> {
    args.get(idx).map(String::as_str).ok_or_else(|| {
        print_usage();
        anyhow::anyhow!("missing {what} argument")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("migrate") => {
            let config_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
            open(config_path).await?;
            tracing::info!(config = %config_path, "Migrations applied");
            Ok(())
        }
        Some("save-alerts") => {
            let config_path = required(&args, 2, "<config.toml>")?;
            let seed_path = required(&args, 3, "<dashboards.json>")?;
            run_save_alerts(config_path, seed_path).await
        }
        Some("pause-all") => {
            let config_path = required(&args, 2, "<config.toml>")?;
            run_pause_all(config_path, true).await
        }
        Some("unpause-all") => {
            let config_path = required(&args, 2, "<config.toml>")?;
            run_pause_all(config_path, false).await
        }
        Some("search") => {
            let config_path = required(&args, 2, "<config.toml>")?;
            let org_id: i64 = required(&args, 3, "<org_id>")?
                .parse()
                .context("org_id must be an integer")?;
            run_search(config_path, org_id, args.get(4).map(String::as_str)).await
        }
        Some("delete-dashboard") => {
            let config_path = required(&args, 2, "<config.toml>")?;
            let dashboard_id: i64 = required(&args, 3, "<dashboard_id>")?
                .parse()
                .context("dashboard_id must be an integer")?;
            run_delete_dashboard(config_path, dashboard_id).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("unknown command: {}", other.unwrap_or("<none>"))
        }
    }
}

async fn run_save_alerts(config_path: &str, seed_path: &str) -> Result<()> {
    let state = open(config_path).await?;
    let outcome = state.apply_dashboard_seed(seed_path).await?;
    tracing::info!(
        inserted = outcome.inserted,
        updated = outcome.updated,
        unchanged = outcome.unchanged,
        deleted = outcome.deleted,
        "save-alerts completed"
    );
    Ok(())
}

async fn run_pause_all(config_path: &str, paused: bool) -> Result<()> {
    let state = open(config_path).await?;
    let affected = state.store.pause_all_alerts(paused).await?;
    tracing::info!(paused, affected, "pause-all completed");
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_search(config_path: &str, org_id: i64, text: Option<&str>) -> Result<()> {
    let state = open(config_path).await?;
    // operator access: the ACL filter does not apply
    let operator = SignedInUser {
        user_id: 0,
        org_id,
        org_role: OrgRole::Admin,
    };
    let mut query = state.search_query(org_id, operator);
    if let Some(text) = text {
        query.query = text.to_string();
    }
    for item in state.store.search_alerts(&query).await? {
        println!("{}", serde_json::to_string(&item)?);
    }
    Ok(())
}

async fn run_delete_dashboard(config_path: &str, dashboard_id: i64) -> Result<()> {
    let state = open(config_path).await?;
    let deleted = state.store.delete_dashboard_alerts(dashboard_id).await?;
    tracing::info!(dashboard_id, deleted, "delete-dashboard completed");
    Ok(())
}
