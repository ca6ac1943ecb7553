#![allow(dead_code)]

use alertstore_common::types::{OrgRole, SignedInUser};
use alertstore_server::config::ServerConfig;
use alertstore_server::state::AppState;
use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
}

impl TestContext {
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `content` under the temp dir and returns the path as a string.
    pub fn write_file(&self, name: &str, content: &str) -> Result<String> {
        let path = self.path(name);
        std::fs::write(&path, content)?;
        Ok(path.to_string_lossy().to_string())
    }
}

pub fn config_toml(temp_dir: &TempDir, standalone: bool) -> String {
    let data_dir = temp_dir.path().join("data");
    format!(
        r#"
[database]
url = "sqlite://{}/alertstore.db?mode=rwc"
data_dir = "{}"

[alerting]
standalone_alerts_enabled = {standalone}
"#,
        data_dir.display(),
        data_dir.display(),
    )
}

pub async fn build_test_context(standalone: bool) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let config_path = temp_dir.path().join("server.toml");
    std::fs::write(&config_path, config_toml(&temp_dir, standalone))?;

    let config = ServerConfig::load(&config_path.to_string_lossy())?;
    let state = AppState::from_config(config).await?;
    Ok(TestContext { temp_dir, state })
}

pub fn operator(org_id: i64) -> SignedInUser {
    SignedInUser {
        user_id: 0,
        org_id,
        org_role: OrgRole::Admin,
    }
}
