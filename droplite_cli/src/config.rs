use std::env::var;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const CONFIG_FILE: &str = "droplite.toml";

#[derive(Serialize, Deserialize, Default)]
pub struct DashboardConfigFile {
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub api_base: String,
}

impl DashboardConfig {
    /// Command line, then `DROPLITE_API_BASE`, then `droplite.toml`, then the default.
    pub fn load(api_base: Option<String>) -> anyhow::Result<Self> {
        let file = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(text) => Some(toml::from_str::<DashboardConfigFile>(&text)?),
            Err(_) => None,
        };
        Ok(Self::resolve(
            api_base,
            var("DROPLITE_API_BASE").ok(),
            file.as_ref(),
        ))
    }

    pub fn resolve(
        api_base: Option<String>,
        env: Option<String>,
        file: Option<&DashboardConfigFile>,
    ) -> Self {
        let api_base = api_base
            .or(env)
            .or(file.and_then(|x| x.api_base.clone()))
            .unwrap_or(DEFAULT_API_BASE.to_string());
        DashboardConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}
