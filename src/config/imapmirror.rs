use std::{collections::HashMap, fs::read_to_string, path::PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::config::{AccountConfig, config_home, data_home};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "data_home")]
    data_dir: PathBuf,
    accounts: HashMap<String, AccountConfig>,
}

impl Config {
    pub fn load_from_file(file: Option<PathBuf>) -> Result<Self> {
        let config_file = file.unwrap_or_else(default_location);
        let contents = read_to_string(&config_file)
            .with_context(|| format!("cannot read config file {}", config_file.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("cannot parse config file {}", config_file.display()))
    }

    pub fn account(&self, name: &str) -> Result<&AccountConfig> {
        self.accounts
            .get(name)
            .with_context(|| format!("no account '{name}' configured"))
    }

    pub fn archive_dir(&self, account: &str) -> PathBuf {
        self.data_dir.join(account)
    }
}

fn default_location() -> PathBuf {
    let mut config_file = config_home();
    config_file.push("config.toml");

    config_file
}
