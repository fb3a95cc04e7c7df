mod account;
mod auth;
mod imapmirror;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub use account::AccountConfig;
pub use auth::AuthConfig;
pub use imapmirror::Config;

fn home() -> PathBuf {
    PathBuf::from_str(&env::var("HOME").expect("HOME should be set"))
        .expect("HOME should be a parseable path")
}

fn config_home() -> PathBuf {
    let mut config_dir = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from_str(&config_home).expect("XDG_CONFIG_HOME should be a parseable path")
    } else {
        let mut config_home = home();
        config_home.push(".config");
        config_home
    };
    config_dir.push(env!("CARGO_PKG_NAME"));

    config_dir
}

fn data_home() -> PathBuf {
    let mut data_home = if let Ok(data_home) = env::var("XDG_DATA_HOME") {
        PathBuf::from_str(&data_home).expect("XDG_DATA_HOME should be a parseable path")
    } else {
        let mut data_home = home();
        data_home.push(".local/share");
        data_home
    };
    data_home.push(env!("CARGO_PKG_NAME"));

    data_home
}
