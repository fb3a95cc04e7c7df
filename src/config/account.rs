use derive_getters::Getters;
use serde::Deserialize;

use crate::config::auth::AuthConfig;

#[derive(Debug, Deserialize, Getters)]
pub struct AccountConfig {
    auth: AuthConfig,
    host: String,
    port: u16,
    folders: Vec<String>,
}
