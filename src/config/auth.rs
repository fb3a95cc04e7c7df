use std::process::Command;

use anyhow::{Context as _, Result, ensure};
use derive_getters::Getters;
use serde::Deserialize;

#[derive(Debug, Deserialize, Getters)]
pub struct PlainAuthConfig {
    user: String,
    #[getter(skip)]
    password_cmd: String,
}

impl PlainAuthConfig {
    pub fn password(&self) -> Result<String> {
        let mut cmd_parts = self.password_cmd.split(' ');
        let mut cmd = Command::new(
            cmd_parts
                .next()
                .context("password_cmd should specify a program")?,
        );
        for part in cmd_parts {
            cmd.arg(part);
        }
        let output = cmd.output().context("password_cmd should be executable")?;

        ensure!(
            !output.stdout.is_empty(),
            "could not retrieve password from password_cmd"
        );

        Ok(String::from_utf8(output.stdout)
            .context("password_cmd should evaluate to a password")?
            .trim_end()
            .to_string())
    }
}

// todo: support oauth2
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    Plain(PlainAuthConfig),
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_password_runs_the_configured_command() {
        let auth = PlainAuthConfig {
            user: "me".to_string(),
            password_cmd: "echo hunter2".to_string(),
        };
        assert_eq!("hunter2", assert_ok!(auth.password()));
    }

    #[rstest]
    fn test_empty_password_output_fails() {
        let auth = PlainAuthConfig {
            user: "me".to_string(),
            password_cmd: "true".to_string(),
        };
        assert_err!(auth.password());
    }
}
