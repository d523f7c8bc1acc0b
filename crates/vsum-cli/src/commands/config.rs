//! The `config` command.

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use super::{ConfigOverrides, load_config};

/// Print the effective configuration as TOML
#[derive(Debug, Parser)]
pub struct ConfigCommand {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

impl ConfigCommand {
    pub fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path, &self.overrides)?;
        print!("{}", config.to_toml()?);
        Ok(())
    }
}
