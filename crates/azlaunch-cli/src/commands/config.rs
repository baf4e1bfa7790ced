//! Configuration management commands.

use azlaunch_core::Config;

use crate::ConfigAction;

pub fn handle(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Validate => {
            let config = Config::load()?;
            let result = config.validate();
            for issue in &result.issues {
                println!("{:?} {}: {}", issue.severity, issue.field, issue.message);
            }
            if result.is_ok() {
                println!("Configuration is valid.");
            } else {
                anyhow::bail!("{} configuration error(s)", result.errors().len());
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_dir().join("config.toml").display());
        }
    }
    Ok(())
}
