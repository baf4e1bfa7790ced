//! Options handed to the external game launch engine.

use std::path::{Path, PathBuf};

use serde::Serialize;

use azlaunch_core::{Account, CloseBehavior, Config, Resolution};

use crate::error::{AccountError, Result};
use crate::lifecycle::SessionLifecycle;
use crate::settings::SettingsStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Memory {
    /// e.g. `"2048M"`
    pub min: String,
    pub max: String,
}

/// Everything the launch engine needs to start the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchOptions {
    /// Account the game is started with
    pub account: Account,
    pub memory: Memory,
    /// Keep the game running when the launcher exits
    pub detached: bool,
    pub close: CloseBehavior,
    /// Fixed window size, `None` lets the game decide
    pub screen: Option<Resolution>,
    pub java_path: Option<String>,
    pub java_args: Vec<String>,
    pub version: String,
    pub instance_dir: PathBuf,
    pub timeout_secs: u64,
}

impl LaunchOptions {
    /// Gather launch options from the current selection and settings.
    pub async fn assemble(
        lifecycle: &SessionLifecycle,
        settings: &SettingsStore,
        config: &Config,
    ) -> Result<Self> {
        let account = lifecycle
            .selected()
            .await?
            .ok_or(AccountError::NoSelectedAccount)?;

        let ram = settings.ram().await?;
        let memory = match (ram.min_arg(), ram.max_arg()) {
            (Some(min), Some(max)) => Memory { min, max },
            _ => {
                return Err(AccountError::invalid(
                    "ram",
                    format!("stored bounds '{}'/'{}' are not usable", ram.min, ram.max),
                ))
            }
        };

        let close = settings.launcher().await?.launcher.close;
        let screen = settings.screen().await?.fixed().cloned();

        Ok(Self {
            account,
            memory,
            detached: close != CloseBehavior::CloseAll,
            close,
            screen,
            java_path: settings.java_path().await?.path,
            java_args: settings.java_args().await?.args,
            version: config.game.version.clone(),
            instance_dir: instance_dir(&config.data_dir(), &config.game.data_directory),
            timeout_secs: config.auth.timeout_secs,
        })
    }
}

/// Game files live in a dot directory, except on macOS.
fn instance_dir(data_dir: &Path, name: &str) -> PathBuf {
    if cfg!(target_os = "macos") {
        data_dir.join(name)
    } else {
        data_dir.join(format!(".{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::lifecycle::tests::{memory_store, test_account};

    async fn setup() -> (SessionLifecycle, SettingsStore, Config) {
        let store = memory_store();
        let config = Config::default();
        let lifecycle = SessionLifecycle::new(Arc::clone(&store));
        let settings = SettingsStore::from_config(store, &config);
        settings.init_defaults().await.unwrap();
        (lifecycle, settings, config)
    }

    #[tokio::test]
    async fn test_requires_selection() {
        let (lifecycle, settings, config) = setup().await;
        let err = LaunchOptions::assemble(&lifecycle, &settings, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NoSelectedAccount));
    }

    #[tokio::test]
    async fn test_assemble_defaults() {
        let (lifecycle, settings, config) = setup().await;
        lifecycle.add_from_login(&test_account("u1")).await.unwrap();

        let options = LaunchOptions::assemble(&lifecycle, &settings, &config)
            .await
            .unwrap();
        assert_eq!(options.account.uuid, "u1");
        assert_eq!(options.memory.min, "2048M");
        assert_eq!(options.memory.max, "4096M");
        assert!(options.detached);
        assert_eq!(options.screen.as_ref().map(|s| s.width.as_str()), Some("1280"));
        assert_eq!(options.version, config.game.version);
        assert_eq!(options.timeout_secs, 10);
    }

    #[tokio::test]
    async fn test_close_all_and_auto_screen() {
        let (lifecycle, settings, config) = setup().await;
        lifecycle.add_from_login(&test_account("u1")).await.unwrap();
        settings.set_close_behavior(CloseBehavior::CloseAll).await.unwrap();
        settings.set_screen("<auto>", "<auto>").await.unwrap();

        let options = LaunchOptions::assemble(&lifecycle, &settings, &config)
            .await
            .unwrap();
        assert!(!options.detached);
        assert!(options.screen.is_none());
    }

    #[test]
    fn test_instance_dir_name() {
        let dir = instance_dir(Path::new("/data"), "azlaunch-instance");
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        if cfg!(target_os = "macos") {
            assert_eq!(name, "azlaunch-instance");
        } else {
            assert_eq!(name, ".azlaunch-instance");
        }
    }
}
