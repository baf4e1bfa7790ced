//! Settings singletons stored next to the accounts.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use azlaunch_core::config::DefaultsConfig;
use azlaunch_core::{
    CloseBehavior, Config, JavaArgs, JavaPath, LauncherSettings, RamSettings, ScreenSettings,
    SelectionPointer, SENTINEL_ID,
};
use azlaunch_store::{Collection, RecordStore, RecordStoreExt, StoreError};

use crate::error::{AccountError, Result};

/// Typed access to the RAM, screen, launcher and Java settings.
pub struct SettingsStore {
    store: Arc<dyn RecordStore>,
    defaults: DefaultsConfig,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn RecordStore>, defaults: DefaultsConfig) -> Self {
        Self { store, defaults }
    }

    pub fn from_config(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self::new(store, config.defaults.clone())
    }

    /// Create every singleton whose collection is still empty. Returns the
    /// collections that were initialized.
    pub async fn init_defaults(&self) -> Result<Vec<Collection>> {
        let mut created = Vec::new();

        self.seed(Collection::AccountsSelected, &SelectionPointer::empty(), &mut created)
            .await?;
        self.seed(Collection::JavaPath, &JavaPath::default(), &mut created)
            .await?;
        self.seed(Collection::JavaArgs, &JavaArgs::default(), &mut created)
            .await?;
        self.seed(Collection::Launcher, &LauncherSettings::default(), &mut created)
            .await?;
        self.seed(Collection::Ram, &RamSettings::from_defaults(&self.defaults), &mut created)
            .await?;
        self.seed(
            Collection::Screen,
            &ScreenSettings::from_defaults(&self.defaults),
            &mut created,
        )
        .await?;

        if !created.is_empty() {
            info!(collections = ?created, "Initialized default settings");
        }
        Ok(created)
    }

    pub async fn ram(&self) -> Result<RamSettings> {
        Ok(self
            .load(Collection::Ram)
            .await?
            .unwrap_or_else(|| RamSettings::from_defaults(&self.defaults)))
    }

    pub async fn screen(&self) -> Result<ScreenSettings> {
        Ok(self
            .load(Collection::Screen)
            .await?
            .unwrap_or_else(|| ScreenSettings::from_defaults(&self.defaults)))
    }

    pub async fn launcher(&self) -> Result<LauncherSettings> {
        Ok(self.load(Collection::Launcher).await?.unwrap_or_default())
    }

    pub async fn java_path(&self) -> Result<JavaPath> {
        Ok(self.load(Collection::JavaPath).await?.unwrap_or_default())
    }

    pub async fn java_args(&self) -> Result<JavaArgs> {
        Ok(self.load(Collection::JavaArgs).await?.unwrap_or_default())
    }

    /// Set memory bounds in gigabytes.
    pub async fn set_ram(&self, min: &str, max: &str) -> Result<RamSettings> {
        let min_gb = parse_gigabytes("ram.min", min)?;
        let max_gb = parse_gigabytes("ram.max", max)?;
        if min_gb > max_gb {
            return Err(AccountError::invalid(
                "ram.min",
                format!("{} GB exceeds the maximum of {} GB", min, max),
            ));
        }

        let ram = RamSettings::new(min.trim(), max.trim());
        self.save(Collection::Ram, &ram).await?;
        Ok(ram)
    }

    /// Set the window size. A width of `<auto>` lets the game decide.
    pub async fn set_screen(&self, width: &str, height: &str) -> Result<ScreenSettings> {
        let screen = if width.trim() == ScreenSettings::AUTO {
            ScreenSettings::new(ScreenSettings::AUTO, ScreenSettings::AUTO)
        } else {
            parse_pixels("screen.width", width)?;
            parse_pixels("screen.height", height)?;
            ScreenSettings::new(width.trim(), height.trim())
        };

        self.save(Collection::Screen, &screen).await?;
        Ok(screen)
    }

    pub async fn set_close_behavior(&self, close: CloseBehavior) -> Result<LauncherSettings> {
        let settings = LauncherSettings::new(close);
        self.save(Collection::Launcher, &settings).await?;
        Ok(settings)
    }

    /// Set a custom Java executable, or `None` for the bundled runtime.
    pub async fn set_java_path(&self, path: Option<String>) -> Result<JavaPath> {
        let path = path.filter(|p| !p.trim().is_empty());
        let settings = JavaPath::new(path);
        self.save(Collection::JavaPath, &settings).await?;
        Ok(settings)
    }

    pub async fn set_java_args(&self, args: Vec<String>) -> Result<JavaArgs> {
        let args = args
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let settings = JavaArgs::new(args);
        self.save(Collection::JavaArgs, &settings).await?;
        Ok(settings)
    }

    async fn seed<T: Serialize + Sync>(
        &self,
        collection: Collection,
        value: &T,
        created: &mut Vec<Collection>,
    ) -> Result<()> {
        if self.store.count(collection).await? > 0 {
            return Ok(());
        }
        match self.store.add_json(collection, SENTINEL_ID, value).await {
            Ok(_) => created.push(collection),
            Err(StoreError::DuplicateKey { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn load<T: DeserializeOwned + Send>(&self, collection: Collection) -> Result<Option<T>> {
        Ok(self.store.get_as(collection, SENTINEL_ID).await?)
    }

    /// Update the singleton, creating it when absent.
    async fn save<T: Serialize + Sync>(&self, collection: Collection, value: &T) -> Result<()> {
        match self.store.update_json(collection, SENTINEL_ID, value).await {
            Err(StoreError::NotFound { .. }) => {
                self.store.add_json(collection, SENTINEL_ID, value).await?;
            }
            other => other?,
        }
        debug!(collection = %collection, "Setting saved");
        Ok(())
    }
}

fn parse_gigabytes(field: &str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(gb) if gb.is_finite() && gb > 0.0 => Ok(gb),
        _ => Err(AccountError::invalid(
            field,
            format!("'{}' is not a positive number of gigabytes", value),
        )),
    }
}

fn parse_pixels(field: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(px) if px > 0 => Ok(px),
        _ => Err(AccountError::invalid(
            field,
            format!("'{}' is not a positive pixel count", value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::memory_store;

    fn settings() -> SettingsStore {
        SettingsStore::new(memory_store(), DefaultsConfig::default())
    }

    #[tokio::test]
    async fn test_init_defaults_once() {
        let settings = settings();
        let created = settings.init_defaults().await.unwrap();
        assert_eq!(created.len(), 6);
        assert!(!created.contains(&Collection::Profile));
        assert!(settings.init_defaults().await.unwrap().is_empty());

        let ram = settings.ram().await.unwrap();
        assert_eq!((ram.min.as_str(), ram.max.as_str()), ("2", "4"));
    }

    #[tokio::test]
    async fn test_init_keeps_existing_values() {
        let settings = settings();
        settings.set_close_behavior(CloseBehavior::CloseAll).await.unwrap();

        let created = settings.init_defaults().await.unwrap();
        assert!(!created.contains(&Collection::Launcher));
        assert_eq!(
            settings.launcher().await.unwrap().launcher.close,
            CloseBehavior::CloseAll
        );
    }

    #[tokio::test]
    async fn test_getters_fall_back_to_defaults() {
        let settings = settings();
        assert_eq!(settings.screen().await.unwrap().screen.width, "1280");
        assert_eq!(settings.java_path().await.unwrap().path, None);
        assert!(settings.java_args().await.unwrap().args.is_empty());
    }

    #[tokio::test]
    async fn test_set_ram_validation() {
        let settings = settings();
        assert!(matches!(
            settings.set_ram("8", "4").await,
            Err(AccountError::InvalidSetting { .. })
        ));
        assert!(matches!(
            settings.set_ram("lots", "4").await,
            Err(AccountError::InvalidSetting { .. })
        ));

        settings.set_ram("3", "6").await.unwrap();
        settings.set_ram("1.5", "2").await.unwrap();
        assert_eq!(settings.ram().await.unwrap().min, "1.5");
    }

    #[tokio::test]
    async fn test_set_screen() {
        let settings = settings();
        assert!(settings.set_screen("wide", "720").await.is_err());

        let auto = settings.set_screen("<auto>", "").await.unwrap();
        assert!(auto.fixed().is_none());

        settings.set_screen("1920", "1080").await.unwrap();
        assert_eq!(settings.screen().await.unwrap().screen.height, "1080");
    }

    #[tokio::test]
    async fn test_java_settings() {
        let settings = settings();
        settings
            .set_java_path(Some("/opt/java/bin/java".to_string()))
            .await
            .unwrap();
        settings
            .set_java_args(vec!["-XX:+UseG1GC".to_string(), " ".to_string()])
            .await
            .unwrap();

        assert_eq!(
            settings.java_path().await.unwrap().path.as_deref(),
            Some("/opt/java/bin/java")
        );
        assert_eq!(settings.java_args().await.unwrap().args, vec!["-XX:+UseG1GC"]);

        settings.set_java_path(Some(String::new())).await.unwrap();
        assert_eq!(settings.java_path().await.unwrap().path, None);
    }
}
