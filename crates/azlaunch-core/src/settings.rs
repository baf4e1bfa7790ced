//! Singleton records: the selection pointer and user settings.
//!
//! Every singleton collection holds exactly one record keyed by
//! [`SENTINEL_ID`]. The `uuid` field carries that sentinel so the records keep
//! the layout older launcher versions wrote.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::DefaultsConfig;

/// Identifier of the single record in every singleton collection.
pub const SENTINEL_ID: &str = "1234";

fn sentinel() -> String {
    SENTINEL_ID.to_string()
}

/// Names the currently active account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPointer {
    #[serde(default = "sentinel")]
    pub uuid: String,
    #[serde(default)]
    pub selected: Option<String>,
}

impl SelectionPointer {
    pub fn empty() -> Self {
        Self {
            uuid: sentinel(),
            selected: None,
        }
    }

    pub fn pointing_at(uuid: impl Into<String>) -> Self {
        Self {
            uuid: sentinel(),
            selected: Some(uuid.into()),
        }
    }
}

impl Default for SelectionPointer {
    fn default() -> Self {
        Self::empty()
    }
}

/// Memory bounds handed to the game, in gigabytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamSettings {
    #[serde(default = "sentinel")]
    pub uuid: String,
    #[serde(rename = "ramMin")]
    pub min: String,
    #[serde(rename = "ramMax")]
    pub max: String,
}

impl RamSettings {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            uuid: sentinel(),
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self::new(defaults.ram_min.clone(), defaults.ram_max.clone())
    }

    /// JVM style memory argument, e.g. `"2048M"` for `"2"`.
    pub fn min_arg(&self) -> Option<String> {
        gigabytes_to_arg(&self.min)
    }

    pub fn max_arg(&self) -> Option<String> {
        gigabytes_to_arg(&self.max)
    }
}

fn gigabytes_to_arg(value: &str) -> Option<String> {
    let gb: f64 = value.trim().parse().ok()?;
    if !gb.is_finite() || gb <= 0.0 {
        return None;
    }
    Some(format!("{}M", (gb * 1024.0).round() as u64))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: String,
    pub height: String,
}

/// Game window size. A width of `<auto>` lets the game decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSettings {
    #[serde(default = "sentinel")]
    pub uuid: String,
    pub screen: Resolution,
}

impl ScreenSettings {
    pub const AUTO: &'static str = "<auto>";

    pub fn new(width: impl Into<String>, height: impl Into<String>) -> Self {
        Self {
            uuid: sentinel(),
            screen: Resolution {
                width: width.into(),
                height: height.into(),
            },
        }
    }

    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self::new(defaults.screen_width.clone(), defaults.screen_height.clone())
    }

    /// The fixed resolution, or `None` when the game picks its own.
    pub fn fixed(&self) -> Option<&Resolution> {
        if self.screen.width == Self::AUTO {
            None
        } else {
            Some(&self.screen)
        }
    }
}

/// What happens to the launcher window once the game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseBehavior {
    /// Close the launcher, the game keeps running
    #[default]
    CloseLauncher,
    /// Close the launcher and stop the game with it
    CloseAll,
    /// Keep the launcher open
    OpenLauncher,
}

impl CloseBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseBehavior::CloseLauncher => "close-launcher",
            CloseBehavior::CloseAll => "close-all",
            CloseBehavior::OpenLauncher => "open-launcher",
        }
    }
}

impl std::str::FromStr for CloseBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "close-launcher" => Ok(CloseBehavior::CloseLauncher),
            "close-all" => Ok(CloseBehavior::CloseAll),
            "open-launcher" => Ok(CloseBehavior::OpenLauncher),
            other => Err(format!(
                "unknown close behavior '{}', expected close-launcher, close-all or open-launcher",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LauncherOptions {
    #[serde(default)]
    pub close: CloseBehavior,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherSettings {
    #[serde(default = "sentinel")]
    pub uuid: String,
    pub launcher: LauncherOptions,
}

impl LauncherSettings {
    pub fn new(close: CloseBehavior) -> Self {
        Self {
            uuid: sentinel(),
            launcher: LauncherOptions { close },
        }
    }
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self::new(CloseBehavior::default())
    }
}

/// Custom Java executable. Older launchers wrote `false` for "bundled Java".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaPath {
    #[serde(default = "sentinel")]
    pub uuid: String,
    #[serde(default, deserialize_with = "path_or_false")]
    pub path: Option<String>,
}

impl JavaPath {
    pub fn new(path: Option<String>) -> Self {
        Self {
            uuid: sentinel(),
            path,
        }
    }
}

impl Default for JavaPath {
    fn default() -> Self {
        Self::new(None)
    }
}

fn path_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Path(String),
        Flag(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Path(p)) if !p.is_empty() => Some(p),
        _ => None,
    })
}

/// Extra JVM arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaArgs {
    #[serde(default = "sentinel")]
    pub uuid: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl JavaArgs {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            uuid: sentinel(),
            args,
        }
    }
}

impl Default for JavaArgs {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pointer_layout() {
        let pointer: SelectionPointer = serde_json::from_value(json!({ "uuid": "1234" })).unwrap();
        assert_eq!(pointer.selected, None);

        let value = serde_json::to_value(SelectionPointer::pointing_at("u1")).unwrap();
        assert_eq!(value, json!({ "uuid": "1234", "selected": "u1" }));
    }

    #[test]
    fn test_ram_args() {
        let ram = RamSettings::new("2", "4.5");
        assert_eq!(ram.min_arg().as_deref(), Some("2048M"));
        assert_eq!(ram.max_arg().as_deref(), Some("4608M"));
        assert_eq!(RamSettings::new("x", "0").min_arg(), None);
        assert_eq!(RamSettings::new("1", "0").max_arg(), None);

        let value = serde_json::to_value(&ram).unwrap();
        assert_eq!(value["ramMin"], "2");
    }

    #[test]
    fn test_java_path_accepts_false() {
        let legacy: JavaPath = serde_json::from_value(json!({ "uuid": "1234", "path": false })).unwrap();
        assert_eq!(legacy.path, None);

        let custom: JavaPath =
            serde_json::from_value(json!({ "uuid": "1234", "path": "/usr/bin/java" })).unwrap();
        assert_eq!(custom.path.as_deref(), Some("/usr/bin/java"));
    }

    #[test]
    fn test_close_behavior_names() {
        let settings: LauncherSettings =
            serde_json::from_value(json!({ "uuid": "1234", "launcher": { "close": "close-all" } })).unwrap();
        assert_eq!(settings.launcher.close, CloseBehavior::CloseAll);
        assert_eq!("open-launcher".parse::<CloseBehavior>(), Ok(CloseBehavior::OpenLauncher));
        assert!("minimize".parse::<CloseBehavior>().is_err());
    }

    #[test]
    fn test_auto_screen() {
        assert!(ScreenSettings::new("<auto>", "<auto>").fixed().is_none());
        assert_eq!(ScreenSettings::new("1920", "1080").fixed().unwrap().height, "1080");
    }
}
