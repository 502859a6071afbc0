//! Harvest settings stored as RON.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use carousel_core::{
    parse_manifest_list, HarvestPlan, MappedIdentifiers, RebuildSchedule, RuleSet,
    DEFAULT_LABEL_LANGUAGES, DEFAULT_REBUILD_INTERVAL_MINUTES, DEFAULT_RULES,
    DEFAULT_TARGET_COUNT, DEFAULT_TARGET_SIZE,
};
use carousel_engine::FetchSettings;
use carousel_logging::carousel_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SETTINGS_FILE: &str = "carousel.ron";
pub const DEFAULT_OUTPUT_FILE: &str = "carousel_images.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings from {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{field} must be at least 1")]
    NotPositive { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// One manifest URL per line.
    pub manifest_urls: String,
    pub selection_rules: String,
    pub number_of_images: usize,
    pub image_size: u32,
    pub label_languages: Vec<String>,
    /// External identifier to internal item id.
    pub identifiers: BTreeMap<String, u64>,
    pub request_timeout_secs: u64,
    pub info_timeout_secs: u64,
    pub max_manifest_bytes: u64,
    pub output: PathBuf,
    pub auto_rebuild_interval_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_urls: String::new(),
            selection_rules: DEFAULT_RULES.to_string(),
            number_of_images: DEFAULT_TARGET_COUNT,
            image_size: DEFAULT_TARGET_SIZE,
            label_languages: DEFAULT_LABEL_LANGUAGES
                .iter()
                .map(|lang| lang.to_string())
                .collect(),
            identifiers: BTreeMap::new(),
            request_timeout_secs: 20,
            info_timeout_secs: 5,
            max_manifest_bytes: FetchSettings::default().max_bytes,
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            auto_rebuild_interval_minutes: DEFAULT_REBUILD_INTERVAL_MINUTES,
        }
    }
}

impl Settings {
    /// Reads and validates settings. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                carousel_info!("No settings at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let settings = Self::from_ron(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        settings.validate()?;
        carousel_info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    fn from_ron(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("number_of_images", self.number_of_images as u64),
            ("image_size", u64::from(self.image_size)),
            ("request_timeout_secs", self.request_timeout_secs),
            ("info_timeout_secs", self.info_timeout_secs),
            ("max_manifest_bytes", self.max_manifest_bytes),
        ];
        match checks.iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::NotPositive { field: *field }),
            None => Ok(()),
        }
    }

    pub fn plan(&self) -> HarvestPlan {
        let label_languages = if self.label_languages.is_empty() {
            HarvestPlan::default().label_languages
        } else {
            self.label_languages.clone()
        };
        HarvestPlan {
            manifest_urls: parse_manifest_list(&self.manifest_urls),
            rules: RuleSet::parse(&self.selection_rules),
            target_size: self.image_size,
            target_count: self.number_of_images,
            label_languages,
        }
    }

    pub fn identifiers(&self) -> MappedIdentifiers {
        let map: HashMap<String, u64> = self
            .identifiers
            .iter()
            .map(|(key, id)| (key.clone(), *id))
            .collect();
        MappedIdentifiers::new(map)
    }

    pub fn manifest_fetch(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_manifest_bytes,
            ..FetchSettings::default()
        }
    }

    pub fn info_fetch(&self) -> FetchSettings {
        FetchSettings::for_image_info(Duration::from_secs(self.info_timeout_secs))
    }

    pub fn schedule(&self) -> RebuildSchedule {
        RebuildSchedule::every_minutes(self.auto_rebuild_interval_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.number_of_images, 5);
        assert_eq!(settings.image_size, 1600);
        assert_eq!(settings.output, PathBuf::from("carousel_images.json"));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("carousel.ron");
        fs::write(
            &path,
            r#"(
                manifest_urls: "https://a.example.org/m\n\nhttps://b.example.org/m\n",
                number_of_images: 3,
                identifiers: { "ark:/99/xyz": 7 },
            )"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.number_of_images, 3);
        assert_eq!(settings.image_size, 1600);

        let plan = settings.plan();
        assert_eq!(plan.manifest_urls.len(), 2);
        assert_eq!(plan.target_count, 3);
        assert_eq!(plan.rules, RuleSet::default());
        assert_eq!(settings.identifiers().len(), 1);
    }

    #[test]
    fn zero_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("carousel.ron");
        fs::write(&path, "(image_size: 0)").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "image_size" }));

        let settings = Settings {
            number_of_images: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::NotPositive { field: "number_of_images" })
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("carousel.ron");
        fs::write(&path, "(number_of_images: \"many\")").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn written_settings_load_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("carousel.ron");
        let settings = Settings {
            manifest_urls: "https://a.example.org/m".to_string(),
            auto_rebuild_interval_minutes: 15,
            ..Settings::default()
        };
        fs::write(&path, settings.to_ron().unwrap()).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
        assert_eq!(settings.schedule().interval(), Duration::from_secs(900));
    }

    #[test]
    fn empty_language_list_falls_back_to_defaults() {
        let settings = Settings {
            label_languages: Vec::new(),
            ..Settings::default()
        };
        assert_eq!(settings.plan().label_languages, vec!["ja", "en", "none"]);
    }
}
