//! Run configuration.
//!
//! Everything the counter needs at start: the line, the counted classes
//! with their capacities, and the track timeout. Loaded from YAML, with
//! every field optional, then overridden from the command line. The
//! configuration is immutable once a [`LineCounter`](crate::counting::LineCounter)
//! has been built from it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::counting::{Capacity, ClassLabel, LineConfig};
use crate::error::LinecountError;

/// Frames a track may go unseen before it is evicted.
pub const DEFAULT_TRACK_TIMEOUT_FRAMES: u64 = 30;

/// Capacity and starting inventory for one class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassConfig {
    pub capacity: Capacity,
    pub initial_inventory: i64,
}

/// Complete counter configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CounterConfig {
    pub line: LineConfig,
    #[serde(deserialize_with = "deserialize_classes")]
    pub classes: BTreeMap<ClassLabel, ClassConfig>,
    pub track_timeout_frames: u64,
    /// Per-frame movement above which a track is flagged as a possible
    /// identity reuse. Disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_jump_px: Option<f64>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        let classes = ["car", "motorcycle"]
            .into_iter()
            .map(|name| (ClassLabel::new(name), ClassConfig::default()))
            .collect();
        Self {
            line: LineConfig::default(),
            classes,
            track_timeout_frames: DEFAULT_TRACK_TIMEOUT_FRAMES,
            max_jump_px: None,
        }
    }
}

impl CounterConfig {
    /// Reads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, LinecountError> {
        let text = fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|source| LinecountError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a YAML configuration string.
    pub fn from_yaml_str(text: &str) -> Result<Self, LinecountError> {
        serde_yaml::from_str(text).map_err(|source| LinecountError::ConfigParse {
            path: Path::new("<string>").to_path_buf(),
            source,
        })
    }

    pub fn to_yaml_string(&self) -> Result<String, LinecountError> {
        serde_yaml::to_string(self).map_err(LinecountError::ConfigWrite)
    }

    /// Sets a class capacity, adding the class if it is not configured yet.
    pub fn set_capacity(&mut self, class: ClassLabel, capacity: Capacity) {
        self.classes.entry(class).or_default().capacity = capacity;
    }

    /// Sets a class's starting inventory, adding the class if needed.
    pub fn set_initial_inventory(&mut self, class: ClassLabel, initial: i64) {
        self.classes.entry(class).or_default().initial_inventory = initial;
    }

    /// Checks the configuration before any frame is processed.
    pub fn validate(&self) -> Result<(), LinecountError> {
        self.line.validate()?;

        if self.classes.is_empty() {
            return Err(LinecountError::InvalidConfig(
                "at least one class must be configured".to_string(),
            ));
        }
        if self.classes.keys().any(ClassLabel::is_empty) {
            return Err(LinecountError::InvalidConfig(
                "class names must not be empty".to_string(),
            ));
        }
        if let Some(jump) = self.max_jump_px {
            if !jump.is_finite() || jump <= 0.0 {
                return Err(LinecountError::InvalidConfig(format!(
                    "max_jump_px must be a positive number, got {}",
                    jump
                )));
            }
        }
        Ok(())
    }
}

/// Reads the class map, rejecting names that collide once normalized.
fn deserialize_classes<'de, D>(deserializer: D) -> Result<BTreeMap<ClassLabel, ClassConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, ClassConfig>::deserialize(deserializer)?;
    let mut classes = BTreeMap::new();
    for (name, config) in raw {
        let label = ClassLabel::new(&name);
        if classes.insert(label.clone(), config).is_some() {
            return Err(serde::de::Error::custom(format!(
                "class '{}' is configured more than once (as '{}')",
                label, name
            )));
        }
    }
    Ok(classes)
}

/// Splits a `CLASS=VALUE` command-line argument.
pub fn parse_class_assignment(arg: &str) -> Result<(ClassLabel, &str), LinecountError> {
    let (class, value) = arg.split_once('=').ok_or_else(|| {
        LinecountError::InvalidConfig(format!("expected CLASS=VALUE, got '{}'", arg))
    })?;
    let label = ClassLabel::new(class);
    if label.is_empty() {
        return Err(LinecountError::InvalidConfig(format!(
            "missing class name in '{}'",
            arg
        )));
    }
    Ok((label, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::Orientation;

    #[test]
    fn test_default_config() {
        let config = CounterConfig::default();
        assert_eq!(config.line.orientation, Orientation::Vertical);
        assert_eq!(config.line.position, 0.5);
        assert_eq!(config.classes.len(), 2);
        assert_eq!(
            config.classes[&ClassLabel::new("car")].capacity,
            Capacity::Limited(50)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = CounterConfig::from_yaml_str(
            "line:\n  orientation: horizontal\n  invert: true\nclasses:\n  Car:\n    capacity: 2\n  bus:\n    capacity: unlimited\n",
        )
        .unwrap();
        assert_eq!(config.line.orientation, Orientation::Horizontal);
        assert_eq!(config.line.position, 0.5);
        assert!(config.line.invert);
        assert_eq!(config.classes.len(), 2);
        assert_eq!(
            config.classes[&ClassLabel::new("car")].capacity,
            Capacity::Limited(2)
        );
        assert_eq!(
            config.classes[&ClassLabel::new("bus")].capacity,
            Capacity::Unlimited
        );
        assert_eq!(config.track_timeout_frames, DEFAULT_TRACK_TIMEOUT_FRAMES);
    }

    #[test]
    fn test_yaml_duplicate_class_rejected() {
        let result = CounterConfig::from_yaml_str(
            "classes:\n  motorbike: {capacity: 1}\n  motorcycle: {capacity: 2}\n",
        );
        assert!(matches!(result, Err(LinecountError::ConfigParse { .. })));
    }

    #[test]
    fn test_yaml_unknown_field_rejected() {
        assert!(CounterConfig::from_yaml_str("colour: red\n").is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = CounterConfig::default();
        config.set_capacity(ClassLabel::new("bus"), Capacity::Unlimited);
        let text = config.to_yaml_string().unwrap();
        let restored = CounterConfig::from_yaml_str(&text).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_validate_rejects_bad_line() {
        let mut config = CounterConfig::default();
        config.line.position = 2.0;
        assert!(matches!(
            config.validate(),
            Err(LinecountError::InvalidLineConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_classes() {
        let config = CounterConfig {
            classes: BTreeMap::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LinecountError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_jump() {
        let config = CounterConfig {
            max_jump_px: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_class_assignment() {
        let (label, value) = parse_class_assignment("Motorbike=12").unwrap();
        assert_eq!(label.as_str(), "motorcycle");
        assert_eq!(value, "12");
        assert!(parse_class_assignment("car").is_err());
        assert!(parse_class_assignment("=3").is_err());
    }
}
