//! Sensor manifest loading.
//!
//! The compiler core only needs an ordered list of sensor names; this module
//! pulls that list out of a robot description file:
//!
//! ```yaml
//! sensors:
//!   - name: imu_pitch
//!     bus: i2c
//!   - foot_contact_l
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Toml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ManifestFormat::Yaml),
            "toml" => Some(ManifestFormat::Toml),
            "json" => Some(ManifestFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RobotManifest {
    #[serde(default)]
    sensors: Vec<SensorEntry>,
}

/// Either `- imu_pitch` or `- name: imu_pitch` with arbitrary extra keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SensorEntry {
    Name(String),
    Detailed { name: String },
}

impl SensorEntry {
    fn into_name(self) -> String {
        match self {
            SensorEntry::Name(name) | SensorEntry::Detailed { name } => name,
        }
    }
}

/// Sensor names in document order.
pub fn parse_manifest(text: &str, format: ManifestFormat) -> Result<Vec<String>, CompileError> {
    let manifest: RobotManifest = match format {
        ManifestFormat::Yaml => {
            // An empty YAML document is null, not an empty mapping.
            if text.trim().is_empty() {
                RobotManifest::default()
            } else {
                serde_yaml::from_str(text).map_err(|e| invalid(format, e))?
            }
        }
        ManifestFormat::Toml => toml::from_str(text).map_err(|e| invalid(format, e))?,
        ManifestFormat::Json => serde_json::from_str(text).map_err(|e| invalid(format, e))?,
    };
    Ok(manifest
        .sensors
        .into_iter()
        .map(SensorEntry::into_name)
        .collect())
}

pub fn load_sensor_manifest(path: &Path) -> Result<Vec<String>, CompileError> {
    let format = ManifestFormat::from_path(path).ok_or_else(|| {
        CompileError::Configuration(format!(
            "{}: unknown manifest format, expected .yaml, .yml, .toml or .json",
            path.display()
        ))
    })?;
    let text = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
    let names = parse_manifest(&text, format).map_err(|err| match err {
        CompileError::Configuration(msg) => {
            CompileError::Configuration(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    debug!(path = %path.display(), sensors = names.len(), "manifest loaded");
    Ok(names)
}

fn invalid(format: ManifestFormat, error: impl std::fmt::Display) -> CompileError {
    CompileError::Configuration(format!("invalid {:?} manifest: {}", format, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_entries_keep_document_order() {
        let text = "sensors:\n  - name: imu_pitch\n    bus: i2c\n  - foot_contact_l\n  - name: imu_roll\n";
        let names = parse_manifest(text, ManifestFormat::Yaml).unwrap();
        assert_eq!(names, vec!["imu_pitch", "foot_contact_l", "imu_roll"]);
    }

    #[test]
    fn toml_and_json_shapes() {
        let toml_text = "[[sensors]]\nname = \"imu_pitch\"\n\n[[sensors]]\nname = \"lidar\"\nrate = 10\n";
        assert_eq!(
            parse_manifest(toml_text, ManifestFormat::Toml).unwrap(),
            vec!["imu_pitch", "lidar"]
        );

        let json_text = r#"{"robot": "floki", "sensors": ["imu_pitch", {"name": "lidar"}]}"#;
        assert_eq!(
            parse_manifest(json_text, ManifestFormat::Json).unwrap(),
            vec!["imu_pitch", "lidar"]
        );
    }

    #[test]
    fn missing_sensor_list_is_empty() {
        assert!(parse_manifest("robot: floki\n", ManifestFormat::Yaml)
            .unwrap()
            .is_empty());
        assert!(parse_manifest("", ManifestFormat::Yaml).unwrap().is_empty());
        assert!(parse_manifest("{}", ManifestFormat::Json).unwrap().is_empty());
    }

    #[test]
    fn malformed_documents_are_configuration_errors() {
        let err = parse_manifest("sensors: [", ManifestFormat::Yaml).unwrap_err();
        assert!(matches!(err, CompileError::Configuration(_)));
        let err = parse_manifest("sensors:\n  - rate: 10\n", ManifestFormat::Yaml).unwrap_err();
        assert!(matches!(err, CompileError::Configuration(_)));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ManifestFormat::from_path(Path::new("robot.yaml")), Some(ManifestFormat::Yaml));
        assert_eq!(ManifestFormat::from_path(Path::new("robot.YML")), Some(ManifestFormat::Yaml));
        assert_eq!(ManifestFormat::from_path(Path::new("robot.toml")), Some(ManifestFormat::Toml));
        assert_eq!(ManifestFormat::from_path(Path::new("robot.ini")), None);
        assert_eq!(ManifestFormat::from_path(Path::new("robot")), None);
    }

    #[test]
    fn loads_from_disk_with_path_in_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.yaml");
        fs::write(&path, "sensors:\n  - name: imu_pitch\n").unwrap();
        assert_eq!(load_sensor_manifest(&path).unwrap(), vec!["imu_pitch"]);

        let bad = dir.path().join("robot.ini");
        fs::write(&bad, "").unwrap();
        let err = load_sensor_manifest(&bad).unwrap_err();
        assert!(err.to_string().contains("robot.ini"));
    }
}
