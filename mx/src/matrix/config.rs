//! MatrixConfig value and structural diff

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Audio-routing mapping of a device: setting key to assigned value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default, deserialize_with = "deserialize_mapping")]
    pub mapping: BTreeMap<String, String>,
}

/// Accept any YAML scalar as a value so unquoted numbers and flags still load
fn deserialize_mapping<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
        Flag(bool),
    }

    let raw: Option<BTreeMap<String, Scalar>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Scalar::Text(s) => s,
                Scalar::Integer(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Flag(b) => b.to_string(),
            };
            (key, value)
        })
        .collect())
}

impl MatrixConfig {
    pub fn new(mapping: BTreeMap<String, String>) -> Self {
        Self { mapping }
    }

    /// Build from `(key, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            mapping: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.mapping.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Every setting where `target` differs from `self`
    ///
    /// Keys present on only one side are reported with the other side unset.
    pub fn diff(&self, target: &MatrixConfig) -> MatrixDiff {
        let mut mapping = BTreeMap::new();

        for (key, current) in &self.mapping {
            match target.mapping.get(key) {
                Some(wanted) if wanted == current => {}
                wanted => {
                    mapping.insert(
                        key.clone(),
                        Change {
                            current: Some(current.clone()),
                            target: wanted.cloned(),
                        },
                    );
                }
            }
        }

        for (key, wanted) in &target.mapping {
            if !self.mapping.contains_key(key) {
                mapping.insert(
                    key.clone(),
                    Change {
                        current: None,
                        target: Some(wanted.clone()),
                    },
                );
            }
        }

        MatrixDiff { mapping }
    }
}

/// One differing setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub current: Option<String>,
    pub target: Option<String>,
}

/// Structural difference between two configurations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatrixDiff {
    pub mapping: BTreeMap<String, Change>,
}

impl MatrixDiff {
    /// True iff the compared configurations are identical
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }
}

impl fmt::Display for MatrixDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, change) in &self.mapping {
            writeln!(
                f,
                "{}: {} -> {}",
                key,
                change.current.as_deref().unwrap_or("(unset)"),
                change.target.as_deref().unwrap_or("(unset)")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> MatrixConfig {
        MatrixConfig::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_diff_of_identical_configs_is_empty() {
        let a = config(&[("listHdmiAssignBD", "OFF"), ("listHdmiAssignSAT/CBL", "HD3")]);
        let b = a.clone();
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_diff_reports_changed_and_one_sided_keys() {
        let current = config(&[("zone1", "HD1"), ("zone2", "HD2"), ("zone3", "OFF")]);
        let target = config(&[("zone1", "HD1"), ("zone2", "HD4"), ("zone4", "HD5")]);

        let diff = current.diff(&target);
        assert_eq!(diff.len(), 3);
        assert_eq!(
            diff.mapping["zone2"],
            Change {
                current: Some("HD2".to_string()),
                target: Some("HD4".to_string()),
            }
        );
        assert_eq!(diff.mapping["zone3"].target, None);
        assert_eq!(diff.mapping["zone4"].current, None);
        assert!(!diff.mapping.contains_key("zone1"));
    }

    #[test]
    fn test_diff_display() {
        let diff = config(&[("zone2", "HD2")]).diff(&config(&[("zone2", "HD4")]));
        assert_eq!(diff.to_string(), "zone2: HD2 -> HD4\n");
    }

    #[test]
    fn test_parse_yaml_mapping() {
        let yaml = r#"
mapping:
  listHdmiAssignBD: "OFF"
  listHdmiAssignSAT/CBL: HD3
  volumeLimit: 60
  ecoMode: false
"#;
        let parsed: MatrixConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed.get("listHdmiAssignBD"), Some("OFF"));
        assert_eq!(parsed.get("listHdmiAssignSAT/CBL"), Some("HD3"));
        assert_eq!(parsed.get("volumeLimit"), Some("60"));
        assert_eq!(parsed.get("ecoMode"), Some("false"));
    }

    #[test]
    fn test_parse_missing_or_null_mapping_is_empty() {
        let parsed: MatrixConfig = serde_yaml::from_str("{}").unwrap();
        assert!(parsed.is_empty());
        let parsed: MatrixConfig = serde_yaml::from_str("mapping:\n").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_rejects_nested_values() {
        let result: Result<MatrixConfig, _> = serde_yaml::from_str("mapping:\n  zone1: [a, b]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_json_body_shape() {
        let json = serde_json::to_value(config(&[("zone1", "HD1")])).unwrap();
        assert_eq!(json, serde_json::json!({"mapping": {"zone1": "HD1"}}));
    }
}
