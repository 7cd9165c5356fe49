//! Persona profiles and conversation sides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};

/// A participant profile: identity plus free-text needs and personality.
///
/// Personas are immutable once loaded. The on-disk format is a flat JSON
/// object `{id, needs, personality}`; missing text fields load as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    #[serde(default)]
    pub needs: String,
    #[serde(default)]
    pub personality: String,
}

impl Persona {
    pub fn new(
        id: impl Into<String>,
        needs: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            needs: needs.into(),
            personality: personality.into(),
        }
    }

    /// Load a persona from a JSON file.
    ///
    /// When the document has no `id`, the file stem is used instead.
    pub fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut value: serde_json::Value = serde_json::from_str(&raw)?;

        let obj = value.as_object_mut().ok_or_else(|| {
            DomainError::InvalidPersona(format!("{} is not a JSON object", path.display()))
        })?;

        let has_id = obj
            .get("id")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_id {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            obj.insert("id".to_string(), serde_json::Value::String(stem));
        }

        Ok(serde_json::from_value(value)?)
    }
}

/// One of the two sides of a conversation.
///
/// Side A is the confidence-building party; side B is the evaluating party
/// whose engagement drives the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    #[default]
    SideA,
    SideB,
}

impl Speaker {
    /// The other side.
    pub const fn other(self) -> Self {
        match self {
            Self::SideA => Self::SideB,
            Self::SideB => Self::SideA,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SideA => "side_a",
            Self::SideB => "side_b",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Speaker {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "side_a" | "a" | "profile_1" => Ok(Self::SideA),
            "side_b" | "b" | "profile_2" => Ok(Self::SideB),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown speaker '{other}', expected side_a or side_b"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_speaker_other_alternates() {
        assert_eq!(Speaker::SideA.other(), Speaker::SideB);
        assert_eq!(Speaker::SideB.other().other(), Speaker::SideB);
    }

    #[test]
    fn test_speaker_parse() {
        assert_eq!("side_b".parse::<Speaker>().unwrap(), Speaker::SideB);
        assert_eq!("profile_1".parse::<Speaker>().unwrap(), Speaker::SideA);
        assert!("side_c".parse::<Speaker>().is_err());
    }

    #[test]
    fn test_load_defaults_id_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001__Ada.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"needs": "seed funding", "personality": "direct"}}"#).unwrap();

        let persona = Persona::load(&path).unwrap();
        assert_eq!(persona.id, "001__Ada");
        assert_eq!(persona.needs, "seed funding");
    }

    #[test]
    fn test_load_missing_fields_default_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, r#"{"id": "p-1"}"#).unwrap();

        let persona = Persona::load(&path).unwrap();
        assert_eq!(persona, Persona::new("p-1", "", ""));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            Persona::load(&path),
            Err(DomainError::InvalidPersona(_))
        ));
    }
}
